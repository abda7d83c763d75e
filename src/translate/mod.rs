// Translation routing and model lifecycle
//
// - cache: loads each language-pair model at most once and shares it across requests
// - router: picks identity, direct or pivot routing and drives one or two model runs
// - ollama: model loader backed by an Ollama server

pub mod cache;
pub mod ollama;
pub mod router;

use async_trait::async_trait;
use std::sync::Arc;

pub use cache::{EvictionPolicy, ModelCache};
pub use router::{Route, Translation, TranslationRouter};

use crate::config::TranslateConfig;
use crate::error::Result;
use crate::language::{LanguagePair, SupportedPairSet};

/// A loaded model bound to one language pair.
///
/// Implementations are shared between concurrent requests once cached, so
/// `translate` must be safe to call from several tasks at once.
#[async_trait]
pub trait TranslationModel: Send + Sync {
    /// Translate `text` from the pair's source language to its target language
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Constructs models for language pairs (the expensive step the cache guards)
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, pair: &LanguagePair) -> Result<Arc<dyn TranslationModel>>;
}

/// Factory for creating the translation router
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Build a router backed by the Ollama loader described in `config`
    pub fn create_router(config: &TranslateConfig) -> Result<TranslationRouter> {
        let loader: Arc<dyn ModelLoader> = Arc::new(ollama::OllamaLoader::new(config.clone())?);
        Self::create_router_with_loader(config, loader)
    }

    /// Build a router around any loader, using the catalog and policies from `config`
    pub fn create_router_with_loader(
        config: &TranslateConfig,
        loader: Arc<dyn ModelLoader>,
    ) -> Result<TranslationRouter> {
        let supported = SupportedPairSet::parse(&config.supported_pairs)?;
        let cache = ModelCache::new(loader, EvictionPolicy::from(config.cache), config.timeout());

        Ok(TranslationRouter::new(
            cache,
            supported,
            &config.pivot_language,
            config.timeout(),
        ))
    }
}
