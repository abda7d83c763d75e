use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::detect::{FastTextDetector, LanguageDetector};
use crate::error::Result;
use crate::synthesize::{SynthesisChain, SynthesizerFactory};
use crate::transcribe::{TranscriberFactory, TranscriptionChain};
use crate::translate::{TranslationRouter, TranslatorFactory};

/// Every long-lived component, built once at startup and shared by the
/// HTTP handlers and CLI commands
pub struct Services {
    pub translator: TranslationRouter,
    pub transcriber: TranscriptionChain,
    pub synthesizer: SynthesisChain,
    pub detector: Arc<dyn LanguageDetector>,
}

impl Services {
    pub fn new(
        translator: TranslationRouter,
        transcriber: TranscriptionChain,
        synthesizer: SynthesisChain,
        detector: Arc<dyn LanguageDetector>,
    ) -> Self {
        Self {
            translator,
            transcriber,
            synthesizer,
            detector,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let translator = TranslatorFactory::create_router(&config.translate)?;
        let transcriber = TranscriberFactory::create_chain(&config.transcriber);
        let synthesizer = SynthesizerFactory::create_chain(&config.synthesis);
        let detector = Arc::new(FastTextDetector::new(config.detect.clone()));

        info!(
            "Services ready: {} translation pairs via pivot '{}', STT {} (secondary: {}), TTS voices {:?}",
            translator.supported_pairs().len(),
            translator.pivot_language(),
            transcriber.primary_name(),
            transcriber.secondary_name().unwrap_or("none"),
            synthesizer.voice_languages(),
        );

        Ok(Self::new(translator, transcriber, synthesizer, detector))
    }
}
