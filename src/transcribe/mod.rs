// Speech-to-text behind a primary/secondary engine pair
//
// - OpenAI: `whisper` CLI, multilingual, reports the detected language
// - WhisperCpp: `whisper-cli` with a single-language GGML model, used only
//   when the primary fails
//
// To add an engine, implement `SpeechEngine`, add it to
// `TranscriberImplementation` and teach the factory to build it.

pub mod chain;
pub mod common;
pub mod openai;
pub mod whisper_cpp;

use async_trait::async_trait;
use std::sync::Arc;

pub use chain::TranscriptionChain;
pub use common::{AudioInput, EngineTranscript, Transcript};
use crate::config::TranscriberConfig;

/// One speech recognition engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Short engine name reported to callers
    fn name(&self) -> &'static str;

    /// Cheap local check that the engine can run at all
    fn is_available(&self) -> bool;

    async fn transcribe(&self, audio: &AudioInput) -> crate::error::Result<EngineTranscript>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriberImplementation {
    OpenAI,
    WhisperCpp,
}

/// Factory for creating transcription engines and chains
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_engine(
        implementation: TranscriberImplementation,
        config: &TranscriberConfig,
    ) -> Arc<dyn SpeechEngine> {
        match implementation {
            TranscriberImplementation::OpenAI => {
                Arc::new(openai::WhisperEngine::new(config.clone()))
            }
            TranscriberImplementation::WhisperCpp => {
                Arc::new(whisper_cpp::WhisperCppEngine::new(config.clone()))
            }
        }
    }

    /// OpenAI Whisper as primary, whisper.cpp as secondary when enabled
    pub fn create_chain(config: &TranscriberConfig) -> TranscriptionChain {
        let primary = Self::create_engine(TranscriberImplementation::OpenAI, config);
        let secondary = config
            .use_fallback
            .then(|| Self::create_engine(TranscriberImplementation::WhisperCpp, config));

        TranscriptionChain::new(
            primary,
            secondary,
            config.fallback_language.clone(),
            config.timeout(),
        )
    }
}
