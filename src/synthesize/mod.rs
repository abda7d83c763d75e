//! Text-to-speech: a voice-per-language primary engine with a basic
//! secondary synthesizer behind it.

pub mod chain;
pub mod coqui;
pub mod espeak;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;

pub use chain::SynthesisChain;
use crate::config::SynthesisConfig;
use crate::error::Result;
use crate::fallback::Stage;

/// Primary engine: voices must be loaded before speaking
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Prepare `voice` for subsequent `speak` calls
    async fn load_voice(&self, voice: &str) -> Result<()>;

    /// Write a WAV rendering of `text` to `out`
    async fn speak(&self, text: &str, voice: &str, out: &Path) -> Result<()>;
}

/// Secondary engine: a single built-in voice, no preparation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FallbackSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn speak(&self, text: &str, out: &Path) -> Result<()>;
}

/// Synthesized audio in a temp file, removed when the artifact drops
#[derive(Debug)]
pub struct SpeechArtifact {
    pub path: TempPath,
    pub engine: String,
    pub stage: Stage,
    /// Language of the voice that was used; differs from the request when
    /// the default voice was substituted
    pub voice_language: String,
}

impl SpeechArtifact {
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Voice picked for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSelection {
    pub language: String,
    pub voice: String,
    pub substituted: bool,
}

pub struct SynthesizerFactory;

impl SynthesizerFactory {
    /// Coqui TTS as primary; espeak-ng as secondary unless its path is empty
    pub fn create_chain(config: &SynthesisConfig) -> SynthesisChain {
        let primary: Arc<dyn VoiceEngine> =
            Arc::new(coqui::CoquiEngine::new(config.binary_path.clone()));
        let secondary = (!config.fallback_binary_path.trim().is_empty()).then(|| {
            Arc::new(espeak::EspeakEngine::new(config.fallback_binary_path.clone()))
                as Arc<dyn FallbackSynthesizer>
        });

        SynthesisChain::new(primary, secondary, config)
    }
}
