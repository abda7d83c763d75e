use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::SynthesisConfig;
use crate::error::{with_deadline, ParleyError, Result};
use crate::fallback::{ChainOutcome, Stage};
use crate::language::normalize_code;
use super::{FallbackSynthesizer, SpeechArtifact, VoiceEngine, VoiceSelection};

pub struct SynthesisChain {
    primary: Arc<dyn VoiceEngine>,
    secondary: Option<Arc<dyn FallbackSynthesizer>>,
    voices: BTreeMap<String, String>,
    default_language: String,
    strict_voices: bool,
    /// Voice currently loaded in the primary engine. Held across load and
    /// speak so concurrent requests cannot switch it mid-synthesis.
    loaded_voice: Mutex<Option<String>>,
    timeout: Duration,
}

impl SynthesisChain {
    pub fn new(
        primary: Arc<dyn VoiceEngine>,
        secondary: Option<Arc<dyn FallbackSynthesizer>>,
        config: &SynthesisConfig,
    ) -> Self {
        let voices = config
            .voices
            .iter()
            .map(|(lang, voice)| (normalize_code(lang), voice.clone()))
            .collect();

        Self {
            primary,
            secondary,
            voices,
            default_language: normalize_code(&config.default_language),
            strict_voices: config.strict_voices,
            loaded_voice: Mutex::new(None),
            timeout: config.timeout(),
        }
    }

    /// Languages with a dedicated voice
    pub fn voice_languages(&self) -> Vec<String> {
        self.voices.keys().cloned().collect()
    }

    pub fn select_voice(&self, language: &str) -> Result<VoiceSelection> {
        let language = normalize_code(language);
        if let Some(voice) = self.voices.get(&language) {
            return Ok(VoiceSelection {
                language,
                voice: voice.clone(),
                substituted: false,
            });
        }

        if self.strict_voices {
            return Err(ParleyError::InvalidInput(format!(
                "No voice configured for language '{}'",
                language
            )));
        }

        let voice = self.voices.get(&self.default_language).ok_or_else(|| {
            ParleyError::Config(format!(
                "No voice configured for default language '{}'",
                self.default_language
            ))
        })?;

        Ok(VoiceSelection {
            language: self.default_language.clone(),
            voice: voice.clone(),
            substituted: true,
        })
    }

    /// Run the chain, reporting which stage produced the audio. The outer
    /// error covers bad input and temp-file failures only.
    pub async fn run(&self, text: &str, language: &str) -> Result<ChainOutcome<SpeechArtifact>> {
        if text.trim().is_empty() {
            return Err(ParleyError::InvalidInput("text must not be empty".to_string()));
        }

        let selection = self.select_voice(language)?;
        if selection.substituted {
            warn!(
                "No voice for '{}', using the '{}' voice instead",
                normalize_code(language),
                selection.language
            );
        }
        let out = tempfile::Builder::new()
            .prefix("parley-speech-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        let outcome = ChainOutcome::run(
            self.speak_primary(text, &selection.voice, &out),
            self.secondary.as_ref().map(|engine| {
                let out: &Path = &out;
                move || async move {
                    with_deadline(engine.name(), self.timeout, engine.speak(text, out)).await?;
                    Ok::<_, ParleyError>(engine.name())
                }
            }),
        )
        .await;

        let stage = outcome.stage();
        Ok(outcome.map(move |engine| SpeechArtifact {
            path: out,
            engine: engine.to_string(),
            stage: stage.unwrap_or(Stage::Primary),
            voice_language: selection.language,
        }))
    }

    /// Synthesize `text`, failing only when both engines fail
    pub async fn synthesize(&self, text: &str, language: &str) -> Result<SpeechArtifact> {
        let outcome = self.run(text, language).await?;
        if let ChainOutcome::Fallback { primary_error, .. } = &outcome {
            warn!("Primary synthesis failed, used secondary engine: {}", primary_error);
        }

        let (artifact, _) = outcome
            .into_result(|primary, secondary| ParleyError::SynthesisFailed { primary, secondary })?;
        Ok(artifact)
    }

    async fn speak_primary(&self, text: &str, voice: &str, out: &Path) -> Result<&'static str> {
        let engine = &self.primary;
        let mut loaded = self.loaded_voice.lock().await;

        if loaded.as_deref() != Some(voice) {
            debug!("Loading voice {} into {}", voice, engine.name());
            // A failed load leaves nothing usable loaded
            *loaded = None;
            with_deadline("voice load", self.timeout, engine.load_voice(voice)).await?;
            *loaded = Some(voice.to_string());
        }

        with_deadline(engine.name(), self.timeout, engine.speak(text, voice, out)).await?;
        Ok(engine.name())
    }
}
