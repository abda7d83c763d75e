use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{with_deadline, ParleyError, Result};
use crate::fallback::{ChainOutcome, Stage};
use super::{AudioInput, SpeechEngine, Transcript};

/// Primary recognizer with an optional secondary behind it
pub struct TranscriptionChain {
    primary: Arc<dyn SpeechEngine>,
    secondary: Option<Arc<dyn SpeechEngine>>,
    /// Reported for secondary results; that engine runs a single-language model
    fallback_language: String,
    timeout: Duration,
}

impl TranscriptionChain {
    pub fn new(
        primary: Arc<dyn SpeechEngine>,
        secondary: Option<Arc<dyn SpeechEngine>>,
        fallback_language: String,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            fallback_language,
            timeout,
        }
    }

    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    pub fn secondary_name(&self) -> Option<&'static str> {
        self.secondary.as_ref().map(|engine| engine.name())
    }

    /// Run the chain and report which stage produced the transcript
    pub async fn run(&self, audio: &AudioInput) -> ChainOutcome<Transcript> {
        let primary = async {
            let engine = &self.primary;
            let result = with_deadline(engine.name(), self.timeout, engine.transcribe(audio)).await?;
            Ok::<_, ParleyError>(Transcript {
                text: result.text,
                language: result.language,
                engine: engine.name().to_string(),
                stage: Stage::Primary,
            })
        };

        let secondary = self.secondary.as_ref().map(move |engine| {
            move || async move {
                if !engine.is_available() {
                    return Err(ParleyError::engine(engine.name(), "engine is not available"));
                }

                let result =
                    with_deadline(engine.name(), self.timeout, engine.transcribe(audio)).await?;
                Ok::<_, ParleyError>(Transcript {
                    text: result.text,
                    language: Some(self.fallback_language.clone()),
                    engine: engine.name().to_string(),
                    stage: Stage::Fallback,
                })
            }
        });

        ChainOutcome::run(primary, secondary).await
    }

    /// Transcribe `audio`, failing only when no engine produced a transcript
    pub async fn transcribe(&self, audio: &AudioInput) -> Result<Transcript> {
        if audio.is_empty() {
            return Err(ParleyError::InvalidInput("audio is empty".to_string()));
        }

        let outcome = self.run(audio).await;
        if let ChainOutcome::Fallback { value, primary_error } = &outcome {
            info!(
                "Transcribed with {} after primary failure: {}",
                value.engine, primary_error
            );
        }

        let (transcript, _) = outcome.into_result(|primary, secondary| {
            warn!("All transcription engines failed");
            ParleyError::TranscriptionFailed { primary, secondary }
        })?;
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::{EngineTranscript, MockSpeechEngine};

    fn audio() -> AudioInput {
        AudioInput::new(b"RIFF0000WAVE".to_vec(), Some("clip.wav".to_string()))
    }

    fn engine(name: &'static str) -> MockSpeechEngine {
        let mut engine = MockSpeechEngine::new();
        engine.expect_name().return_const(name);
        engine
    }

    fn chain(primary: MockSpeechEngine, secondary: Option<MockSpeechEngine>) -> TranscriptionChain {
        TranscriptionChain::new(
            Arc::new(primary),
            secondary.map(|engine| Arc::new(engine) as Arc<dyn SpeechEngine>),
            "en".to_string(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_primary_success_never_touches_secondary() {
        let mut primary = engine("whisper");
        primary.expect_transcribe().times(1).returning(|_| {
            Ok(EngineTranscript {
                text: "hola mundo".to_string(),
                language: Some("es".to_string()),
            })
        });
        let mut secondary = engine("whisper.cpp");
        secondary.expect_is_available().never();
        secondary.expect_transcribe().never();

        let transcript = chain(primary, Some(secondary)).transcribe(&audio()).await.unwrap();
        assert_eq!(transcript.text, "hola mundo");
        assert_eq!(transcript.language.as_deref(), Some("es"));
        assert_eq!(transcript.engine, "whisper");
        assert_eq!(transcript.stage, Stage::Primary);
    }

    #[tokio::test]
    async fn test_fallback_reports_fixed_language() {
        let mut primary = engine("whisper");
        primary
            .expect_transcribe()
            .times(1)
            .returning(|_| Err(ParleyError::engine("whisper", "model missing")));
        let mut secondary = engine("whisper.cpp");
        secondary.expect_is_available().return_const(true);
        secondary.expect_transcribe().times(1).returning(|_| {
            Ok(EngineTranscript {
                text: "hello world".to_string(),
                language: Some("de".to_string()),
            })
        });

        let outcome = chain(primary, Some(secondary)).run(&audio()).await;
        match outcome {
            ChainOutcome::Fallback {
                value,
                primary_error,
            } => {
                assert_eq!(value.text, "hello world");
                assert_eq!(value.language.as_deref(), Some("en"));
                assert_eq!(value.stage, Stage::Fallback);
                assert!(primary_error.to_string().contains("model missing"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_both_failures_are_combined() {
        let mut primary = engine("whisper");
        primary
            .expect_transcribe()
            .returning(|_| Err(ParleyError::engine("whisper", "decoder crashed")));
        let mut secondary = engine("whisper.cpp");
        secondary.expect_is_available().return_const(true);
        secondary
            .expect_transcribe()
            .returning(|_| Err(ParleyError::engine("whisper.cpp", "bad wav header")));

        let err = chain(primary, Some(secondary))
            .transcribe(&audio())
            .await
            .unwrap_err();
        match err {
            ParleyError::TranscriptionFailed { primary, secondary } => {
                assert!(primary.contains("decoder crashed"));
                assert!(secondary.contains("bad wav header"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_secondary_is_not_run() {
        let mut primary = engine("whisper");
        primary
            .expect_transcribe()
            .returning(|_| Err(ParleyError::engine("whisper", "not installed")));
        let mut secondary = engine("whisper.cpp");
        secondary.expect_is_available().return_const(false);
        secondary.expect_transcribe().never();

        let err = chain(primary, Some(secondary))
            .transcribe(&audio())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not available"));
    }

    #[tokio::test]
    async fn test_no_secondary_configured() {
        let mut primary = engine("whisper");
        primary
            .expect_transcribe()
            .returning(|_| Err(ParleyError::engine("whisper", "not installed")));

        let err = chain(primary, None).transcribe(&audio()).await.unwrap_err();
        assert!(matches!(err, ParleyError::TranscriptionFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_audio_is_rejected() {
        let mut primary = engine("whisper");
        primary.expect_transcribe().never();

        let err = chain(primary, None)
            .transcribe(&AudioInput::new(Vec::new(), None))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }
}
