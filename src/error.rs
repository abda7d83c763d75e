use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::language::LanguagePair;

/// Which hop of a translation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationLeg {
    Direct,
    /// source -> pivot
    ToPivot,
    /// pivot -> target
    FromPivot,
}

impl fmt::Display for TranslationLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::ToPivot => write!(f, "source-to-pivot leg"),
            Self::FromPivot => write!(f, "pivot-to-target leg"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No suitable translation model found for {pair}")]
    UnsupportedLanguagePair { pair: LanguagePair },

    #[error("Model loading failed for {pair}: {reason}")]
    ModelLoad { pair: LanguagePair, reason: String },

    #[error("Translation failed for {pair} ({leg}): {cause}")]
    TranslationFailed {
        pair: LanguagePair,
        leg: TranslationLeg,
        #[source]
        cause: Box<ParleyError>,
    },

    #[error("Transcription failed: primary: {primary}; secondary: {secondary}")]
    TranscriptionFailed { primary: String, secondary: String },

    #[error("Synthesis failed: primary: {primary}; secondary: {secondary}")]
    SynthesisFailed { primary: String, secondary: String },

    #[error("{engine} failed: {message}")]
    Engine { engine: String, message: String },

    #[error("Language detection error: {0}")]
    Detection(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ParleyError {
    pub fn engine(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Engine {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Errors caused by the request itself rather than by a provider
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::UnsupportedLanguagePair { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;

/// Run `future` under a deadline, mapping expiry to [`ParleyError::Timeout`]
pub async fn with_deadline<T, F>(operation: &str, deadline: Duration, future: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => Err(ParleyError::Timeout {
            operation: operation.to_string(),
            after: deadline,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        let pair = LanguagePair::new("fr", "xx").unwrap();
        assert!(ParleyError::InvalidInput("empty".into()).is_client_error());
        assert!(ParleyError::UnsupportedLanguagePair { pair: pair.clone() }.is_client_error());
        assert!(!ParleyError::ModelLoad { pair, reason: "gone".into() }.is_client_error());
        assert!(!ParleyError::engine("espeak-ng", "boom").is_client_error());
    }

    #[test]
    fn test_translation_failure_names_leg_and_cause() {
        let pair = LanguagePair::new("fr", "de").unwrap();
        let err = ParleyError::TranslationFailed {
            pair: pair.clone(),
            leg: TranslationLeg::FromPivot,
            cause: Box::new(ParleyError::ModelLoad {
                pair: LanguagePair::new("en", "de").unwrap(),
                reason: "missing weights".into(),
            }),
        };
        let message = err.to_string();
        assert!(message.contains("fr-de"));
        assert!(message.contains("pivot-to-target leg"));
        assert!(message.contains("missing weights"));
    }

    #[tokio::test]
    async fn test_deadline_expiry_is_timeout() {
        let result: Result<()> = with_deadline("slow op", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ParleyError::Timeout { .. }));
        assert!(err.to_string().starts_with("slow op timed out"));
    }
}
