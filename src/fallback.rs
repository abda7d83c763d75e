//! Two-stage engine pipeline: run a primary engine, and only if it fails,
//! a secondary one. The outcome says which stage produced the value so
//! callers never have to inspect error types to tell the cases apart.

use std::future::Future;

use tracing::warn;

use crate::error::ParleyError;

/// Which engine produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Primary,
    Fallback,
}

#[derive(Debug)]
pub enum ChainOutcome<T> {
    /// The primary engine succeeded; the secondary was not invoked
    Primary(T),
    /// The primary engine failed and the secondary succeeded
    Fallback { value: T, primary_error: ParleyError },
    /// Nothing produced a value. `secondary` is `None` when no secondary
    /// engine was configured or available.
    Failed {
        primary: ParleyError,
        secondary: Option<ParleyError>,
    },
}

impl<T> ChainOutcome<T> {
    /// Run `primary`, then `secondary` on failure when one is provided
    pub async fn run<P, S, SF>(primary: P, secondary: Option<S>) -> Self
    where
        P: Future<Output = Result<T, ParleyError>>,
        S: FnOnce() -> SF,
        SF: Future<Output = Result<T, ParleyError>>,
    {
        let primary_error = match primary.await {
            Ok(value) => return Self::Primary(value),
            Err(e) => e,
        };

        let Some(secondary) = secondary else {
            return Self::Failed {
                primary: primary_error,
                secondary: None,
            };
        };

        warn!("Primary engine failed: {}. Trying secondary engine", primary_error);
        match secondary().await {
            Ok(value) => Self::Fallback {
                value,
                primary_error,
            },
            Err(secondary_error) => Self::Failed {
                primary: primary_error,
                secondary: Some(secondary_error),
            },
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Primary(_) => Some(Stage::Primary),
            Self::Fallback { .. } => Some(Stage::Fallback),
            Self::Failed { .. } => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ChainOutcome<U> {
        match self {
            Self::Primary(value) => ChainOutcome::Primary(f(value)),
            Self::Fallback {
                value,
                primary_error,
            } => ChainOutcome::Fallback {
                value: f(value),
                primary_error,
            },
            Self::Failed { primary, secondary } => ChainOutcome::Failed { primary, secondary },
        }
    }

    /// Collapse into a plain result, building the combined error with `on_failure`
    pub fn into_result<F>(self, on_failure: F) -> Result<(T, Stage), ParleyError>
    where
        F: FnOnce(String, String) -> ParleyError,
    {
        match self {
            Self::Primary(value) => Ok((value, Stage::Primary)),
            Self::Fallback { value, .. } => Ok((value, Stage::Fallback)),
            Self::Failed { primary, secondary } => {
                let secondary = secondary
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no secondary engine available".to_string());
                Err(on_failure(primary.to_string(), secondary))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Ready;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Secondary = fn() -> Ready<Result<u32, ParleyError>>;

    fn failing(message: &str) -> Result<u32, ParleyError> {
        Err(ParleyError::engine("test", message))
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let secondary_calls = AtomicUsize::new(0);
        let outcome = ChainOutcome::run(async { Ok::<_, ParleyError>(1) }, Some(|| {
            secondary_calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ParleyError>(2) }
        }))
        .await;

        assert!(matches!(outcome, ChainOutcome::Primary(1)));
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_keeps_primary_cause() {
        let outcome = ChainOutcome::run(async { failing("no gpu") }, Some(|| async { Ok::<_, ParleyError>(2) })).await;

        assert_eq!(outcome.stage(), Some(Stage::Fallback));
        match outcome {
            ChainOutcome::Fallback { value, primary_error } => {
                assert_eq!(value, 2);
                assert!(primary_error.to_string().contains("no gpu"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_both_failures_are_reported() {
        let outcome =
            ChainOutcome::run(async { failing("first") }, Some(|| async { failing("second") })).await;

        let err = outcome
            .into_result(|primary, secondary| ParleyError::TranscriptionFailed { primary, secondary })
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("first"));
        assert!(message.contains("second"));
    }

    #[tokio::test]
    async fn test_missing_secondary() {
        let outcome = ChainOutcome::run(async { failing("first") }, None::<Secondary>).await;

        assert!(matches!(outcome, ChainOutcome::Failed { secondary: None, .. }));
        let err = outcome
            .into_result(|primary, secondary| ParleyError::SynthesisFailed { primary, secondary })
            .unwrap_err();
        assert!(err.to_string().contains("no secondary engine available"));
    }
}
