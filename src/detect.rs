use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::command;
use crate::config::DetectConfig;
use crate::error::{with_deadline, ParleyError, Result};

const LABEL_PREFIX: &str = "__label__";
const DETECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Language code reported when nothing clears the confidence threshold
pub const UNDETERMINED: &str = "und";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    /// Most likely language of `text`, or `None` when not confident enough
    async fn detect(&self, text: &str) -> Result<Option<String>>;
}

/// fastText language identification (lid.176) through the `fasttext` CLI
pub struct FastTextDetector {
    config: DetectConfig,
}

impl FastTextDetector {
    pub fn new(config: DetectConfig) -> Self {
        Self { config }
    }

    async fn predict(&self, line: &str) -> Result<String> {
        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg("predict-prob")
            .arg(&self.config.model_path)
            .arg("-")
            .arg("1");

        let input = format!("{}\n", line);
        let output = with_deadline(
            "language detection",
            DETECT_TIMEOUT,
            command::run_with_stdin("fasttext", &mut cmd, input.as_bytes()),
        )
        .await?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl LanguageDetector for FastTextDetector {
    async fn detect(&self, text: &str) -> Result<Option<String>> {
        if text.is_empty() {
            return Err(ParleyError::InvalidInput("text must not be empty".to_string()));
        }
        if text.trim().is_empty() {
            return Ok(None);
        }

        // fastText reads one document per line
        let line = text.replace(['\r', '\n'], " ");
        let stdout = self.predict(&line).await?;
        let (code, confidence) = parse_prediction(&stdout)?;
        debug!("Detected '{}' with confidence {:.3}", code, confidence);

        Ok((confidence >= self.config.threshold).then_some(code))
    }
}

/// Parse the first `__label__xx <prob>` line of `predict-prob` output
pub fn parse_prediction(output: &str) -> Result<(String, f32)> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| ParleyError::Detection("fasttext produced no prediction".to_string()))?;

    let mut parts = line.split_whitespace();
    let label = parts.next().unwrap_or_default();
    let code = label
        .strip_prefix(LABEL_PREFIX)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ParleyError::Detection(format!("Unexpected label: {}", line)))?;

    let confidence = parts
        .next()
        .and_then(|prob| prob.parse::<f32>().ok())
        .ok_or_else(|| ParleyError::Detection(format!("Missing probability: {}", line)))?;

    Ok((code.to_string(), confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_and_probability() {
        let (code, confidence) = parse_prediction("__label__fr 0.982143\n").unwrap();
        assert_eq!(code, "fr");
        assert!((confidence - 0.982143).abs() < 1e-6);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_prediction("").is_err());
        assert!(parse_prediction("fr 0.9").is_err());
        assert!(parse_prediction("__label__fr").is_err());
        assert!(parse_prediction("__label__ 0.9").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_threshold_and_newlines() {
        use assert_fs::prelude::*;
        use std::os::unix::fs::PermissionsExt;

        // Stand-in CLI that echoes a fixed prediction and records its stdin
        let temp = assert_fs::TempDir::new().unwrap();
        let stdin_log = temp.child("stdin.txt");
        let script = temp.child("fasttext");
        script
            .write_str(&format!(
                "#!/bin/sh\ncat > {}\necho \"__label__de 0.55\"\n",
                stdin_log.path().display()
            ))
            .unwrap();
        std::fs::set_permissions(script.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = DetectConfig {
            binary_path: script.path().to_string_lossy().into_owned(),
            ..DetectConfig::default()
        };
        let detector = FastTextDetector::new(config.clone());
        assert_eq!(detector.detect("Guten\nMorgen").await.unwrap(), None);
        assert_eq!(std::fs::read_to_string(stdin_log.path()).unwrap(), "Guten Morgen\n");

        config.threshold = 0.5;
        let detector = FastTextDetector::new(config);
        assert_eq!(detector.detect("Guten Morgen").await.unwrap().as_deref(), Some("de"));
    }

    #[tokio::test]
    async fn test_empty_and_blank_text() {
        let detector = FastTextDetector::new(DetectConfig {
            binary_path: "/nonexistent/fasttext".to_string(),
            ..DetectConfig::default()
        });

        assert!(detector.detect("").await.unwrap_err().is_client_error());
        assert_eq!(detector.detect("  \n ").await.unwrap(), None);
    }
}
