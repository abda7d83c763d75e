// Coqui TTS engine driven through its `tts` CLI

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::command;
use crate::error::Result;
use super::VoiceEngine;

pub struct CoquiEngine {
    binary_path: String,
}

impl CoquiEngine {
    pub fn new(binary_path: String) -> Self {
        Self { binary_path }
    }

    fn speak_command(&self, text: &str, voice: &str, out: &Path) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        // Joined form so text starting with '-' is not read as an option
        cmd.arg(format!("--text={}", text))
            .arg("--model_name")
            .arg(voice)
            .arg("--out_path")
            .arg(out);
        cmd
    }
}

#[async_trait]
impl VoiceEngine for CoquiEngine {
    fn name(&self) -> &'static str {
        "coqui"
    }

    async fn load_voice(&self, voice: &str) -> Result<()> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("--model_info_by_name").arg(voice);
        command::run(self.name(), &mut cmd).await?;

        info!("Coqui voice ready: {}", voice);
        Ok(())
    }

    async fn speak(&self, text: &str, voice: &str, out: &Path) -> Result<()> {
        debug!("Coqui synthesizing {} chars with {}", text.len(), voice);
        let mut cmd = self.speak_command(text, voice, out);
        command::run(self.name(), &mut cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speak_arguments() {
        let engine = CoquiEngine::new("tts".to_string());
        let cmd = engine.speak_command(
            "-- not a flag",
            "tts_models/en/ljspeech/tacotron2-DDC",
            Path::new("/tmp/out.wav"),
        );
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "--text=-- not a flag",
                "--model_name",
                "tts_models/en/ljspeech/tacotron2-DDC",
                "--out_path",
                "/tmp/out.wav",
            ]
        );
    }

    #[tokio::test]
    async fn test_load_fails_without_binary() {
        let engine = CoquiEngine::new("/nonexistent/tts".to_string());
        assert!(engine.load_voice("tts_models/en/ljspeech/tacotron2-DDC").await.is_err());
    }
}
