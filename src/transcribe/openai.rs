// OpenAI Whisper (Python CLI) engine

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::command;
use crate::config::TranscriberConfig;
use crate::error::{ParleyError, Result};
use super::common::{
    read_json_output, AudioInput, EngineTranscript, OpenAIWhisperMapper, OpenAIWhisperOutput,
    TranscriptionMapper,
};
use super::SpeechEngine;

pub struct WhisperEngine {
    config: TranscriberConfig,
}

impl WhisperEngine {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, audio_path: &std::path::Path, output_dir: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg(audio_path)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--output_format")
            .arg("json")
            .arg("--verbose")
            .arg("False");

        if let Some(model_dir) = &self.config.model_dir {
            cmd.arg("--model_dir").arg(model_dir);
        }

        cmd
    }
}

#[async_trait]
impl SpeechEngine for WhisperEngine {
    fn name(&self) -> &'static str {
        "whisper"
    }

    fn is_available(&self) -> bool {
        command::binary_available(&self.config.binary_path)
    }

    async fn transcribe(&self, audio: &AudioInput) -> Result<EngineTranscript> {
        let audio_file = audio.write_temp().await?;
        let output_dir = tempfile::tempdir()?;

        debug!("Executing OpenAI Whisper with model: {}", self.config.model);
        let mut cmd = self.build_command(audio_file.path(), output_dir.path());
        command::run(self.name(), &mut cmd).await?;

        // whisper names its output after the input file stem
        let stem = audio_file
            .path()
            .file_stem()
            .ok_or_else(|| ParleyError::engine(self.name(), "Invalid audio filename"))?;
        let json_file = output_dir
            .path()
            .join(format!("{}.json", stem.to_string_lossy()));

        let output: OpenAIWhisperOutput = read_json_output(self.name(), &json_file).await?;
        let transcript = OpenAIWhisperMapper::to_engine_transcript(output);

        info!(
            "Whisper transcribed {} chars (language: {})",
            transcript.text.len(),
            transcript.language.as_deref().unwrap_or("unknown")
        );
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_command_arguments() {
        let engine = WhisperEngine::new(TranscriberConfig::default());
        let cmd = engine.build_command(Path::new("/tmp/a.wav"), Path::new("/tmp/out"));
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "/tmp/a.wav");
        assert!(args.windows(2).any(|w| w[0] == "--output_format" && w[1] == "json"));
        assert!(args.windows(2).any(|w| w[0] == "--model" && w[1] == "small"));
        assert!(args.windows(2).any(|w| w[0] == "--model_dir" && w[1] == ".parley/models/stt"));
    }

    #[tokio::test]
    async fn test_missing_binary_fails() {
        let engine = WhisperEngine::new(TranscriberConfig {
            binary_path: "/nonexistent/whisper".to_string(),
            ..TranscriberConfig::default()
        });
        assert!(!engine.is_available());

        let audio = AudioInput::new(vec![0; 16], Some("clip.wav".into()));
        let err = engine.transcribe(&audio).await.unwrap_err();
        assert!(matches!(err, ParleyError::Engine { .. }));
    }
}
