// whisper.cpp engine, used as the secondary recognizer

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

use crate::command;
use crate::config::TranscriberConfig;
use crate::error::Result;
use super::common::{
    read_json_output, AudioInput, EngineTranscript, TranscriptionMapper, WhisperCppMapper,
    WhisperCppOutput,
};
use super::SpeechEngine;

pub struct WhisperCppEngine {
    config: TranscriberConfig,
}

impl WhisperCppEngine {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, audio_path: &Path, output_base: &Path) -> Command {
        let mut cmd = Command::new(&self.config.fallback_binary_path);
        cmd.arg("-m")
            .arg(&self.config.fallback_model)
            .arg("-f")
            .arg(audio_path)
            .arg("-oj")
            .arg("-of")
            .arg(output_base)
            .arg("-l")
            .arg(&self.config.fallback_language)
            .arg("-np");
        cmd
    }
}

#[async_trait]
impl SpeechEngine for WhisperCppEngine {
    fn name(&self) -> &'static str {
        "whisper.cpp"
    }

    /// Available once the GGML model has been downloaded
    fn is_available(&self) -> bool {
        Path::new(&self.config.fallback_model).is_file()
    }

    async fn transcribe(&self, audio: &AudioInput) -> Result<EngineTranscript> {
        let audio_file = audio.write_temp().await?;
        let output_dir = tempfile::tempdir()?;
        let output_base = output_dir.path().join("transcript");

        let mut cmd = self.build_command(audio_file.path(), &output_base);
        command::run(self.name(), &mut cmd).await?;

        let output: WhisperCppOutput =
            read_json_output(self.name(), &output_base.with_extension("json")).await?;
        let transcript = WhisperCppMapper::to_engine_transcript(output);

        info!("whisper.cpp transcribed {} chars", transcript.text.len());
        Ok(transcript)
    }
}
