use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::command;
use crate::error::Result;
use super::FallbackSynthesizer;

/// espeak-ng with its default voice. Text goes in on stdin.
pub struct EspeakEngine {
    binary_path: String,
}

impl EspeakEngine {
    pub fn new(binary_path: String) -> Self {
        Self { binary_path }
    }
}

#[async_trait]
impl FallbackSynthesizer for EspeakEngine {
    fn name(&self) -> &'static str {
        "espeak-ng"
    }

    async fn speak(&self, text: &str, out: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-w").arg(out).arg("--stdin");
        command::run_with_stdin(self.name(), &mut cmd, text.as_bytes()).await?;
        Ok(())
    }
}
