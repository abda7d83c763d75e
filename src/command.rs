// Subprocess plumbing shared by the CLI-backed engines

use std::path::Path;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ParleyError, Result};

/// Run `cmd` to completion, turning spawn failures and non-zero exits into
/// [`ParleyError::Engine`] errors carrying stderr
pub async fn run(engine: &str, cmd: &mut Command) -> Result<Output> {
    debug!("Running {}: {:?}", engine, cmd.as_std());

    let output = cmd
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ParleyError::engine(engine, format!("Failed to execute command: {}", e)))?;

    check_status(engine, output)
}

/// Like [`run`], but writes `input` to the child's stdin first
pub async fn run_with_stdin(engine: &str, cmd: &mut Command, input: &[u8]) -> Result<Output> {
    debug!("Running {} with {} bytes on stdin: {:?}", engine, input.len(), cmd.as_std());

    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ParleyError::engine(engine, format!("Failed to execute command: {}", e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input)
            .await
            .map_err(|e| ParleyError::engine(engine, format!("Failed to write stdin: {}", e)))?;
        // Dropping closes the pipe so the child sees EOF
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| ParleyError::engine(engine, format!("Failed to wait for command: {}", e)))?;

    check_status(engine, output)
}

fn check_status(engine: &str, output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(ParleyError::engine(
        engine,
        format!("exited with {}: {}", output.status, stderr.trim()),
    ))
}

/// Whether `binary` is an existing path or resolvable on `PATH`
pub fn binary_available(binary: &str) -> bool {
    let path = Path::new(binary);
    if path.components().count() > 1 {
        return path.is_file();
    }

    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file()))
        .unwrap_or(false)
}
