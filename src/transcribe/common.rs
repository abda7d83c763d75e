use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{ParleyError, Result};
use crate::fallback::Stage;

/// Uploaded audio, fully buffered so it can be replayed to a second engine
#[derive(Debug, Clone)]
pub struct AudioInput {
    bytes: Vec<u8>,
    file_name: Option<String>,
}

impl AudioInput {
    pub fn new(bytes: Vec<u8>, file_name: Option<String>) -> Self {
        Self { bytes, file_name }
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(Self { bytes, file_name })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Extension of the uploaded file name, defaulting to `wav`
    pub fn extension(&self) -> &str {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or("wav")
    }

    /// Copy the buffer into a fresh temp file for a CLI engine.
    /// The file is removed when the returned handle drops.
    pub async fn write_temp(&self) -> Result<NamedTempFile> {
        let file = tempfile::Builder::new()
            .prefix("parley-audio-")
            .suffix(&format!(".{}", self.extension()))
            .tempfile()?;
        tokio::fs::write(file.path(), &self.bytes).await?;
        Ok(file)
    }
}

/// Raw result from a single recognition engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineTranscript {
    pub text: String,
    /// Language the engine detected, if it reports one
    pub language: Option<String>,
}

/// Normalized transcription returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    pub text: String,
    /// `None` when the language is unknown
    pub language: Option<String>,
    pub engine: String,
    pub stage: Stage,
}

/// OpenAI Whisper JSON output (`--output_format json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperOutput {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<OpenAIWhisperSegment>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperSegment {
    pub id: u64,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// whisper.cpp JSON output (`--output-json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    pub result: WhisperCppResult,
    #[serde(default)]
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

/// Trait for converting engine-specific output into an [`EngineTranscript`]
pub trait TranscriptionMapper<T> {
    fn to_engine_transcript(output: T) -> EngineTranscript;
}

pub struct OpenAIWhisperMapper;

impl TranscriptionMapper<OpenAIWhisperOutput> for OpenAIWhisperMapper {
    fn to_engine_transcript(output: OpenAIWhisperOutput) -> EngineTranscript {
        EngineTranscript {
            text: output.text.trim().to_string(),
            language: output.language.filter(|lang| !lang.is_empty()),
        }
    }
}

pub struct WhisperCppMapper;

impl TranscriptionMapper<WhisperCppOutput> for WhisperCppMapper {
    fn to_engine_transcript(output: WhisperCppOutput) -> EngineTranscript {
        let text = output
            .transcription
            .iter()
            .map(|seg| seg.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        EngineTranscript {
            text,
            language: Some(output.result.language).filter(|lang| !lang.is_empty()),
        }
    }
}

/// Read and parse an engine's JSON output file
pub async fn read_json_output<T: for<'de> Deserialize<'de>>(engine: &str, path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ParleyError::engine(
            engine,
            format!("Failed to read JSON output {}: {}", path.display(), e),
        )
    })?;

    serde_json::from_str(&content)
        .map_err(|e| ParleyError::engine(engine, format!("Failed to parse JSON output: {}", e)))
}
