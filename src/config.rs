use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{ParleyError, Result};
use crate::language::{default_supported_pairs, LanguagePair, DEFAULT_PIVOT_LANGUAGE};

fn default_invocation_timeout_secs() -> u64 {
    120
}

fn default_detect_threshold() -> f32 {
    0.7
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub transcriber: TranscriberConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub detect: DetectConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Ollama endpoint URL
    pub endpoint: String,
    /// Model used for any pair without an override
    pub model: String,
    /// Per-pair model overrides, keyed by `src-tgt`
    #[serde(default)]
    pub pair_models: BTreeMap<String, String>,
    /// Pairs that have a direct model, as `src-tgt`
    pub supported_pairs: Vec<String>,
    /// Intermediate language for two-hop translation
    pub pivot_language: String,
    /// Loaded-model cache policy
    #[serde(default)]
    pub cache: CachePolicyConfig,
    /// Deadline for a single model load or generation (seconds)
    #[serde(default = "default_invocation_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum CachePolicyConfig {
    /// Keep every loaded model for the life of the process
    #[default]
    Unbounded,
    /// Keep at most `capacity` models, evicting the least recently used
    Lru { capacity: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Path to the OpenAI Whisper CLI (primary engine)
    pub binary_path: String,
    /// Whisper model name for the primary engine
    pub model: String,
    /// Directory where the primary engine keeps downloaded weights
    pub model_dir: Option<String>,
    /// Enable the secondary engine
    pub use_fallback: bool,
    /// Path to whisper.cpp `whisper-cli` (secondary engine)
    pub fallback_binary_path: String,
    /// Single-language GGML model used by the secondary engine
    pub fallback_model: String,
    /// Language reported for secondary-engine results
    pub fallback_language: String,
    /// Deadline for one engine run (seconds)
    #[serde(default = "default_invocation_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Path to the Coqui `tts` CLI (primary engine)
    pub binary_path: String,
    /// Voice per language code
    pub voices: BTreeMap<String, String>,
    /// Language whose voice is used when the requested one has none
    pub default_language: String,
    /// Fail instead of substituting the default voice
    #[serde(default)]
    pub strict_voices: bool,
    /// Path to `espeak-ng` (secondary engine)
    pub fallback_binary_path: String,
    /// Deadline for one engine run (seconds)
    #[serde(default = "default_invocation_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Path to the fastText CLI
    pub binary_path: String,
    /// Path to the language-identification model (lid.176.bin)
    pub model_path: String,
    /// Minimum confidence for a detection to be reported
    #[serde(default = "default_detect_threshold")]
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind: String,
    /// Maximum accepted upload size for audio (bytes)
    pub max_upload_bytes: usize,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            pair_models: BTreeMap::new(),
            supported_pairs: default_supported_pairs(),
            pivot_language: DEFAULT_PIVOT_LANGUAGE.to_string(),
            cache: CachePolicyConfig::Unbounded,
            timeout_secs: default_invocation_timeout_secs(),
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper".to_string(),
            model: "small".to_string(),
            model_dir: Some(".parley/models/stt".to_string()),
            use_fallback: true,
            fallback_binary_path: "whisper-cli".to_string(),
            fallback_model: ".parley/models/stt/ggml-base.en.bin".to_string(),
            fallback_language: "en".to_string(),
            timeout_secs: default_invocation_timeout_secs(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        let mut voices = BTreeMap::new();
        voices.insert(
            "en".to_string(),
            "tts_models/en/ljspeech/tacotron2-DDC".to_string(),
        );

        Self {
            binary_path: "tts".to_string(),
            voices,
            default_language: "en".to_string(),
            strict_voices: false,
            fallback_binary_path: "espeak-ng".to_string(),
            timeout_secs: default_invocation_timeout_secs(),
        }
    }
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            binary_path: "fasttext".to_string(),
            model_path: ".parley/models/lid/lid.176.bin".to_string(),
            threshold: default_detect_threshold(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl TranslateConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TranscriberConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ParleyError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ParleyError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ParleyError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ParleyError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject settings that would only fail later at request time
    pub fn validate(&self) -> Result<()> {
        if self.translate.pivot_language.trim().is_empty() {
            return Err(ParleyError::Config("pivot_language must not be empty".to_string()));
        }

        for key in self.translate.pair_models.keys() {
            key.parse::<LanguagePair>()?;
        }

        if let CachePolicyConfig::Lru { capacity: 0 } = self.translate.cache {
            return Err(ParleyError::Config("LRU cache capacity must be at least 1".to_string()));
        }

        if !(0.0..=1.0).contains(&self.detect.threshold) {
            return Err(ParleyError::Config(format!(
                "Detection threshold must be within 0.0..=1.0, got {}",
                self.detect.threshold
            )));
        }

        if !self.synthesis.voices.contains_key(&self.synthesis.default_language) {
            return Err(ParleyError::Config(format!(
                "No voice configured for default language '{}'",
                self.synthesis.default_language
            )));
        }

        Ok(())
    }
}
