use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::error::{ParleyError, Result};
use crate::language::{display_name, LanguagePair};
use super::{ModelLoader, TranslationModel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
}

/// Loads pair-bound translation models from an Ollama server
pub struct OllamaLoader {
    client: Client,
    config: TranslateConfig,
    pair_models: HashMap<LanguagePair, String>,
}

impl OllamaLoader {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300)) // 5 minute timeout
            .build()?;

        let pair_models = config
            .pair_models
            .iter()
            .map(|(key, model)| Ok((key.parse::<LanguagePair>()?, model.clone())))
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            client,
            config,
            pair_models,
        })
    }

    /// Model name for a pair: explicit override first, then the default model
    pub fn model_for(&self, pair: &LanguagePair) -> &str {
        self.pair_models
            .get(pair)
            .map(String::as_str)
            .unwrap_or(&self.config.model)
    }
}

#[async_trait]
impl ModelLoader for OllamaLoader {
    async fn load(&self, pair: &LanguagePair) -> Result<Arc<dyn TranslationModel>> {
        let model = self.model_for(pair).to_string();

        check_ollama_availability(&self.client, &self.config.endpoint, &model)
            .await
            .map_err(|e| ParleyError::ModelLoad {
                pair: pair.clone(),
                reason: e.to_string(),
            })?;

        info!("Bound Ollama model '{}' to {}", model, pair);
        Ok(Arc::new(OllamaModel {
            client: self.client.clone(),
            endpoint: self.config.endpoint.clone(),
            model,
            pair: pair.clone(),
        }))
    }
}

/// One Ollama model bound to a language pair. Stateless per call.
pub struct OllamaModel {
    client: Client,
    endpoint: String,
    model: String,
    pair: LanguagePair,
}

impl OllamaModel {
    /// Build translation prompt, asking for JSON output
    fn build_translation_prompt(&self, text: &str) -> String {
        let source_name = display_name(self.pair.source());
        let target_name = display_name(self.pair.target());

        format!(
            "You are a professional translator.\n\
             \n\
             Translate the text below from {} to {} ONLY. Do not translate to any other language.\n\
             The target language is: {} (language code: {})\n\
             \n\
             Return ONLY the translation in JSON format as {{\"text\":\"your {} translation here\"}}.\n\
             Do not include any explanations, alternatives, or text in other languages.\n\
             \n\
             [Text to translate]\n\
             {}\n",
            source_name,
            target_name,
            target_name,
            self.pair.target(),
            target_name,
            text
        )
    }
}

#[async_trait]
impl TranslationModel for OllamaModel {
    async fn translate(&self, text: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: self.build_translation_prompt(text),
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.endpoint);
        debug!("Sending translation request for {} to: {}", self.pair, url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ParleyError::engine("ollama", format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ParleyError::engine(
                "ollama",
                format!("API error {}: {}", status, error_text),
            ));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ParleyError::engine("ollama", format!("Failed to parse response: {}", e)))?;

        parse_translation(&generated.response)
    }
}

/// Extract the translation from a raw model reply
pub fn parse_translation(raw: &str) -> Result<String> {
    let raw = raw.trim();
    debug!("Raw Ollama response: {}", raw);

    if raw.is_empty() {
        return Err(ParleyError::engine("ollama", "Empty translation received"));
    }

    if let Ok(result) = serde_json::from_str::<TranslationResult>(raw) {
        let text = result.text.trim();
        if text.is_empty() {
            return Err(ParleyError::engine("ollama", "Empty translation received"));
        }
        return Ok(text.to_string());
    }

    Ok(clean_translation_response(raw))
}

/// Clean up a non-JSON reply to extract just the translation
fn clean_translation_response(response: &str) -> String {
    let lines: Vec<&str> = response.lines().collect();

    for &line in &lines {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with("Here are")
            || trimmed.starts_with("Here is")
            || trimmed.starts_with("Translation:")
            || trimmed.starts_with("- ")
            || trimmed.starts_with("* ")
        {
            continue;
        }

        if trimmed.starts_with("**") && trimmed.ends_with("**") {
            continue;
        }

        if trimmed.len() > 3 {
            return trimmed.to_string();
        }
    }

    lines
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .unwrap_or(response)
        .to_string()
}

/// Check if Ollama is available and the model is loaded
pub async fn check_ollama_availability(client: &Client, endpoint: &str, model: &str) -> Result<()> {
    let url = format!("{}/api/show", endpoint);

    let request = json!({
        "name": model
    });

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| ParleyError::engine("ollama", format!("Failed to connect to Ollama: {}", e)))?;

    if response.status().is_success() {
        info!("Ollama model '{}' is available", model);
        Ok(())
    } else {
        Err(ParleyError::engine(
            "ollama",
            format!(
                "Model '{}' not found. Please pull the model first: ollama pull {}",
                model, model
            ),
        ))
    }
}
