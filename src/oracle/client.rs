//! LLM-backed oracle client

use crate::oracle::{OracleError, OracleResult, ReasoningOracle};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Supported completion providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProvider {
    OpenAI,
    Ollama,
    Gemini,
}

/// Oracle client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub system_prompt: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_base_url: None,
            system_prompt: None,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a retrieval assistant for a clinical study knowledge graph. \
     Respond with exactly the JSON or code requested, no explanations.";

/// Production `ReasoningOracle` speaking the chat/completions dialects
/// of the supported providers.
pub struct LlmOracle {
    client: Client,
    config: OracleConfig,
    api_base_url: String,
}

impl LlmOracle {
    pub fn new(config: &OracleConfig) -> OracleResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| OracleError::ConfigError(e.to_string()))?;

        let api_base_url = config.api_base_url.clone().unwrap_or_else(|| {
            match config.provider {
                LlmProvider::OpenAI => "https://api.openai.com/v1".to_string(),
                LlmProvider::Ollama => "http://localhost:11434".to_string(),
                LlmProvider::Gemini => {
                    "https://generativelanguage.googleapis.com/v1beta".to_string()
                }
            }
        });

        Ok(Self {
            client,
            config: config.clone(),
            api_base_url,
        })
    }

    fn system_prompt(&self) -> String {
        self.config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
    }

    async fn openai_chat(&self, prompt: &str) -> OracleResult<String> {
        #[derive(Serialize)]
        struct Message {
            role: String,
            content: String,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: Vec<Message>,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MessageContent,
        }

        #[derive(Deserialize)]
        struct MessageContent {
            content: String,
        }

        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| OracleError::ConfigError("OpenAI requires API key".to_string()))?;

        let url = format!("{}/chat/completions", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&Request {
                model: &self.config.model,
                messages: vec![
                    Message {
                        role: "system".to_string(),
                        content: self.system_prompt(),
                    },
                    Message {
                        role: "user".to_string(),
                        content: prompt.to_string(),
                    },
                ],
                temperature: 0.0,
            })
            .send()
            .await
            .map_err(|e| OracleError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(OracleError::ApiError(format!(
                "OpenAI error: {}",
                resp.status()
            )));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| OracleError::SerializationError(e.to_string()))?;
        Ok(result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default())
    }

    async fn ollama_chat(&self, prompt: &str) -> OracleResult<String> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            prompt: String,
            system: String,
            stream: bool,
        }

        #[derive(Deserialize)]
        struct Response {
            response: String,
        }

        let url = format!("{}/api/generate", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .json(&Request {
                model: &self.config.model,
                prompt: prompt.to_string(),
                system: self.system_prompt(),
                stream: false,
            })
            .send()
            .await
            .map_err(|e| OracleError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(OracleError::ApiError(format!(
                "Ollama error: {}",
                resp.status()
            )));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| OracleError::SerializationError(e.to_string()))?;
        Ok(result.response)
    }

    async fn gemini_chat(&self, prompt: &str) -> OracleResult<String> {
        #[derive(Serialize)]
        struct Request {
            contents: Vec<Content>,
            #[serde(rename = "generationConfig")]
            generation_config: GenerationConfig,
        }

        #[derive(Serialize, Deserialize)]
        struct Content {
            role: Option<String>,
            parts: Vec<Part>,
        }

        #[derive(Serialize, Deserialize)]
        struct Part {
            text: String,
        }

        #[derive(Serialize)]
        struct GenerationConfig {
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Response {
            candidates: Option<Vec<Candidate>>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Content,
        }

        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| OracleError::ConfigError("Gemini requires API key".to_string()))?;

        // Gemini v1beta has no dedicated system role; prepend the
        // system instruction to the user turn.
        let full_prompt = format!("{}\n\n{}", self.system_prompt(), prompt);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base_url, self.config.model, api_key
        );

        let resp = self
            .client
            .post(&url)
            .json(&Request {
                contents: vec![Content {
                    role: Some("user".to_string()),
                    parts: vec![Part { text: full_prompt }],
                }],
                generation_config: GenerationConfig { temperature: 0.0 },
            })
            .send()
            .await
            .map_err(|e| OracleError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(OracleError::ApiError(format!("Gemini error: {}", text)));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| OracleError::SerializationError(e.to_string()))?;

        if let Some(candidates) = result.candidates {
            if let Some(first) = candidates.first() {
                if let Some(part) = first.content.parts.first() {
                    return Ok(part.text.clone());
                }
            }
        }

        Ok(String::new())
    }
}

#[async_trait]
impl ReasoningOracle for LlmOracle {
    fn name(&self) -> &str {
        match self.config.provider {
            LlmProvider::OpenAI => "openai",
            LlmProvider::Ollama => "ollama",
            LlmProvider::Gemini => "gemini",
        }
    }

    async fn complete(&self, prompt: &str) -> OracleResult<String> {
        match self.config.provider {
            LlmProvider::OpenAI => self.openai_chat(prompt).await,
            LlmProvider::Ollama => self.ollama_chat(prompt).await,
            LlmProvider::Gemini => self.gemini_chat(prompt).await,
        }
    }
}
