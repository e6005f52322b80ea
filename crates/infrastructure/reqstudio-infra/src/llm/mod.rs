//! Ollama-backed analysis service.

mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use reqstudio_app_core::ports::{AnalysisPort, PortError, PortResult};
use reqstudio_app_core::AppSettings;
use reqstudio_core::{AnalysisResult, Requirement, TestCase};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Per-request ceiling; the caller usually applies a tighter deadline.
    pub request_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: reqstudio_config::DEFAULT_LLM_BASE_URL.to_string(),
            model: reqstudio_config::DEFAULT_LLM_MODEL.to_string(),
            request_timeout: Duration::from_secs(reqstudio_config::MAX_SERVICE_TIMEOUT_SECS),
        }
    }
}

impl From<&AppSettings> for OllamaConfig {
    fn from(settings: &AppSettings) -> Self {
        Self {
            base_url: settings.llm_base_url.clone(),
            model: settings.llm_model.clone(),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    /// Sends one non-streaming completion request and returns the model's text.
    async fn complete(&self, prompt: &str) -> PortResult<String> {
        let url = self.endpoint();
        debug!(%url, model = %self.config.model, chars = prompt.len(), "llm request");

        let resp = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.config.model,
                prompt,
                stream: false,
                format: "json",
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, "llm service rejected request: {body}");
            return Err(PortError::ServiceUnavailable(format!("{url} returned {status}")));
        }

        let body: GenerateResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                PortError::Parse {
                    path: url.clone(),
                    message: e.to_string(),
                }
            }
        })?;
        Ok(body.response)
    }

    fn transport_error(&self, e: reqwest::Error) -> PortError {
        if e.is_timeout() {
            PortError::Timeout(self.config.request_timeout.as_secs())
        } else if e.is_connect() || e.is_request() {
            PortError::ServiceUnavailable(e.to_string())
        } else {
            PortError::Io {
                path: self.config.base_url.clone(),
                message: e.to_string(),
            }
        }
    }

    fn reply_error(&self, e: serde_json::Error) -> PortError {
        PortError::Parse {
            path: format!("{} reply", self.config.model),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl AnalysisPort for OllamaClient {
    async fn analyze_requirement(&self, text: &str) -> PortResult<AnalysisResult> {
        let reply = self.complete(&prompt::analysis_prompt(text)).await?;
        prompt::decode_analysis(&reply).map_err(|e| self.reply_error(e))
    }

    async fn generate_test_cases(&self, requirements: &[Requirement]) -> PortResult<Vec<TestCase>> {
        if requirements.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self
            .complete(&prompt::generation_prompt(requirements))
            .await?;
        prompt::decode_test_cases(&reply, requirements).map_err(|e| self.reply_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let client = OllamaClient::with_client(
            Client::new(),
            OllamaConfig {
                base_url: "http://llm.local:11434/".into(),
                ..OllamaConfig::default()
            },
        );
        assert_eq!(client.endpoint(), "http://llm.local:11434/api/generate");
    }

    #[test]
    fn config_follows_settings() {
        let settings = AppSettings {
            llm_model: "mistral".into(),
            ..AppSettings::default()
        };
        let config = OllamaConfig::from(&settings);
        assert_eq!(config.model, "mistral");
        assert_eq!(config.base_url, reqstudio_config::DEFAULT_LLM_BASE_URL);
    }

    #[tokio::test]
    async fn unreachable_service_is_reported_as_unavailable() {
        let client = OllamaClient::new(OllamaConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..OllamaConfig::default()
        })
        .unwrap();
        let err = client.analyze_requirement("anything").await.unwrap_err();
        assert!(matches!(err, PortError::ServiceUnavailable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn empty_batch_skips_the_service() {
        let client = OllamaClient::new(OllamaConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..OllamaConfig::default()
        })
        .unwrap();
        assert!(client.generate_test_cases(&[]).await.unwrap().is_empty());
    }
}
