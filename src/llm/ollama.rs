use std::time::Duration;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::ModelServiceError;
use crate::llm::LanguageModelService;
use crate::model::ModelId;

/// Client for a local Ollama server's non-streaming `/api/generate` endpoint.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, Report<ModelServiceError>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .change_context(ModelServiceError::Request)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    total_duration: Option<u64>,
}

/// Error payload Ollama sends with non-2xx responses, e.g. an unknown model.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_owned())
}

impl GenerateResponse {
    fn into_text(self, model: ModelId) -> Result<String, Report<ModelServiceError>> {
        let text = self.response.trim();
        if text.is_empty() {
            return Err(Report::new(ModelServiceError::EmptyResponse {
                model: model.to_string(),
            }));
        }
        Ok(text.to_owned())
    }
}

impl LanguageModelService for OllamaClient {
    fn generate(
        &self,
        model: ModelId,
        prompt: &str,
    ) -> BoxFuture<'_, Result<String, Report<ModelServiceError>>> {
        let prompt = prompt.to_owned();
        Box::pin(async move {
            let url = format!("{}/api/generate", self.base_url);
            let body = GenerateRequest {
                model: model.as_str(),
                prompt: &prompt,
                stream: false,
            };

            debug!(%model, prompt_len = prompt.len(), "sending generate request");

            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .change_context(ModelServiceError::Request)
                .attach_with(|| format!("url: {url}"))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Report::new(ModelServiceError::Status {
                    status: status.as_u16(),
                    detail: error_detail(&body),
                })
                .change_context(ModelServiceError::Request)
                .attach(format!("url: {url}")));
            }

            let parsed: GenerateResponse = response
                .json()
                .await
                .change_context(ModelServiceError::ResponseParse)?;

            info!(
                %model,
                total_duration_ms = parsed.total_duration.map(|ns| ns / 1_000_000),
                "model generation complete"
            );

            parsed.into_text(model)
        })
    }
}
