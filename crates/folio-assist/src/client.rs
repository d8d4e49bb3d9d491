use folio_core::{AssistOutput, AssistRequest, TextTransformer};

use crate::config::AssistConfig;
use crate::error::TransformError;
use crate::prompt;
use crate::response::{self, GenerateRequest};

/// HTTP client for a Gemini-style `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: AssistConfig,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: AssistConfig) -> Result<Self, TransformError> {
        let api_key = config.api_key.clone().ok_or(TransformError::MissingKey)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| TransformError::Client { source })?;
        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    /// Build a client from `FOLIO_*` environment variables.
    pub fn from_env() -> Result<Self, TransformError> {
        Self::new(AssistConfig::from_env())
    }

    pub fn config(&self) -> &AssistConfig {
        &self.config
    }

    /// Send one prompt and return the generated text.
    #[tracing::instrument(skip_all, fields(model = %self.config.model, action = ?request.action))]
    pub async fn generate(&self, request: &AssistRequest) -> Result<String, TransformError> {
        let body = GenerateRequest::new(prompt::build(request), request.action);
        let response = self
            .http
            .post(self.config.generate_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|source| TransformError::Http { source })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| TransformError::Http { source })?;
        tracing::debug!(status = status.as_u16(), bytes = text.len(), "assist response");

        match (status.is_success(), response::extract_text(&text)) {
            (true, result) => result,
            // Provider errors carry a better message than the status line.
            (false, Err(err @ TransformError::Provider { .. })) => Err(err),
            (false, _) => Err(TransformError::Status {
                status: status.as_u16(),
                body: text,
            }),
        }
    }
}

impl TextTransformer for GeminiClient {
    type Error = TransformError;

    async fn transform(&self, request: &AssistRequest) -> Result<AssistOutput, TransformError> {
        let text = self.generate(request).await?;
        Ok(response::into_output(request.action, &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::AssistAction;

    #[test]
    fn test_missing_key() {
        let err = GeminiClient::new(AssistConfig::default()).unwrap_err();
        assert!(matches!(err, TransformError::MissingKey));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let config = AssistConfig {
            endpoint: "http://127.0.0.1:9/v1beta".into(),
            timeout_secs: 2,
            ..AssistConfig::default()
        }
        .with_api_key("test");
        let client = GeminiClient::new(config).unwrap();
        let err = client
            .transform(&AssistRequest::new(AssistAction::Proofread, "teh"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::Http { .. }));
    }
}
