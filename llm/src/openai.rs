//! OpenAI Chat Completions API client.

use crate::{http_client, read_api_key, Backend, GenerateRequest, LlmError, Provider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI chat client. The system prompt travels as a leading `system` message.
#[derive(Clone)]
pub struct OpenAi {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: API_BASE.to_string(),
        })
    }

    /// Create a client from the OPENAI_API_KEY environment variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(read_api_key(Provider::OpenAi)?, model)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Backend for OpenAi {
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(ApiMessage {
                role: "system",
                content: &request.system,
            });
        }
        messages.extend(request.messages.iter().map(|m| ApiMessage {
            role: m.role.as_str(),
            content: &m.text,
        }));

        let api_request = ApiRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            messages,
        };

        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            "openai request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse {
                provider: Provider::OpenAi,
            })
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAi {
        OpenAi::new("sk-test", "gpt-test")
            .unwrap()
            .with_base_url(format!("{}/v1", server.uri()))
    }

    #[tokio::test]
    async fn test_system_prompt_leads_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-test",
                "messages": [
                    {"role": "system", "content": "You are the PL"},
                    {"role": "user", "content": "The gate is shut."},
                    {"role": "assistant", "content": "[Action] I knock."},
                    {"role": "user", "content": "Nobody answers."}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "[Action] I climb the wall."}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = GenerateRequest::new(
            "You are the PL",
            vec![
                Message::user("The gate is shut."),
                Message::assistant("[Action] I knock."),
                Message::user("Nobody answers."),
            ],
        );
        let text = client(&server).generate(request).await.unwrap();
        assert_eq!(text, "[Action] I climb the wall.");
    }

    #[tokio::test]
    async fn test_null_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let request = GenerateRequest::new("", vec![Message::user("hi")]);
        let err = client(&server).generate(request).await.unwrap_err();
        assert!(matches!(
            err,
            LlmError::EmptyResponse {
                provider: Provider::OpenAi
            }
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let request = GenerateRequest::new("", vec![Message::user("hi")]);
        let err = client(&server).generate(request).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
    }
}
