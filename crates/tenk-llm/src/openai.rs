use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{CompletionOptions, LlmProvider, Message, ResponseFormat};
use crate::sanitize::clean_completion;

const PROVIDER: &str = "openai";
const LOG_BODY_LIMIT: usize = 512;

/// Client for any OpenAI-compatible chat completions and embeddings API.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: Option<String>,
    embedding_base_url: Option<String>,
    embedding_api_key: Option<String>,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_base_url", &self.embedding_base_url)
            .field(
                "embedding_api_key",
                &self.embedding_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

fn trim_base(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

fn truncate_for_log(body: &str) -> &str {
    match body.char_indices().nth(LOG_BODY_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        embedding_model: Option<String>,
    ) -> Self {
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url: trim_base(base_url),
            model,
            embedding_model,
            embedding_base_url: None,
            embedding_api_key: None,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Route embedding requests to a different host, optionally with its own key.
    #[must_use]
    pub fn with_embedding_endpoint(mut self, base_url: String, api_key: Option<String>) -> Self {
        self.embedding_base_url = Some(trim_base(base_url));
        self.embedding_api_key = api_key;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            stream: false,
            response_format: options.response_format,
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!(
                "OpenAI API error {status}: {}",
                truncate_for_log(&text)
            );
            return Err(LlmError::RequestFailure {
                provider: PROVIDER,
                status: status.as_u16(),
                body: text,
            });
        }

        let resp: OpenAiChatResponse = serde_json::from_str(&text)?;

        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(LlmError::EmptyResponse { provider: PROVIDER })
    }
}

impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let raw = self.send_request(messages, options).await?;
        Ok(clean_completion(&raw))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let model = self
            .embedding_model
            .as_deref()
            .ok_or(LlmError::EmbedUnsupported { provider: PROVIDER })?;

        let base = self.embedding_base_url.as_deref().unwrap_or(&self.base_url);
        let key = self.embedding_api_key.as_deref().unwrap_or(&self.api_key);
        let body = EmbeddingRequest { input: text, model };

        let response = self
            .client
            .post(format!("{base}/embeddings"))
            .header("Authorization", format!("Bearer {key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!(
                "OpenAI embedding API error {status}: {}",
                truncate_for_log(&text)
            );
            return Err(LlmError::RequestFailure {
                provider: PROVIDER,
                status: status.as_u16(),
                body: text,
            });
        }

        let resp: EmbeddingResponse = serde_json::from_str(&text)?;

        resp.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(LlmError::EmptyResponse { provider: PROVIDER })
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(
            "test-key".into(),
            format!("{}/v1/", server.uri()),
            "Qwen/Qwen3-32B-AWQ".into(),
            Some("embed-model".into()),
        )
    }

    fn chat_body(content: &str) -> serde_json::Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[test]
    fn new_trims_trailing_slashes() {
        let p = OpenAiProvider::new("k".into(), "http://x/v1///".into(), "m".into(), None);
        assert_eq!(p.base_url, "http://x/v1");
    }

    #[test]
    fn debug_redacts_keys() {
        let p = OpenAiProvider::new("sk-secret".into(), "http://x".into(), "m".into(), None)
            .with_embedding_endpoint("http://e".into(), Some("ek-secret".into()));
        let dbg = format!("{p:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(!dbg.contains("ek-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn chat_request_omits_absent_response_format() {
        let msgs = [Message::user("hi")];
        let body = ChatRequest {
            model: "m",
            messages: &msgs,
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 10,
            stream: false,
            response_format: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("response_format").is_none());
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn truncate_for_log_respects_char_boundaries() {
        let long = "é".repeat(LOG_BODY_LIMIT + 10);
        assert_eq!(truncate_for_log(&long).chars().count(), LOG_BODY_LIMIT);
        assert_eq!(truncate_for_log("short"), "short");
    }

    #[tokio::test]
    async fn complete_sends_options_and_strips_reasoning() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "Qwen/Qwen3-32B-AWQ",
                "max_tokens": 800,
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
                "<think>reasoning</think>```json\n{\"sub_questions\": []}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let opts = CompletionOptions::new(0.0, 1.0, 800).json();
        let out = provider_for(&server)
            .complete(&[Message::user("q")], &opts)
            .await
            .unwrap();
        assert_eq!(out, "{\"sub_questions\": []}");
    }

    #[tokio::test]
    async fn complete_non_success_returns_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(&[Message::user("q")], &CompletionOptions::default())
            .await
            .unwrap_err();
        match err {
            LlmError::RequestFailure { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn complete_empty_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(&[Message::user("q")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn complete_honours_per_call_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_body("late"))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let opts = CompletionOptions::default().with_timeout(Duration::from_millis(100));
        let err = provider_for(&server)
            .complete(&[Message::user("q")], &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
    }

    #[tokio::test]
    async fn embed_returns_first_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(json!({"input": "revenue", "model": "embed-model"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"embedding": [0.1, 0.2, 0.3]}]})),
            )
            .mount(&server)
            .await;

        let v = provider_for(&server).embed("revenue").await.unwrap();
        assert_eq!(v, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embed_uses_separate_endpoint_and_key() {
        let chat = MockServer::start().await;
        let embed = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer embed-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": [{"embedding": [1.0]}]})),
            )
            .expect(1)
            .mount(&embed)
            .await;

        let p = provider_for(&chat).with_embedding_endpoint(embed.uri(), Some("embed-key".into()));
        assert_eq!(p.embed("x").await.unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn embed_without_model_returns_error() {
        let p = OpenAiProvider::new("k".into(), "http://127.0.0.1:1".into(), "m".into(), None);
        assert!(!p.supports_embeddings());
        let err = p.embed("test").await.unwrap_err();
        assert!(err.to_string().contains("embedding not supported"));
    }

    #[tokio::test]
    async fn embed_unreachable_endpoint_errors() {
        let p = OpenAiProvider::new(
            "k".into(),
            "http://127.0.0.1:1".into(),
            "m".into(),
            Some("embed-model".into()),
        );
        assert!(p.embed("test").await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires TENK_LLM_API_KEY env var"]
    async fn integration_chat() {
        let api_key = std::env::var("TENK_LLM_API_KEY").expect("TENK_LLM_API_KEY must be set");
        let provider = OpenAiProvider::new(
            api_key,
            "https://api.tandemn.com/api/v1".into(),
            "Qwen/Qwen3-32B-AWQ".into(),
            None,
        );
        let out = provider
            .complete(
                &[Message::user("Reply with exactly: pong")],
                &CompletionOptions::new(0.0, 1.0, 64),
            )
            .await
            .unwrap();
        assert!(out.to_lowercase().contains("pong"));
    }
}
