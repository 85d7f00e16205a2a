//! OpenAI adapter — `/v1/models`, `/v1/chat/completions`, `/v1/completions`.
//! Works against any OpenAI-compatible base URL.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::*;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAIAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIAdapter {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Same adapter with a request timeout. Without one, the transport
    /// default applies (no timeout).
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a completion call and sort the reply into body or error.
    async fn post_completion(
        &self,
        path: &str,
        payload: serde_json::Value,
        key: &Credential,
    ) -> Result<CompletionBody, ProbeError> {
        let resp = self.client.post(self.url(path))
            .bearer_auth(key.expose())
            .json(&payload)
            .send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!(path, status = status.as_u16(), bytes = body.len(), "completion reply");

        if !status.is_success() {
            return Err(ProbeError::Provider {
                status: status.as_u16(),
                message: parse_error_message(&body),
            });
        }
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ProbeError::Decode(e.to_string()))?;
        Ok(CompletionBody(value))
    }
}

impl Default for OpenAIAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for OpenAIAdapter {
    fn provider_id(&self) -> &str { "openai" }

    async fn list_models(&self, key: &Credential) -> Result<Vec<ModelInfo>, ProbeError> {
        let resp = self.client.get(self.url("/v1/models"))
            .bearer_auth(key.expose())
            .send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = parse_error_message(&body)
                .unwrap_or_else(|| crate::error::UNKNOWN_ERROR.to_string());
            return Err(ProbeError::ListLookup(message));
        }
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ProbeError::Decode(e.to_string()))?;
        Ok(parse_model_list(&value))
    }

    async fn chat_completion(
        &self,
        req: &CompletionRequest,
        key: &Credential,
    ) -> Result<CompletionBody, ProbeError> {
        let payload = serde_json::json!({
            "model": &req.model,
            "messages": [{"role": "user", "content": &req.prompt}],
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
        });
        self.post_completion("/v1/chat/completions", payload, key).await
    }

    async fn legacy_completion(
        &self,
        req: &CompletionRequest,
        key: &Credential,
    ) -> Result<CompletionBody, ProbeError> {
        let payload = serde_json::json!({
            "model": &req.model,
            "prompt": &req.prompt,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
        });
        self.post_completion("/v1/completions", payload, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn key() -> Credential {
        Credential::new("sk-test").unwrap()
    }

    fn request(model: &str) -> CompletionRequest {
        CompletionRequest {
            model: model.to_string(),
            prompt: "Write a single-line friendly hello message.".to_string(),
            max_tokens: 50,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn test_list_models_keeps_provider_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/v1/models")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"object":"list","data":[
                {"id":"gpt-4o-mini","object":"model","created":1721172741,"owned_by":"system"},
                {"id":"babbage-002","object":"model","created":1692634615,"owned_by":"system"},
                {"id":"gpt-4o","object":"model","created":1715367049,"owned_by":"openai"}]}"#)
            .expect(1)
            .create_async().await;

        let adapter = OpenAIAdapter::with_base_url(server.url());
        let models = adapter.list_models(&key()).await.unwrap();
        let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gpt-4o-mini", "babbage-002", "gpt-4o"]);
        assert_eq!(models[2].owned_by, "openai");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_models_surfaces_provider_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/v1/models")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#)
            .create_async().await;

        let adapter = OpenAIAdapter::with_base_url(server.url());
        let err = adapter.list_models(&key()).await.unwrap_err();
        assert_eq!(err, ProbeError::ListLookup("Incorrect API key provided".into()));
    }

    #[tokio::test]
    async fn test_list_models_without_message_is_unknown() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/v1/models")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async().await;

        let adapter = OpenAIAdapter::with_base_url(server.url());
        let err = adapter.list_models(&key()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch models: Unknown error");
    }

    #[tokio::test]
    async fn test_chat_completion_body_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(serde_json::json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "Write a single-line friendly hello message."}],
                "max_tokens": 50,
                "temperature": 0.7,
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Hi there!"}}]}"#)
            .expect(1)
            .create_async().await;

        let adapter = OpenAIAdapter::with_base_url(server.url());
        let body = adapter.chat_completion(&request("gpt-4o"), &key()).await.unwrap();
        assert_eq!(body.response_text(), "Hi there!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_legacy_completion_body_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/v1/completions")
            .match_body(Matcher::Json(serde_json::json!({
                "model": "text-davinci-003",
                "prompt": "Write a single-line friendly hello message.",
                "max_tokens": 50,
                "temperature": 0.7,
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"index":0,"text":"Hello!"}]}"#)
            .expect(1)
            .create_async().await;

        let adapter = OpenAIAdapter::with_base_url(server.url());
        let body = adapter.legacy_completion(&request("text-davinci-003"), &key()).await.unwrap();
        assert_eq!(body.response_text(), "Hello!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_error_status_and_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/v1/chat/completions")
            .with_status(404)
            .with_body("not json")
            .create_async().await;

        let adapter = OpenAIAdapter::with_base_url(server.url());
        let err = adapter.chat_completion(&request("text-ada-001"), &key()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HTTP 404");
    }

    #[tokio::test]
    async fn test_success_with_invalid_json_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body("<html>")
            .create_async().await;

        let adapter = OpenAIAdapter::with_base_url(server.url());
        let err = adapter.chat_completion(&request("gpt-4o"), &key()).await.unwrap_err();
        assert!(matches!(err, ProbeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_success_with_unexpected_shape_is_not_an_error() {
        let shapes = [
            r#"{"choices":null}"#,
            r#"{"choices":[null]}"#,
            r#"{"choices":[{"message":{"role":"assistant","content":[{"type":"text","text":"hi"}]}}]}"#,
        ];
        for shape in shapes {
            let mut server = mockito::Server::new_async().await;
            let _mock = server.mock("POST", "/v1/chat/completions")
                .with_status(200)
                .with_body(shape)
                .create_async().await;

            let adapter = OpenAIAdapter::with_base_url(server.url());
            let body = adapter.chat_completion(&request("gpt-4o"), &key()).await.unwrap();
            assert_eq!(body.response_text(), NO_RESPONSE_CONTENT, "shape: {}", shape);
        }
    }

    #[tokio::test]
    async fn test_list_models_keeps_entries_with_null_fields() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/v1/models")
            .with_status(200)
            .with_body(r#"{"data":[
                {"id":"gpt-4o","object":"model","created":1715367049,"owned_by":"openai"},
                {"id":"local","created":null,"owned_by":null}]}"#)
            .create_async().await;

        let adapter = OpenAIAdapter::with_base_url(server.url());
        let models = adapter.list_models(&key()).await.unwrap();
        let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gpt-4o", "local"]);
        assert_eq!(models[1].owned_by, "");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let adapter = OpenAIAdapter::with_base_url("http://localhost:8080/");
        assert_eq!(adapter.base_url(), "http://localhost:8080");
        assert_eq!(adapter.url("/v1/models"), "http://localhost:8080/v1/models");
    }
}
