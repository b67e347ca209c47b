use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatModel, GenerationError};
use crate::domain::types::Message;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini クライアント設定
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            max_output_tokens: 2048,
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

/// Gemini generateContent API を使用した会話モデル
pub struct GeminiClient {
    client: reqwest::Client,
    config: parking_lot::RwLock<GeminiConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("HTTP client builder failed, using defaults: {e}");
                reqwest::Client::new()
            });

        Self {
            client,
            config: parking_lot::RwLock::new(config),
        }
    }

    /// APIキーを実行時に差し替える（None または空文字で未設定に戻す）
    pub fn set_api_key(&self, api_key: Option<String>) {
        let key = api_key.filter(|k| !k.trim().is_empty());
        self.config.write().api_key = key;
    }

    /// 現在の設定のクローンを取得する。
    pub fn config(&self) -> GeminiConfig {
        self.config.read().clone()
    }

    fn api_url(model: &str) -> String {
        format!("{GEMINI_API_BASE}/{model}:generateContent")
    }

    fn build_request<'a>(
        config: &GeminiConfig,
        transcript: &'a [Message<'a>],
    ) -> GenerateContentRequest<'a> {
        let contents = transcript
            .iter()
            .map(|m| Content {
                role: m.role.as_str(),
                parts: vec![Part { text: m.text }],
            })
            .collect();

        GenerateContentRequest {
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: config.max_output_tokens,
                temperature: config.temperature,
            },
        }
    }

    fn parse_response(response: GenerateContentResponse) -> Result<String, GenerationError> {
        let text = response
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                if let Some(reason) = candidate.finish_reason.as_deref() {
                    log::debug!("Gemini finish reason: {reason}");
                }
                candidate
                    .content
                    .map(|c| c.parts)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if !text.is_empty() {
            return Ok(text);
        }

        match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => Err(GenerationError::Api(format!("prompt blocked: {reason}"))),
            None => Err(GenerationError::EmptyResponse),
        }
    }

    fn classify_status(status: reqwest::StatusCode, body: String) -> GenerationError {
        match status.as_u16() {
            401 | 403 => GenerationError::Unauthorized(body),
            400 if body.contains("API_KEY_INVALID") => GenerationError::Unauthorized(body),
            429 => GenerationError::RateLimited,
            _ => GenerationError::Api(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate(&self, transcript: &[Message<'_>]) -> Result<String, GenerationError> {
        let config = self.config();
        let api_key = config.api_key.clone().ok_or(GenerationError::MissingApiKey)?;

        let request = Self::build_request(&config, transcript);

        log::debug!(
            "Gemini request: model={} messages={}",
            config.model,
            transcript.len()
        );

        let response = self
            .client
            .post(Self::api_url(&config.model))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        Self::parse_response(parsed)
    }

    fn ensure_ready(&self) -> Result<(), GenerationError> {
        match self.config.read().api_key {
            Some(_) => Ok(()),
            None => Err(GenerationError::MissingApiKey),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let config = GeminiConfig::default();
        let transcript = [Message::user("hello"), Message::model("hi there")];
        let body = serde_json::to_value(GeminiClient::build_request(&config, &transcript)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "hi there");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_api_url() {
        assert_eq!(
            GeminiClient::api_url("gemini-1.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let json = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]},"finishReason":"STOP"}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(GeminiClient::parse_response(parsed).unwrap(), "Hello");
    }

    #[test]
    fn test_parse_response_blocked_prompt() {
        let json = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let err = GeminiClient::parse_response(parsed).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_response_empty() {
        let parsed: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            GeminiClient::parse_response(parsed),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn test_classify_status() {
        use reqwest::StatusCode;
        assert!(matches!(
            GeminiClient::classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            GenerationError::RateLimited
        ));
        assert!(matches!(
            GeminiClient::classify_status(StatusCode::BAD_REQUEST, "API_KEY_INVALID".into()),
            GenerationError::Unauthorized(_)
        ));
        assert!(matches!(
            GeminiClient::classify_status(StatusCode::INTERNAL_SERVER_ERROR, "oops".into()),
            GenerationError::Api(_)
        ));
    }

    #[test]
    fn test_ensure_ready_tracks_api_key() {
        let client = GeminiClient::new(GeminiConfig::default());
        assert!(matches!(client.ensure_ready(), Err(GenerationError::MissingApiKey)));

        client.set_api_key(Some("test-key".into()));
        assert!(client.ensure_ready().is_ok());

        client.set_api_key(Some("   ".into()));
        assert!(client.ensure_ready().is_err());
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_fast() {
        let client = GeminiClient::new(GeminiConfig::default());
        let err = client.generate(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = GeminiConfig {
            api_key: Some("secret".into()),
            ..Default::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("REDACTED"));
    }
}
