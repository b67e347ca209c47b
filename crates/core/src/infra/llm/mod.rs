mod echo;
pub mod gemini;

pub use echo::EchoModel;
pub use gemini::{GeminiClient, GeminiConfig};

use async_trait::async_trait;

use crate::domain::error::ErrorCode;
use crate::domain::types::Message;

/// 生成エラー（GenerationError）
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Please enter your Gemini API key.")]
    MissingApiKey,
    #[error("Error generating response: invalid API key ({0})")]
    Unauthorized(String),
    #[error("Error generating response: rate limited")]
    RateLimited,
    #[error("Error generating response: network error: {0}")]
    Network(String),
    #[error("Error generating response: request timed out")]
    Timeout,
    #[error("Error generating response: {0}")]
    Api(String),
    #[error("Error generating response: response parse error: {0}")]
    Parse(String),
    #[error("Error generating response: empty response")]
    EmptyResponse,
}

impl GenerationError {
    /// 会話ターンに記録するエラーコード
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingApiKey => ErrorCode::MissingApiKey,
            _ => ErrorCode::Generation,
        }
    }
}

/// 会話モデル trait（リモートLLMが実装する）
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// トランスクリプト全体を入力として次のモデル応答を生成する
    async fn generate(&self, transcript: &[Message<'_>]) -> Result<String, GenerationError>;

    /// 呼び出し前の事前チェック（APIキー等）
    fn ensure_ready(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    fn name(&self) -> &str;
}
