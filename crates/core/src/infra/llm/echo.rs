use async_trait::async_trait;

use super::{ChatModel, GenerationError};
use crate::domain::types::{Message, Role};

/// EchoModel: 最後のユーザー発話をそのまま返すオフライン実装。
/// APIキーなしで会話フローを確認するために使う。
pub struct EchoModel;

#[async_trait]
impl ChatModel for EchoModel {
    async fn generate(&self, transcript: &[Message<'_>]) -> Result<String, GenerationError> {
        transcript
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| format!("[echo] {}", m.text))
            .ok_or(GenerationError::EmptyResponse)
    }

    fn name(&self) -> &str {
        "echo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_returns_last_user_message() {
        let transcript = [
            Message::user("first"),
            Message::model("reply"),
            Message::user("second"),
        ];
        let reply = EchoModel.generate(&transcript).await.unwrap();
        assert_eq!(reply, "[echo] second");
    }

    #[tokio::test]
    async fn test_echo_without_user_message() {
        let err = EchoModel.generate(&[]).await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[test]
    fn test_echo_name() {
        assert_eq!(EchoModel.name(), "echo");
        assert!(EchoModel.ensure_ready().is_ok());
    }
}
