#[cfg(test)]
mod tests {
    use crate::domain::conversation::{Conversation, ConversationState, Turn};
    use crate::domain::error::{AppError, ErrorCode};
    use crate::domain::settings::SttEngineChoice;
    use crate::domain::types::{Message, Mode, Role};

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&Mode::Text).unwrap(), "\"text\"");
        assert_eq!(serde_json::to_string(&Mode::Voice).unwrap(), "\"voice\"");
        assert_eq!(
            serde_json::from_str::<Mode>("\"voice\"").unwrap(),
            Mode::Voice
        );
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_string(&Message::user("salaam")).unwrap();
        assert_eq!(json, r#"{"role":"user","text":"salaam"}"#);
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
    }

    #[test]
    fn test_conversation_state_serialization() {
        assert_eq!(
            serde_json::to_string(&ConversationState::AwaitingReply).unwrap(),
            "\"awaiting_reply\""
        );
        assert_eq!(
            serde_json::to_string(&ConversationState::Complete).unwrap(),
            "\"complete\""
        );
    }

    #[test]
    fn test_error_code_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::Recognition).unwrap(),
            "\"E_RECOGNITION\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::MissingApiKey).unwrap(),
            "\"E_API_KEY\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::InvalidState).unwrap(),
            "\"E_INVALID_STATE\""
        );
    }

    #[test]
    fn test_error_code_as_str_matches_serde() {
        for code in [
            ErrorCode::Recognition,
            ErrorCode::Generation,
            ErrorCode::MissingApiKey,
            ErrorCode::Synthesis,
            ErrorCode::InvalidState,
            ErrorCode::InvalidInput,
            ErrorCode::Device,
            ErrorCode::Config,
            ErrorCode::Internal,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_app_error_serialization() {
        let err = AppError::invalid_state("テスト");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("E_INVALID_STATE"));
        assert!(json.contains("recoverable"));
    }

    #[test]
    fn test_turn_serialization_skips_absent_failure() {
        let mut conv = Conversation::new("c1".into(), Mode::Text, "now".into());
        conv.append_user_turn("hello").unwrap();
        let json = serde_json::to_string(conv.last_turn().unwrap()).unwrap();
        assert_eq!(json, r#"{"user_utterance":"hello","model_reply":null}"#);

        let failed = Turn {
            user_utterance: None,
            model_reply: Some("Sorry".into()),
            failure: Some(ErrorCode::Recognition),
        };
        let json = serde_json::to_string(&failed).unwrap();
        assert!(json.contains("\"failure\":\"E_RECOGNITION\""));
    }

    #[test]
    fn test_stt_engine_choice_roundtrip() {
        assert_eq!(
            serde_json::to_string(&SttEngineChoice::Google).unwrap(),
            "\"google\""
        );
        assert_eq!(
            serde_json::from_str::<SttEngineChoice>("\"noop\"").unwrap(),
            SttEngineChoice::Noop
        );
    }
}
