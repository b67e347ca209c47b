use std::sync::Arc;

use serde::Serialize;

use super::error::{AppError, ErrorCode};
use super::types::{Message, Mode};

/// 会話の1往復（ユーザー発話 + モデル応答）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub user_utterance: Option<String>,
    pub model_reply: Option<String>,
    /// model_reply がモデル応答ではなく失敗内容を保持している場合のエラーコード
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ErrorCode>,
}

impl Turn {
    pub fn is_pending(&self) -> bool {
        self.model_reply.is_none()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// 会話の観測可能な状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// 全ターンが応答済み
    Complete,
    /// 最終ターンがモデル応答待ち
    AwaitingReply,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::AwaitingReply => "awaiting_reply",
        }
    }
}

/// 1つの会話のターン履歴。
///
/// 不変条件: model_reply が未設定のターンは高々1つで、存在する場合は必ず最終ターン。
#[derive(Debug, Clone)]
pub struct Conversation {
    pub conversation_id: String,
    pub mode: Mode,
    pub created_at: String,
    turns: Vec<Turn>,
}

/// 非同期ハンドラ間で共有する会話ハンドル（1会話につき同時に1交換のみ）
pub type ConversationHandle = Arc<tokio::sync::Mutex<Conversation>>;

impl Conversation {
    pub fn new(conversation_id: String, mode: Mode, now: String) -> Self {
        Self {
            conversation_id,
            mode,
            created_at: now,
            turns: Vec::new(),
        }
    }

    pub fn into_handle(self) -> ConversationHandle {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn state(&self) -> ConversationState {
        match self.turns.last() {
            Some(turn) if turn.is_pending() => ConversationState::AwaitingReply,
            _ => ConversationState::Complete,
        }
    }

    /// ユーザー発話を新しい最終ターンとして追加する
    pub fn append_user_turn(&mut self, utterance: impl Into<String>) -> Result<(), AppError> {
        let utterance = utterance.into();
        if utterance.trim().is_empty() {
            return Err(AppError::invalid_input("発話テキストが空です"));
        }
        self.ensure_complete("append_user_turn")?;

        self.turns.push(Turn {
            user_utterance: Some(utterance),
            model_reply: None,
            failure: None,
        });
        Ok(())
    }

    /// モデル入力用のロール付きメッセージ列（呼び出し時点のターンを反映、遅延評価）
    pub fn to_transcript(&self) -> Transcript<'_> {
        Transcript {
            turns: self.turns.iter(),
            pending_reply: None,
        }
    }

    /// モデル応答を最終ターンに書き込む
    pub fn commit_model_reply(&mut self, reply_text: impl Into<String>) -> Result<(), AppError> {
        let turn = self.pending_turn_mut("commit_model_reply")?;
        turn.model_reply = Some(reply_text.into());
        Ok(())
    }

    /// コラボレータの失敗を最終ターンの応答として記録する
    pub fn commit_failure(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Result<(), AppError> {
        let turn = self.pending_turn_mut("commit_failure")?;
        turn.model_reply = Some(message.into());
        turn.failure = Some(code);
        Ok(())
    }

    /// モデル呼び出し前の失敗を応答済みターンとして追加する
    pub fn push_failed_turn(
        &mut self,
        user_utterance: Option<String>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Result<(), AppError> {
        self.ensure_complete("push_failed_turn")?;
        self.turns.push(Turn {
            user_utterance,
            model_reply: Some(message.into()),
            failure: Some(code),
        });
        Ok(())
    }

    /// 全ターンを破棄する（冪等）
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn ensure_complete(&self, op: &str) -> Result<(), AppError> {
        match self.state() {
            ConversationState::Complete => Ok(()),
            ConversationState::AwaitingReply => Err(AppError::invalid_state(format!(
                "{op} は応答待ちのターンがある間は実行できません"
            ))),
        }
    }

    fn pending_turn_mut(&mut self, op: &str) -> Result<&mut Turn, AppError> {
        match self.turns.last_mut() {
            Some(turn) if turn.is_pending() => Ok(turn),
            Some(_) => Err(AppError::invalid_state(format!(
                "{op}: 最終ターンは既に応答済みです"
            ))),
            None => Err(AppError::invalid_state(format!("{op}: ターンがありません"))),
        }
    }
}

/// ターン列から導出されるロール付きメッセージのイテレータ。
/// clone すれば先頭から何度でも辿り直せる。
#[derive(Debug, Clone)]
pub struct Transcript<'a> {
    turns: std::slice::Iter<'a, Turn>,
    pending_reply: Option<&'a str>,
}

impl<'a> Iterator for Transcript<'a> {
    type Item = Message<'a>;

    fn next(&mut self) -> Option<Message<'a>> {
        if let Some(reply) = self.pending_reply.take() {
            return Some(Message::model(reply));
        }

        for turn in self.turns.by_ref() {
            let reply = turn.model_reply.as_deref();
            match turn.user_utterance.as_deref() {
                Some(utterance) => {
                    self.pending_reply = reply;
                    return Some(Message::user(utterance));
                }
                None => {
                    if let Some(reply) = reply {
                        return Some(Message::model(reply));
                    }
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Role;

    fn now() -> String {
        "2025-01-15T10:30:00Z".to_string()
    }

    fn new_conversation() -> Conversation {
        Conversation::new("test-conversation".to_string(), Mode::Text, now())
    }

    fn collect(conv: &Conversation) -> Vec<(Role, String)> {
        conv.to_transcript()
            .map(|m| (m.role, m.text.to_string()))
            .collect()
    }

    #[test]
    fn test_hello_scenario() {
        let mut conv = new_conversation();
        conv.append_user_turn("hello").unwrap();
        assert_eq!(collect(&conv), vec![(Role::User, "hello".to_string())]);
        assert_eq!(conv.state(), ConversationState::AwaitingReply);

        conv.commit_model_reply("hi there").unwrap();
        assert_eq!(
            collect(&conv),
            vec![
                (Role::User, "hello".to_string()),
                (Role::Model, "hi there".to_string()),
            ]
        );
        assert_eq!(conv.state(), ConversationState::Complete);
    }

    #[test]
    fn test_clear_after_two_turns() {
        let mut conv = new_conversation();
        conv.append_user_turn("one").unwrap();
        conv.commit_model_reply("1").unwrap();
        conv.append_user_turn("two").unwrap();
        conv.commit_model_reply("2").unwrap();
        assert_eq!(conv.to_transcript().count(), 4);

        conv.clear();
        assert_eq!(conv.to_transcript().count(), 0);
        assert!(conv.is_empty());

        conv.clear();
        assert!(conv.is_empty());
    }

    #[test]
    fn test_commit_on_empty_is_invalid_state() {
        let mut conv = new_conversation();
        let err = conv.commit_model_reply("orphan").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert!(conv.is_empty());
    }

    #[test]
    fn test_commit_twice_is_invalid_state() {
        let mut conv = new_conversation();
        conv.append_user_turn("hello").unwrap();
        conv.commit_model_reply("hi").unwrap();
        let err = conv.commit_model_reply("again").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert_eq!(conv.last_turn().unwrap().model_reply.as_deref(), Some("hi"));
    }

    #[test]
    fn test_append_while_awaiting_is_invalid_state() {
        let mut conv = new_conversation();
        conv.append_user_turn("first").unwrap();
        let err = conv.append_user_turn("second").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_append_blank_is_invalid_input() {
        let mut conv = new_conversation();
        let err = conv.append_user_turn("   ").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(conv.is_empty());
    }

    #[test]
    fn test_transcript_is_restartable_and_lazy() {
        let mut conv = new_conversation();
        conv.append_user_turn("a").unwrap();
        conv.commit_model_reply("b").unwrap();

        let transcript = conv.to_transcript();
        let first: Vec<_> = transcript.clone().collect();
        let second: Vec<_> = transcript.collect();
        assert_eq!(first, second);

        conv.append_user_turn("c").unwrap();
        assert_eq!(conv.to_transcript().count(), 3);
    }

    #[test]
    fn test_failed_turn_without_utterance() {
        let mut conv = new_conversation();
        conv.push_failed_turn(None, ErrorCode::Recognition, "could not understand")
            .unwrap();

        let turn = conv.last_turn().unwrap();
        assert!(turn.user_utterance.is_none());
        assert!(turn.is_failed());
        assert_eq!(
            collect(&conv),
            vec![(Role::Model, "could not understand".to_string())]
        );
        assert_eq!(conv.state(), ConversationState::Complete);
    }

    #[test]
    fn test_commit_failure_marks_turn() {
        let mut conv = new_conversation();
        conv.append_user_turn("hello").unwrap();
        conv.commit_failure(ErrorCode::Generation, "quota exceeded")
            .unwrap();

        let turn = conv.last_turn().unwrap();
        assert_eq!(turn.failure, Some(ErrorCode::Generation));
        assert_eq!(turn.model_reply.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn test_push_failed_turn_while_awaiting_is_invalid_state() {
        let mut conv = new_conversation();
        conv.append_user_turn("hello").unwrap();
        let err = conv
            .push_failed_turn(None, ErrorCode::Recognition, "x")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn test_single_pending_turn_invariant_over_sequence() {
        let mut conv = new_conversation();
        // 決定的な操作列: 0=append, 1=commit, 2=failed turn, 3=clear
        let ops = [0, 1, 0, 0, 1, 1, 2, 0, 2, 1, 3, 1, 0, 1, 0];
        for (i, op) in ops.iter().enumerate() {
            let _ = match op {
                0 => conv.append_user_turn(format!("u{i}")),
                1 => conv.commit_model_reply(format!("m{i}")),
                2 => conv.push_failed_turn(None, ErrorCode::Recognition, "err"),
                _ => {
                    conv.clear();
                    Ok(())
                }
            };

            let pending: Vec<usize> = conv
                .turns()
                .iter()
                .enumerate()
                .filter(|(_, t)| t.is_pending())
                .map(|(idx, _)| idx)
                .collect();
            assert!(pending.len() <= 1);
            if let Some(&idx) = pending.first() {
                assert_eq!(idx, conv.len() - 1);
            }
        }
    }

    #[test]
    fn test_transcript_length_formula() {
        let mut conv = new_conversation();
        for i in 0..3 {
            conv.append_user_turn(format!("q{i}")).unwrap();
            conv.commit_model_reply(format!("a{i}")).unwrap();
        }
        assert_eq!(conv.to_transcript().count(), 6);

        conv.append_user_turn("q3").unwrap();
        assert_eq!(conv.to_transcript().count(), 7);
    }
}
