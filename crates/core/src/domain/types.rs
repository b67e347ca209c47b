use serde::{Deserialize, Serialize};

/// 入力モダリティ（モードごとに独立した会話を持つ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Text,
    Voice,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
        }
    }
}

/// トランスクリプト上の発話者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// ロール付きメッセージ（モデル呼び出しの入力単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Message<'a> {
    pub role: Role,
    pub text: &'a str,
}

impl<'a> Message<'a> {
    pub fn user(text: &'a str) -> Self {
        Self {
            role: Role::User,
            text,
        }
    }

    pub fn model(text: &'a str) -> Self {
        Self {
            role: Role::Model,
            text,
        }
    }
}
