use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_RECOGNITION")]
    Recognition,
    #[serde(rename = "E_GENERATION")]
    Generation,
    #[serde(rename = "E_API_KEY")]
    MissingApiKey,
    #[serde(rename = "E_SYNTHESIS")]
    Synthesis,
    #[serde(rename = "E_INVALID_STATE")]
    InvalidState,
    #[serde(rename = "E_INVALID_INPUT")]
    InvalidInput,
    #[serde(rename = "E_DEVICE")]
    Device,
    #[serde(rename = "E_CONFIG")]
    Config,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recognition => "E_RECOGNITION",
            Self::Generation => "E_GENERATION",
            Self::MissingApiKey => "E_API_KEY",
            Self::Synthesis => "E_SYNTHESIS",
            Self::InvalidState => "E_INVALID_STATE",
            Self::InvalidInput => "E_INVALID_INPUT",
            Self::Device => "E_DEVICE",
            Self::Config => "E_CONFIG",
            Self::Internal => "E_INTERNAL",
        }
    }
}

/// アプリケーションエラー（フロントエンドへの返却値兼用）
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidState,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidInput,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Device,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Config,
            message: msg.into(),
            recoverable: false,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}
