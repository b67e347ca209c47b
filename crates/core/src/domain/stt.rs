use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

// ─── AudioInput ──────────────────────────────────────────────────

/// 文字起こし対象の音声入力。
#[derive(Debug, Clone)]
pub struct AudioInput {
    /// 入力固有ID (UUID v4)
    pub id: Uuid,
    /// 録音開始時刻 (UTC)
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// 入力長 (ミリ秒)
    pub duration_ms: u32,
    /// サンプルレート (Hz)
    pub sample_rate: u32,
    /// ディスク上のWAVファイルパス (ファイル入力時)
    pub wav_path: Option<PathBuf>,
    /// インメモリPCMサンプル (f32, mono)。マイク入力時。
    pub samples: Option<Vec<f32>>,
}

impl AudioInput {
    /// PCMサンプルから AudioInput を生成する。duration_ms は自動算出。
    pub fn from_samples(
        samples: Vec<f32>,
        sample_rate: u32,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let duration_ms = if sample_rate > 0 {
            ((samples.len() as f64 / sample_rate as f64) * 1000.0) as u32
        } else {
            0
        };
        Self {
            id: Uuid::new_v4(),
            started_at,
            duration_ms,
            sample_rate,
            wav_path: None,
            samples: Some(samples),
        }
    }

    /// WAVファイルを参照する AudioInput を生成する。長さとレートは読み込み時に確定する。
    pub fn from_wav_path(path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            duration_ms: 0,
            sample_rate: 0,
            wav_path: Some(path.into()),
            samples: None,
        }
    }
}

// ─── Recognition ─────────────────────────────────────────────────

/// 文字起こし結果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recognition {
    /// 文字起こしテキスト
    pub text: String,
    /// 信頼度スコア (0.0–1.0)。エンジンが提供しない場合は None。
    pub confidence: Option<f32>,
    /// 認識に使った言語コード (例: "ur-PK")
    pub language: String,
}

// ─── SttError ────────────────────────────────────────────────────

/// STT処理で発生するエラー（RecognitionError）。
#[derive(Debug, Clone)]
pub struct SttError {
    pub kind: SttErrorKind,
    pub detail: String,
    pub recoverable: bool,
}

impl std::fmt::Display for SttError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            SttErrorKind::NoSpeech => write!(f, "Sorry, I could not understand the audio."),
            SttErrorKind::RequestFailed => write!(f, "Could not request results; {}", self.detail),
            _ => write!(f, "Error during recognition: {}", self.detail),
        }
    }
}

impl std::error::Error for SttError {}

/// STTエラー種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SttErrorKind {
    /// 音声フォーマットが不正/非対応
    AudioFormat,
    /// STTエンジンが利用不可 (APIキー未設定等)
    EngineNotAvailable,
    /// 発話を認識できなかった
    NoSpeech,
    /// サービスに到達できない、またはHTTPエラー
    RequestFailed,
    /// タイムアウト
    Timeout,
}

impl SttError {
    pub fn audio_format(detail: impl Into<String>) -> Self {
        Self { kind: SttErrorKind::AudioFormat, detail: detail.into(), recoverable: false }
    }

    pub fn engine_not_available(detail: impl Into<String>) -> Self {
        Self { kind: SttErrorKind::EngineNotAvailable, detail: detail.into(), recoverable: false }
    }

    pub fn no_speech() -> Self {
        Self { kind: SttErrorKind::NoSpeech, detail: "No speech recognized".into(), recoverable: true }
    }

    pub fn request_failed(detail: impl Into<String>) -> Self {
        Self { kind: SttErrorKind::RequestFailed, detail: detail.into(), recoverable: true }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self { kind: SttErrorKind::Timeout, detail: detail.into(), recoverable: true }
    }
}

// ─── SttContext ──────────────────────────────────────────────────

/// STTエンジンに渡す認識コンテキスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttContext {
    /// 認識言語 (BCP-47, 例: "ur-PK")
    pub language: String,
}

impl Default for SttContext {
    fn default() -> Self {
        Self {
            language: "ur-PK".into(),
        }
    }
}

// ─── SttEngine trait ─────────────────────────────────────────────

/// STTエンジンのコアトレイト。全STT実装がこれを満たす。
#[async_trait::async_trait]
pub trait SttEngine: Send + Sync {
    /// 音声入力を文字起こしする。
    async fn transcribe(
        &self,
        audio: &AudioInput,
        ctx: &SttContext,
    ) -> Result<Recognition, SttError>;

    /// エンジン名 (例: "google-speech", "noop")。
    fn name(&self) -> &str;
}

// ─── Tests ───────────────────────────────────────────────────────
