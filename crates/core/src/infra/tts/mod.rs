pub mod google_translate;
mod noop;

pub use google_translate::{GoogleTranslateTts, TtsConfig};
pub use noop::NoopSynthesizer;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

/// 合成済み音声への参照（ディスク上の MP3）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioHandle {
    pub path: PathBuf,
    pub language: String,
    pub bytes: usize,
}

/// 音声合成エラー
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("Speech synthesis is disabled")]
    Disabled,
    #[error("Nothing to synthesize")]
    EmptyText,
    #[error("Synthesis request failed: {0}")]
    Request(String),
    #[error("Synthesis output error: {0}")]
    Io(#[from] std::io::Error),
}

/// 音声合成 trait（言語ヒント付きでテキストを音声に変換する）
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        language_hint: &str,
    ) -> Result<AudioHandle, SynthesisError>;

    fn name(&self) -> &str;
}
