use async_trait::async_trait;

use crate::domain::stt::{AudioInput, Recognition, SttContext, SttEngine, SttError};

/// NoopSttEngine: 固定結果を返すモック実装。
/// STT の API キーがない環境やテストで使う。
pub struct NoopSttEngine {
    outcome: Result<String, SttError>,
}

impl NoopSttEngine {
    pub fn new() -> Self {
        Self::with_text("[STT stub] this is a mock transcription")
    }

    /// 常に指定テキストを返す
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(text.into()),
        }
    }

    /// 常に指定エラーを返す
    pub fn failing(error: SttError) -> Self {
        Self { outcome: Err(error) }
    }
}

impl Default for NoopSttEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SttEngine for NoopSttEngine {
    async fn transcribe(
        &self,
        _audio: &AudioInput,
        ctx: &SttContext,
    ) -> Result<Recognition, SttError> {
        self.outcome.clone().map(|text| Recognition {
            text,
            confidence: Some(1.0),
            language: ctx.language.clone(),
        })
    }

    fn name(&self) -> &str {
        "noop"
    }
}
