use async_trait::async_trait;

use super::{AudioHandle, SpeechSynthesizer, SynthesisError};

/// NoopSynthesizer: 読み上げ無効時の実装。常に Disabled を返す。
pub struct NoopSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NoopSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _language_hint: &str,
    ) -> Result<AudioHandle, SynthesisError> {
        Err(SynthesisError::Disabled)
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_synthesizer_is_disabled() {
        let err = NoopSynthesizer.synthesize("hello", "en").await.unwrap_err();
        assert!(matches!(err, SynthesisError::Disabled));
        assert_eq!(NoopSynthesizer.name(), "noop");
    }
}
