use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::{AudioHandle, SpeechSynthesizer, SynthesisError};

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// translate_tts が1リクエストで受け付ける最大文字数
const MAX_CHUNK_CHARS: usize = 100;

/// 読み上げ設定
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// MP3 の出力先ディレクトリ（None ならシステムの一時ディレクトリ）
    pub output_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            timeout_secs: 30,
        }
    }
}

/// Google 翻訳の読み上げエンドポイントを使う合成器（gTTS 互換）。
/// 長文は 100 文字以下のチャンクに分割し、MP3 を連結して1ファイルにする。
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    config: TtsConfig,
}

impl GoogleTranslateTts {
    pub fn new(config: TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0")
            .build()
            .unwrap_or_else(|e| {
                log::warn!("HTTP client builder failed, using defaults: {e}");
                reqwest::Client::new()
            });

        Self { client, config }
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        language: &str,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>, SynthesisError> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();

        let response = self
            .client
            .get(TRANSLATE_TTS_URL)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("q", chunk),
                ("tl", language),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SynthesisError::Request(format!(
                "HTTP {status} for language '{language}'"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn write_mp3(&self, audio: &[u8]) -> Result<PathBuf, SynthesisError> {
        let dir = self
            .config
            .output_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        std::fs::create_dir_all(&dir)?;

        let mut file = tempfile::Builder::new()
            .prefix("reply-")
            .suffix(".mp3")
            .tempfile_in(&dir)?;
        file.write_all(audio)?;
        let (_, path) = file.keep().map_err(|e| SynthesisError::Io(e.error))?;
        Ok(path)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(
        &self,
        text: &str,
        language_hint: &str,
    ) -> Result<AudioHandle, SynthesisError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let total = chunks.len();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            audio.extend(self.fetch_chunk(chunk, language_hint, idx, total).await?);
        }

        let path = self.write_mp3(&audio)?;
        log::info!(
            "Synthesized {} chunk(s), {} bytes ({}) -> {:?}",
            total,
            audio.len(),
            language_hint,
            path
        );

        Ok(AudioHandle {
            path,
            language: language_hint.to_string(),
            bytes: audio.len(),
        })
    }

    fn name(&self) -> &str {
        "google-translate-tts"
    }
}

/// テキストを max_chars 文字以下のチャンクに分割する。
/// 単語境界で詰め、文末記号の直後では必ず区切る。
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let mut flush = |current: &mut String, current_len: &mut usize| {
        if !current.is_empty() {
            chunks.push(std::mem::take(current));
        }
        *current_len = 0;
    };

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            flush(&mut current, &mut current_len);
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                current = piece.iter().collect();
                flush(&mut current, &mut current_len);
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if needed > max_chars {
            flush(&mut current, &mut current_len);
            current.push_str(word);
            current_len = word_len;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
        }

        if ends_sentence(word) {
            flush(&mut current, &mut current_len);
        }
    }
    flush(&mut current, &mut current_len);

    chunks
}

fn ends_sentence(word: &str) -> bool {
    // '۔' と '؟' はウルドゥー語の句点・疑問符
    matches!(
        word.chars().last(),
        Some('.' | '!' | '?' | '۔' | '؟' | ':' | ';')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_short_text_single_chunk() {
        assert_eq!(split_text("hello world", 100), vec!["hello world"]);
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_text("   ", 100).is_empty());
    }

    #[test]
    fn test_split_on_sentence_end() {
        let chunks = split_text("First one. Second one!", 100);
        assert_eq!(chunks, vec!["First one.", "Second one!"]);
    }

    #[test]
    fn test_split_urdu_full_stop() {
        let chunks = split_text("آپ کیسے ہیں۔ میں ٹھیک ہوں", 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "آپ کیسے ہیں۔");
    }

    #[test]
    fn test_split_respects_char_limit() {
        let text = "word ".repeat(60);
        let chunks = split_text(&text, 20);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        assert_eq!(chunks.join(" ").split_whitespace().count(), 60);
    }

    #[test]
    fn test_split_counts_chars_not_bytes() {
        // ウルドゥー文字は UTF-8 で2バイト
        let word = "ب".repeat(10);
        let text = format!("{word} {word}");
        assert_eq!(split_text(&text, 21).len(), 1);
    }

    #[test]
    fn test_split_hard_splits_long_word() {
        let word = "x".repeat(25);
        let chunks = split_text(&word, 10);
        assert_eq!(chunks, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_before_request() {
        let tts = GoogleTranslateTts::new(TtsConfig::default());
        let err = tts.synthesize("  ", "en").await.unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyText));
    }

    #[test]
    fn test_write_mp3_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tts = GoogleTranslateTts::new(TtsConfig {
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        let path = tts.write_mp3(b"ID3").unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3");
    }
}
