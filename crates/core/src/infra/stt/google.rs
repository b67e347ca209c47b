use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::domain::stt::{AudioInput, Recognition, SttContext, SttEngine, SttError};
use crate::infra::audio::wav::{self, PcmAudio};

const RECOGNIZE_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

/// 同期認識 API が受け付ける最大音声長
const MAX_SYNC_AUDIO_MS: u32 = 60_000;

/// Google Speech-to-Text エンジンの設定。
#[derive(Clone)]
pub struct GoogleSpeechConfig {
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// 自動句読点を付与するか
    pub automatic_punctuation: bool,
}

impl std::fmt::Debug for GoogleSpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSpeechConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("automatic_punctuation", &self.automatic_punctuation)
            .finish()
    }
}

impl Default for GoogleSpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            timeout_secs: 30,
            automatic_punctuation: true,
        }
    }
}

/// Google Cloud Speech-to-Text (REST, 同期認識) を使用した STT エンジン。
pub struct GoogleSpeechEngine {
    client: reqwest::Client,
    config: GoogleSpeechConfig,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
    enable_automatic_punctuation: bool,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f32>,
}

impl GoogleSpeechEngine {
    pub fn new(config: GoogleSpeechConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("HTTP client builder failed, using defaults: {e}");
                reqwest::Client::new()
            });

        Self { client, config }
    }

    /// 入力から PCM を取り出す（WAV パスの場合は読み込む）
    async fn load_pcm(audio: &AudioInput) -> Result<PcmAudio, SttError> {
        if let Some(samples) = &audio.samples {
            return Ok(PcmAudio {
                samples: samples.clone(),
                sample_rate: audio.sample_rate,
            });
        }

        let path = audio
            .wav_path
            .clone()
            .ok_or_else(|| SttError::audio_format("No samples or WAV path in audio input"))?;

        if !path.exists() {
            return Err(SttError::audio_format(format!(
                "WAV file not found: {:?}",
                path
            )));
        }

        tokio::task::spawn_blocking(move || wav::read_mono(&path))
            .await
            .map_err(|e| SttError::audio_format(format!("WAV reader task failed: {e}")))?
            .map_err(|e| SttError::audio_format(format!("Invalid WAV: {e}")))
    }

    fn build_request<'a>(
        &self,
        pcm: &PcmAudio,
        language: &'a str,
    ) -> RecognizeRequest<'a> {
        let content = base64::engine::general_purpose::STANDARD.encode(wav::to_linear16(&pcm.samples));
        RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: pcm.sample_rate,
                language_code: language,
                enable_automatic_punctuation: self.config.automatic_punctuation,
            },
            audio: RecognitionAudio { content },
        }
    }

    fn parse_response(response: RecognizeResponse, language: &str) -> Result<Recognition, SttError> {
        let best: Vec<Alternative> = response
            .results
            .into_iter()
            .filter_map(|r| r.alternatives.into_iter().next())
            .filter(|a| !a.transcript.trim().is_empty())
            .collect();

        if best.is_empty() {
            return Err(SttError::no_speech());
        }

        let confidences: Vec<f32> = best.iter().filter_map(|a| a.confidence).collect();
        let confidence = if confidences.is_empty() {
            None
        } else {
            Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
        };

        let text = best
            .iter()
            .map(|a| a.transcript.trim())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Recognition {
            text,
            confidence,
            language: language.to_string(),
        })
    }
}

#[async_trait]
impl SttEngine for GoogleSpeechEngine {
    async fn transcribe(
        &self,
        audio: &AudioInput,
        ctx: &SttContext,
    ) -> Result<Recognition, SttError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| SttError::engine_not_available("Google Speech API key is not set"))?;

        let pcm = Self::load_pcm(audio).await?;
        if pcm.samples.is_empty() || pcm.sample_rate == 0 {
            return Err(SttError::no_speech());
        }
        if pcm.duration_ms() > MAX_SYNC_AUDIO_MS {
            return Err(SttError::audio_format(format!(
                "Audio is {} ms long; synchronous recognition accepts up to {} ms",
                pcm.duration_ms(),
                MAX_SYNC_AUDIO_MS
            )));
        }

        let request = self.build_request(&pcm, &ctx.language);

        log::debug!(
            "Google Speech request: {} ms @ {} Hz, language={}",
            pcm.duration_ms(),
            pcm.sample_rate,
            ctx.language
        );

        let response = self
            .client
            .post(RECOGNIZE_URL)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SttError::timeout(e.to_string())
                } else {
                    SttError::request_failed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::request_failed(format!("HTTP {status}: {body}")));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| SttError::request_failed(format!("Response parse error: {e}")))?;

        Self::parse_response(parsed, &ctx.language)
    }

    fn name(&self) -> &str {
        "google-speech"
    }
}
