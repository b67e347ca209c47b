use std::sync::mpsc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::wav::{to_mono, PcmAudio};

/// 音声キャプチャエラー
#[derive(Debug, thiserror::Error)]
pub enum AudioCaptureError {
    #[error("No audio input device found")]
    NoDevice,
    #[error("Audio device config error: {0}")]
    Config(String),
    #[error("Audio stream error: {0}")]
    Stream(String),
}

/// キャプチャ設定（実際のデバイスから取得した値）
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

/// デバイスの存在と設定を事前チェックする（stream は作らない）
pub fn check_device() -> Result<CaptureConfig, AudioCaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioCaptureError::NoDevice)?;

    let supported_config = device
        .default_input_config()
        .map_err(|e| AudioCaptureError::Config(e.to_string()))?;

    Ok(CaptureConfig {
        sample_rate: supported_config.sample_rate().0,
        channels: supported_config.channels(),
    })
}

/// 既定の入力デバイスから指定時間だけ録音し、mono PCM を返す。
///
/// cpal::Stream は Send ではないため、呼び出しスレッド上で stream を作成・破棄する。
/// 非同期コンテキストからは `spawn_blocking` 経由で呼ぶこと。
pub fn record(duration: Duration) -> Result<PcmAudio, AudioCaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioCaptureError::NoDevice)?;

    let supported_config = device
        .default_input_config()
        .map_err(|e| AudioCaptureError::Config(e.to_string()))?;

    let sample_rate = supported_config.sample_rate().0;
    let channels = supported_config.channels();
    let sample_format = supported_config.sample_format();

    let config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let (sample_tx, sample_rx) = mpsc::channel::<Vec<f32>>();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let _ = sample_tx.send(to_mono(data, channels));
            },
            |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _info: &cpal::InputCallbackInfo| {
                let f32_data: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                let _ = sample_tx.send(to_mono(&f32_data, channels));
            },
            |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        ),
        format => {
            return Err(AudioCaptureError::Config(format!(
                "Unsupported sample format: {:?}",
                format
            )));
        }
    }
    .map_err(|e| AudioCaptureError::Stream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioCaptureError::Stream(e.to_string()))?;

    log::info!(
        "Recording {:?}: {}Hz, {} channels, {:?}",
        duration,
        sample_rate,
        channels,
        sample_format
    );

    let mut samples = Vec::with_capacity(sample_rate as usize * duration.as_secs().max(1) as usize);
    let deadline = Instant::now() + duration;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match sample_rx.recv_timeout(remaining) {
            Ok(chunk) => samples.extend_from_slice(&chunk),
            Err(mpsc::RecvTimeoutError::Timeout) => break,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(AudioCaptureError::Stream("capture stream closed".into()));
            }
        }
    }
    drop(stream);

    // 停止後にキューに残ったチャンクも回収する
    samples.extend(sample_rx.try_iter().flatten());

    Ok(PcmAudio {
        samples,
        sample_rate,
    })
}
