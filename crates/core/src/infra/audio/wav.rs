use std::path::Path;

/// モノラル PCM 音声（f32, -1.0〜1.0）
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmAudio {
    pub fn duration_ms(&self) -> u32 {
        if self.sample_rate == 0 {
            return 0;
        }
        ((self.samples.len() as f64 / self.sample_rate as f64) * 1000.0) as u32
    }
}

/// WAV ファイルを読み込み、モノラル f32 に変換する
pub fn read_mono(path: &Path) -> Result<PcmAudio, hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(PcmAudio {
        samples: to_mono(&interleaved, spec.channels),
        sample_rate: spec.sample_rate,
    })
}

/// モノラル f32 を 16bit PCM WAV として書き出す
pub fn write_mono(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(f32_to_i16(s))?;
    }
    writer.finalize()
}

/// f32 サンプルを LINEAR16 (little endian) バイト列に変換する
pub fn to_linear16(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| f32_to_i16(s).to_le_bytes())
        .collect()
}

/// インターリーブされた多チャンネル → モノ変換（チャンネル平均）
pub fn to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn f32_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_to_mono_averages_frames() {
        let mono = to_mono(&[1.0, 0.0, 0.5, 0.5], 2);
        assert_eq!(mono, vec![0.5, 0.5]);
    }

    #[test]
    fn mono_passthrough() {
        assert_eq!(to_mono(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn linear16_is_little_endian_and_clamped() {
        let bytes = to_linear16(&[0.0, 1.0, -2.0]);
        assert_eq!(bytes.len(), 6);
        assert_eq!(&bytes[0..2], &[0, 0]);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), -i16::MAX);
    }

    #[test]
    fn write_then_read_keeps_rate_and_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..1600).map(|i| ((i as f32) * 0.01).sin() * 0.5).collect();

        write_mono(&path, &samples, 16_000).unwrap();
        let audio = read_mono(&path).unwrap();

        assert_eq!(audio.sample_rate, 16_000);
        assert_eq!(audio.samples.len(), 1600);
        assert_eq!(audio.duration_ms(), 100);
        assert!((audio.samples[100] - samples[100]).abs() < 1e-3);
    }

    #[test]
    fn read_missing_file_fails() {
        assert!(read_mono(Path::new("/nonexistent/audio.wav")).is_err());
    }
}
