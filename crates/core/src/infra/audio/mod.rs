#[cfg(feature = "microphone")]
pub mod capture;
pub mod wav;

#[cfg(feature = "microphone")]
pub use capture::{record, AudioCaptureError, CaptureConfig};
pub use wav::{read_mono, to_linear16, to_mono, write_mono, PcmAudio};
