pub mod google;
mod noop;

pub use google::{GoogleSpeechConfig, GoogleSpeechEngine};
pub use noop::NoopSttEngine;

pub use crate::domain::stt::{
    AudioInput, Recognition, SttContext, SttEngine, SttError, SttErrorKind,
};
