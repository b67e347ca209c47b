pub mod audio;
pub mod lang;
pub mod llm;
pub mod metrics;
pub mod post_processor;
pub mod settings_store;
pub mod stt;
pub mod tts;
