pub mod conversation;
pub mod error;
pub mod settings;
pub mod stt;
pub mod types;

mod serde_tests;
