pub mod config;
pub mod error;
pub mod types;

pub use config::KbchatConfig;
pub use error::{ChatError, ConfigError, ErrorKind};
pub use types::{ApiEnvelope, ChatRequest};
