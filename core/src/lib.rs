// Inworld TTS Core Library
// Voice catalog, configuration flow and streaming synthesis client

pub mod catalog;
pub mod config;
pub mod flow;
pub mod http;
pub mod provider;
pub mod store;
pub mod synthesis;
pub mod validator;

// Export core types
pub use catalog::{fetch_catalog, Voice, VoiceCatalog};
pub use config::{
    AudioEncoding, ClientConfig, ConfigResolver, Credentials, ModelId, SynthesisConfig,
    TimestampType,
};
pub use flow::{FlowResult, FlowSession, FlowStage, Form};
pub use http::{HttpVoiceApi, VoiceApi};
pub use provider::InworldTtsProvider;
pub use store::{ConfigEntry, ConfigStore, InMemoryConfigStore, JsonFileStore};
pub use synthesis::{AudioResult, RequestOptions, StreamDecoder, SynthesisClient};
pub use validator::validate;

/// Integration domain, used as the store namespace
pub const DOMAIN: &str = "inworld_tts";
/// Title given to entries created by the setup flow
pub const TITLE: &str = "Inworld TTS";

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("Invalid authentication")]
    AuthError,

    #[error("Rate limit exceeded")]
    RateLimitError,

    #[error("Cannot connect: {0}")]
    ConnectError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Language '{0}' not supported")]
    UnsupportedLanguage(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl TtsError {
    /// User-visible code shown on a re-rendered form.
    ///
    /// Anything outside the auth and connectivity kinds collapses to `unknown`.
    pub fn error_code(&self) -> &'static str {
        match self {
            TtsError::AuthError => "invalid_auth",
            TtsError::ConnectError(_) | TtsError::TransportError(_) | TtsError::RateLimitError => {
                "cannot_connect"
            }
            _ => "unknown",
        }
    }
}

pub type Result<T> = std::result::Result<T, TtsError>;
