//! Configuration types for the Inworld TTS integration
//!
//! - `Credentials`: API base URL + key (key redacted in Debug output)
//! - `SynthesisConfig`: voice, model and audio parameters used per request
//! - `AudioEncoding`, `ModelId`, `TimestampType`: the enumerated choices
//! - `ClientConfig`: HTTP timeouts, read from env with sane defaults
//! - `ConfigResolver`: layered per-field lookup (see `resolve`)
//!
//! Env overrides:
//! - INWORLD_TIMEOUT_MS, INWORLD_STREAM_TIMEOUT_MS, INWORLD_USER_AGENT

mod resolve;

pub use resolve::{compiled_default, ConfigResolver, LayerKind};

use crate::{Result, TtsError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_API_BASE_URL: &str = "https://api.inworld.ai/";
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SAMPLE_RATE_HERTZ: u32 = 48_000;
pub const DEFAULT_TEMPERATURE: f64 = 0.8;
pub const MIN_SAMPLE_RATE_HERTZ: u32 = 8_000;
pub const MAX_SAMPLE_RATE_HERTZ: u32 = 48_000;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Keys used in persisted entries and form submissions
pub mod keys {
    pub const API_URL: &str = "api_url";
    pub const API_KEY: &str = "api_key";
    pub const LANGUAGE: &str = "language";
    pub const VOICE_ID: &str = "voice_id";
    pub const MODEL_ID: &str = "model_id";
    pub const AUDIO_ENCODING: &str = "audio_encoding";
    pub const SAMPLE_RATE_HERTZ: &str = "sample_rate_hertz";
    pub const TEMPERATURE: &str = "temperature";
    pub const TIMESTAMP_TYPE: &str = "timestamp_type";
}

/// API credentials. Immutable once validated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "api_url")]
    pub base_url: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Join an API path onto the base URL, tolerating a trailing slash
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn authorization(&self) -> String {
        format!("Basic {}", self.api_key)
    }

    /// Resolve credentials from layered configuration
    pub fn resolve(resolver: &ConfigResolver<'_>) -> Result<Self> {
        let base_url: String = resolver.require(keys::API_URL)?;
        let api_key: String = resolver.require(keys::API_KEY)?;
        if api_key.trim().is_empty() {
            return Err(TtsError::ConfigMissing(keys::API_KEY.to_string()));
        }
        Ok(Self { base_url, api_key })
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert(keys::API_URL.into(), Value::String(self.base_url.clone()));
        m.insert(keys::API_KEY.into(), Value::String(self.api_key.clone()));
        m
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish()
    }
}

/// Mask every value whose key mentions `key` before a map is logged
pub fn redact(values: &Map<String, Value>) -> Map<String, Value> {
    values
        .iter()
        .map(|(k, v)| {
            if k.to_lowercase().contains("key") {
                (k.clone(), Value::String("***".into()))
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

/// Supported audio encodings. Each maps to exactly one content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum AudioEncoding {
    Linear16,
    Mp3,
    OggOpus,
    Alaw,
    Mulaw,
}

impl AudioEncoding {
    pub const ALL: [AudioEncoding; 5] = [
        AudioEncoding::Linear16,
        AudioEncoding::Mp3,
        AudioEncoding::OggOpus,
        AudioEncoding::Alaw,
        AudioEncoding::Mulaw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "LINEAR16",
            AudioEncoding::Mp3 => "MP3",
            AudioEncoding::OggOpus => "OGG_OPUS",
            AudioEncoding::Alaw => "ALAW",
            AudioEncoding::Mulaw => "MULAW",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "audio/mpeg",
            AudioEncoding::OggOpus => "audio/opus",
            // LINEAR16 carries a WAV header; the companded formats are served as wav too
            AudioEncoding::Linear16 | AudioEncoding::Alaw | AudioEncoding::Mulaw => "audio/wav",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::OggOpus => "ogg",
            AudioEncoding::Linear16 | AudioEncoding::Alaw | AudioEncoding::Mulaw => "wav",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "Uncompressed 16-bit signed little-endian samples (Linear PCM) with a WAV header",
            AudioEncoding::Mp3 => "MP3 audio",
            AudioEncoding::OggOpus => "Opus encoded audio wrapped in an ogg container",
            AudioEncoding::Alaw => "ALAW encoded audio, 8-bit companded PCM",
            AudioEncoding::Mulaw => "MULAW encoded audio, 8-bit companded PCM",
        }
    }
}

impl Default for AudioEncoding {
    fn default() -> Self {
        AudioEncoding::Mp3
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioEncoding {
    type Err = TtsError;

    // Case-insensitive: entries written as "mp3" and "MP3" both resolve
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        AudioEncoding::ALL
            .into_iter()
            .find(|e| e.as_str() == upper)
            .ok_or_else(|| TtsError::InvalidConfig(format!("unknown audio encoding: {s}")))
    }
}

impl TryFrom<String> for AudioEncoding {
    type Error = TtsError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Known synthesis models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ModelId {
    #[serde(rename = "inworld-tts-1")]
    InworldTts1,
    #[serde(rename = "inworld-tts-1-max")]
    InworldTts1Max,
}

impl ModelId {
    pub const ALL: [ModelId; 2] = [ModelId::InworldTts1, ModelId::InworldTts1Max];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::InworldTts1 => "inworld-tts-1",
            ModelId::InworldTts1Max => "inworld-tts-1-max",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelId::InworldTts1 => "Inworld TTS (Fast, cost-efficient)",
            ModelId::InworldTts1Max => "Inworld TTS Max (More expressive, preview)",
        }
    }
}

impl Default for ModelId {
    fn default() -> Self {
        ModelId::InworldTts1
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = TtsError;
    fn from_str(s: &str) -> Result<Self> {
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| TtsError::InvalidConfig(format!("unknown model id: {s}")))
    }
}

impl TryFrom<String> for ModelId {
    type Error = TtsError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Timestamp alignment requested alongside the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum TimestampType {
    #[serde(rename = "TIMESTAMP_TYPE_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "WORD")]
    Word,
    #[serde(rename = "CHARACTER")]
    Character,
}

impl TimestampType {
    pub const ALL: [TimestampType; 3] = [
        TimestampType::Unspecified,
        TimestampType::Word,
        TimestampType::Character,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampType::Unspecified => "TIMESTAMP_TYPE_UNSPECIFIED",
            TimestampType::Word => "WORD",
            TimestampType::Character => "CHARACTER",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimestampType::Unspecified => "None",
            TimestampType::Word => "Word-level alignment",
            TimestampType::Character => "Character-level alignment",
        }
    }
}

impl fmt::Display for TimestampType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimestampType {
    type Err = TtsError;
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        TimestampType::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| TtsError::InvalidConfig(format!("unknown timestamp type: {s}")))
    }
}

impl TryFrom<String> for TimestampType {
    type Error = TtsError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Finalized synthesis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    pub language: String,
    pub voice_id: String,
    pub model_id: ModelId,
    pub audio_encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_type: Option<TimestampType>,
}

impl SynthesisConfig {
    /// Resolve every field through the layered lookup, then check ranges
    pub fn resolve(resolver: &ConfigResolver<'_>) -> Result<Self> {
        let cfg = Self {
            language: resolver.require(keys::LANGUAGE)?,
            voice_id: resolver.require(keys::VOICE_ID)?,
            model_id: resolver.require(keys::MODEL_ID)?,
            audio_encoding: resolver.require(keys::AUDIO_ENCODING)?,
            sample_rate_hertz: resolver.require(keys::SAMPLE_RATE_HERTZ)?,
            temperature: resolver.require(keys::TEMPERATURE)?,
            timestamp_type: resolver.get(keys::TIMESTAMP_TYPE)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range checks. Voice membership is checked against the catalog by the flow.
    pub fn validate(&self) -> Result<()> {
        if self.voice_id.trim().is_empty() {
            return Err(TtsError::ConfigMissing(keys::VOICE_ID.to_string()));
        }
        if !(MIN_SAMPLE_RATE_HERTZ..=MAX_SAMPLE_RATE_HERTZ).contains(&self.sample_rate_hertz) {
            return Err(TtsError::InvalidConfig(format!(
                "sample_rate_hertz {} outside {}..={}",
                self.sample_rate_hertz, MIN_SAMPLE_RATE_HERTZ, MAX_SAMPLE_RATE_HERTZ
            )));
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(TtsError::InvalidConfig(format!(
                "temperature {} outside {}..={}",
                self.temperature, MIN_TEMPERATURE, MAX_TEMPERATURE
            )));
        }
        Ok(())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(m)) => m,
            _ => Map::new(),
        }
    }
}

/// HTTP client settings shared by the catalog fetcher, validator and synthesis client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout for the catalog fetch and the validation probe
    pub request_timeout_ms: u64,
    /// Total timeout for a streaming synthesis call, body included
    pub stream_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: std::env::var("INWORLD_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_API_TIMEOUT_MS),
            stream_timeout_ms: std::env::var("INWORLD_STREAM_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_API_TIMEOUT_MS),
            user_agent: std::env::var("INWORLD_USER_AGENT")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("inworld-tts-core/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_parse_is_case_insensitive() {
        assert_eq!("mp3".parse::<AudioEncoding>().unwrap(), AudioEncoding::Mp3);
        assert_eq!("ogg_opus".parse::<AudioEncoding>().unwrap(), AudioEncoding::OggOpus);
        assert!("flac".parse::<AudioEncoding>().is_err());
    }

    #[test]
    fn encoding_serializes_as_wire_name() {
        let v = serde_json::to_value(AudioEncoding::Linear16).unwrap();
        assert_eq!(v, Value::String("LINEAR16".into()));
        let back: AudioEncoding = serde_json::from_value(Value::String("mulaw".into())).unwrap();
        assert_eq!(back, AudioEncoding::Mulaw);
    }

    #[test]
    fn every_encoding_has_one_content_type() {
        assert_eq!(AudioEncoding::Mp3.content_type(), "audio/mpeg");
        assert_eq!(AudioEncoding::Linear16.content_type(), "audio/wav");
        assert_eq!(AudioEncoding::OggOpus.content_type(), "audio/opus");
        assert_eq!(AudioEncoding::Alaw.content_type(), "audio/wav");
        assert_eq!(AudioEncoding::Mulaw.content_type(), "audio/wav");
    }

    #[test]
    fn credentials_debug_hides_key() {
        let creds = Credentials::new("https://api.inworld.ai/", "secret-key");
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("secret-key"));
        assert_eq!(creds.endpoint("/tts/v1/voices"), "https://api.inworld.ai/tts/v1/voices");
    }

    #[test]
    fn redact_masks_key_fields() {
        let mut m = Map::new();
        m.insert("api_key".into(), Value::String("K".into()));
        m.insert("api_url".into(), Value::String("u".into()));
        let r = redact(&m);
        assert_eq!(r["api_key"], "***");
        assert_eq!(r["api_url"], "u");
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let mut cfg = SynthesisConfig {
            language: "en".into(),
            voice_id: "v1".into(),
            model_id: ModelId::InworldTts1,
            audio_encoding: AudioEncoding::Mp3,
            sample_rate_hertz: 48_000,
            temperature: 0.8,
            timestamp_type: None,
        };
        assert!(cfg.validate().is_ok());
        cfg.sample_rate_hertz = 7_999;
        assert!(matches!(cfg.validate(), Err(TtsError::InvalidConfig(_))));
        cfg.sample_rate_hertz = 8_000;
        cfg.temperature = 2.5;
        assert!(matches!(cfg.validate(), Err(TtsError::InvalidConfig(_))));
    }
}
