//! Streaming Synthesis Client
//!
//! `POST {base_url}/tts/v1/voice:stream` with the configured voice, model and
//! audio parameters, consuming the NDJSON body chunk by chunk as it arrives.
//!
//! Failure mapping:
//! - 401 -> `AuthError`, 429 -> `RateLimitError`
//! - other non-2xx, network faults, total timeout -> `TransportError`
//! - `error` line or undecodable audio chunk -> `ProtocolError` (no partial audio is returned)

mod stream;

pub use stream::StreamDecoder;

use crate::config::{AudioEncoding, ClientConfig, Credentials, ModelId, SynthesisConfig, TimestampType};
use crate::http::{build_client, check_synthesis_status, transport_error, SYNTHESIZE_PATH};
use crate::{Result, TtsError};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Audio returned by one synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioResult {
    pub content_type: &'static str,
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Per-call options supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Voice id overriding the configured one for this call only
    #[serde(default)]
    pub voice: Option<String>,
}

impl RequestOptions {
    pub fn with_voice(voice: impl Into<String>) -> Self {
        Self {
            voice: Some(voice.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub audio_encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
}

/// Wire body shared by the validation probe and runtime synthesis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub voice_id: &'a str,
    pub model_id: ModelId,
    pub temperature: f64,
    pub audio_config: AudioConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_type: Option<TimestampType>,
}

impl<'a> SynthesisRequest<'a> {
    pub fn from_config(config: &'a SynthesisConfig, text: &'a str, voice_override: Option<&'a str>) -> Self {
        Self {
            text,
            voice_id: voice_override
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(&config.voice_id),
            model_id: config.model_id,
            temperature: config.temperature,
            audio_config: AudioConfig {
                audio_encoding: config.audio_encoding,
                sample_rate_hertz: config.sample_rate_hertz,
            },
            timestamp_type: config.timestamp_type,
        }
    }
}

/// First 50 characters of a message, for logs
fn preview(message: &str) -> String {
    match message.char_indices().nth(50) {
        Some((idx, _)) => format!("{}...", &message[..idx]),
        None => message.to_string(),
    }
}

#[derive(Clone)]
pub struct SynthesisClient {
    http: reqwest::Client,
    credentials: Credentials,
    total_timeout: Duration,
}

impl SynthesisClient {
    pub fn new(credentials: Credentials, cfg: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(cfg, cfg.stream_timeout_ms)?,
            credentials,
            total_timeout: Duration::from_millis(cfg.stream_timeout_ms),
        })
    }

    /// Synthesize `text` and return the reassembled audio.
    ///
    /// The whole exchange, body included, runs under one total timeout so a
    /// server trickling chunks cannot stall the caller. Dropping the returned
    /// future cancels the in-flight request.
    pub async fn synthesize(
        &self,
        config: &SynthesisConfig,
        text: &str,
        options: &RequestOptions,
    ) -> Result<AudioResult> {
        match tokio::time::timeout(self.total_timeout, self.stream(config, text, options)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(target: "inworld_synthesis", timeout_ms = self.total_timeout.as_millis() as u64, "Synthesis timed out");
                Err(TtsError::TransportError(format!(
                    "synthesis timed out after {} ms",
                    self.total_timeout.as_millis()
                )))
            }
        }
    }

    async fn stream(
        &self,
        config: &SynthesisConfig,
        text: &str,
        options: &RequestOptions,
    ) -> Result<AudioResult> {
        let url = self.credentials.endpoint(SYNTHESIZE_PATH);
        let body = SynthesisRequest::from_config(config, text, options.voice.as_deref());
        debug!(
            target: "inworld_synthesis",
            message = %preview(text),
            voice_id = %body.voice_id,
            model_id = %body.model_id,
            encoding = %config.audio_encoding,
            sample_rate_hertz = config.sample_rate_hertz,
            "Getting TTS audio"
        );

        let mut resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.credentials.authorization())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "inworld_synthesis", error = %e, "Request error to Inworld API");
                transport_error(e)
            })?;
        resp = check_synthesis_status(resp).await?;

        let mut decoder = StreamDecoder::new();
        while let Some(chunk) = resp.chunk().await.map_err(transport_error)? {
            decoder.push(&chunk)?;
        }
        let bytes = decoder.finish()?;

        info!(target: "inworld_synthesis", bytes = bytes.len(), "Received TTS audio");
        Ok(AudioResult {
            content_type: config.audio_encoding.content_type(),
            extension: config.audio_encoding.extension(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> SynthesisConfig {
        SynthesisConfig {
            language: "en".into(),
            voice_id: "v1".into(),
            model_id: ModelId::InworldTts1,
            audio_encoding: AudioEncoding::Mp3,
            sample_rate_hertz: 48_000,
            temperature: 0.8,
            timestamp_type: None,
        }
    }

    #[test]
    fn request_body_matches_wire_shape() {
        let cfg = config();
        let body = serde_json::to_value(SynthesisRequest::from_config(&cfg, "hi", None)).unwrap();
        assert_eq!(
            body,
            json!({
                "text": "hi",
                "voiceId": "v1",
                "modelId": "inworld-tts-1",
                "temperature": 0.8,
                "audioConfig": {"audioEncoding": "MP3", "sampleRateHertz": 48000}
            })
        );
    }

    #[test]
    fn voice_override_replaces_only_voice() {
        let mut cfg = config();
        cfg.timestamp_type = Some(TimestampType::Word);
        let req = SynthesisRequest::from_config(&cfg, "hi", Some("v2"));
        assert_eq!(req.voice_id, "v2");
        assert_eq!(req.model_id, cfg.model_id);
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["timestampType"], "WORD");

        let blank = SynthesisRequest::from_config(&cfg, "hi", Some("  "));
        assert_eq!(blank.voice_id, "v1");
    }

    #[test]
    fn preview_truncates_long_messages() {
        let long = "é".repeat(60);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 53);
        assert_eq!(preview("short"), "short");
    }
}
