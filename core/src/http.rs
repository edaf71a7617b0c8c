//! HTTP plumbing shared by the catalog fetcher, validator and synthesis client
//!
//! Provides:
//! - endpoint paths and `reqwest::Client` construction with bounded timeouts
//! - status / transport error classification per surface
//! - `VoiceApi`, the seam the setup flow talks to, and its reqwest-backed `HttpVoiceApi`
//!
//! The pooled client carries no credentials; the `Authorization` header is
//! attached per request so one pool never leaks a key across sessions.

use crate::catalog::{fetch_catalog, VoiceCatalog};
use crate::config::{ClientConfig, Credentials, SynthesisConfig};
use crate::{Result, TtsError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

pub(crate) const VOICES_PATH: &str = "tts/v1/voices";
/// Used for both the validation probe and runtime synthesis
pub(crate) const SYNTHESIZE_PATH: &str = "tts/v1/voice:stream";

pub(crate) fn build_client(cfg: &ClientConfig, timeout_ms: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent(&cfg.user_agent)
        .build()
        .map_err(|e| TtsError::ConnectError(format!("Failed to build HTTP client: {e}")))
}

pub(crate) fn connect_error(e: reqwest::Error) -> TtsError {
    if e.is_timeout() {
        TtsError::ConnectError(format!("request timed out: {e}"))
    } else {
        TtsError::ConnectError(e.to_string())
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> TtsError {
    if e.is_timeout() {
        TtsError::TransportError(format!("request timed out: {e}"))
    } else {
        TtsError::TransportError(e.to_string())
    }
}

/// Setup surface (catalog, probe): 401 -> AuthError, other non-2xx -> ConnectError
pub(crate) async fn check_setup_status(resp: Response, target: &'static str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(target: "inworld_http", surface = target, %status, body = %body, "Inworld API returned error");
    if status == StatusCode::UNAUTHORIZED {
        Err(TtsError::AuthError)
    } else {
        Err(TtsError::ConnectError(format!("HTTP {status}")))
    }
}

/// Synthesis surface: 401 -> AuthError, 429 -> RateLimitError, other non-2xx -> TransportError
pub(crate) async fn check_synthesis_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(target: "inworld_synthesis", %status, body = %body, "HTTP error from Inworld API");
    match status {
        StatusCode::UNAUTHORIZED => Err(TtsError::AuthError),
        StatusCode::TOO_MANY_REQUESTS => Err(TtsError::RateLimitError),
        _ => Err(TtsError::TransportError(format!("HTTP {status}: {body}"))),
    }
}

/// Remote operations needed by the setup/options flow
#[async_trait]
pub trait VoiceApi: Send + Sync {
    /// List voices grouped by language
    async fn fetch_catalog(&self, credentials: &Credentials) -> Result<VoiceCatalog>;

    /// Probe synthesis with candidate settings; Ok on any 2xx
    async fn validate(&self, credentials: &Credentials, config: &SynthesisConfig) -> Result<()>;
}

/// `VoiceApi` over HTTP
#[derive(Clone)]
pub struct HttpVoiceApi {
    http: Client,
}

impl HttpVoiceApi {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(cfg, cfg.request_timeout_ms)?,
        })
    }
}

#[async_trait]
impl VoiceApi for HttpVoiceApi {
    async fn fetch_catalog(&self, credentials: &Credentials) -> Result<VoiceCatalog> {
        fetch_catalog(&self.http, credentials).await
    }

    async fn validate(&self, credentials: &Credentials, config: &SynthesisConfig) -> Result<()> {
        crate::validator::validate(&self.http, credentials, config).await
    }
}
