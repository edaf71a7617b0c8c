//! Configuration Validator
//!
//! Confirms a candidate configuration by issuing one real synthesis call with
//! a short probe text. The catalog alone cannot tell whether the backend
//! accepts a voice/model/encoding combination, so the probe is authoritative.
//! Only the response status matters; the audio is never read.

use crate::config::{Credentials, SynthesisConfig};
use crate::http::{check_setup_status, connect_error, SYNTHESIZE_PATH};
use crate::synthesis::SynthesisRequest;
use crate::Result;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

pub const PROBE_TEXT: &str = "Test";

/// The request body sent by the probe
pub fn probe_request(config: &SynthesisConfig) -> SynthesisRequest<'_> {
    SynthesisRequest::from_config(config, PROBE_TEXT, None)
}

/// Validate credentials + synthesis settings against the live API.
///
/// 401 -> `AuthError`; any other failure (status, network, timeout) -> `ConnectError`.
pub async fn validate(
    http: &reqwest::Client,
    credentials: &Credentials,
    config: &SynthesisConfig,
) -> Result<()> {
    let url = credentials.endpoint(SYNTHESIZE_PATH);
    let body = probe_request(config);
    debug!(
        target: "inworld_flow",
        url = %url,
        voice_id = %config.voice_id,
        model_id = %config.model_id,
        "Making probe TTS request"
    );

    let resp = http
        .post(&url)
        .header(AUTHORIZATION, credentials.authorization())
        .header(CONTENT_TYPE, "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            warn!(target: "inworld_flow", error = %e, "Probe request failed");
            connect_error(e)
        })?;

    // Dropping the response aborts the body; the audio is not needed
    check_setup_status(resp, "inworld_flow").await?;
    debug!(target: "inworld_flow", "Voice validation successful");
    Ok(())
}
