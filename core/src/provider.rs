//! Host-facing speech provider
//!
//! Binds one persisted entry to a `SynthesisClient`. The entry is resolved
//! once (options over data over defaults); each call may override the voice.
//!
//! Supported per-call options:
//! - voice: string (voice id, replaces the configured one for this call)

use crate::config::{ClientConfig, SynthesisConfig};
use crate::store::ConfigEntry;
use crate::synthesis::{AudioResult, RequestOptions, SynthesisClient};
use crate::{Result, TtsError, DOMAIN, TITLE};
use tracing::{debug, error};

pub struct InworldTtsProvider {
    unique_id: String,
    config: SynthesisConfig,
    client: SynthesisClient,
}

impl InworldTtsProvider {
    pub fn from_entry(entry: &ConfigEntry, cfg: &ClientConfig) -> Result<Self> {
        debug!(target: "inworld_synthesis", entry = ?entry, "Setting up provider from config entry");
        let credentials = entry.credentials()?;
        let config = entry.synthesis_config()?;
        Ok(Self {
            unique_id: format!("{DOMAIN}_{}", entry.entry_id),
            config,
            client: SynthesisClient::new(credentials, cfg)?,
        })
    }

    pub fn name(&self) -> &'static str {
        TITLE
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn supported_languages(&self) -> Vec<String> {
        vec![self.config.language.clone()]
    }

    pub fn default_language(&self) -> &str {
        &self.config.language
    }

    pub fn supported_options(&self) -> &'static [&'static str] {
        &["voice"]
    }

    /// Synthesize `message` in `language` (must be the configured language)
    pub async fn get_tts_audio(
        &self,
        message: &str,
        language: &str,
        options: &RequestOptions,
    ) -> Result<AudioResult> {
        if language != self.config.language {
            return Err(TtsError::UnsupportedLanguage(language.to_string()));
        }
        self.client
            .synthesize(&self.config, message, options)
            .await
            .inspect_err(|e| error!(target: "inworld_synthesis", error = %e, "Inworld TTS request failed"))
    }
}
