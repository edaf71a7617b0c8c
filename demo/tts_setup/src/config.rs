use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use inworld_tts_core::ClientConfig;

const DEFAULT_STORE_PATH: &str = "tts_setup_entries.json";

/// Settings for the terminal driver
#[derive(Clone)]
pub struct TtsSetupConfig {
    /// Prefilled into the credentials step
    pub api_url: Option<String>,
    /// Used when the credentials prompt is left empty
    pub api_key: Option<String>,
    pub store_path: PathBuf,
    pub client: ClientConfig,
}

impl fmt::Debug for TtsSetupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsSetupConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("store_path", &self.store_path)
            .field("client", &self.client)
            .finish()
    }
}

impl Default for TtsSetupConfig {
    fn default() -> Self {
        Self {
            api_url: std::env::var("INWORLD_API_URL").ok().filter(|s| !s.is_empty()),
            api_key: std::env::var("INWORLD_API_KEY").ok().filter(|s| !s.is_empty()),
            store_path: std::env::var("INWORLD_STORE_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
            client: ClientConfig::default(),
        }
    }
}

impl TtsSetupConfig {
    /// Load configuration from a TOML file (path via TTS_SETUP_CONFIG or ./tts_setup.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let path = std::env::var("TTS_SETUP_CONFIG").unwrap_or_else(|_| "tts_setup.toml".into());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Self {
        let default = Self::default();
        if !path.exists() {
            tracing::info!(target: "tts_setup", path = %path.display(), "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<TtsSetupToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target: "tts_setup", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "tts_setup", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct TtsSetupToml {
    inworld: Option<InworldToml>,
    store: Option<StoreToml>,
    client: Option<ClientToml>,
}

impl TtsSetupToml {
    fn overlay(self, mut base: TtsSetupConfig) -> TtsSetupConfig {
        if let Some(i) = self.inworld {
            i.apply(&mut base);
        }
        if let Some(s) = self.store {
            if let Some(p) = s.path {
                base.store_path = p;
            }
        }
        if let Some(c) = self.client {
            c.apply(&mut base.client);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct InworldToml {
    api_url: Option<String>,
    api_key: Option<String>,
}

impl InworldToml {
    fn apply(self, base: &mut TtsSetupConfig) {
        if let Some(v) = self.api_url.filter(|s| !s.is_empty()) {
            base.api_url = Some(v);
        }
        if let Some(v) = self.api_key.filter(|s| !s.is_empty()) {
            base.api_key = Some(v);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct StoreToml {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ClientToml {
    request_timeout_ms: Option<u64>,
    stream_timeout_ms: Option<u64>,
    user_agent: Option<String>,
}

impl ClientToml {
    fn apply(self, base: &mut ClientConfig) {
        if let Some(v) = self.request_timeout_ms {
            base.request_timeout_ms = v;
        }
        if let Some(v) = self.stream_timeout_ms {
            base.stream_timeout_ms = v;
        }
        if let Some(v) = self.user_agent {
            base.user_agent = v;
        }
    }
}
