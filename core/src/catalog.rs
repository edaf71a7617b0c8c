//! Voice Catalog
//!
//! Fetches the voice list from `GET {base_url}/tts/v1/voices` and inverts it
//! into a language -> voices index used by the setup flow selectors.
//! The catalog is built per flow session and never persisted.

use crate::config::Credentials;
use crate::http::{check_setup_status, connect_error, VOICES_PATH};
use crate::{Result, TtsError};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One selectable voice. Serialized as a `{value, label}` select option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    #[serde(rename = "value")]
    pub id: String,
    pub label: String,
}

/// Language code -> ordered voices. Keys iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceCatalog {
    by_language: BTreeMap<String, Vec<Voice>>,
}

/// Voices response from the Inworld API
#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoiceRecord {
    #[serde(default)]
    voice_id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    languages: Vec<String>,
}

impl VoiceCatalog {
    /// Build the index from raw voice records.
    ///
    /// Records without a voice id are skipped. A voice listed twice for the
    /// same language is kept once, at its first position.
    fn from_records(records: Vec<VoiceRecord>) -> Self {
        let mut by_language: BTreeMap<String, Vec<Voice>> = BTreeMap::new();
        for record in records {
            let id = match record.voice_id.filter(|id| !id.trim().is_empty()) {
                Some(id) => id,
                None => continue,
            };
            let label = record
                .display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| id.clone());
            for language in record.languages {
                if language.trim().is_empty() {
                    continue;
                }
                let voices = by_language.entry(language).or_default();
                if !voices.iter().any(|v| v.id == id) {
                    voices.push(Voice {
                        id: id.clone(),
                        label: label.clone(),
                    });
                }
            }
        }
        Self { by_language }
    }

    /// Parse a voices response body (`{"voices": [...]}`)
    pub fn from_response_json(body: &[u8]) -> Result<Self> {
        let resp: VoicesResponse = serde_json::from_slice(body)
            .map_err(|e| TtsError::ProtocolError(format!("Failed to parse voices response: {e}")))?;
        Ok(Self::from_records(resp.voices))
    }

    /// Build a catalog from an already-indexed map, dropping empty languages
    pub fn from_index(index: BTreeMap<String, Vec<Voice>>) -> Self {
        Self {
            by_language: index.into_iter().filter(|(_, v)| !v.is_empty()).collect(),
        }
    }

    /// Sorted language codes
    pub fn languages(&self) -> Vec<&str> {
        self.by_language.keys().map(String::as_str).collect()
    }

    pub fn first_language(&self) -> Option<&str> {
        self.by_language.keys().next().map(String::as_str)
    }

    pub fn voices(&self, language: &str) -> &[Voice] {
        self.by_language
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_language(&self, language: &str) -> bool {
        self.by_language.contains_key(language)
    }

    pub fn contains_voice(&self, language: &str, voice_id: &str) -> bool {
        self.voices(language).iter().any(|v| v.id == voice_id)
    }

    pub fn is_empty(&self) -> bool {
        self.by_language.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_language.len()
    }

    /// Compact `lang: id, id, ...` listing used as a form description placeholder
    pub fn summary(&self) -> String {
        self.by_language
            .iter()
            .map(|(lang, voices)| {
                let ids: Vec<&str> = voices.iter().map(|v| v.id.as_str()).collect();
                format!("{lang}: {}", ids.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Fetch the voice catalog.
///
/// - 401 -> `AuthError`
/// - any other non-2xx, network fault or timeout -> `ConnectError`
/// - unparseable body -> `ProtocolError`
pub async fn fetch_catalog(http: &reqwest::Client, credentials: &Credentials) -> Result<VoiceCatalog> {
    let url = credentials.endpoint(VOICES_PATH);
    debug!(target: "inworld_catalog", url = %url, "Fetching voices from Inworld API");

    let resp = http
        .get(&url)
        .header(reqwest::header::AUTHORIZATION, credentials.authorization())
        .header(CONTENT_TYPE, "application/json")
        .send()
        .await
        .map_err(|e| {
            warn!(target: "inworld_catalog", error = %e, "Voices request failed");
            connect_error(e)
        })?;

    let resp = check_setup_status(resp, "inworld_catalog").await?;
    let body = resp.bytes().await.map_err(connect_error)?;
    let catalog = VoiceCatalog::from_response_json(&body)?;

    debug!(
        target: "inworld_catalog",
        languages = catalog.len(),
        codes = ?catalog.languages(),
        "Organized voices by language"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverts_voices_into_languages() {
        let body = br#"{"voices":[
            {"voiceId":"alex","displayName":"Alex","languages":["en","de"]},
            {"voiceId":"hana","languages":["ja"]},
            {"displayName":"No Id","languages":["en"]},
            {"voiceId":"mute","languages":[]}
        ]}"#;
        let catalog = VoiceCatalog::from_response_json(body).unwrap();
        assert_eq!(catalog.languages(), vec!["de", "en", "ja"]);
        assert_eq!(catalog.voices("en").len(), 1);
        assert_eq!(catalog.voices("ja")[0].label, "hana");
        assert!(catalog.contains_voice("de", "alex"));
        assert!(!catalog.contains_voice("ja", "alex"));
    }

    #[test]
    fn duplicate_voice_kept_once_per_language() {
        let body = br#"{"voices":[
            {"voiceId":"alex","displayName":"Alex","languages":["en","en"]},
            {"voiceId":"alex","displayName":"Alex again","languages":["en"]}
        ]}"#;
        let catalog = VoiceCatalog::from_response_json(body).unwrap();
        assert_eq!(catalog.voices("en").len(), 1);
        assert_eq!(catalog.voices("en")[0].label, "Alex");
    }

    #[test]
    fn empty_display_name_falls_back_to_id() {
        let body = br#"{"voices":[{"voiceId":"v1","displayName":"","languages":["en"]}]}"#;
        let catalog = VoiceCatalog::from_response_json(body).unwrap();
        assert_eq!(catalog.voices("en")[0].label, "v1");
    }

    #[test]
    fn missing_voices_key_is_empty_catalog() {
        let catalog = VoiceCatalog::from_response_json(b"{}").unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.first_language().is_none());
    }

    #[test]
    fn malformed_body_is_protocol_error() {
        assert!(matches!(
            VoiceCatalog::from_response_json(b"<html>"),
            Err(TtsError::ProtocolError(_))
        ));
    }
}
