//! Field-level checks on raw form submissions.
//!
//! Submissions arrive as JSON maps from the host. Each known field is checked
//! and normalized (enum names canonicalized, numbers parsed, ranges enforced);
//! unknown keys are ignored. Problems are reported per field and never cost a
//! network call.

use crate::config::{
    keys, AudioEncoding, Credentials, ModelId, TimestampType, DEFAULT_API_BASE_URL,
    MAX_SAMPLE_RATE_HERTZ, MAX_TEMPERATURE, MIN_SAMPLE_RATE_HERTZ, MIN_TEMPERATURE,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

pub(crate) type FieldErrors = BTreeMap<String, String>;

pub(crate) const REQUIRED: &str = "required";
pub(crate) const INVALID_CHOICE: &str = "invalid_choice";
pub(crate) const INVALID_NUMBER: &str = "invalid_number";
pub(crate) const OUT_OF_RANGE: &str = "out_of_range";

fn non_empty_str<'a>(input: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// `{api_url, api_key}` -> credentials, or per-field errors
pub(crate) fn parse_credentials(input: &Map<String, Value>) -> Result<Credentials, FieldErrors> {
    let mut errors = FieldErrors::new();
    let api_url = non_empty_str(input, keys::API_URL).unwrap_or(DEFAULT_API_BASE_URL);
    if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
        errors.insert(keys::API_URL.into(), "invalid_url".into());
    }
    let api_key = non_empty_str(input, keys::API_KEY);
    if api_key.is_none() {
        errors.insert(keys::API_KEY.into(), REQUIRED.into());
    }
    match api_key {
        Some(key) if errors.is_empty() => Ok(Credentials::new(api_url, key)),
        _ => Err(errors),
    }
}

fn parse_choice<T: FromStr>(value: &Value) -> Option<T> {
    value.as_str().and_then(|s| s.parse::<T>().ok())
}

fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn parse_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Normalize a voice-selection submission.
///
/// Returns the valid fields in canonical form plus errors for the rest.
/// Empty strings and nulls count as "not submitted".
pub(crate) fn normalize_voice_selection(input: &Map<String, Value>) -> (Map<String, Value>, FieldErrors) {
    let mut out = Map::new();
    let mut errors = FieldErrors::new();

    for (key, value) in input {
        if value.is_null() || value.as_str().is_some_and(|s| s.trim().is_empty()) {
            continue;
        }
        let key = key.as_str();
        let normalized = match key {
            keys::LANGUAGE | keys::VOICE_ID => value
                .as_str()
                .map(|s| Value::String(s.trim().to_string()))
                .ok_or(INVALID_CHOICE),
            keys::MODEL_ID => parse_choice::<ModelId>(value)
                .map(|m| Value::String(m.as_str().into()))
                .ok_or(INVALID_CHOICE),
            keys::AUDIO_ENCODING => parse_choice::<AudioEncoding>(value)
                .map(|e| Value::String(e.as_str().into()))
                .ok_or(INVALID_CHOICE),
            keys::TIMESTAMP_TYPE => parse_choice::<TimestampType>(value)
                .map(|t| Value::String(t.as_str().into()))
                .ok_or(INVALID_CHOICE),
            keys::SAMPLE_RATE_HERTZ => match parse_u64(value) {
                None => Err(INVALID_NUMBER),
                Some(n)
                    if n < MIN_SAMPLE_RATE_HERTZ as u64 || n > MAX_SAMPLE_RATE_HERTZ as u64 =>
                {
                    Err(OUT_OF_RANGE)
                }
                Some(n) => Ok(Value::from(n)),
            },
            keys::TEMPERATURE => match parse_f64(value) {
                None => Err(INVALID_NUMBER),
                Some(t) if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&t) => Err(OUT_OF_RANGE),
                Some(t) => Ok(Value::from(t)),
            },
            _ => continue,
        };
        match normalized {
            Ok(v) => {
                out.insert(key.to_string(), v);
            }
            Err(code) => {
                errors.insert(key.to_string(), code.to_string());
            }
        }
    }
    (out, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn credentials_require_key() {
        let errs = parse_credentials(&map(json!({"api_url": "https://x/"}))).unwrap_err();
        assert_eq!(errs.get("api_key").map(String::as_str), Some(REQUIRED));

        let creds = parse_credentials(&map(json!({"api_key": " K "}))).unwrap();
        assert_eq!(creds.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(creds.api_key, "K");
    }

    #[test]
    fn credentials_reject_non_http_url() {
        let errs = parse_credentials(&map(json!({"api_url": "ftp://x", "api_key": "K"}))).unwrap_err();
        assert!(errs.contains_key("api_url"));
    }

    #[test]
    fn normalizes_choices_and_numbers() {
        let (out, errors) = normalize_voice_selection(&map(json!({
            "language": "en",
            "voice_id": "v1",
            "model_id": "inworld-tts-1-max",
            "audio_encoding": "mp3",
            "sample_rate_hertz": "16000",
            "temperature": 1,
            "timestamp_type": "word",
            "unrelated": true
        })));
        assert!(errors.is_empty());
        assert_eq!(out["audio_encoding"], "MP3");
        assert_eq!(out["sample_rate_hertz"], 16000);
        assert_eq!(out["temperature"], 1.0);
        assert_eq!(out["timestamp_type"], "WORD");
        assert!(!out.contains_key("unrelated"));
    }

    #[test]
    fn reports_field_errors() {
        let (out, errors) = normalize_voice_selection(&map(json!({
            "model_id": "gpt",
            "sample_rate_hertz": 96000,
            "temperature": "warm",
            "voice_id": ""
        })));
        assert!(out.is_empty());
        assert_eq!(errors["model_id"], INVALID_CHOICE);
        assert_eq!(errors["sample_rate_hertz"], OUT_OF_RANGE);
        assert_eq!(errors["temperature"], INVALID_NUMBER);
        assert!(!errors.contains_key("voice_id"));
    }
}
