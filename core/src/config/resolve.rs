//! Layered configuration lookup.
//!
//! Fields are resolved lazily, one at a time, by walking an ordered list of
//! layers (highest priority first) and finally the compiled defaults:
//!
//!   session overrides > persisted options > persisted data > compiled default
//!
//! A `null` value in a layer counts as absent. Only when no layer and no
//! default carries a key does lookup fail with `ConfigMissing`.

use super::{keys, DEFAULT_API_BASE_URL, DEFAULT_SAMPLE_RATE_HERTZ, DEFAULT_TEMPERATURE};
use super::{AudioEncoding, ModelId};
use crate::{Result, TtsError};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    SessionOverrides,
    Options,
    Data,
    Defaults,
}

/// Compiled-in default for a key, if it has one
pub fn compiled_default(key: &str) -> Option<Value> {
    match key {
        keys::API_URL => Some(Value::String(DEFAULT_API_BASE_URL.to_string())),
        keys::MODEL_ID => Some(Value::String(ModelId::default().as_str().to_string())),
        keys::AUDIO_ENCODING => Some(Value::String(
            AudioEncoding::default().as_str().to_string(),
        )),
        keys::SAMPLE_RATE_HERTZ => Some(Value::from(DEFAULT_SAMPLE_RATE_HERTZ)),
        keys::TEMPERATURE => Some(Value::from(DEFAULT_TEMPERATURE)),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigResolver<'a> {
    layers: Vec<(LayerKind, &'a Map<String, Value>)>,
}

impl<'a> ConfigResolver<'a> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer below the ones already added
    pub fn layer(mut self, kind: LayerKind, values: &'a Map<String, Value>) -> Self {
        self.layers.push((kind, values));
        self
    }

    /// First non-null value for `key`, with the layer it came from
    pub fn lookup(&self, key: &str) -> Option<(LayerKind, Value)> {
        self.layers
            .iter()
            .find_map(|(kind, values)| match values.get(key) {
                Some(Value::Null) | None => None,
                Some(v) => Some((*kind, v.clone())),
            })
            .or_else(|| compiled_default(key).map(|v| (LayerKind::Defaults, v)))
    }

    /// Typed lookup; `Ok(None)` when no layer and no default has the key
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.lookup(key) {
            None => Ok(None),
            Some((kind, v)) => serde_json::from_value(v).map(Some).map_err(|e| {
                TtsError::InvalidConfig(format!("{key} (from {kind:?}): {e}"))
            }),
        }
    }

    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get(key)?
            .ok_or_else(|| TtsError::ConfigMissing(key.to_string()))
    }
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
    fn higher_layer_wins() {
        let session = map(json!({"voice_id": "s"}));
        let options = map(json!({"voice_id": "o", "language": "de"}));
        let data = map(json!({"voice_id": "d", "language": "en", "api_key": "K"}));
        let r = ConfigResolver::new()
            .layer(LayerKind::SessionOverrides, &session)
            .layer(LayerKind::Options, &options)
            .layer(LayerKind::Data, &data);

        assert_eq!(r.require::<String>("voice_id").unwrap(), "s");
        assert_eq!(r.require::<String>("language").unwrap(), "de");
        assert_eq!(r.lookup("api_key").unwrap().0, LayerKind::Data);
    }

    #[test]
    fn null_is_treated_as_absent() {
        let options = map(json!({"temperature": null}));
        let data = map(json!({"temperature": 1.5}));
        let r = ConfigResolver::new()
            .layer(LayerKind::Options, &options)
            .layer(LayerKind::Data, &data);
        assert_eq!(r.require::<f64>("temperature").unwrap(), 1.5);
    }

    #[test]
    fn falls_back_to_compiled_default() {
        let r = ConfigResolver::new();
        assert_eq!(r.require::<u32>("sample_rate_hertz").unwrap(), 48_000);
        assert_eq!(r.require::<ModelId>("model_id").unwrap(), ModelId::InworldTts1);
        assert_eq!(r.lookup("api_url").unwrap().0, LayerKind::Defaults);
    }

    #[test]
    fn missing_without_default_is_config_missing() {
        let r = ConfigResolver::new();
        assert!(matches!(
            r.require::<String>("voice_id"),
            Err(TtsError::ConfigMissing(k)) if k == "voice_id"
        ));
        assert!(r.get::<String>("timestamp_type").unwrap().is_none());
    }

    #[test]
    fn wrong_type_is_invalid_config() {
        let data = map(json!({"sample_rate_hertz": "fast"}));
        let r = ConfigResolver::new().layer(LayerKind::Data, &data);
        assert!(matches!(
            r.require::<u32>("sample_rate_hertz"),
            Err(TtsError::InvalidConfig(_))
        ));
    }
}
