//! Form descriptions returned to the host for rendering.
//!
//! The host owns presentation; a `Form` only states which fields exist, their
//! choices, ranges and defaults, and the error codes to display.

use crate::catalog::VoiceCatalog;
use crate::config::{
    keys, AudioEncoding, ConfigResolver, ModelId, TimestampType, DEFAULT_API_BASE_URL,
    MAX_SAMPLE_RATE_HERTZ, MAX_TEMPERATURE, MIN_SAMPLE_RATE_HERTZ, MIN_TEMPERATURE,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Key under which a step-wide error code is reported
pub const BASE_ERROR: &str = "base";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Credentials,
    VoiceSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Secret,
    Select { options: Vec<SelectOption> },
    Integer { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
    pub step_id: StepId,
    pub fields: Vec<FormField>,
    pub errors: BTreeMap<String, String>,
    pub description_placeholders: BTreeMap<String, String>,
}

impl Form {
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn default_of(&self, name: &str) -> Option<&Value> {
        self.field(name).and_then(|f| f.default.as_ref())
    }

    /// Choice values of a select field; empty for non-select fields
    pub fn choices(&self, name: &str) -> Vec<&str> {
        match self.field(name).map(|f| &f.kind) {
            Some(FieldKind::Select { options }) => options.iter().map(|o| o.value.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn base_error(&self) -> Option<&str> {
        self.errors.get(BASE_ERROR).map(String::as_str)
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

/// `{api_url, api_key}` step. The key is never echoed back as a default.
pub(crate) fn credentials_form(api_url: Option<&str>, errors: BTreeMap<String, String>) -> Form {
    Form {
        step_id: StepId::Credentials,
        fields: vec![
            FormField {
                name: keys::API_URL,
                required: true,
                default: Some(Value::String(
                    api_url.unwrap_or(DEFAULT_API_BASE_URL).to_string(),
                )),
                kind: FieldKind::Text,
            },
            FormField {
                name: keys::API_KEY,
                required: true,
                default: None,
                kind: FieldKind::Secret,
            },
        ],
        errors,
        description_placeholders: BTreeMap::new(),
    }
}

/// Voice/language + audio options step.
///
/// `language` must already be the effective selection. With an empty catalog
/// both language and voice degrade to free text.
pub(crate) fn voice_selection_form(
    catalog: &VoiceCatalog,
    language: Option<&str>,
    defaults: &ConfigResolver<'_>,
    errors: BTreeMap<String, String>,
) -> Form {
    let default = |key: &str| defaults.lookup(key).map(|(_, v)| v);
    let mut fields = Vec::with_capacity(7);

    if catalog.is_empty() {
        fields.push(FormField {
            name: keys::LANGUAGE,
            required: true,
            default: language.map(|l| Value::String(l.to_string())),
            kind: FieldKind::Text,
        });
    } else {
        fields.push(FormField {
            name: keys::LANGUAGE,
            required: true,
            default: language.map(|l| Value::String(l.to_string())),
            kind: FieldKind::Select {
                options: catalog
                    .languages()
                    .into_iter()
                    .map(|l| SelectOption::new(l, l.to_uppercase()))
                    .collect(),
            },
        });
    }

    let voices = language.map(|l| catalog.voices(l)).unwrap_or(&[]);
    let current_voice = default(keys::VOICE_ID);
    if voices.is_empty() {
        fields.push(FormField {
            name: keys::VOICE_ID,
            required: false,
            default: Some(current_voice.unwrap_or_else(|| Value::String(String::new()))),
            kind: FieldKind::Text,
        });
    } else {
        // Keep the current voice when it belongs to this language, else the first one
        let default_voice = current_voice
            .as_ref()
            .and_then(Value::as_str)
            .filter(|id| voices.iter().any(|v| v.id == *id))
            .unwrap_or(voices[0].id.as_str())
            .to_string();
        fields.push(FormField {
            name: keys::VOICE_ID,
            required: true,
            default: Some(Value::String(default_voice)),
            kind: FieldKind::Select {
                options: voices
                    .iter()
                    .map(|v| SelectOption::new(&v.id, &v.label))
                    .collect(),
            },
        });
    }

    fields.push(FormField {
        name: keys::MODEL_ID,
        required: false,
        default: default(keys::MODEL_ID),
        kind: FieldKind::Select {
            options: ModelId::ALL
                .iter()
                .map(|m| SelectOption::new(m.as_str(), m.label()))
                .collect(),
        },
    });
    fields.push(FormField {
        name: keys::AUDIO_ENCODING,
        required: false,
        default: default(keys::AUDIO_ENCODING),
        kind: FieldKind::Select {
            options: AudioEncoding::ALL
                .iter()
                .map(|e| SelectOption::new(e.as_str(), e.description()))
                .collect(),
        },
    });
    fields.push(FormField {
        name: keys::SAMPLE_RATE_HERTZ,
        required: false,
        default: default(keys::SAMPLE_RATE_HERTZ),
        kind: FieldKind::Integer {
            min: MIN_SAMPLE_RATE_HERTZ as i64,
            max: MAX_SAMPLE_RATE_HERTZ as i64,
        },
    });
    fields.push(FormField {
        name: keys::TEMPERATURE,
        required: false,
        default: default(keys::TEMPERATURE),
        kind: FieldKind::Float {
            min: MIN_TEMPERATURE,
            max: MAX_TEMPERATURE,
        },
    });
    fields.push(FormField {
        name: keys::TIMESTAMP_TYPE,
        required: false,
        default: default(keys::TIMESTAMP_TYPE),
        kind: FieldKind::Select {
            options: TimestampType::ALL
                .iter()
                .map(|t| SelectOption::new(t.as_str(), t.label()))
                .collect(),
        },
    });

    let mut placeholders = BTreeMap::new();
    placeholders.insert("voices_data".to_string(), catalog.summary());
    placeholders.insert(
        "selected_language".to_string(),
        language.unwrap_or_default().to_string(),
    );

    Form {
        step_id: StepId::VoiceSelection,
        fields,
        errors,
        description_placeholders: placeholders,
    }
}
