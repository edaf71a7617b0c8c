//! Setup / options flow state machine
//!
//! ```text
//! AwaitingCredentials --catalog ok--> AwaitingVoiceSelection --voice valid--> Validating --probe ok--> Complete
//!        ^  |                               ^  |   (language change: re-render)      |
//!        +--+ invalid_auth / cannot_connect +--+ <---- invalid_auth / cannot_connect -+
//! ```
//!
//! Failures never abort a session: the current step is re-rendered with an
//! error code (`invalid_auth`, `cannot_connect`, `unknown`). Every network
//! call is awaited before the session is touched, so dropping a step future
//! leaves the session exactly as it was.
//!
//! A session owns its catalog and answers; nothing is shared between sessions
//! except the `VoiceApi` (an HTTP pool without credentials).

pub mod form;
mod input;

pub use form::{FieldKind, Form, FormField, SelectOption, StepId, BASE_ERROR};

use crate::catalog::VoiceCatalog;
use crate::config::{keys, ConfigResolver, Credentials, LayerKind, SynthesisConfig};
use crate::http::VoiceApi;
use crate::store::ConfigEntry;
use crate::{Result, TtsError, TITLE};
use input::{normalize_voice_selection, parse_credentials, FieldErrors, INVALID_CHOICE, REQUIRED};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    AwaitingCredentials,
    AwaitingVoiceSelection,
    /// The validation call is in flight. Never returned by `FlowSession::stage`:
    /// the call is awaited inside `submit`, and a dropped submit leaves the
    /// session at voice selection.
    Validating,
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowResult {
    /// Show (or re-show) a step
    Form(Form),
    /// Flow finished; the entry is ready to persist
    Complete(ConfigEntry),
}

impl FlowResult {
    pub fn form(&self) -> Option<&Form> {
        match self {
            FlowResult::Form(f) => Some(f),
            FlowResult::Complete(_) => None,
        }
    }

    pub fn entry(&self) -> Option<&ConfigEntry> {
        match self {
            FlowResult::Complete(e) => Some(e),
            FlowResult::Form(_) => None,
        }
    }
}

/// State carried while the user picks a voice
#[derive(Debug, Clone)]
struct VoiceSelection {
    credentials: Credentials,
    catalog: VoiceCatalog,
    /// False until a catalog fetch has succeeded; an empty catalog only
    /// means "free text" once it is loaded
    catalog_loaded: bool,
    selected_language: Option<String>,
    /// Accumulated answers; the session-override layer during resolution
    answers: Map<String, Value>,
}

#[derive(Debug, Clone)]
enum FlowState {
    AwaitingCredentials { api_url: Option<String> },
    AwaitingVoiceSelection(VoiceSelection),
    Complete(ConfigEntry),
}

/// Setup creates a new entry; options edits one in place
#[derive(Debug, Clone)]
enum FlowKind {
    Setup,
    Options(ConfigEntry),
}

pub struct FlowSession {
    api: Arc<dyn VoiceApi>,
    kind: FlowKind,
    state: FlowState,
}

fn empty() -> Map<String, Value> {
    Map::new()
}

/// Map a fault to the user-visible code, logging unclassified ones in full
fn error_code(err: &TtsError, step: &str) -> &'static str {
    let code = err.error_code();
    match code {
        "invalid_auth" => debug!(target: "inworld_flow", step, "Invalid authentication"),
        "cannot_connect" => {
            debug!(target: "inworld_flow", step, error = %err, "Cannot connect to Inworld API")
        }
        _ => error!(target: "inworld_flow", step, error = ?err, "Unexpected error during flow step"),
    }
    code
}

fn base_error(code: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(BASE_ERROR.to_string(), code.to_string());
    errors
}

impl FlowSession {
    /// New setup flow, starting at the credentials step
    pub fn setup(api: Arc<dyn VoiceApi>) -> Self {
        info!(target: "inworld_flow", "Initializing setup flow");
        Self {
            api,
            kind: FlowKind::Setup,
            state: FlowState::AwaitingCredentials { api_url: None },
        }
    }

    /// Options-edit flow over an existing entry, starting at voice selection.
    /// The catalog is fetched by `start`.
    pub fn options(api: Arc<dyn VoiceApi>, entry: ConfigEntry) -> Result<Self> {
        info!(target: "inworld_flow", entry_id = %entry.entry_id, "Initializing options flow");
        let credentials = entry.credentials()?;
        Ok(Self {
            api,
            state: FlowState::AwaitingVoiceSelection(VoiceSelection {
                credentials,
                catalog: VoiceCatalog::default(),
                catalog_loaded: false,
                selected_language: None,
                answers: Map::new(),
            }),
            kind: FlowKind::Options(entry),
        })
    }

    pub fn stage(&self) -> FlowStage {
        match self.state {
            FlowState::AwaitingCredentials { .. } => FlowStage::AwaitingCredentials,
            FlowState::AwaitingVoiceSelection(_) => FlowStage::AwaitingVoiceSelection,
            FlowState::Complete(_) => FlowStage::Complete,
        }
    }

    pub fn catalog(&self) -> Option<&VoiceCatalog> {
        match &self.state {
            FlowState::AwaitingVoiceSelection(sel) => Some(&sel.catalog),
            _ => None,
        }
    }

    pub fn selected_language(&self) -> Option<&str> {
        match &self.state {
            FlowState::AwaitingVoiceSelection(sel) => sel.selected_language.as_deref(),
            _ => None,
        }
    }

    /// First form of the flow. Options flows load the catalog here; a failed
    /// load still shows the form, with `cannot_connect` and free-text fields,
    /// and the fetch is retried on the next submission.
    pub async fn start(&mut self) -> FlowResult {
        let FlowState::AwaitingVoiceSelection(sel) = &self.state else {
            return self.render();
        };
        debug!(target: "inworld_flow", "Fetching voices for options form");
        let fetched = self.api.fetch_catalog(&sel.credentials).await;

        let FlowState::AwaitingVoiceSelection(sel) = &mut self.state else {
            return self.render();
        };
        match fetched {
            Ok(catalog) => {
                sel.catalog = catalog;
                sel.catalog_loaded = true;
                self.render()
            }
            Err(e) => {
                error!(target: "inworld_flow", error = %e, "Failed to fetch voices for options form");
                self.render_with(base_error("cannot_connect"))
            }
        }
    }

    /// Render the current step without errors
    pub fn render(&mut self) -> FlowResult {
        self.render_with(FieldErrors::new())
    }

    fn render_with(&mut self, errors: FieldErrors) -> FlowResult {
        let (options, data) = match &self.kind {
            FlowKind::Setup => (empty(), empty()),
            FlowKind::Options(entry) => (entry.options.clone(), entry.data.clone()),
        };
        match &mut self.state {
            FlowState::AwaitingCredentials { api_url } => {
                FlowResult::Form(form::credentials_form(api_url.as_deref(), errors))
            }
            FlowState::AwaitingVoiceSelection(sel) => {
                let resolver = ConfigResolver::new()
                    .layer(LayerKind::SessionOverrides, &sel.answers)
                    .layer(LayerKind::Options, &options)
                    .layer(LayerKind::Data, &data);
                if sel.selected_language.is_none() {
                    sel.selected_language = default_language(&sel.catalog, &resolver);
                }
                FlowResult::Form(form::voice_selection_form(
                    &sel.catalog,
                    sel.selected_language.as_deref(),
                    &resolver,
                    errors,
                ))
            }
            FlowState::Complete(entry) => FlowResult::Complete(entry.clone()),
        }
    }

    /// Submit the current step's form
    pub async fn submit(&mut self, input: Map<String, Value>) -> FlowResult {
        match self.state {
            FlowState::AwaitingCredentials { .. } => self.submit_credentials(input).await,
            FlowState::AwaitingVoiceSelection(_) => self.submit_voice_selection(input).await,
            FlowState::Complete(_) => self.render(),
        }
    }

    /// Credentials step: fetch the catalog with the submitted credentials
    pub async fn submit_credentials(&mut self, input: Map<String, Value>) -> FlowResult {
        if !matches!(self.state, FlowState::AwaitingCredentials { .. }) {
            return self.render();
        }
        let submitted_url = input
            .get(keys::API_URL)
            .and_then(Value::as_str)
            .map(str::to_string);
        let credentials = match parse_credentials(&input) {
            Ok(c) => c,
            Err(errors) => {
                self.state = FlowState::AwaitingCredentials { api_url: submitted_url };
                return self.render_with(errors);
            }
        };

        debug!(target: "inworld_flow", credentials = ?credentials, "Validating API connection");
        match self.api.fetch_catalog(&credentials).await {
            Ok(catalog) => {
                info!(
                    target: "inworld_flow",
                    languages = catalog.len(),
                    "API validation successful, continuing to voice selection"
                );
                self.state = FlowState::AwaitingVoiceSelection(VoiceSelection {
                    credentials,
                    catalog,
                    catalog_loaded: true,
                    selected_language: None,
                    answers: Map::new(),
                });
                self.render()
            }
            Err(e) => {
                let code = error_code(&e, "credentials");
                self.state = FlowState::AwaitingCredentials { api_url: submitted_url };
                self.render_with(base_error(code))
            }
        }
    }

    /// Voice selection step: re-render on language change or field errors,
    /// otherwise probe the configuration and complete.
    pub async fn submit_voice_selection(&mut self, input: Map<String, Value>) -> FlowResult {
        let FlowState::AwaitingVoiceSelection(current) = &self.state else {
            return self.render();
        };
        // Work on a copy; it is committed only once no await remains pending
        let mut next = current.clone();

        let (normalized, mut errors) = normalize_voice_selection(&input);
        let submitted_language = normalized
            .get(keys::LANGUAGE)
            .and_then(Value::as_str)
            .map(str::to_string);
        for (k, v) in normalized {
            next.answers.insert(k, v);
        }

        if !next.catalog_loaded {
            debug!(target: "inworld_flow", "Retrying voice fetch for options form");
            match self.api.fetch_catalog(&next.credentials).await {
                Ok(catalog) => {
                    if let Some(lang) = next.selected_language.as_deref() {
                        if !catalog.has_language(lang) {
                            next.selected_language = None;
                        }
                    }
                    next.catalog = catalog;
                    next.catalog_loaded = true;
                }
                Err(e) => {
                    error!(target: "inworld_flow", error = %e, "Failed to fetch voices for options form");
                    return self.commit_and_render(next, base_error("cannot_connect"));
                }
            }
        }

        if !errors.is_empty() {
            // Still switch the voice list when the new language itself is fine
            if let Some(lang) = submitted_language.as_deref() {
                if next.catalog.is_empty() || next.catalog.has_language(lang) {
                    next.selected_language = Some(lang.to_string());
                }
            }
            return self.commit_and_render(next, errors);
        }

        let (options, data) = match &self.kind {
            FlowKind::Setup => (empty(), empty()),
            FlowKind::Options(entry) => (entry.options.clone(), entry.data.clone()),
        };
        let resolver = ConfigResolver::new()
            .layer(LayerKind::SessionOverrides, &next.answers)
            .layer(LayerKind::Options, &options)
            .layer(LayerKind::Data, &data);

        let language = submitted_language
            .or_else(|| next.selected_language.clone())
            .or_else(|| default_language(&next.catalog, &resolver));
        let voice_id: Option<String> = resolver.get(keys::VOICE_ID).ok().flatten();

        let Some(language) = language else {
            errors.insert(keys::LANGUAGE.into(), REQUIRED.into());
            return self.commit_and_render(next, errors);
        };

        if !next.catalog.is_empty() {
            if !next.catalog.has_language(&language) {
                errors.insert(keys::LANGUAGE.into(), INVALID_CHOICE.into());
                return self.commit_and_render(next, errors);
            }
            let changed = next.selected_language.as_deref() != Some(language.as_str());
            if changed {
                debug!(
                    target: "inworld_flow",
                    from = ?next.selected_language,
                    to = %language,
                    "Language selection changed"
                );
                next.selected_language = Some(language.clone());
            }
            let voice_ok = voice_id
                .as_deref()
                .is_some_and(|v| next.catalog.contains_voice(&language, v));
            if !voice_ok {
                // A new language shows its own voices; the same language with a foreign voice is an error
                if !changed {
                    let code = if voice_id.is_some() { INVALID_CHOICE } else { REQUIRED };
                    errors.insert(keys::VOICE_ID.into(), code.into());
                }
                return self.commit_and_render(next, errors);
            }
        } else {
            next.selected_language = Some(language.clone());
            if voice_id.as_deref().map_or(true, |v| v.trim().is_empty()) {
                errors.insert(keys::VOICE_ID.into(), REQUIRED.into());
                return self.commit_and_render(next, errors);
            }
        }
        next.answers
            .insert(keys::LANGUAGE.into(), Value::String(language));

        let resolver = ConfigResolver::new()
            .layer(LayerKind::SessionOverrides, &next.answers)
            .layer(LayerKind::Options, &options)
            .layer(LayerKind::Data, &data);
        let candidate = match SynthesisConfig::resolve(&resolver) {
            Ok(c) => c,
            Err(TtsError::ConfigMissing(key)) => {
                errors.insert(key, REQUIRED.into());
                return self.commit_and_render(next, errors);
            }
            Err(e) => {
                let code = error_code(&e, "voice_selection");
                return self.commit_and_render(next, base_error(code));
            }
        };

        info!(
            target: "inworld_flow",
            stage = ?FlowStage::Validating,
            voice_id = %candidate.voice_id,
            model_id = %candidate.model_id,
            "Validating voice configuration"
        );
        let probe = self.api.validate(&next.credentials, &candidate).await;

        match probe {
            Ok(()) => {
                let entry = self.finish(&next.credentials, &candidate);
                info!(target: "inworld_flow", entry_id = %entry.entry_id, "Voice validation successful, flow complete");
                self.state = FlowState::Complete(entry.clone());
                FlowResult::Complete(entry)
            }
            Err(e) => {
                let code = error_code(&e, "validating");
                self.commit_and_render(next, base_error(code))
            }
        }
    }

    fn commit_and_render(&mut self, next: VoiceSelection, errors: FieldErrors) -> FlowResult {
        self.state = FlowState::AwaitingVoiceSelection(next);
        self.render_with(errors)
    }

    /// Entry produced on completion. Setup writes credentials + settings as
    /// data; options replaces only the options overlay.
    fn finish(&self, credentials: &Credentials, config: &SynthesisConfig) -> ConfigEntry {
        match &self.kind {
            FlowKind::Setup => {
                let mut data = credentials.to_map();
                data.extend(config.to_map());
                ConfigEntry::new(TITLE, data)
            }
            FlowKind::Options(entry) => entry.with_options(config.to_map()),
        }
    }
}

/// Language shown when none has been chosen: resolved value if the catalog
/// has it (or the catalog is empty), else the first sorted language
fn default_language(catalog: &VoiceCatalog, resolver: &ConfigResolver<'_>) -> Option<String> {
    let resolved: Option<String> = resolver.get(keys::LANGUAGE).ok().flatten();
    match resolved {
        Some(lang) if catalog.is_empty() || catalog.has_language(&lang) => Some(lang),
        _ => catalog.first_language().map(str::to_string),
    }
}
