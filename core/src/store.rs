//! Persisted configuration entries.
//!
//! An entry holds the initial `data` written by the setup flow (credentials +
//! synthesis settings) and an `options` overlay written by later options-edit
//! flows. Lookups go options -> data -> compiled default.
//!
//! Storage backends:
//! - `InMemoryConfigStore` - development/testing
//! - `JsonFileStore` - single JSON document on disk

use crate::config::{redact, ConfigResolver, Credentials, LayerKind, SynthesisConfig};
use crate::{Result, TtsError, DOMAIN};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Time-based entry id
fn gen_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{:x}", nanos)
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub domain: String,
    pub title: String,
    pub data: Map<String, Value>,
    #[serde(default)]
    pub options: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub fn new(title: impl Into<String>, data: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            entry_id: gen_id(),
            domain: DOMAIN.to_string(),
            title: title.into(),
            data,
            options: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Resolver over this entry: options > data > compiled default
    pub fn resolver(&self) -> ConfigResolver<'_> {
        ConfigResolver::new()
            .layer(LayerKind::Options, &self.options)
            .layer(LayerKind::Data, &self.data)
    }

    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::resolve(&self.resolver())
    }

    pub fn synthesis_config(&self) -> Result<SynthesisConfig> {
        SynthesisConfig::resolve(&self.resolver())
    }

    /// Copy of this entry with the options overlay replaced; data untouched
    pub fn with_options(&self, options: Map<String, Value>) -> Self {
        Self {
            options,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigEntry")
            .field("entry_id", &self.entry_id)
            .field("domain", &self.domain)
            .field("title", &self.title)
            .field("data", &redact(&self.data))
            .field("options", &redact(&self.options))
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self, entry_id: &str) -> Result<Option<ConfigEntry>>;

    /// Insert or replace a whole entry
    async fn save(&self, entry: &ConfigEntry) -> Result<()>;

    /// Replace only the options overlay of an existing entry
    async fn update_options(&self, entry_id: &str, options: Map<String, Value>) -> Result<ConfigEntry>;

    async fn list(&self) -> Result<Vec<ConfigEntry>>;
}

pub struct InMemoryConfigStore {
    entries: DashMap<String, ConfigEntry>,
}

impl InMemoryConfigStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
        })
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn load(&self, entry_id: &str) -> Result<Option<ConfigEntry>> {
        Ok(self.entries.get(entry_id).map(|e| e.clone()))
    }

    async fn save(&self, entry: &ConfigEntry) -> Result<()> {
        debug!(target: "inworld_store", entry_id = %entry.entry_id, "Saving entry");
        self.entries.insert(entry.entry_id.clone(), entry.clone());
        Ok(())
    }

    async fn update_options(&self, entry_id: &str, options: Map<String, Value>) -> Result<ConfigEntry> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| TtsError::StorageError(format!("entry not found: {entry_id}")))?;
        let updated = entry.with_options(options);
        *entry = updated.clone();
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<ConfigEntry>> {
        let mut all: Vec<ConfigEntry> = self.entries.iter().map(|e| e.clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    entries: BTreeMap<String, ConfigEntry>,
}

/// Entries kept in one JSON file, rewritten atomically on every change
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreDocument> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, doc: &StoreDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(doc)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn load(&self, entry_id: &str) -> Result<Option<ConfigEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.entries.remove(entry_id))
    }

    async fn save(&self, entry: &ConfigEntry) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut doc = self.read().await?;
        doc.entries.insert(entry.entry_id.clone(), entry.clone());
        self.write(&doc).await?;
        info!(target: "inworld_store", entry_id = %entry.entry_id, path = ?self.path, "Entry saved");
        Ok(())
    }

    async fn update_options(&self, entry_id: &str, options: Map<String, Value>) -> Result<ConfigEntry> {
        let _guard = self.lock.lock().await;
        let mut doc = self.read().await?;
        let updated = doc
            .entries
            .get(entry_id)
            .map(|e| e.with_options(options))
            .ok_or_else(|| TtsError::StorageError(format!("entry not found: {entry_id}")))?;
        doc.entries.insert(entry_id.to_string(), updated.clone());
        self.write(&doc).await?;
        info!(target: "inworld_store", entry_id = %entry_id, "Entry options updated");
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<ConfigEntry>> {
        let _guard = self.lock.lock().await;
        let mut all: Vec<ConfigEntry> = self.read().await?.entries.into_values().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}
