//! Lagring av datasett: lokal nøkkel/verdi (gjest) og remote dokumentlager (konto).
//!
//! `DatasetRepo` ruter `load_entries`/`save_entries` etter om det finnes en
//! innlogget identitet, og eier gjest → konto-flettingen.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::SyncConfig;
use crate::error::{MergeError, StoreError};
use crate::merge::{merge_snapshots, MergeCounts};
use crate::metrics::{self, Metrics};
use crate::models::{Dataset, Identity};
use crate::normalize::{normalize_document, Snapshot};

/// Et dokument i remote-lagret: toppnivåfelt → JSON.
pub type Document = Map<String, Value>;

pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Enhetslokal lagring (nettleserens localStorage eller tilsvarende). Synkron.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    /// `true`: felt som ikke er med i skrivingen beholdes
    pub merge: bool,
    /// Felt som settes til serverens skrivetidspunkt
    pub server_timestamp: Option<String>,
}

impl UpsertOptions {
    pub fn merge_stamped() -> Self {
        Self {
            merge: true,
            server_timestamp: Some(UPDATED_AT_FIELD.to_string()),
        }
    }
}

/// Remote dokumentlager. Én `upsert` er én atomisk dokumentskriving.
pub trait DocumentStore: Send + Sync {
    fn get(&self, path: &str) -> Result<Option<Document>, StoreError>;
    fn upsert(&self, path: &str, fields: Document, opts: &UpsertOptions) -> Result<(), StoreError>;
}

/// Identitet med tom uid regnes som ikke innlogget.
fn signed_in(identity: Option<&Identity>) -> Option<&Identity> {
    identity.filter(|id| !id.uid.trim().is_empty())
}

fn lock<'a, T>(m: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    m.lock()
        .map_err(|_| StoreError::Unavailable(format!("{what} lock poisoned")))
}

// ──────────────────────────────────────────────────────────────────────────────
// Lokale lagre
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MemoryKvStore {
    items: Mutex<HashMap<String, String>>,
    available: AtomicBool,
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulerer utilgjengelig lagring (privat modus, kvote full …).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("local storage disabled".into()))
        }
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(lock(&self.items, "local store")?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check()?;
        lock(&self.items, "local store")?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        lock(&self.items, "local store")?.remove(key);
        Ok(())
    }
}

/// Én fil per nøkkel i en katalog (`<dir>/<key>.json`).
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Nøkkelen escapes reversibelt (`%XX` per byte utenom `[A-Za-z0-9_-]`),
    /// så to ulike nøkler aldri deler fil.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut safe = String::with_capacity(key.len());
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                safe.push(b as char);
            } else {
                safe.push_str(&format!("%{b:02X}"));
            }
        }
        self.dir.join(format!("{safe}.json"))
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!("local key {} not found at {}", key, path.display());
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        std::fs::write(&path, value)?;
        debug!("local key {} written to {}", key, path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Remote i minnet (tester, lokal utvikling)
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: Mutex<HashMap<String, Document>>,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offline: både lesing og skriving feiler med `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Antall vellykkede skrivinger siden opprettelse.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Legger inn et dokument direkte, uten å telle som skriving.
    pub fn insert(&self, path: &str, doc: Document) -> Result<(), StoreError> {
        lock(&self.docs, "document store")?.insert(path.to_string(), doc);
        Ok(())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("document store offline".into()))
        } else {
            Ok(())
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        self.check()?;
        Ok(lock(&self.docs, "document store")?.get(path).cloned())
    }

    fn upsert(&self, path: &str, mut fields: Document, opts: &UpsertOptions) -> Result<(), StoreError> {
        self.check()?;
        if let Some(ts) = &opts.server_timestamp {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            fields.insert(ts.clone(), Value::String(now));
        }

        let mut docs = lock(&self.docs, "document store")?;
        let doc = docs.entry(path.to_string()).or_default();
        if !opts.merge {
            doc.clear();
        }
        doc.extend(fields);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Repo
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub merged_count: usize,
    pub counts: MergeCounts,
}

pub struct DatasetRepo<'a> {
    local: &'a dyn KeyValueStore,
    remote: &'a dyn DocumentStore,
    config: SyncConfig,
    metrics: Option<&'a Metrics>,
}

impl<'a> DatasetRepo<'a> {
    pub fn new(local: &'a dyn KeyValueStore, remote: &'a dyn DocumentStore) -> Self {
        Self::with_config(local, remote, SyncConfig::default())
    }

    pub fn with_config(
        local: &'a dyn KeyValueStore,
        remote: &'a dyn DocumentStore,
        config: SyncConfig,
    ) -> Self {
        Self {
            local,
            remote,
            config,
            metrics: metrics::global(),
        }
    }

    pub fn with_metrics(mut self, metrics: &'a Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn record(&self, f: impl FnOnce(&Metrics)) {
        if let Some(m) = self.metrics {
            f(m);
        }
    }

    /// `None` → gjestedatasett (feiler aldri), `Some` → kontodokument.
    pub fn load_entries(&self, identity: Option<&Identity>) -> Result<Dataset, StoreError> {
        match signed_in(identity) {
            None => Ok(self.read_guest().map(|s| s.dataset).unwrap_or_default()),
            Some(id) => {
                let path = self.config.dataset_path(&id.uid);
                let doc = self.remote.get(&path)?;
                debug!("loaded {} (found={})", path, doc.is_some());
                Ok(doc.map(|d| normalize_document(&d)).unwrap_or_default())
            }
        }
    }

    pub fn save_entries(&self, identity: Option<&Identity>, dataset: &Dataset) -> Result<(), StoreError> {
        let mut doc = dataset.to_document();
        match signed_in(identity) {
            None => {
                self.local
                    .set(&self.config.guest_key, &serde_json::to_string(&doc)?)?;
                if let Some(name_key) = &self.config.guest_name_key {
                    self.local.set(name_key, &dataset.name)?;
                }
                self.record(|m| metrics::saves_total(m, "guest").inc());
                info!("guest dataset saved ({} entries)", dataset.total_entries());
            }
            Some(id) => {
                if dataset.name.trim().is_empty() {
                    doc.insert("name".into(), Value::String(id.fallback_name()));
                }
                doc.insert("ownerUid".into(), Value::String(id.uid.clone()));
                doc.insert("email".into(), Value::String(id.email.clone().unwrap_or_default()));
                doc.insert(
                    "displayName".into(),
                    Value::String(id.display_name.clone().unwrap_or_default()),
                );

                let path = self.config.dataset_path(&id.uid);
                self.remote.upsert(&path, doc, &UpsertOptions::merge_stamped())?;
                self.record(|m| metrics::saves_total(m, "account").inc());
                info!("account dataset saved to {} ({} entries)", path, dataset.total_entries());
            }
        }
        Ok(())
    }

    /// Fletter gjestedatasettet inn i kontoen og sletter det lokalt ved suksess.
    ///
    /// Ingen identitet eller ingen gjesteøkter gir `merged_count = 0` uten
    /// remote-kall. Feiler lesing eller skriving mot remote, er lokal data urørt.
    pub fn merge_guest_to_user(&self, identity: Option<&Identity>) -> Result<MergeReport, MergeError> {
        let Some(id) = signed_in(identity) else {
            return Ok(MergeReport::default());
        };

        let guest = match self.read_guest() {
            Some(s) if s.total_entries() > 0 => s,
            _ => {
                self.record(|m| metrics::merge_noop_total(m).inc());
                debug!("no guest data to merge for {}", id.uid);
                return Ok(MergeReport::default());
            }
        };

        let path = self.config.dataset_path(&id.uid);
        let remote = match self.remote.get(&path) {
            Ok(doc) => doc.map(|d| Snapshot::from_document(&d)).unwrap_or_default(),
            Err(e) => {
                self.record(|m| metrics::merge_failed_total(m).inc());
                warn!("merge aborted, could not read {}: {}", path, e);
                return Err(MergeError::RemoteRead(e));
            }
        };

        let outcome = merge_snapshots(&remote, &guest, self.config.precedence);

        if let Err(e) = self
            .remote
            .upsert(&path, outcome.to_document(), &UpsertOptions::merge_stamped())
        {
            self.record(|m| metrics::merge_failed_total(m).inc());
            warn!("merge aborted, could not write {}: {}", path, e);
            return Err(MergeError::RemoteWrite(e));
        }

        self.clear_guest();

        let merged_count = outcome.merged_count();
        self.record(|m| {
            metrics::merge_total(m).inc();
            metrics::merged_entries_total(m).inc_by(merged_count as u64);
        });
        info!(
            "merged guest data into {} (merged_count={}, legacy={}, run={}, swim={}, bike={})",
            path,
            merged_count,
            outcome.counts.legacy,
            outcome.counts.run,
            outcome.counts.swim,
            outcome.counts.bike
        );

        Ok(MergeReport {
            merged_count,
            counts: outcome.counts,
        })
    }

    /// Leser gjestedatasettet. Utilgjengelig lagring eller korrupt JSON
    /// behandles som "ingen data".
    fn read_guest(&self) -> Option<Snapshot> {
        let text = match self.local.get(&self.config.guest_key) {
            Ok(Some(t)) => t,
            Ok(None) => return None,
            Err(e) => {
                warn!("local storage unavailable, treating guest dataset as empty: {}", e);
                return None;
            }
        };
        let raw: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                warn!("guest dataset is not valid JSON, ignoring it: {}", e);
                return None;
            }
        };

        let mut snap = Snapshot::from_value(&raw);
        if snap.dataset.name.is_empty() {
            if let Some(name_key) = &self.config.guest_name_key {
                if let Ok(Some(name)) = self.local.get(name_key) {
                    snap.dataset.name = name.trim().to_string();
                }
            }
        }
        Some(snap)
    }

    fn clear_guest(&self) {
        // remote er allerede skrevet; feil her logges bare
        if let Err(e) = self.local.remove(&self.config.guest_key) {
            warn!("merged, but could not clear guest dataset: {}", e);
        }
        if let Some(name_key) = &self.config.guest_name_key {
            if let Err(e) = self.local.remove(name_key) {
                warn!("merged, but could not clear guest name: {}", e);
            }
        }
    }
}
