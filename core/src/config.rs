use serde::Deserialize;
use serde_path_to_error as spte;

use crate::error::ConfigError;
use crate::merge::{Precedence, DEFAULT_PRECEDENCE};

pub const DEFAULT_GUEST_KEY: &str = "rd_guest";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Nøkler og stier for lagring av datasett.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Nøkkel for gjestedatasettet i lokal lagring
    pub guest_key: String,
    /// Valgfri egen nøkkel for gjestens visningsnavn
    pub guest_name_key: Option<String>,
    pub users_collection: String,
    pub datasets_collection: String,
    pub dataset_id: String,
    pub precedence: Precedence,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            guest_key: DEFAULT_GUEST_KEY.to_string(),
            guest_name_key: None,
            users_collection: "users".to_string(),
            datasets_collection: "datasets".to_string(),
            dataset_id: "default".to_string(),
            precedence: DEFAULT_PRECEDENCE,
        }
    }
}

impl SyncConfig {
    pub fn from_json_str(json_in: &str) -> Result<Self, ConfigError> {
        parse_json(json_in)
    }

    /// `users/{uid}/datasets/default`
    pub fn dataset_path(&self, uid: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.users_collection, uid, self.datasets_collection, self.dataset_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FirestoreConfig {
    pub project_id: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Firebase ID-token for innlogget bruker (Bearer)
    #[serde(default)]
    pub id_token: Option<String>,
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_base_url() -> String {
    DEFAULT_FIRESTORE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: default_database(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            id_token: None,
        }
    }

    pub fn from_json_str(json_in: &str) -> Result<Self, ConfigError> {
        let cfg: FirestoreConfig = parse_json(json_in)?;
        if cfg.project_id.trim().is_empty() {
            return Err(ConfigError::Missing("project_id"));
        }
        Ok(cfg)
    }

    /// `projects/{p}/databases/{db}/documents`
    pub fn documents_root(&self) -> String {
        format!("projects/{}/databases/{}/documents", self.project_id, self.database)
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(json_in: &str) -> Result<T, ConfigError> {
    let mut de = serde_json::Deserializer::from_str(json_in);
    spte::deserialize(&mut de).map_err(|e| ConfigError::Parse {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })
}
