use thiserror::Error;

/// Feil fra lokal eller remote lagring.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Lagringen er ikke tilgjengelig (offline, privat modus, forgiftet lås …)
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("http {status} from document store: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// Svar fra remote kunne ikke tolkes; `path` er JSON-stien som feilet.
    #[error("decode error at {path}: {message}")]
    Decode { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Feil fra gjest → konto-merge. Lokal data er alltid urørt når denne returneres.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to read account dataset: {0}")]
    RemoteRead(#[source] StoreError),

    #[error("failed to write merged dataset: {0}")]
    RemoteWrite(#[source] StoreError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("date is required")]
    MissingDate,

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("missing config value: {0}")]
    Missing(&'static str),
}
