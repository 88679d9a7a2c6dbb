//! Kjerne for treningsloggen: normalisering av lagrede datasett,
//! gjest → konto-fletting og konvertering av pace/tall fra skjemaet.

pub mod config;
pub mod error;
pub mod firestore;
pub mod form;
pub mod merge;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod pace;
pub mod report;
pub mod signature;
pub mod storage;

#[cfg(feature = "python")]
mod py;

pub use config::{FirestoreConfig, SyncConfig};
pub use error::{ConfigError, DraftError, MergeError, StoreError};
pub use firestore::FirestoreRestStore;
pub use form::{insert_sorted, remove_at, EntryDraft};
pub use merge::{merge_snapshots, MergeCounts, MergeOutcome, Precedence, DEFAULT_PRECEDENCE};
pub use models::{Dataset, EntriesBySport, Entry, Identity, Sport};
pub use normalize::{normalize, Snapshot};
pub use pace::{calculate_pace, format_pace, format_time, parse_pace, to_num};
pub use report::{entries_to_csv, filter_by_date, sort_overviews, DatasetOverview, EntrySummary};
pub use signature::{legacy_signature, signature};
pub use storage::{
    DatasetRepo, Document, DocumentStore, FileKvStore, KeyValueStore, MemoryDocumentStore,
    MemoryKvStore, MergeReport, UpsertOptions,
};
