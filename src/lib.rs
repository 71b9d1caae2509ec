// src/lib.rs
//! field-encrypt — property-level encryption for structured record fields
//!
//! Selected sub-values ("properties") of record fields are stored encrypted
//! in a keyed ciphertext store while the record's primary storage row keeps
//! a non-null placeholder, so indexing and existence queries keep working.
//!
//! - [`identity`] — composite key addressing one property instance
//! - [`store`] — rusqlite-backed keyed store of encrypted values
//! - [`processor`] — per-record encrypt/decrypt passes
//! - [`reconcile`] — chunked migration after a settings change
//!
//! The cipher itself is delegated to an [`EncryptionCapability`]
//! implementation selected per field by an opaque profile reference.

pub mod capability;
pub mod config;
pub mod consts;
pub mod error;
pub mod identity;
pub mod processor;
pub mod reconcile;
pub mod record;
pub mod settings;
pub mod store;

pub use capability::{EncryptionCapability, PlaceholderOverride};
pub use config::load as load_config;
pub use consts::{DEFAULT_CHUNK_SIZE, DEFAULT_PLACEHOLDER};
pub use error::FieldEncryptError;
pub use identity::EncryptedValueKey;
pub use processor::FieldCryptoProcessor;
pub use reconcile::{Progress, ReconciliationBatch, RecordFailure};
pub use record::{EncryptableRecord, RecordRef, RecordStorage};
pub use settings::{FieldEncryptionSettings, FieldSettingsSource};
pub use store::{open_default_store_db, open_store_db, open_store_db_in_memory};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FieldEncryptError>;
