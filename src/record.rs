// src/record.rs
//! Consumed collaborator contracts for record access
//!
//! The generic record/field storage engine lives outside this crate. These
//! traits are the slice of it the crypto pipeline needs: enumerate language
//! variants, walk multi-valued fields, and read/write one property at a time.

use serde::{Deserialize, Serialize};

use crate::error::FieldEncryptError;

/// A structured record whose field properties may be encrypted.
///
/// A "field" is a named, possibly multi-valued attribute; each value instance
/// is a delta. A "property" is a named sub-value within one delta (e.g. a
/// main value vs. a summary).
pub trait EncryptableRecord {
    /// Type of the owning record, e.g. `"node"`.
    fn record_type(&self) -> &str;

    fn id(&self) -> String;

    /// Revision identifier, `None` for record types without revisioning.
    fn revision_id(&self) -> Option<String>;

    /// Language variants carried by this record. A record with no
    /// translations reports its single canonical language tag.
    fn languages(&self) -> Vec<String>;

    /// Field names in a fixed order; repeated calls against an unchanged
    /// record must return the same order.
    fn field_names(&self) -> Vec<String>;

    /// Number of value instances in the named field for one language variant.
    fn delta_count(&self, lang: &str, field: &str) -> usize;

    /// One property value, or `None` when the delta has no such property.
    fn property(&self, lang: &str, field: &str, delta: usize, property: &str) -> Option<String>;

    fn set_property(&mut self, lang: &str, field: &str, delta: usize, property: &str, value: &str);
}

/// Address of one record (revision) inside a reconciliation candidate set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: String,
    pub revision_id: Option<String>,
}

impl RecordRef {
    pub fn new(id: impl Into<String>) -> Self {
        RecordRef {
            id: id.into(),
            revision_id: None,
        }
    }

    pub fn revision(id: impl Into<String>, revision_id: impl Into<String>) -> Self {
        RecordRef {
            id: id.into(),
            revision_id: Some(revision_id.into()),
        }
    }
}

/// Load/save access to the caller's record storage, consumed by the
/// reconciliation coordinator.
pub trait RecordStorage {
    type Record: EncryptableRecord;

    fn load(&mut self, record_type: &str, r: &RecordRef)
        -> Result<Self::Record, FieldEncryptError>;

    fn save(&mut self, record: Self::Record) -> Result<(), FieldEncryptError>;
}
