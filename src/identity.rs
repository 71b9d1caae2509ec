// src/identity.rs
//! Identity key builder — the composite key addressing one property instance

use serde::{Deserialize, Serialize};

use crate::record::EncryptableRecord;

/// Unique address of one encrypted property value: which record (and
/// revision), which field, which delta within it, which property, which
/// language variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptedValueKey {
    pub record_type: String,
    pub record_id: String,
    /// Equals `record_id` for record types without revisioning.
    pub revision_id: String,
    pub field_name: String,
    pub delta: u32,
    pub property: String,
    pub lang: String,
}

impl EncryptedValueKey {
    /// Derive the key for one property instance of a record.
    pub fn for_property(
        record: &dyn EncryptableRecord,
        lang: &str,
        field: &str,
        delta: usize,
        property: &str,
    ) -> Self {
        let record_id = record.id();
        let revision_id = record.revision_id().unwrap_or_else(|| record_id.clone());
        EncryptedValueKey {
            record_type: record.record_type().to_string(),
            record_id,
            revision_id,
            field_name: field.to_string(),
            delta: delta as u32,
            property: property.to_string(),
            lang: lang.to_string(),
        }
    }
}
