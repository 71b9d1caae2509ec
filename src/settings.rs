// src/settings.rs
//! Per-field encryption settings, consumed from the field-configuration store

use serde::{Deserialize, Serialize};

/// Snapshot of one field's encryption configuration.
///
/// Serde-round-trippable on purpose: when a field's configuration changes,
/// the caller keeps a snapshot of the prior settings so reconciliation can
/// decrypt under the settings the ciphertext was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEncryptionSettings {
    pub enabled: bool,
    /// Property names to process, in processing order.
    pub properties: Vec<String>,
    /// Opaque profile reference handed to the encryption capability.
    /// `None` means the configuration is incomplete; such properties are
    /// skipped rather than failed.
    pub profile: Option<String>,
    /// Whether derived render caches must be excluded for this field.
    pub cache_exclude: bool,
}

impl FieldEncryptionSettings {
    pub fn disabled() -> Self {
        FieldEncryptionSettings {
            enabled: false,
            properties: Vec::new(),
            profile: None,
            cache_exclude: false,
        }
    }

    pub fn enabled(
        profile: impl Into<String>,
        properties: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        FieldEncryptionSettings {
            enabled: true,
            properties: properties.into_iter().map(Into::into).collect(),
            profile: Some(profile.into()),
            cache_exclude: true,
        }
    }

    pub fn with_cache_exclude(mut self, cache_exclude: bool) -> Self {
        self.cache_exclude = cache_exclude;
        self
    }
}

/// Read access to the current field configuration.
///
/// Eligibility is entirely data-driven from this contract; the core never
/// special-cases field types.
pub trait FieldSettingsSource {
    /// Current settings for a field on an owner type. `None` when the field
    /// has no encryption configuration at all (treated as disabled).
    fn settings(&self, record_type: &str, field: &str) -> Option<FieldEncryptionSettings>;
}
