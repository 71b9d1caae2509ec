// src/processor.rs
//! Field crypto processor — per-record encrypt/decrypt passes
//!
//! Walks every language variant, field, delta and configured property of a
//! record in a fixed order (field, delta ascending, configured-property
//! order), so repeated runs against unchanged input are byte-identical.
//!
//! On encrypt, plaintext goes to the ciphertext store and the primary field
//! value is replaced with a placeholder; on decrypt, the placeholder is
//! swapped back for the recovered plaintext. A missing store row on decrypt
//! leaves the stored value untouched: a record whose property was never
//! encrypted, or whose ciphertext was already pruned, still loads.

use std::collections::BTreeSet;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::capability::{EncryptionCapability, PlaceholderOverride};
use crate::consts::DEFAULT_PLACEHOLDER;
use crate::error::FieldEncryptError;
use crate::identity::EncryptedValueKey;
use crate::record::EncryptableRecord;
use crate::settings::{FieldEncryptionSettings, FieldSettingsSource};
use crate::store;

type Result<T> = std::result::Result<T, FieldEncryptError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

pub struct FieldCryptoProcessor<'a> {
    conn: &'a Connection,
    settings: &'a dyn FieldSettingsSource,
    capability: &'a dyn EncryptionCapability,
    placeholder_override: Option<&'a dyn PlaceholderOverride>,
}

impl<'a> FieldCryptoProcessor<'a> {
    pub fn new(
        conn: &'a Connection,
        settings: &'a dyn FieldSettingsSource,
        capability: &'a dyn EncryptionCapability,
    ) -> Self {
        FieldCryptoProcessor {
            conn,
            settings,
            capability,
            placeholder_override: None,
        }
    }

    /// Install a collaborator that substitutes the placeholder written to
    /// primary storage for specific record/field/property combinations.
    pub fn with_placeholder_override(mut self, p: &'a dyn PlaceholderOverride) -> Self {
        self.placeholder_override = Some(p);
        self
    }

    /// True if any field on the record currently has encryption enabled.
    /// Scans field configuration only; never touches the ciphertext store.
    pub fn record_has_encrypted_fields(&self, record: &dyn EncryptableRecord) -> bool {
        record
            .field_names()
            .iter()
            .any(|field| self.field_is_encrypted(record.record_type(), field))
    }

    /// Fields on the record that are encrypted and configured to exclude
    /// derived caches. A caller-owned rendering layer marks its output
    /// uncacheable when this set is non-empty. Read-only.
    pub fn cache_exclusion_for(&self, record: &dyn EncryptableRecord) -> BTreeSet<String> {
        let record_type = record.record_type();
        record
            .field_names()
            .into_iter()
            .filter(|field| {
                self.settings
                    .settings(record_type, field)
                    .map(|s| s.enabled && s.cache_exclude)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// The ciphertext store connection this processor reads and writes.
    pub fn connection(&self) -> &'a Connection {
        self.conn
    }

    /// Current configuration for one field, as seen by this processor.
    pub fn settings_for(
        &self,
        record_type: &str,
        field: &str,
    ) -> Option<FieldEncryptionSettings> {
        self.settings.settings(record_type, field)
    }

    /// Encrypt every eligible property of every language variant, writing
    /// ciphertext to the store and placeholders into the record.
    pub fn encrypt_record(&self, record: &mut dyn EncryptableRecord) -> Result<()> {
        self.process_record(record, Direction::Encrypt, None)
    }

    /// Decrypt every eligible property of every language variant.
    pub fn decrypt_record(&self, record: &mut dyn EncryptableRecord) -> Result<()> {
        self.process_record(record, Direction::Decrypt, None)
    }

    /// Like [`decrypt_record`](Self::decrypt_record), but leaves `skip_field`
    /// untouched. For hosts whose record-load path decrypts automatically:
    /// while reconciliation is reading a field's stored value as ciphertext
    /// on purpose, that field must not also be decrypted by the load hook.
    /// The skip is a per-call parameter, so concurrent passes over other
    /// records or fields are unaffected.
    pub fn decrypt_record_skipping(
        &self,
        record: &mut dyn EncryptableRecord,
        skip_field: Option<&str>,
    ) -> Result<()> {
        self.process_record(record, Direction::Decrypt, skip_field)
    }

    /// Forced decrypt of one field under explicit settings, bypassing the
    /// current field configuration entirely. Reconciliation uses this to
    /// decrypt under the settings that were in effect when the ciphertext
    /// was written.
    pub fn decrypt_field_with(
        &self,
        record: &mut dyn EncryptableRecord,
        field: &str,
        settings: &FieldEncryptionSettings,
    ) -> Result<()> {
        for lang in record.languages() {
            self.process_field(record, &lang, field, settings, Direction::Decrypt)?;
        }
        Ok(())
    }

    fn field_is_encrypted(&self, record_type: &str, field: &str) -> bool {
        self.settings
            .settings(record_type, field)
            .map(|s| s.enabled)
            .unwrap_or(false)
    }

    fn process_record(
        &self,
        record: &mut dyn EncryptableRecord,
        direction: Direction,
        skip_field: Option<&str>,
    ) -> Result<()> {
        let record_type = record.record_type().to_string();
        for lang in record.languages() {
            for field in record.field_names() {
                if skip_field == Some(field.as_str()) {
                    continue;
                }
                let Some(settings) = self.settings.settings(&record_type, &field) else {
                    continue;
                };
                if !settings.enabled {
                    continue;
                }
                self.process_field(record, &lang, &field, &settings, direction)?;
            }
        }
        Ok(())
    }

    fn process_field(
        &self,
        record: &mut dyn EncryptableRecord,
        lang: &str,
        field: &str,
        settings: &FieldEncryptionSettings,
        direction: Direction,
    ) -> Result<()> {
        for delta in 0..record.delta_count(lang, field) {
            for property in &settings.properties {
                match direction {
                    Direction::Encrypt => {
                        self.encrypt_property(record, lang, field, delta, property, settings)?
                    }
                    Direction::Decrypt => {
                        self.decrypt_property(record, lang, field, delta, property, settings)?
                    }
                }
            }
        }
        Ok(())
    }

    fn encrypt_property(
        &self,
        record: &mut dyn EncryptableRecord,
        lang: &str,
        field: &str,
        delta: usize,
        property: &str,
        settings: &FieldEncryptionSettings,
    ) -> Result<()> {
        // A delta without this property is skipped, not errored.
        let Some(value) = record.property(lang, field, delta, property) else {
            return Ok(());
        };
        // Encrypting an intentionally-empty value is a no-op.
        if value.is_empty() {
            return Ok(());
        }
        let placeholder = self.placeholder_for(&*record, field, property);
        if value == placeholder {
            // Already substituted by a previous pass; re-encrypting the
            // sentinel would destroy the real ciphertext's meaning.
            debug!(field, property, "value already carries the placeholder, skipping");
            return Ok(());
        }
        let Some(profile) = settings.profile.as_deref() else {
            warn!(field, property, "field marked encrypted but has no profile reference");
            return Ok(());
        };

        let raw = self.capability.encrypt(value.as_bytes(), profile)?;
        let armored = STANDARD.encode(raw);
        let key = EncryptedValueKey::for_property(&*record, lang, field, delta, property);
        store::put_encrypted_value(self.conn, &key, &armored)?;
        record.set_property(lang, field, delta, property, &placeholder);
        Ok(())
    }

    fn decrypt_property(
        &self,
        record: &mut dyn EncryptableRecord,
        lang: &str,
        field: &str,
        delta: usize,
        property: &str,
        settings: &FieldEncryptionSettings,
    ) -> Result<()> {
        let Some(current) = record.property(lang, field, delta, property) else {
            return Ok(());
        };
        if current.is_empty() {
            return Ok(());
        }
        let key = EncryptedValueKey::for_property(&*record, lang, field, delta, property);
        // No row means nothing was ever encrypted here (or it was pruned);
        // the stored value stands.
        let Some(armored) = store::get_encrypted_value(self.conn, &key)? else {
            return Ok(());
        };
        let Some(profile) = settings.profile.as_deref() else {
            warn!(field, property, "stored ciphertext but no profile reference to decrypt with");
            return Ok(());
        };

        let raw = STANDARD.decode(armored.as_bytes())?;
        let plaintext = String::from_utf8(self.capability.decrypt(&raw, profile)?)?;
        record.set_property(lang, field, delta, property, &plaintext);
        Ok(())
    }

    fn placeholder_for(
        &self,
        record: &dyn EncryptableRecord,
        field: &str,
        property: &str,
    ) -> String {
        self.placeholder_override
            .and_then(|p| p.placeholder_for(record, field, property))
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string())
    }
}
