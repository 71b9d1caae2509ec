// tests/support.rs
//! Shared test doubles: in-memory records, static settings, a reversible
//! mock capability, and in-memory record storage.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use field_encrypt::capability::{EncryptionCapability, PlaceholderOverride};
use field_encrypt::error::FieldEncryptError;
use field_encrypt::record::{EncryptableRecord, RecordRef, RecordStorage};
use field_encrypt::settings::{FieldEncryptionSettings, FieldSettingsSource};

/// Initialize test-friendly logging. Idempotent.
#[allow(dead_code)]
pub fn setup() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

/// In-memory record: language variants, multi-valued fields, properties.
#[derive(Debug, Clone)]
pub struct TestRecord {
    record_type: String,
    id: String,
    revision_id: Option<String>,
    languages: Vec<String>,
    // (lang, field) -> deltas -> property map
    values: BTreeMap<(String, String), Vec<BTreeMap<String, String>>>,
}

#[allow(dead_code)]
impl TestRecord {
    pub fn new(record_type: &str, id: &str) -> Self {
        TestRecord {
            record_type: record_type.to_string(),
            id: id.to_string(),
            revision_id: None,
            languages: vec!["en".to_string()],
            values: BTreeMap::new(),
        }
    }

    pub fn with_revision(mut self, revision_id: &str) -> Self {
        self.revision_id = Some(revision_id.to_string());
        self
    }

    pub fn with_languages(mut self, langs: &[&str]) -> Self {
        self.languages = langs.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Append one delta to a field with the given properties.
    pub fn push_item(&mut self, lang: &str, field: &str, props: &[(&str, &str)]) {
        let item = props
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.values
            .entry((lang.to_string(), field.to_string()))
            .or_default()
            .push(item);
    }

    pub fn storage_key(&self) -> String {
        match &self.revision_id {
            Some(rev) => format!("{}@{}", self.id, rev),
            None => self.id.clone(),
        }
    }
}

impl EncryptableRecord for TestRecord {
    fn record_type(&self) -> &str {
        &self.record_type
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn revision_id(&self) -> Option<String> {
        self.revision_id.clone()
    }

    fn languages(&self) -> Vec<String> {
        self.languages.clone()
    }

    fn field_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self.values.keys().map(|(_, f)| f.clone()).collect();
        names.into_iter().collect()
    }

    fn delta_count(&self, lang: &str, field: &str) -> usize {
        self.values
            .get(&(lang.to_string(), field.to_string()))
            .map(|items| items.len())
            .unwrap_or(0)
    }

    fn property(&self, lang: &str, field: &str, delta: usize, property: &str) -> Option<String> {
        self.values
            .get(&(lang.to_string(), field.to_string()))?
            .get(delta)?
            .get(property)
            .cloned()
    }

    fn set_property(&mut self, lang: &str, field: &str, delta: usize, property: &str, value: &str) {
        if let Some(items) = self.values.get_mut(&(lang.to_string(), field.to_string())) {
            if let Some(item) = items.get_mut(delta) {
                item.insert(property.to_string(), value.to_string());
            }
        }
    }
}

/// Static field-configuration source keyed by (record_type, field).
#[derive(Debug, Default)]
pub struct StaticSettings {
    entries: BTreeMap<(String, String), FieldEncryptionSettings>,
}

#[allow(dead_code)]
impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, record_type: &str, field: &str, settings: FieldEncryptionSettings) {
        self.entries
            .insert((record_type.to_string(), field.to_string()), settings);
    }
}

impl FieldSettingsSource for StaticSettings {
    fn settings(&self, record_type: &str, field: &str) -> Option<FieldEncryptionSettings> {
        self.entries
            .get(&(record_type.to_string(), field.to_string()))
            .cloned()
    }
}

const MASK: u8 = 0x5a;

/// Reversible mock cipher. The output embeds the profile reference, and
/// decrypting under a different profile fails, which is what the
/// reconciliation tests rely on. Optionally fails on a plaintext marker to
/// exercise error propagation.
#[derive(Debug, Default)]
pub struct MockCapability {
    pub fail_marker: Option<String>,
}

#[allow(dead_code)]
impl MockCapability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        MockCapability {
            fail_marker: Some(marker.to_string()),
        }
    }
}

impl EncryptionCapability for MockCapability {
    fn encrypt(&self, plaintext: &[u8], profile: &str) -> Result<Vec<u8>, FieldEncryptError> {
        if let Some(marker) = &self.fail_marker {
            if plaintext
                .windows(marker.len().max(1))
                .any(|w| w == marker.as_bytes())
            {
                return Err(FieldEncryptError::capability(profile, "backend unavailable"));
            }
        }
        let mut out = Vec::with_capacity(profile.len() + 1 + plaintext.len());
        out.extend_from_slice(profile.as_bytes());
        out.push(b':');
        out.extend_from_slice(plaintext);
        for byte in &mut out {
            *byte ^= MASK;
        }
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], profile: &str) -> Result<Vec<u8>, FieldEncryptError> {
        let unmasked: Vec<u8> = ciphertext.iter().map(|b| b ^ MASK).collect();
        let split = unmasked
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| FieldEncryptError::capability(profile, "malformed ciphertext"))?;
        if &unmasked[..split] != profile.as_bytes() {
            return Err(FieldEncryptError::capability(
                profile,
                "ciphertext was written under a different profile",
            ));
        }
        Ok(unmasked[split + 1..].to_vec())
    }
}

/// Placeholder override mirroring a field type that rejects the default
/// sentinel for its summary property.
#[derive(Debug)]
pub struct SummaryPlaceholder;

impl PlaceholderOverride for SummaryPlaceholder {
    fn placeholder_for(
        &self,
        _record: &dyn EncryptableRecord,
        _field: &str,
        property: &str,
    ) -> Option<String> {
        (property == "summary").then(|| "[ENCRYPTED SUMMARY]".to_string())
    }
}

/// In-memory record storage for the reconciliation coordinator.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    pub records: BTreeMap<String, TestRecord>,
    pub saves: usize,
}

#[allow(dead_code)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: TestRecord) {
        self.records.insert(record.storage_key(), record);
    }

    pub fn get(&self, key: &str) -> &TestRecord {
        self.records.get(key).expect("record present")
    }
}

impl RecordStorage for MemoryStorage {
    type Record = TestRecord;

    fn load(
        &mut self,
        _record_type: &str,
        r: &RecordRef,
    ) -> Result<TestRecord, FieldEncryptError> {
        let key = match &r.revision_id {
            Some(rev) => format!("{}@{}", r.id, rev),
            None => r.id.clone(),
        };
        self.records
            .get(&key)
            .cloned()
            .ok_or_else(|| FieldEncryptError::Storage(format!("no such record: {key}")))
    }

    fn save(&mut self, record: TestRecord) -> Result<(), FieldEncryptError> {
        self.saves += 1;
        self.records.insert(record.storage_key(), record);
        Ok(())
    }
}
