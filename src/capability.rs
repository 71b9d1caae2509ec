// src/capability.rs
//! External encryption capability and placeholder override contracts
//!
//! The cipher itself is not this crate's problem. Implementations receive an
//! opaque profile reference selecting key/algorithm configuration and return
//! an opaque payload (including any provider framing such as an auth tag).

use crate::error::FieldEncryptError;
use crate::record::EncryptableRecord;

pub trait EncryptionCapability {
    fn encrypt(&self, plaintext: &[u8], profile: &str) -> Result<Vec<u8>, FieldEncryptError>;

    fn decrypt(&self, ciphertext: &[u8], profile: &str) -> Result<Vec<u8>, FieldEncryptError>;
}

/// Extension point replacing the default `"[ENCRYPTED]"` sentinel written to
/// primary storage. Some field value types reject the default string, so a
/// collaborator may substitute one per record/field/property.
pub trait PlaceholderOverride {
    /// `None` keeps the default placeholder.
    fn placeholder_for(
        &self,
        record: &dyn EncryptableRecord,
        field: &str,
        property: &str,
    ) -> Option<String>;
}
