// src/error.rs
//! Public error type for the entire crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldEncryptError {
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("encryption capability failed for profile '{profile}': {message}")]
    Capability { profile: String, message: String },

    #[error("stored ciphertext is not valid base64: {0}")]
    Armor(#[from] base64::DecodeError),

    #[error("recovered plaintext is not valid UTF-8: {0}")]
    Plaintext(#[from] std::string::FromUtf8Error),

    #[error("record storage error: {0}")]
    Storage(String),
}

impl FieldEncryptError {
    /// Build a `Capability` error. Used by `EncryptionCapability` implementors.
    pub fn capability(profile: impl Into<String>, message: impl Into<String>) -> Self {
        FieldEncryptError::Capability {
            profile: profile.into(),
            message: message.into(),
        }
    }
}
