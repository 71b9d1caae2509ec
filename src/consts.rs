// src/consts.rs
//! Shared constants — defaults used across the crate

/// Sentinel written into primary field storage in place of encrypted plaintext.
// Must be non-null so indexes and existence queries over the row keep working.
pub const DEFAULT_PLACEHOLDER: &str = "[ENCRYPTED]";

/// Records migrated per reconciliation invocation.
// Small enough to fit one request/tick on hosts with execution-time limits.
pub const DEFAULT_CHUNK_SIZE: usize = 5;
