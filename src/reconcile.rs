// src/reconcile.rs
//! Reconciliation coordinator — migrates existing data after a settings change
//!
//! When a field's encryption settings change, every record (and revision)
//! that already holds data in that field must be re-processed: decrypted
//! under the *old* settings, then re-encrypted under the new ones (or left
//! as plaintext when encryption was disabled). The coordinator works through
//! a caller-supplied candidate list in bounded chunks, one chunk per
//! invocation, so a host with execution-time limits can drive it from a
//! queue or cron tick. All resume state lives in the [`ReconciliationBatch`]
//! value itself; it serializes, so a scheduler can park it between ticks.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{info, warn};

use crate::error::FieldEncryptError;
use crate::processor::FieldCryptoProcessor;
use crate::record::{EncryptableRecord, RecordRef, RecordStorage};
use crate::settings::FieldEncryptionSettings;
use crate::store;

/// One record that could not be migrated. Recorded, not fatal: the rest of
/// the chunk and subsequent chunks still run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFailure {
    pub record: RecordRef,
    pub message: String,
}

/// Completion report for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Records actually migrated, not merely attempted.
    pub processed: usize,
    pub failed: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_finished(&self) -> bool {
        self.processed + self.failed >= self.total
    }

    /// Completion level in `0.0..=1.0`, for host progress bars.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.processed + self.failed) as f64 / self.total as f64
        }
    }
}

/// State of one reconciliation run for one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationBatch {
    record_type: String,
    field_name: String,
    /// Settings in effect when the existing ciphertext was written.
    old_settings: FieldEncryptionSettings,
    chunk_size: usize,
    remaining: VecDeque<RecordRef>,
    processed: usize,
    total: usize,
    failures: Vec<RecordFailure>,
}

impl ReconciliationBatch {
    /// Start a run over a point-in-time candidate snapshot. Records modified
    /// after the snapshot reconcile themselves on their own next save under
    /// the new settings; they are not tracked here.
    ///
    /// The chunk size comes from the crate config (`[batch] chunk_size`);
    /// override it per batch with [`with_chunk_size`](Self::with_chunk_size).
    pub fn new(
        record_type: impl Into<String>,
        field_name: impl Into<String>,
        old_settings: FieldEncryptionSettings,
        candidates: Vec<RecordRef>,
    ) -> Self {
        let total = candidates.len();
        ReconciliationBatch {
            record_type: record_type.into(),
            field_name: field_name.into(),
            old_settings,
            chunk_size: crate::config::load().batch.chunk_size.max(1),
            remaining: candidates.into(),
            processed: 0,
            total,
            failures: Vec::new(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn progress(&self) -> Progress {
        Progress {
            processed: self.processed,
            failed: self.failures.len(),
            total: self.total,
        }
    }

    pub fn failures(&self) -> &[RecordFailure] {
        &self.failures
    }

    /// Process up to one chunk of candidates. Invoking again after the run
    /// has finished is a no-op. Per-record errors are recorded in
    /// [`failures`](Self::failures) and do not abort the chunk.
    pub fn run_chunk<S: RecordStorage>(
        &mut self,
        storage: &mut S,
        processor: &FieldCryptoProcessor<'_>,
    ) -> Progress {
        for _ in 0..self.chunk_size {
            let Some(record_ref) = self.remaining.pop_front() else {
                break;
            };
            match self.migrate_record(storage, processor, &record_ref) {
                Ok(()) => self.processed += 1,
                Err(err) => {
                    warn!(
                        record_type = %self.record_type,
                        field = %self.field_name,
                        record = %record_ref.id,
                        error = %err,
                        "record failed to reconcile"
                    );
                    self.failures.push(RecordFailure {
                        record: record_ref,
                        message: err.to_string(),
                    });
                }
            }
        }

        let progress = self.progress();
        info!(
            record_type = %self.record_type,
            field = %self.field_name,
            processed = progress.processed,
            total = progress.total,
            "reconciliation chunk complete"
        );
        progress
    }

    fn migrate_record<S: RecordStorage>(
        &self,
        storage: &mut S,
        processor: &FieldCryptoProcessor<'_>,
        record_ref: &RecordRef,
    ) -> Result<(), FieldEncryptError> {
        let mut record = storage.load(&self.record_type, record_ref)?;

        // Restore plaintext from the ciphertext written under the old
        // settings. Properties already re-encrypted (or never encrypted)
        // have no matching row and pass through unchanged, which is what
        // makes a re-run a correct no-op.
        processor.decrypt_field_with(&mut record, &self.field_name, &self.old_settings)?;

        // Every row the field held under the old settings is now stale: the
        // record carries plaintext again. Prune them before the re-encrypt
        // pass, so properties dropped from the configured set (or the whole
        // field, when encryption was disabled) leave no orphaned ciphertext.
        // Pruning goes through the processor's own connection so it cannot
        // target a different store than the re-encrypt writes.
        let record_id = record.id();
        let revision_id = record.revision_id().unwrap_or_else(|| record_id.clone());
        store::delete_for_record_field(
            processor.connection(),
            &self.record_type,
            &record_id,
            &revision_id,
            &self.field_name,
        )?;

        // The ordinary pre-save pass re-encrypts under the current settings.
        // With encryption disabled the field is simply not eligible and the
        // record keeps its plaintext.
        processor.encrypt_record(&mut record)?;

        storage.save(record)?;
        Ok(())
    }
}
