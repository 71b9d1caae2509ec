// src/store.rs
//! Ciphertext store — keyed persistence of encrypted property values
//!
//! One row per property instance, keyed by the full 7-tuple from
//! [`EncryptedValueKey`]. Writes are per-key upserts; no cross-key
//! transaction spans multiple properties or records.

use std::{fs, path::Path};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::FieldEncryptError;
use crate::identity::EncryptedValueKey;

type Result<T> = std::result::Result<T, FieldEncryptError>;

/// Open the ciphertext store at the configured path.
pub fn open_default_store_db() -> Result<Connection> {
    let config = crate::config::load();
    open_store_db(&config.paths.store_db)
}

/// Open (and if needed create) the ciphertext store at `db_path`.
pub fn open_store_db<P: AsRef<Path>>(db_path: P) -> Result<Connection> {
    if let Some(parent) = db_path.as_ref().parent() {
        let _ = fs::create_dir_all(parent);
    }

    let conn = Connection::open(db_path)?;
    init_store_schema(&conn)?;
    Ok(conn)
}

/// In-memory store, handy for hosts that keep ciphertext elsewhere and for tests.
pub fn open_store_db_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_store_schema(&conn)?;
    Ok(conn)
}

fn init_store_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS encrypted_field_value (
            record_type TEXT NOT NULL,
            record_id   TEXT NOT NULL,
            revision_id TEXT NOT NULL,
            field_name  TEXT NOT NULL,
            delta       INTEGER NOT NULL,
            property    TEXT NOT NULL,
            lang        TEXT NOT NULL,
            ciphertext  TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT,
            PRIMARY KEY (record_type, record_id, revision_id, field_name, delta, property, lang)
        );

        CREATE INDEX IF NOT EXISTS idx_efv_record
            ON encrypted_field_value(record_type, record_id);
        CREATE INDEX IF NOT EXISTS idx_efv_type_field
            ON encrypted_field_value(record_type, field_name);
        "#,
    )?;
    Ok(())
}

/// Upsert one ciphertext under its full key. Idempotent; an existing row is
/// overwritten in place, keeping its `created_at`.
pub fn put_encrypted_value(
    conn: &Connection,
    key: &EncryptedValueKey,
    ciphertext: &str,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO encrypted_field_value (
            record_type, record_id, revision_id, field_name, delta, property, lang, ciphertext
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT (record_type, record_id, revision_id, field_name, delta, property, lang)
        DO UPDATE SET ciphertext = excluded.ciphertext, updated_at = datetime('now')
        "#,
        params![
            &key.record_type,
            &key.record_id,
            &key.revision_id,
            &key.field_name,
            key.delta as i64,
            &key.property,
            &key.lang,
            ciphertext,
        ],
    )?;
    Ok(())
}

/// Look up one ciphertext. `None` is "nothing to decrypt", not an error.
pub fn get_encrypted_value(
    conn: &Connection,
    key: &EncryptedValueKey,
) -> Result<Option<String>> {
    let ciphertext = conn
        .query_row(
            r#"
            SELECT ciphertext FROM encrypted_field_value
            WHERE record_type = ?1 AND record_id = ?2 AND revision_id = ?3
              AND field_name = ?4 AND delta = ?5 AND property = ?6 AND lang = ?7
            "#,
            params![
                &key.record_type,
                &key.record_id,
                &key.revision_id,
                &key.field_name,
                key.delta as i64,
                &key.property,
                &key.lang,
            ],
            |row| row.get(0),
        )
        .optional()?;
    Ok(ciphertext)
}

/// Remove every row for one record, across all revisions, fields and
/// languages. Used when the record itself is deleted.
pub fn delete_for_record(conn: &Connection, record_type: &str, record_id: &str) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM encrypted_field_value WHERE record_type = ?1 AND record_id = ?2",
        params![record_type, record_id],
    )?;
    Ok(deleted)
}

/// Remove the rows for one field on one revision of one record. Used when a
/// field stops being encrypted on that record during reconciliation.
pub fn delete_for_record_field(
    conn: &Connection,
    record_type: &str,
    record_id: &str,
    revision_id: &str,
    field_name: &str,
) -> Result<usize> {
    let deleted = conn.execute(
        r#"
        DELETE FROM encrypted_field_value
        WHERE record_type = ?1 AND record_id = ?2 AND revision_id = ?3 AND field_name = ?4
        "#,
        params![record_type, record_id, revision_id, field_name],
    )?;
    Ok(deleted)
}

/// Remove every row for one field across all records of a type. Used when
/// the field's storage configuration itself is deleted.
pub fn delete_for_type_field(
    conn: &Connection,
    record_type: &str,
    field_name: &str,
) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM encrypted_field_value WHERE record_type = ?1 AND field_name = ?2",
        params![record_type, field_name],
    )?;
    Ok(deleted)
}

/// Number of rows stored for one record, all revisions/fields/langs.
pub fn count_for_record(conn: &Connection, record_type: &str, record_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM encrypted_field_value WHERE record_type = ?1 AND record_id = ?2",
        params![record_type, record_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Total number of rows in the store.
pub fn count_all(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM encrypted_field_value", [], |row| {
        row.get(0)
    })?;
    Ok(count as u64)
}
