// src/config.rs
use serde::Deserialize;
use std::sync::OnceLock;

use crate::consts::DEFAULT_CHUNK_SIZE;

/// Crate config — loaded once, first use
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub paths: Paths,
    pub batch: Batch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paths {
    pub store_db: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Batch {
    pub chunk_size: usize,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load config at runtime — falls back to defaults if missing
pub fn load() -> &'static Config {
    CONFIG.get_or_init(|| {
        let config_path =
            std::env::var("FIELD_ENCRYPT_CONFIG").unwrap_or_else(|_| "field-encrypt.toml".into());

        let mut conf: Config = if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)
                .expect("failed to read field-encrypt config file");
            toml::from_str(&content).expect("invalid TOML in field-encrypt config file")
        } else {
            Config {
                paths: Paths {
                    store_db: "data/encrypted_fields.db".into(),
                },
                batch: Batch {
                    chunk_size: DEFAULT_CHUNK_SIZE,
                },
            }
        };

        // Test isolation: point the store at a scratch path without a config file
        if let Ok(path) = std::env::var("FIELD_ENCRYPT_STORE_DB") {
            conf.paths.store_db = path;
        }

        conf
    })
}
