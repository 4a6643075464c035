//! Configuration management.
use std::path::PathBuf;

use config::Config;
use serde::Deserialize;

use crate::error::{TransferError, TransferResult};

/// Application settings, from built-in defaults overlaid by an optional
/// TOML file. CLI flags override individual values downstream.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
    /// Local (replacement unit) database settings.
    pub database: DatabaseSettings,
    /// Uploaded-data settings.
    pub import: ImportSettings,
}

/// Where the replacement unit keeps its databases and device registry.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Candidate database directories; firmware revisions moved it around,
    /// the first existing one wins.
    pub search_paths: Vec<String>,
    /// Registry document naming the local devices.
    pub registry_file: String,
}

/// Where uploaded data from the old unit is expected.
#[derive(Debug, Deserialize, Clone)]
pub struct ImportSettings {
    /// Default directory holding the uploaded interchange files.
    pub feed_dir: String,
    /// Registry filename looked up inside an old unit's data directory.
    pub registry_file: String,
}

impl Settings {
    /// Load settings, overlaying `config_path` (if given) onto defaults.
    pub fn new(config_path: Option<&str>) -> TransferResult<Self> {
        let mut builder = Config::builder()
            .set_default("log_level", "info")?
            .set_default(
                "database.search_paths",
                vec!["/HCBv2/data/hcb_rrd/", "/qmf/var/hcb_rrd/"],
            )?
            .set_default("database.registry_file", "/HCBv2/config/device-registry.json")?
            .set_default("import.feed_dir", "/var/volatile/tmp/exports/")?
            .set_default("import.registry_file", "device-registry.json")?;

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder.build()?;
        settings.try_deserialize().map_err(TransferError::Config)
    }

    /// First existing configured database directory, if any.
    pub fn locate_database_dir(&self) -> Option<PathBuf> {
        self.database
            .search_paths
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_dir())
    }
}
