use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MuportError, Result};

pub const CONFIG_FILE: &str = "muport.yml";
pub const DEFAULT_PREFIX: &str = "wp_";
pub const DEFAULT_WP_BIN: &str = "wp";

/// Optional on-disk settings. Every field may be omitted; CLI flags override
/// whatever is here.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub db: Option<PathBuf>,
    pub prefix: Option<String>,
    pub wp_bin: Option<String>,
}

impl ConfigFile {
    /// Walk up from `start` towards the filesystem root looking for
    /// `muport.yml`. No file anywhere is not an error.
    pub fn discover(start: &Path) -> Result<Option<Self>> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Ok(Some(Self::load(&candidate)?));
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut file: Self = serde_yaml::from_str(&raw)?;
        // A relative db path means "relative to the config file", not to
        // wherever the command happens to run from.
        if let Some(db) = &file.db
            && db.is_relative()
            && let Some(parent) = path.parent()
        {
            file.db = Some(parent.join(db));
        }
        Ok(file)
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Destination SQLite database.
    pub db: PathBuf,
    /// Network base table prefix.
    pub prefix: String,
    /// wp-cli binary for the external operations.
    pub wp_bin: String,
}

impl Config {
    /// CLI flag > muport.yml > built-in default. The database has no
    /// default; it must come from one of the first two.
    pub fn resolve(
        cli_db: Option<PathBuf>,
        cli_prefix: Option<String>,
        cli_wp_bin: Option<String>,
    ) -> Result<Self> {
        let file = ConfigFile::discover(&std::env::current_dir()?)?.unwrap_or_default();
        Self::merge(cli_db, cli_prefix, cli_wp_bin, file)
    }

    fn merge(
        cli_db: Option<PathBuf>,
        cli_prefix: Option<String>,
        cli_wp_bin: Option<String>,
        file: ConfigFile,
    ) -> Result<Self> {
        let db = cli_db.or(file.db).ok_or(MuportError::NoDatabase)?;
        let prefix = cli_prefix
            .or(file.prefix)
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let wp_bin = cli_wp_bin
            .or(file.wp_bin)
            .unwrap_or_else(|| DEFAULT_WP_BIN.to_string());
        Ok(Self { db, prefix, wp_bin })
    }
}
