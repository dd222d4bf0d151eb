use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{MuportError, Result};

/// Default on-disk name, shared with the wp-cli original so existing map
/// files keep working.
pub const DEFAULT_MAP_FILE: &str = "ids_maps.json";

/// Old→new user ID map.
///
/// Built once during `import users` and replayed by the `posts` rewrite
/// passes, possibly in a separate invocation days later. The flat JSON file
/// written by [`IdsMap::save_to_file`] is the only contract between the two
/// sides, so the on-disk form must stay reloadable byte-for-byte.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdsMap {
    entries: BTreeMap<u64, u64>,
}

impl IdsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `old` → `new`.
    ///
    /// Re-setting the identical value is a no-op so re-running an import over
    /// the same export stays idempotent. A disagreeing value means the same
    /// old ID resolved to two different accounts and fails.
    pub fn set(&mut self, old: u64, new: u64) -> Result<()> {
        if let Some(&existing) = self.entries.get(&old) {
            if existing != new {
                return Err(MuportError::DuplicateMapping { old, existing, new });
            }
            return Ok(());
        }
        self.entries.insert(old, new);
        Ok(())
    }

    pub fn get(&self, old: u64) -> Option<u64> {
        self.entries.get(&old).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending old-ID order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.entries.iter().map(|(old, new)| (*old, *new))
    }

    /// Serialize as a flat JSON object (`{"5":12}`). Keys come out in
    /// numeric order, which keeps repeated saves byte-identical.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string(&self.entries)?)?;
        Ok(())
    }

    /// Inverse of [`IdsMap::save_to_file`].
    ///
    /// A missing path or empty file is an input error; malformed JSON or a
    /// non-flat shape is a parse error. `{}` loads as a valid empty map.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if path.as_os_str().is_empty() || !path.is_file() {
            return Err(MuportError::InvalidInputFile(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Err(MuportError::EmptyMapFile(path.to_path_buf()));
        }
        Self::parse(&raw)
    }

    /// Keys are decimal strings; values may be JSON numbers or numeric
    /// strings (the PHP exporter emitted both over its lifetime). Both
    /// sides must be positive: no identity is ever zero, so a zero entry
    /// means the file was mangled.
    fn parse(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| MuportError::MapParse(e.to_string()))?;

        let Value::Object(object) = value else {
            return Err(MuportError::MapParse(
                "expected a flat JSON object of old/new id pairs".into(),
            ));
        };

        let mut map = Self::new();
        for (key, value) in &object {
            let old = key
                .parse::<u64>()
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(|| {
                    MuportError::MapParse(format!("key '{key}' is not a positive numeric id"))
                })?;
            let new = match value {
                Value::Number(n) => n.as_u64().ok_or_else(|| {
                    MuportError::MapParse(format!("value for '{key}' is not an unsigned id"))
                })?,
                Value::String(s) => s.parse::<u64>().map_err(|_| {
                    MuportError::MapParse(format!("value '{s}' for '{key}' is not a numeric id"))
                })?,
                other => {
                    return Err(MuportError::MapParse(format!(
                        "value for '{key}' must be a number or numeric string, got {other}"
                    )));
                }
            };
            if new == 0 {
                return Err(MuportError::MapParse(format!(
                    "value for '{key}' must be a positive id"
                )));
            }
            map.set(old, new)?;
        }
        Ok(map)
    }
}
