use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Load a JSON array file. A missing or blank file is an empty collection;
/// anything unparseable is an error so the caller never overwrites it.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not found, starting empty", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid JSON array", path.display()))
}

/// Rewrite a collection file wholesale via a temp file and rename.
pub fn save<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let json = serde_json::to_vec_pretty(rows)?;
    let tmp = path.with_extension("json.tmp");

    fs::write(&tmp, &json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}
