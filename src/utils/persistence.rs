use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Writes `value` as pretty JSON by staging to a sibling temporary file and renaming it.
pub fn save_json_atomic<T: Serialize>(value: &T, path: &Path) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = tmp_path(path);
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Loads a JSON document, returning `None` when the file does not exist yet.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&data)?))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_restores_value() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("data.json");
        let mut value = BTreeMap::new();
        value.insert("alice".to_string(), 3);

        save_json_atomic(&value, &path).unwrap();
        let loaded: Option<BTreeMap<String, i32>> = load_json(&path).unwrap();

        assert_eq!(loaded, Some(value));
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn missing_file_loads_as_none() {
        let temp = tempdir().unwrap();
        let loaded: Option<Vec<String>> = load_json(&temp.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }
}
