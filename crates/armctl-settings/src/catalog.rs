//! Sequence catalog file
//!
//! A JSON snapshot of the device's stored sequences, kept for reference.
//! The file only records what the device reported; nothing in it is ever
//! sent back to the arm.

use crate::error::{SettingsError, SettingsResult};
use armctl_core::SequenceEntry;
use serde::{Deserialize, Serialize};
use std::path::Path;

const CATALOG_NOTE: &str =
    "Sequence listing as reported by the arm. Sequence steps are stored on the device.";

/// On-disk layout of a catalog file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Free-form note for whoever opens the file
    #[serde(default)]
    pub note: String,
    /// Stored sequences
    #[serde(default)]
    pub sequences: Vec<SequenceEntry>,
}

/// Write `entries` to `path`
pub fn save_catalog(path: &Path, entries: &[SequenceEntry]) -> SettingsResult<()> {
    let file = CatalogFile {
        note: CATALOG_NOTE.to_string(),
        sequences: entries.to_vec(),
    };
    let content = serde_json::to_string_pretty(&file)?;
    std::fs::write(path, content).map_err(|e| SettingsError::SaveError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Read the sequence listing stored at `path`
pub fn load_catalog(path: &Path) -> SettingsResult<Vec<SequenceEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| SettingsError::LoadError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let file: CatalogFile = serde_json::from_str(&content)?;
    Ok(file.sequences)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_layout() {
        let file = CatalogFile {
            note: String::new(),
            sequences: vec![SequenceEntry::new(3, "wave")],
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["sequences"][0]["index"], 3);
        assert_eq!(json["sequences"][0]["name"], "wave");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_catalog(Path::new("/nonexistent/armctl/catalog.json")),
            Err(SettingsError::LoadError { .. })
        ));
    }
}
