use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A persisted record together with the schema version it was written under.
///
/// ```json
/// { "schema_version": 0, "attributes": { "id": "r1" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateFile {
    pub schema_version: u32,
    pub attributes: Value,
}

impl StateFile {
    pub fn new(schema_version: u32, attributes: Value) -> Self {
        Self {
            schema_version,
            attributes,
        }
    }
}

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("failed to read state file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse state file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

pub fn read_state_file(path: &Path) -> Result<StateFile, StateFileError> {
    let raw = fs::read_to_string(path).map_err(|source| StateFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StateFileError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn reads_versioned_records() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"schema_version":2,"attributes":{"id":"r1"}}"#).expect("write");

        let file = read_state_file(&path).expect("read");
        assert_eq!(file, StateFile::new(2, json!({ "id": "r1" })));
    }

    #[test]
    fn version_is_required() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"attributes":{}}"#).expect("write");

        let err = read_state_file(&path).expect_err("no version");
        assert!(err.to_string().contains("missing field `schema_version`"));
    }
}
