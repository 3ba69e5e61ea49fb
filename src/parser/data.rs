//! Scenario and credential files
//!
//! Both are JSON. Problems here are fatal: the run cannot start without them.

use log::info;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::types::{CredentialMap, Scenario};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("data file is missing: {0}")]
    NotFound(PathBuf),

    #[error("invalid data file {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("cannot read data file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn read_json(path: &Path) -> Result<serde_json::Value, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| DataError::InvalidFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load the scenario list; the root must be a JSON array
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>, DataError> {
    let value = read_json(path)?;
    if !value.is_array() {
        return Err(DataError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "test scenarios file must contain a list of scenarios".to_string(),
        });
    }
    let scenarios: Vec<Scenario> =
        serde_json::from_value(value).map_err(|e| DataError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    for (index, scenario) in scenarios.iter().enumerate() {
        scenario
            .validate()
            .map_err(|reason| DataError::InvalidFormat {
                path: path.to_path_buf(),
                reason: format!("scenario #{}: {}", index + 1, reason),
            })?;
    }

    info!("loaded {} scenario(s) from {}", scenarios.len(), path.display());
    Ok(scenarios)
}

/// Load the user key to credential map
pub fn load_credentials(path: &Path) -> Result<CredentialMap, DataError> {
    let value = read_json(path)?;
    if !value.is_object() {
        return Err(DataError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "users file must contain an object keyed by user".to_string(),
        });
    }
    let users: CredentialMap =
        serde_json::from_value(value).map_err(|e| DataError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    info!("loaded credentials for {} user(s)", users.len());
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_scenarios() {
        let file = json_file(
            r#"[
                {"query": "vintage camera", "maxPrice": 50, "limit": 3, "maxCartTotal": 120, "userKey": "defaultUser"},
                {"query": "tripod", "maxPrice": 30, "maxCartTotal": 60}
            ]"#,
        );
        let scenarios = load_scenarios(file.path()).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].limit, 3);
        assert_eq!(scenarios[1].limit, 5);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_scenarios(Path::new("/nonexistent/scenarios.json")).unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
        let err = load_credentials(Path::new("/nonexistent/users.json")).unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }

    #[test]
    fn test_non_list_root_is_invalid() {
        let file = json_file(r#"{"query": "camera"}"#);
        let err = load_scenarios(file.path()).unwrap_err();
        assert!(matches!(err, DataError::InvalidFormat { .. }));
    }

    #[test]
    fn test_invalid_scenario_values_rejected() {
        let file = json_file(r#"[{"query": "camera", "maxPrice": -1, "maxCartTotal": 10}]"#);
        let err = load_scenarios(file.path()).unwrap_err();
        assert!(err.to_string().contains("scenario #1"));
    }

    #[test]
    fn test_load_credentials() {
        let file = json_file(r#"{"defaultUser": {"username": "alice", "password": "pw"}}"#);
        let users = load_credentials(file.path()).unwrap();
        assert_eq!(users["defaultUser"].username, "alice");
    }
}
