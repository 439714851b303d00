use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of the credential pool as configured on disk. The pool is
/// loaded once at startup; a credential's identity is its position in the
/// configured order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub refresh_token: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(
        default,
        rename = "projectId",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_id: Option<String>,
    #[serde(
        default,
        rename = "sessionId",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,
}

/// A pool credential merged with a live access token, ready for upstream
/// calls.
#[derive(Debug, Clone)]
pub struct Credential {
    pub index: usize,
    pub access_token: String,
    pub project_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("failed to read accounts file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse accounts file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Load the credential pool from a JSON array. A missing file yields an
/// empty pool rather than an error; the rotation manager then reports no
/// credential available per call.
pub fn load_accounts(path: &Path) -> Result<Vec<CredentialConfig>, AccountsError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path).map_err(|source| AccountsError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| AccountsError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pool_entries() {
        let pool: Vec<CredentialConfig> = serde_json::from_str(
            r#"[
                { "refresh_token": "rt-a" },
                { "refresh_token": "rt-b", "disabled": true, "projectId": "p1", "sessionId": "s1" }
            ]"#,
        )
        .unwrap();
        assert_eq!(pool.len(), 2);
        assert!(!pool[0].disabled);
        assert!(pool[0].project_id.is_none());
        assert!(pool[1].disabled);
        assert_eq!(pool[1].project_id.as_deref(), Some("p1"));
        assert_eq!(pool[1].session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn missing_file_yields_empty_pool() {
        let pool = load_accounts(Path::new("/nonexistent/accounts.json")).unwrap();
        assert!(pool.is_empty());
    }
}
