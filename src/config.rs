//! Configuration handling for the dispatcher

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::engine::{ListMode, RowSchema};
use crate::remote::RetryPolicy;

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "CASE_DISPATCH_API_URL";

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("api_base_url must be an http(s) URL, got '{0}'")]
    InvalidBaseUrl(String),
    #[error("page_size must be at least 1")]
    ZeroPageSize,
    #[error("concurrency_limit must be at least 1")]
    ZeroConcurrency,
    #[error("{which} schema is invalid: {reason}")]
    InvalidSchema { which: &'static str, reason: String },
    #[error("{0} filter must be a JSON object")]
    InvalidFilter(&'static str),
}

/// User configuration for the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Base URL every remote path is joined onto
    pub api_base_url: String,
    /// Case listing endpoint
    pub cases_path: String,
    /// Operator directory endpoint
    pub assignees_path: String,
    /// Assignment endpoint
    pub assign_path: String,
    /// Header carrying the credential
    pub auth_header: String,
    /// Prefix put before the credential, e.g. "Bearer"
    pub auth_scheme: Option<String>,
    pub page_size: u32,
    /// Page requests in flight at once
    pub concurrency_limit: usize,
    pub request_timeout_secs: u64,
    pub retry: RetryPolicy,
    /// Rows rendered beyond each edge of the table
    pub overscan: usize,
    /// Where exports are written; defaults to the data directory
    pub export_dir: Option<PathBuf>,
    /// Filter object sent with the unassigned case listing
    pub unassigned_filter: Value,
    /// Filter object sent with the reassign case listing
    pub reassign_filter: Value,
    pub case_schema: RowSchema,
    pub assignee_schema: RowSchema,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            cases_path: "cases/search".to_string(),
            assignees_path: "operators/search".to_string(),
            assign_path: "cases/assign".to_string(),
            auth_header: "Authorization".to_string(),
            auth_scheme: Some("Bearer".to_string()),
            page_size: 50,
            concurrency_limit: 5,
            request_timeout_secs: 30,
            retry: RetryPolicy::default(),
            overscan: 5,
            export_dir: None,
            unassigned_filter: json!({ "assigned": false }),
            reassign_filter: json!({ "assigned": true }),
            case_schema: RowSchema::cases(),
            assignee_schema: RowSchema::assignees(),
        }
    }
}

impl DispatchConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("io", "casedispatch", "case-dispatch")
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Platform data directory (credential file, default export location)
    pub fn data_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Load configuration from the platform config file, then apply the
    /// environment override
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.apply_api_url_override(&url);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: DispatchConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn apply_api_url_override(&mut self, url: &str) {
        let url = url.trim();
        if !url.is_empty() {
            tracing::info!("Using API URL from {API_URL_ENV}");
            self.api_base_url = url.to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.api_base_url.clone()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        self.case_schema
            .validate()
            .map_err(|reason| ConfigError::InvalidSchema { which: "case", reason })?;
        self.assignee_schema
            .validate()
            .map_err(|reason| ConfigError::InvalidSchema {
                which: "assignee",
                reason,
            })?;
        if !self.unassigned_filter.is_object() {
            return Err(ConfigError::InvalidFilter("unassigned"));
        }
        if !self.reassign_filter.is_object() {
            return Err(ConfigError::InvalidFilter("reassign"));
        }
        Ok(())
    }

    /// Filter payload sent for a case-list mode
    pub fn filter_for(&self, mode: ListMode) -> &Value {
        match mode {
            ListMode::Unassigned => &self.unassigned_filter,
            ListMode::Reassign => &self.reassign_filter,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Resolved export directory
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(|| Self::data_dir().map(|dir| dir.join("exports")))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = DispatchConfig::default();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.concurrency_limit, 5);
        assert_eq!(config.auth_header, "Authorization");
        assert_eq!(config.auth_scheme.as_deref(), Some("Bearer"));
        assert!(config.export_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialization() {
        let config = DispatchConfig {
            api_base_url: "https://cases.example.test/v2".to_string(),
            page_size: 100,
            concurrency_limit: 2,
            export_dir: Some(PathBuf::from("/tmp/exports")),
            ..Default::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: DispatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_deserialize_from_empty_json() {
        let parsed: DispatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, DispatchConfig::default());
    }

    #[test]
    fn test_partial_deserialization() {
        let json = r#"{"page_size": 20, "retry": {"max_attempts": 5}, "unknown_field": 1}"#;
        let parsed: DispatchConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.page_size, 20);
        assert_eq!(parsed.retry.max_attempts, 5);
        assert_eq!(parsed.retry.initial_backoff_ms, RetryPolicy::default().initial_backoff_ms);
        assert_eq!(parsed.concurrency_limit, 5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = DispatchConfig {
            api_base_url: "localhost:8080".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBaseUrl(_))));

        let config = DispatchConfig {
            page_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPageSize));

        let config = DispatchConfig {
            concurrency_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));

        let mut config = DispatchConfig::default();
        config.case_schema.key_field = "missing".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSchema { which: "case", .. })
        ));

        let config = DispatchConfig {
            reassign_filter: json!("assigned"),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidFilter("reassign")));
    }

    #[test]
    fn test_filter_for_mode() {
        let config = DispatchConfig::default();
        assert_eq!(config.filter_for(ListMode::Unassigned), &json!({"assigned": false}));
        assert_eq!(config.filter_for(ListMode::Reassign), &json!({"assigned": true}));
    }

    #[test]
    fn test_api_url_override_ignores_blank() {
        let mut config = DispatchConfig::default();
        config.apply_api_url_override("   ");
        assert_eq!(config.api_base_url, DispatchConfig::default().api_base_url);
        config.apply_api_url_override(" https://other.test ");
        assert_eq!(config.api_base_url, "https://other.test");
    }

    #[test]
    fn test_load_from_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = DispatchConfig {
            overscan: 9,
            ..Default::default()
        };
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(DispatchConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_from_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = DispatchConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, DispatchConfig::default());
    }

    #[test]
    fn test_load_from_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(DispatchConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_export_dir_prefers_configured() {
        let config = DispatchConfig {
            export_dir: Some(PathBuf::from("/srv/out")),
            ..Default::default()
        };
        assert_eq!(config.export_dir(), PathBuf::from("/srv/out"));
    }

    #[test]
    fn test_config_path_returns_option() {
        let _path = DispatchConfig::config_path();
    }
}
