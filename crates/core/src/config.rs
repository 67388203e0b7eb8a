//! Runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the
//! services, so request handling never reads process-wide environment variables.
//! Sources, highest precedence first: a `server_config.json` file, `NCD_*`
//! environment variables, built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{ReferError, ReferResult};

/// File name looked for in the working directory at startup.
pub const CONFIG_FILE_NAME: &str = "server_config.json";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_TOKEN_TTL_MINUTES: u64 = 24 * 60;
const DEFAULT_TOKEN_SECRET: &str = "dev-secret-change-me";

/// Resolved configuration, as the services consume it.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Allowed CORS origins; empty means allow any origin.
    pub cors_origins: Vec<String>,
    pub token_secret: String,
    pub token_ttl_minutes: u64,
    /// JSON snapshot path; `None` runs fully in memory.
    pub data_file: Option<PathBuf>,
}

impl AppConfig {
    /// Merge the sources by precedence and validate the result.
    pub fn resolve(file: Option<ConfigFile>, env: EnvOverrides) -> ReferResult<Self> {
        let file = file.unwrap_or_default();

        let token_secret = file
            .token_secret
            .or(env.token_secret)
            .unwrap_or_else(|| {
                tracing::warn!("no token secret configured; using the development default");
                DEFAULT_TOKEN_SECRET.to_string()
            });

        let token_ttl_minutes = file
            .token_ttl_minutes
            .or(env.token_ttl_minutes)
            .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES);
        if token_ttl_minutes == 0 {
            return Err(ReferError::Validation(
                "token_ttl_minutes must be positive".into(),
            ));
        }

        Ok(Self {
            bind_addr: file
                .bind_addr
                .or(env.bind_addr)
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            cors_origins: file.cors_origins.or(env.cors_origins).unwrap_or_default(),
            token_secret,
            token_ttl_minutes,
            data_file: file.data_file.or(env.data_file),
        })
    }
}

/// The on-disk configuration file, all fields optional.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub bind_addr: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    pub token_secret: Option<String>,
    pub token_ttl_minutes: Option<u64>,
    /// Older deployments call this `db_path`; both spellings are accepted.
    #[serde(alias = "db_path")]
    pub data_file: Option<PathBuf>,
}

impl ConfigFile {
    /// Load the file if it exists; a missing file is not an error.
    pub fn load(path: &Path) -> ReferResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| ReferError::Validation(format!("read {}: {e}", path.display())))?;
        let parsed = serde_json::from_str(&raw)
            .map_err(|e| ReferError::Validation(format!("parse {}: {e}", path.display())))?;
        Ok(Some(parsed))
    }
}

/// Environment-variable overrides, captured as a snapshot at startup.
#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub bind_addr: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    pub token_secret: Option<String>,
    pub token_ttl_minutes: Option<u64>,
    pub data_file: Option<PathBuf>,
}

impl EnvOverrides {
    /// Snapshot the `NCD_*` variables from the process environment.
    pub fn from_process_env() -> ReferResult<Self> {
        fn var(name: &str) -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let token_ttl_minutes = var("NCD_TOKEN_TTL_MINUTES")
            .map(|v| {
                v.parse::<u64>().map_err(|_| {
                    ReferError::Validation(format!(
                        "NCD_TOKEN_TTL_MINUTES is not a number: {v}"
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            bind_addr: var("NCD_BIND_ADDR"),
            cors_origins: var("NCD_CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect()),
            token_secret: var("NCD_TOKEN_SECRET"),
            token_ttl_minutes,
            data_file: var("NCD_DATA_FILE").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let config = AppConfig::resolve(None, EnvOverrides::default()).expect("resolve");
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.token_ttl_minutes, DEFAULT_TOKEN_TTL_MINUTES);
        assert!(config.cors_origins.is_empty());
        assert!(config.data_file.is_none());
    }

    #[test]
    fn file_wins_over_env() {
        let file = ConfigFile {
            bind_addr: Some("127.0.0.1:9000".into()),
            ..ConfigFile::default()
        };
        let env = EnvOverrides {
            bind_addr: Some("0.0.0.0:7000".into()),
            token_secret: Some("from-env".into()),
            ..EnvOverrides::default()
        };

        let config = AppConfig::resolve(Some(file), env).expect("resolve");
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        // Env still fills fields the file leaves out.
        assert_eq!(config.token_secret, "from-env");
    }

    #[test]
    fn db_path_alias_is_accepted() {
        let file: ConfigFile =
            serde_json::from_str(r#"{"db_path": "referrals.json"}"#).expect("parse");
        assert_eq!(file.data_file, Some(PathBuf::from("referrals.json")));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let file = ConfigFile {
            token_ttl_minutes: Some(0),
            ..ConfigFile::default()
        };
        assert!(AppConfig::resolve(Some(file), EnvOverrides::default()).is_err());
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let loaded = ConfigFile::load(Path::new("/nonexistent/server_config.json"));
        assert!(matches!(loaded, Ok(None)));
    }
}
