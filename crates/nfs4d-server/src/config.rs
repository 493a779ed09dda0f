use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// `auth.*` surface (§6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub require_auth: bool,
    pub allow_sys: bool,
    pub allow_gss: bool,
    pub service_name: String,
    pub keytab_path: Option<PathBuf>,
    pub allowed_principals: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allow_sys: true,
            allow_gss: false,
            service_name: "nfs".to_string(),
            keytab_path: None,
            allowed_principals: Vec::new(),
        }
    }
}

/// `log_format`: `pretty` is human-readable, `json` is one object per
/// line. Neither is a metrics/alerting export format, so choosing
/// either doesn't touch that Non-goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Pretty
    }
}

/// The full configuration surface (§3, §6), layered defaults → TOML file
/// → `NFS4D_*` environment overrides. Parsed once at [`Config::load`]
/// and handed to every component by reference; nothing below reads
/// configuration out of a global.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub root_path: PathBuf,
    pub lease_seconds: u64,
    pub session_timeout_minutes: u64,
    pub grace_period_seconds: u64,
    pub lock_wait_timeout_seconds: u64,
    pub stale_lock_sweep_minutes: u64,
    pub auth: AuthConfig,
    pub wal_path: PathBuf,
    pub journal_path: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 2049,
            root_path: PathBuf::from("/"),
            lease_seconds: 90,
            session_timeout_minutes: 30,
            grace_period_seconds: 60,
            lock_wait_timeout_seconds: 30,
            stale_lock_sweep_minutes: 5,
            auth: AuthConfig::default(),
            wal_path: PathBuf::from("/var/lib/nfs4d/wal"),
            journal_path: PathBuf::from("/var/lib/nfs4d/journal"),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Build a `Config` from defaults, an optional TOML file, then
    /// `NFS4D_*` environment overrides, in that order (§3).
    pub fn load(toml_path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match toml_path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| ServerError::Config(format!("reading {}: {e}", path.display())))?;
                toml::from_str(&text)
                    .map_err(|e| ServerError::Config(format!("parsing {}: {e}", path.display())))?
            }
            None => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("NFS4D_PORT") {
            if let Ok(v) = v.parse() {
                self.port = v;
            }
        }
        if let Ok(v) = std::env::var("NFS4D_ROOT_PATH") {
            self.root_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NFS4D_WAL_PATH") {
            self.wal_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NFS4D_JOURNAL_PATH") {
            self.journal_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NFS4D_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("NFS4D_LEASE_SECONDS") {
            if let Ok(v) = v.parse() {
                self.lease_seconds = v;
            }
        }
        if let Ok(v) = std::env::var("NFS4D_GRACE_PERIOD_SECONDS") {
            if let Ok(v) = v.parse() {
                self.grace_period_seconds = v;
            }
        }
    }

    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_seconds)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes * 60)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }

    pub fn lock_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_wait_timeout_seconds)
    }

    pub fn stale_lock_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.stale_lock_sweep_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_configuration_surface() {
        let c = Config::default();
        assert_eq!(c.port, 2049);
        assert_eq!(c.root_path, PathBuf::from("/"));
        assert_eq!(c.lease_seconds, 90);
        assert_eq!(c.session_timeout_minutes, 30);
        assert_eq!(c.grace_period_seconds, 60);
        assert_eq!(c.lock_wait_timeout_seconds, 30);
        assert_eq!(c.stale_lock_sweep_minutes, 5);
        assert!(c.auth.require_auth);
        assert!(c.auth.allow_sys);
        assert!(!c.auth.allow_gss);
    }

    #[test]
    fn toml_file_overrides_defaults_for_fields_it_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nfs4d.toml");
        std::fs::write(&path, "port = 3049\nroot_path = \"/srv/export\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.port, 3049);
        assert_eq!(config.root_path, PathBuf::from("/srv/export"));
        // Fields the file didn't set keep their defaults.
        assert_eq!(config.lease_seconds, 90);
    }

    #[test]
    fn missing_toml_file_is_a_config_error() {
        let err = Config::load(Some(Path::new("/does/not/exist.toml"))).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn env_override_wins_over_toml_and_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nfs4d.toml");
        std::fs::write(&path, "port = 3049\n").unwrap();
        std::env::set_var("NFS4D_PORT", "4049");
        let config = Config::load(Some(&path)).unwrap();
        std::env::remove_var("NFS4D_PORT");
        assert_eq!(config.port, 4049);
    }

    #[test]
    fn duration_helpers_convert_units() {
        let c = Config::default();
        assert_eq!(c.session_timeout(), Duration::from_secs(30 * 60));
        assert_eq!(c.stale_lock_sweep_interval(), Duration::from_secs(5 * 60));
    }
}
