//! Configuration types and loading
//!
//! Precedence: `--config` > `BOOKNET_CONFIG` > `booknet.toml` in the working
//! directory > built-in defaults. `BOOKNET_API_URL` overrides the base URL
//! from any source.

use std::path::{Path, PathBuf};
use std::time::Duration;

use booknet_auth::{JUST_LOGGED_IN_DURATION, REQUEST_TIMEOUT, SESSION_REVALIDATE_INTERVAL};
use common::Error;
use directories::ProjectDirs;
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "booknet.toml";
const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session file; defaults to `session.json` in the platform data directory
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default = "default_revalidate")]
    pub revalidate_secs: u64,
    #[serde(default = "default_celebrate")]
    pub celebrate_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            revalidate_secs: default_revalidate(),
            celebrate_secs: default_celebrate(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    REQUEST_TIMEOUT.as_secs()
}

fn default_revalidate() -> u64 {
    SESSION_REVALIDATE_INTERVAL.as_secs()
}

fn default_celebrate() -> u64 {
    JUST_LOGGED_IN_DURATION.as_secs()
}

/// Where the config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named explicitly by flag or env var; must exist
    Explicit(PathBuf),
    /// The default file name; may be absent
    Default(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::Default(p) => p,
        }
    }
}

impl Config {
    /// Resolve the config file from the CLI flag or `BOOKNET_CONFIG`.
    pub fn resolve_path(cli_path: Option<&Path>) -> ConfigSource {
        if let Some(p) = cli_path {
            return ConfigSource::Explicit(p.to_path_buf());
        }
        if let Ok(p) = std::env::var("BOOKNET_CONFIG") {
            return ConfigSource::Explicit(PathBuf::from(p));
        }
        ConfigSource::Default(PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load, overlay environment variables, validate.
    pub fn load(source: &ConfigSource) -> common::Result<Self> {
        let mut config = match source {
            ConfigSource::Default(path) if !path.exists() => Config::default(),
            other => {
                let path = other.path();
                let contents = std::fs::read_to_string(path).map_err(|source| Error::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&contents).map_err(|source| Error::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };

        if let Ok(url) = std::env::var("BOOKNET_API_URL") {
            config.api.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.session.revalidate_secs == 0 {
            return Err(Error::Config(
                "revalidate_secs must be greater than 0".into(),
            ));
        }
        if self.session.celebrate_secs == 0 {
            return Err(Error::Config(
                "celebrate_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn revalidate_interval(&self) -> Duration {
        Duration::from_secs(self.session.revalidate_secs)
    }

    pub fn celebrate_for(&self) -> Duration {
        Duration::from_secs(self.session.celebrate_secs)
    }

    /// Session file path: configured, else the platform data directory
    /// (`$XDG_DATA_HOME/booknet` on Linux).
    pub fn store_path(&self) -> common::Result<PathBuf> {
        if let Some(p) = &self.session.store_path {
            return Ok(p.clone());
        }
        ProjectDirs::from("io", "BookNet", "booknet")
            .map(|dirs| dirs.data_dir().join(SESSION_FILE))
            .ok_or(Error::NoDataDir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch process environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> ConfigSource {
        let path = dir.path().join("booknet.toml");
        std::fs::write(&path, contents).unwrap();
        ConfigSource::Explicit(path)
    }

    #[test]
    fn load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("BOOKNET_API_URL") };
        let dir = tempfile::tempdir().unwrap();
        let source = write_config(
            &dir,
            r#"
[api]
base_url = "https://books.example.com/api"
timeout_secs = 20

[session]
store_path = "/tmp/booknet-test/session.json"
revalidate_secs = 60
"#,
        );

        let config = Config::load(&source).unwrap();
        assert_eq!(config.api.base_url, "https://books.example.com/api");
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert_eq!(config.revalidate_interval(), Duration::from_secs(60));
        assert_eq!(config.celebrate_for(), Duration::from_secs(3));
        assert_eq!(
            config.store_path().unwrap(),
            PathBuf::from("/tmp/booknet-test/session.json")
        );
    }

    #[test]
    fn missing_default_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("BOOKNET_API_URL") };
        let source = ConfigSource::Default(PathBuf::from("/nonexistent/booknet.toml"));
        let config = Config::load(&source).unwrap();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.revalidate_interval(), Duration::from_secs(300));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let source = ConfigSource::Explicit(PathBuf::from("/nonexistent/booknet.toml"));
        let err = Config::load(&source).unwrap_err();
        assert!(matches!(err, Error::Read { ref path, .. } if path == source.path()));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_config(&dir, "not valid {{{{ toml");
        assert!(matches!(Config::load(&source), Err(Error::Parse { .. })));
    }

    #[test]
    fn env_overrides_base_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let source = write_config(&dir, "[api]\nbase_url = \"https://file.example.com\"\n");

        unsafe { set_env("BOOKNET_API_URL", "http://127.0.0.1:9000/api") };
        let config = Config::load(&source).unwrap();
        unsafe { remove_env("BOOKNET_API_URL") };
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000/api");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("BOOKNET_API_URL") };
        let dir = tempfile::tempdir().unwrap();
        let source = write_config(&dir, "[api]\nbase_url = \"ftp://books.example.com\"\n");
        let err = Config::load(&source).unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn rejects_zero_timeouts() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("BOOKNET_API_URL") };
        let dir = tempfile::tempdir().unwrap();
        let source = write_config(&dir, "[api]\ntimeout_secs = 0\n");
        assert!(Config::load(&source).is_err());

        let source = write_config(&dir, "[session]\nrevalidate_secs = 0\n");
        assert!(Config::load(&source).is_err());
    }

    #[test]
    fn resolve_path_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("BOOKNET_CONFIG", "/env/booknet.toml") };
        assert_eq!(
            Config::resolve_path(Some(Path::new("/cli/booknet.toml"))),
            ConfigSource::Explicit(PathBuf::from("/cli/booknet.toml"))
        );
        assert_eq!(
            Config::resolve_path(None),
            ConfigSource::Explicit(PathBuf::from("/env/booknet.toml"))
        );
        unsafe { remove_env("BOOKNET_CONFIG") };
        assert_eq!(
            Config::resolve_path(None),
            ConfigSource::Default(PathBuf::from("booknet.toml"))
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn default_store_path_under_xdg_data_home() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("XDG_DATA_HOME", "/var/tmp/xdg") };
        let path = Config::default().store_path();
        unsafe { remove_env("XDG_DATA_HOME") };
        assert_eq!(
            path.unwrap(),
            PathBuf::from("/var/tmp/xdg/booknet/session.json")
        );
    }

    #[test]
    fn configured_store_path_wins() {
        let config = Config {
            session: SessionConfig {
                store_path: Some(PathBuf::from("/srv/booknet/session.json")),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.store_path().unwrap(),
            PathBuf::from("/srv/booknet/session.json")
        );
    }

    #[test]
    fn default_store_path_is_never_relative() {
        let _lock = ENV_MUTEX.lock().unwrap();
        match Config::default().store_path() {
            Ok(path) => assert!(path.is_absolute(), "got {}", path.display()),
            Err(e) => assert!(matches!(e, Error::NoDataDir)),
        }
    }
}
