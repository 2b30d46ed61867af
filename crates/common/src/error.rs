//! Errors for the local side of the BookNet client
//!
//! Loading `booknet.toml`, checking its values and locating the session file
//! fail with these. Network and session failures live in `booknet-auth` and
//! `booknet-api`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A config value that parsed but makes no sense
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// No home or data directory to keep the session file in
    #[error("no data directory for the session file; set session.store_path in booknet.toml")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_carries_reason() {
        let err = Error::Config("timeout_secs must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: timeout_secs must be greater than 0"
        );
    }

    #[test]
    fn file_errors_name_the_path() {
        let err = Error::Read {
            path: PathBuf::from("/etc/booknet.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().starts_with("cannot read config file /etc/booknet.toml"));

        let source = toml::from_str::<toml::Value>("api = {{").unwrap_err();
        let err = Error::Parse {
            path: PathBuf::from("booknet.toml"),
            source,
        };
        assert!(err.to_string().starts_with("malformed config file booknet.toml"));
    }

    #[test]
    fn missing_data_dir_suggests_store_path() {
        assert!(Error::NoDataDir.to_string().contains("session.store_path"));
    }
}
