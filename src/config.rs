//! Startup configuration read from the FRC image's `frc.json`
//!
//! ```json
//! { "team": 1234, "ntmode": "client" }
//! ```
//!
//! `team` is required. `ntmode` is optional, matched case-insensitively, and an
//! unknown value is reported and ignored.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "/boot/frc.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not open '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config error in '{0}': must be JSON object")]
    NotAnObject(PathBuf),

    #[error("config error in '{0}': could not read team number")]
    MissingTeam(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkMode {
    #[default]
    Client,
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartupConfig {
    pub team: u32,
    pub network_mode: NetworkMode,
}

impl StartupConfig {
    /// Config path from the first command line argument, if any
    pub fn path_from_args(mut args: impl Iterator<Item = String>) -> PathBuf {
        args.nth(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content, path)?;
        info!(
            "Loaded {}: team {}, {:?} mode",
            path.display(),
            config.team,
            config.network_mode
        );
        Ok(config)
    }

    /// Parses the file contents; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let json: Value = serde_json::from_str(content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let Value::Object(object) = json else {
            return Err(ConfigError::NotAnObject(path.to_path_buf()));
        };

        let team = object
            .get("team")
            .and_then(Value::as_u64)
            .and_then(|team| u32::try_from(team).ok())
            .ok_or_else(|| ConfigError::MissingTeam(path.to_path_buf()))?;

        let mut network_mode = NetworkMode::Client;
        if let Some(mode) = object.get("ntmode") {
            match mode.as_str().map(str::to_lowercase).as_deref() {
                Some("client") => network_mode = NetworkMode::Client,
                Some("server") => network_mode = NetworkMode::Server,
                _ => warn!(
                    "config error in '{}': could not understand ntmode value {}",
                    path.display(),
                    mode
                ),
            }
        }

        Ok(Self { team, network_mode })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(content: &str) -> Result<StartupConfig, ConfigError> {
        StartupConfig::parse(content, Path::new("frc.json"))
    }

    #[test]
    fn reads_team_and_mode() {
        let config = parse(r#"{"team": 1234, "ntmode": "Server", "cameras": []}"#).unwrap();
        assert_eq!(config.team, 1234);
        assert_eq!(config.network_mode, NetworkMode::Server);
    }

    #[test]
    fn unknown_mode_stays_client() {
        let config = parse(r#"{"team": 5, "ntmode": "peer"}"#).unwrap();
        assert_eq!(config.network_mode, NetworkMode::Client);
    }

    #[test]
    fn rejects_missing_team_and_non_objects() {
        assert!(matches!(
            parse(r#"{"ntmode": "client"}"#),
            Err(ConfigError::MissingTeam(_))
        ));
        assert!(matches!(parse("[1, 2]"), Err(ConfigError::NotAnObject(_))));
        assert!(matches!(parse("{team"), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"team": 971}}"#).unwrap();

        let config = StartupConfig::load(file.path()).unwrap();
        assert_eq!(config.team, 971);
        assert_eq!(config.network_mode, NetworkMode::Client);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = StartupConfig::load(&dir.path().join("frc.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn first_argument_overrides_default_path() {
        let args = ["scoreboard".to_string(), "/tmp/frc.json".to_string()];
        assert_eq!(
            StartupConfig::path_from_args(args.into_iter()),
            PathBuf::from("/tmp/frc.json")
        );
        assert_eq!(
            StartupConfig::path_from_args(std::iter::once("scoreboard".to_string())),
            PathBuf::from(DEFAULT_CONFIG_FILE)
        );
    }
}
