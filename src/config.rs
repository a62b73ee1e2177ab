//! Configuration - `stackbind.toml`
//!
//! ```toml
//! [vm]
//! max_call_depth = 200
//! capture_print = false
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! directory = "logs"
//! ```

use crate::logging::{LogConfig, LogFormat, LogOutput};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

pub const CONFIG_FILE: &str = "stackbind.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vm: VmConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reference engine limits and behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmConfig {
    /// Nested calls allowed before `StackOverflow`
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,

    /// Collect `print` output instead of writing to stdout
    #[serde(default)]
    pub capture_print: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Log to daily files in this directory instead of stderr
    #[serde(default)]
    pub directory: Option<String>,

    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: default_max_call_depth(),
            capture_print: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            directory: None,
            filter: None,
        }
    }
}

fn default_max_call_depth() -> usize { 200 }
fn default_level() -> String { "info".to_string() }

impl LoggingConfig {
    pub fn to_log_config(&self) -> LogConfig {
        let level = self.level.parse::<Level>().unwrap_or(Level::INFO);
        let output = match &self.directory {
            Some(directory) => LogOutput::File {
                directory: directory.clone(),
                prefix: "stackbind".to_string(),
            },
            None => LogOutput::Stderr,
        };

        let config = LogConfig::new()
            .with_level(level)
            .with_format(self.format)
            .with_output(output);

        match &self.filter {
            Some(filter) => config.with_filter(filter.clone()),
            None => config,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Failed to read config {}: {}", path.display(), source)
            }
            Self::Parse { message } => write!(f, "Failed to parse config: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { .. } => None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Nearest `stackbind.toml` in the current directory or its parents
    pub fn find() -> Option<PathBuf> {
        Self::find_from(&std::env::current_dir().ok()?)
    }

    /// Nearest `stackbind.toml` in `start` or its parents
    pub fn find_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|path| path.is_file())
    }

    /// Load the nearest `stackbind.toml`, falling back to defaults
    ///
    /// A file that fails to load is reported on stderr since logging is
    /// usually configured from it.
    pub fn discover() -> Self {
        let Some(path) = Self::find() else {
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("warning: ignoring {}: {}", path.display(), e);
                tracing::warn!("ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.vm.max_call_depth, 200);
        assert!(!config.vm.capture_print);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [vm]
            capture_print = true

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.vm.max_call_depth, 200);
        assert!(config.vm.capture_print);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::parse("[vm\nmax_call_depth = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_logging_config_conversion() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            directory: Some("logs".to_string()),
            filter: Some("stackbind::vm=trace".to_string()),
        };

        let config = logging.to_log_config();
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(
            config.output,
            LogOutput::File { directory: "logs".to_string(), prefix: "stackbind".to_string() }
        );
        assert_eq!(config.filter.as_deref(), Some("stackbind::vm=trace"));
    }

    #[test]
    fn test_find_walks_to_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("scripts").join("demo");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(Config::find_from(&nested), None);

        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[vm\n").unwrap();
        assert_eq!(Config::find_from(&nested), Some(path.clone()));

        // found files are loaded by the caller, which sees the parse error
        let err = Config::load(&Config::find_from(&nested).unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let closer = nested.join(CONFIG_FILE);
        fs::write(&closer, "[vm]\nmax_call_depth = 4\n").unwrap();
        assert_eq!(Config::find_from(&nested), Some(closer));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[vm]\nmax_call_depth = 16\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.vm.max_call_depth, 16);

        let missing = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
