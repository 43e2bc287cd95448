//! Command implementations.

mod info;
mod simulate;
mod validate;

pub use info::run_info;
pub use simulate::run_simulate;
pub use validate::run_validate;

use std::path::Path;

use contracts::SyncEngineConfig;

use crate::error::{CliError, Result};

/// Load a config file, or fall back to the built-in two-stream defaults
pub(crate) fn load_config(path: Option<&Path>) -> Result<SyncEngineConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            Ok(config_loader::ConfigLoader::load_from_path(path)?)
        }
        None => Ok(default_config()),
    }
}

pub(crate) fn default_config() -> SyncEngineConfig {
    SyncEngineConfig::with_streams(["video", "meta"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config.required_streams.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/sync.toml"))).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_loads_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, r#"required_streams = ["a", "b", "c"]"#).unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.required_streams.len(), 3);
    }
}
