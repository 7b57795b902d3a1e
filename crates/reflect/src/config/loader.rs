//! Config path resolution
//!
//! The config file is taken from `HELIUM_REFLECT_CONFIG` when set, otherwise
//! `reflect.toml` in the working directory.

use std::path::PathBuf;

use super::{ConfigError, ConfigResult};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "HELIUM_REFLECT_CONFIG";

/// File name used when the environment variable is unset
pub const CONFIG_FILE_NAME: &str = "reflect.toml";

/// Returns the config path for the current process.
pub fn config_path() -> ConfigResult<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => {
            let cwd = std::env::current_dir().map_err(ConfigError::IoError)?;
            Ok(cwd.join(CONFIG_FILE_NAME))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_file_name() {
        // Either the override or the default file, never a directory
        let path = config_path().unwrap();
        assert!(path.file_name().is_some());
    }
}
