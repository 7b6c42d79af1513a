//! Where salat keeps its files.
//!
//! Data lives under [`dirs::data_dir`] and the config file under
//! [`dirs::config_dir`], each in a `salat/` subdirectory. `SALAT_DATA_DIR`
//! and `SALAT_CONFIG_DIR` replace those roots.

use std::path::PathBuf;

const APP_DIR: &str = "salat";

fn root(override_var: &str, platform: Option<PathBuf>) -> PathBuf {
    std::env::var_os(override_var)
        .map(PathBuf::from)
        .unwrap_or_else(|| resolve(platform))
}

/// Platform root plus the app directory, or the temp dir when the
/// platform has no such root.
fn resolve(platform: Option<PathBuf>) -> PathBuf {
    platform.unwrap_or_else(std::env::temp_dir).join(APP_DIR)
}

fn data_root() -> PathBuf {
    root("SALAT_DATA_DIR", dirs::data_dir())
}

/// Key/value store directory.
#[must_use]
pub fn store_dir() -> PathBuf {
    data_root().join("store")
}

/// Log file directory.
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_root().join("logs")
}

/// Default config file path.
#[must_use]
pub fn config_file() -> PathBuf {
    root("SALAT_CONFIG_DIR", dirs::config_dir()).join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_logs_share_a_root() {
        assert_eq!(store_dir().parent(), logs_dir().parent());
        assert!(store_dir().ends_with("store"));
        assert!(config_file().ends_with("config.toml"));
    }

    #[test]
    fn missing_platform_root_falls_back_to_temp_dir() {
        assert_eq!(resolve(None), std::env::temp_dir().join("salat"));
        assert_eq!(
            resolve(Some(PathBuf::from("/srv/data"))),
            PathBuf::from("/srv/data/salat")
        );
    }
}
