use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// On-disk syntax of a configuration file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// Pure function to read config file contents
pub(crate) fn read_config_file(path: &Path) -> Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Pure function to deserialize config contents in the given format.
///
/// An empty or whitespace-only document deserializes as `T::default()`.
pub fn parse_document<T>(contents: &str, format: ConfigFormat) -> Result<T, String>
where
    T: DeserializeOwned + Default,
{
    if contents.trim().is_empty() {
        return Ok(T::default());
    }
    match format {
        ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
        ConfigFormat::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
    }
}

/// Handle file read errors with appropriate logging
pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // Only log actual errors, not "file not found"
    if error.kind() == std::io::ErrorKind::NotFound {
        debug!(path = %config_path.display(), "Config file absent; using defaults");
    } else {
        warn!(
            path = %config_path.display(),
            error = %error,
            "Failed to read config file; using defaults"
        );
    }
}

/// Load a config file with `parse`, falling back to `T::default()` on any failure.
pub(crate) fn load_or_default<T, F>(config_path: &Path, what: &str, parse: F) -> T
where
    T: Default,
    F: FnOnce(&str, ConfigFormat) -> Result<T, String>,
{
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return T::default();
        }
    };

    match parse(&contents, ConfigFormat::from_path(config_path)) {
        Ok(config) => {
            debug!(path = %config_path.display(), "Loaded {} config", what);
            config
        }
        Err(e) => {
            warn!(
                path = %config_path.display(),
                error = %e,
                "Invalid {} config; using defaults",
                what
            );
            T::default()
        }
    }
}
