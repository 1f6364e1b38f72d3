use anyhow::{anyhow, Result};
use thiserror::Error;

/// This trait describes interaction with the configuration for imgctl.
pub trait Config: Send {
    /// Returns a value from the configuration by its key.
    fn get(&self, key: &str) -> Result<String>;
    /// Returns a value from the configuration by its key, with the source.
    fn get_with_source(&self, key: &str) -> Result<(String, String)>;
    /// Sets a value in the configuration by its key.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Write the configuration.
    fn write(&self) -> Result<()>;

    /// Return the string representation of the config.
    fn config_to_string(&self) -> Result<String>;
}

pub const DEFAULT_IMAGE_ENDPOINT: &str = "unix:///run/containerd/containerd.sock";
pub const DEFAULT_TIMEOUT: &str = "10";

pub struct ConfigOption {
    pub key: String,
    pub default_value: String,
    pub allowed_values: Vec<String>,
}

pub fn config_options() -> Vec<ConfigOption> {
    vec![
        // e.g. unix:///run/containerd/containerd.sock or tcp://localhost:3735
        ConfigOption {
            key: "image-endpoint".to_string(),
            default_value: DEFAULT_IMAGE_ENDPOINT.to_string(),
            allowed_values: vec![],
        },
        // Seconds to wait for a connection or a response.
        ConfigOption {
            key: "timeout".to_string(),
            default_value: DEFAULT_TIMEOUT.to_string(),
            allowed_values: vec![],
        },
        ConfigOption {
            key: "debug".to_string(),
            default_value: "false".to_string(),
            allowed_values: vec!["true".to_string(), "false".to_string()],
        },
    ]
}

pub fn default_value(key: &str) -> Result<String> {
    config_options()
        .into_iter()
        .find(|option| option.key == key)
        .map(|option| option.default_value)
        .ok_or_else(|| anyhow!("invalid key: {}", key))
}

pub fn validate_key(key: &str) -> Result<()> {
    default_value(key).map(|_| ())
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidValueError {
    #[error("invalid values, valid values: {0:?}")]
    ValidValues(Vec<String>),
    #[error("invalid value {0:?}, expected a positive number of seconds")]
    Timeout(String),
}

pub fn validate_value(key: &str, value: &str) -> Result<()> {
    if key == "timeout" {
        return match value.parse::<u64>() {
            Ok(n) if n > 0 => Ok(()),
            _ => Err(InvalidValueError::Timeout(value.to_string()).into()),
        };
    }

    let mut valid_values: Vec<String> = vec![];

    // Set the valid values for the key.
    for config_key in config_options() {
        if config_key.key == key {
            valid_values = config_key.allowed_values;
            break;
        }
    }

    if valid_values.is_empty() || valid_values.iter().any(|v| v == value) {
        return Ok(());
    }

    Err(InvalidValueError::ValidValues(valid_values).into())
}

pub fn new_blank_root() -> Result<toml_edit::Document> {
    Ok(toml_edit::Document::new())
}

pub fn new_config(root: toml_edit::Document) -> crate::config_from_file::FileConfig {
    crate::config_from_file::FileConfig {
        map: crate::config_map::ConfigMap {
            root: root.as_table().clone(),
        },
    }
}

#[cfg(test)]
pub fn new_blank_config() -> Result<crate::config_from_file::FileConfig> {
    Ok(new_config(new_blank_root()?))
}
