//! # Configuration du moteur UPnP
//!
//! This crate provides configuration management for the UPnP engine:
//! - Loading configuration from YAML files
//! - Merging with an embedded default configuration
//! - Environment variable overrides
//! - Typed getters and setters with defaults
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::Config;
//!
//! let config = Config::load("")?;
//! let mx = config.get_search_mx();
//! let timeout = config.get_http_timeout_secs();
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("upnp.yaml");

const ENV_CONFIG_DIR: &str = "PMONETUPNP_CONFIG";
const ENV_PREFIX: &str = "PMONETUPNP_CONFIG__";
const CONFIG_DIR_NAME: &str = ".pmonetupnp";
const CONFIG_FILE_NAME: &str = "config.yaml";

pub const DEFAULT_SEARCH_MX: u64 = 3;
pub const DEFAULT_MULTICAST_TTL: u64 = 4;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 250;
pub const DEFAULT_CONTROL_POINT_PORT_BASE: u64 = 5004;
pub const DEFAULT_CONTROL_POINT_PORT_RANGE: u64 = 1024;
pub const DEFAULT_DEVICE_PORT_BASE: u64 = 6004;
pub const DEFAULT_DEVICE_PORT_RANGE: u64 = 1024;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PRODUCT_NAME: &str = "pmonetupnp";
pub const DEFAULT_PRODUCT_VERSION: &str = "0.1.0";

/// Macro to generate getter/setter for u64 values with default
macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> u64 {
            match self.get_value($path) {
                Ok(Value::Number(n)) => n.as_u64().unwrap_or_else(|| {
                    warn!(path = %$path.join("."), "Negative or non integer value, using default {}", $default);
                    $default
                }),
                Ok(Value::String(s)) => s.trim().parse::<u64>().unwrap_or_else(|_| {
                    warn!(path = %$path.join("."), "Invalid value '{}', using default {}", s, $default);
                    $default
                }),
                _ => $default,
            }
        }

        pub fn $setter(&mut self, value: u64) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> String {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.is_empty() => s,
                Ok(Value::Number(n)) => n.to_string(),
                _ => $default.to_string(),
            }
        }

        pub fn $setter(&mut self, value: String) -> Result<()> {
            self.set_value($path, Value::String(value))
        }
    };
}

/// Configuration manager for the UPnP engine
///
/// Holds the merged YAML tree. Values are read through typed getters
/// that fall back to the built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    path: Option<PathBuf>,
    data: Value,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> Option<PathBuf> {
        // 1. Try provided directory
        if !directory.is_empty() {
            return Some(PathBuf::from(directory));
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return Some(PathBuf::from(env_path));
        }

        // 3. Try current directory
        if Path::new(CONFIG_DIR_NAME).exists() {
            return Some(PathBuf::from(CONFIG_DIR_NAME));
        }

        // 4. Try home directory
        home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME))
            .filter(|dir| dir.exists())
    }

    /// Loads the configuration
    ///
    /// The `config.yaml` file is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PMONETUPNP_CONFIG` environment variable
    /// 3. `.pmonetupnp` in the current directory
    /// 4. `.pmonetupnp` in the user's home directory
    ///
    /// The file is merged over the embedded defaults, then
    /// `PMONETUPNP_CONFIG__SECTION__KEY` environment variables are applied.
    pub fn load(directory: &str) -> Result<Self> {
        let mut data: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let path = Self::find_config_dir(directory).map(|dir| dir.join(CONFIG_FILE_NAME));
        match path.as_ref().map(fs::read) {
            Some(Ok(bytes)) => {
                info!(config_file = ?path, "Loaded config file");
                let external: Value = serde_yaml::from_slice(&bytes)?;
                merge_yaml(&mut data, &lower_keys_value(external));
            }
            _ => {
                info!(config_file = ?path, "Config file not found, using default embedded config");
            }
        }

        let mut data = lower_keys_value(data);
        apply_env_overrides(&mut data, env::vars());

        Ok(Config { path, data })
    }

    /// Builds a configuration from a YAML string merged over the defaults
    ///
    /// Environment variables are not consulted.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut data: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if !yaml.trim().is_empty() {
            let external: Value = serde_yaml::from_str(yaml)?;
            merge_yaml(&mut data, &lower_keys_value(external));
        }

        Ok(Config {
            path: None,
            data: lower_keys_value(data),
        })
    }

    /// Path of the backing `config.yaml`, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Saves the current configuration to its `config.yaml` file
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| anyhow!("Configuration has no backing file"))?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_yaml::to_string(&self.data)?)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["ssdp", "search_mx"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&mut self, path: &[&str], value: Value) -> Result<()> {
        set_value_internal(&mut self.data, path, value)
    }

    /// Gets a configuration value at the specified path
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let mut current = &self.data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();

                if let Some(next) = map.get(&Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    impl_u64_config!(
        get_search_mx,
        set_search_mx,
        &["ssdp", "search_mx"],
        DEFAULT_SEARCH_MX
    );

    impl_u64_config!(
        get_multicast_ttl,
        set_multicast_ttl,
        &["ssdp", "multicast_ttl"],
        DEFAULT_MULTICAST_TTL
    );

    impl_u64_config!(
        get_read_timeout_ms,
        set_read_timeout_ms,
        &["ssdp", "read_timeout_ms"],
        DEFAULT_READ_TIMEOUT_MS
    );

    impl_u64_config!(
        get_control_point_port_base,
        set_control_point_port_base,
        &["control_point", "port_base"],
        DEFAULT_CONTROL_POINT_PORT_BASE
    );

    impl_u64_config!(
        get_control_point_port_range,
        set_control_point_port_range,
        &["control_point", "port_range"],
        DEFAULT_CONTROL_POINT_PORT_RANGE
    );

    impl_u64_config!(
        get_device_port_base,
        set_device_port_base,
        &["device", "port_base"],
        DEFAULT_DEVICE_PORT_BASE
    );

    impl_u64_config!(
        get_device_port_range,
        set_device_port_range,
        &["device", "port_range"],
        DEFAULT_DEVICE_PORT_RANGE
    );

    impl_u64_config!(
        get_http_timeout_secs,
        set_http_timeout_secs,
        &["http", "timeout_secs"],
        DEFAULT_HTTP_TIMEOUT_SECS
    );

    impl_string_config!(
        get_product_name,
        set_product_name,
        &["product", "name"],
        DEFAULT_PRODUCT_NAME
    );

    impl_string_config!(
        get_product_version,
        set_product_version,
        &["product", "version"],
        DEFAULT_PRODUCT_VERSION
    );
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    if let Value::Mapping(map) = data {
        let key_value = Value::String(path[0].to_lowercase());
        if path.len() == 1 {
            map.insert(key_value, value);
        } else {
            let entry = map
                .entry(key_value)
                .or_insert(Value::Mapping(Mapping::new()));
            set_value_internal(entry, &path[1..], value)?;
        }
        Ok(())
    } else {
        Err(anyhow!("Current node is not a map"))
    }
}

fn apply_env_overrides<I>(config: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let key_path = stripped.split("__").collect::<Vec<_>>();
            let yaml_value = convert_env_value(&value);
            if let Err(err) = set_value_internal(config, &key_path, yaml_value) {
                warn!(env_var = %key, "Ignoring environment override: {}", err);
            }
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                if let Value::String(s) = k {
                    new_map.insert(Value::String(s.to_lowercase()), lower_keys_value(v));
                } else {
                    new_map.insert(k, lower_keys_value(v));
                }
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.get_search_mx(), 3);
        assert_eq!(config.get_multicast_ttl(), 4);
        assert_eq!(config.get_control_point_port_base(), 5004);
        assert_eq!(config.get_control_point_port_range(), 1024);
        assert_eq!(config.get_device_port_base(), 6004);
        assert_eq!(config.get_device_port_range(), 1024);
        assert_eq!(config.get_product_name(), "pmonetupnp");
    }

    #[test]
    fn test_merge_over_defaults() {
        let config = Config::from_yaml("SSDP:\n  Search_MX: 5\nhttp:\n  timeout_secs: 2\n").unwrap();
        assert_eq!(config.get_search_mx(), 5);
        assert_eq!(config.get_http_timeout_secs(), 2);
        // clé non surchargée
        assert_eq!(config.get_multicast_ttl(), 4);
    }

    #[test]
    fn test_invalid_value_falls_back_to_default() {
        let config = Config::from_yaml("ssdp:\n  search_mx: soon\n").unwrap();
        assert_eq!(config.get_search_mx(), DEFAULT_SEARCH_MX);
    }

    #[test]
    fn test_env_overrides() {
        let mut data = lower_keys_value(serde_yaml::from_str(DEFAULT_CONFIG).unwrap());
        apply_env_overrides(
            &mut data,
            vec![
                ("PMONETUPNP_CONFIG__DEVICE__PORT_BASE".to_string(), "7000".to_string()),
                ("UNRELATED".to_string(), "1".to_string()),
            ],
        );
        let config = Config { path: None, data };
        assert_eq!(config.get_device_port_base(), 7000);
    }

    #[test]
    fn test_setters() {
        let mut config = Config::from_yaml("").unwrap();
        config.set_search_mx(9).unwrap();
        config.set_product_name("lightdev".to_string()).unwrap();
        assert_eq!(config.get_search_mx(), 9);
        assert_eq!(config.get_product_name(), "lightdev");
        assert!(config.save().is_err());
    }
}
