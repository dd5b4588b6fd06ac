// Configuration management for StudyFrog

pub mod builder;
pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use builder::ConfigBuilder;
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Environment prefix used by the StudyFrog applications.
pub const ENV_PREFIX: &str = "STUDYFROG";

/// Main configuration manager
///
/// Holds a nested JSON document. Keys are addressed with dots
/// (`"dispatcher.base_id"`); every load deep-merges into what is already there.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Map<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(Map::new())),
            env_prefix: None,
        }
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::new(RwLock::new(Map::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Map<String, Value>>> {
        self.config.read().map_err(|_| ConfigError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Map<String, Value>>> {
        self.config.write().map_err(|_| ConfigError::Poisoned)
    }

    /// Deep-merge an object into the configuration
    pub fn merge_value(&self, value: Value) -> Result<()> {
        let Value::Object(incoming) = value else {
            return Err(ConfigError::ParseError(
                "Only objects can be merged into the configuration".to_string(),
            ));
        };

        let mut config = self.write()?;
        deep_merge(&mut config, incoming);
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;
        self.merge_value(Value::Object(env_vars))
    }

    /// Load configuration from .env file
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok(); // Ignore if .env doesn't exist
        }
        self.load_env()
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data)
    }

    /// Load configuration from file, detecting the format from its extension
    pub fn load_file_auto(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::auto(path)?.load_file(path)?;
        self.merge_value(data)
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        let path: Vec<String> = key.split('.').map(str::to_string).collect();
        let mut config = self.write()?;
        env::insert_path(&mut config, &path, json_value);

        Ok(())
    }

    /// Get a raw value by dotted key
    pub fn get_value(&self, key: &str) -> Result<Value> {
        let config = self.read()?;
        lookup(&config, key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.get_value(key)?;
        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Deserialize a section, or the type's default when the section is absent
    pub fn get_section<T: DeserializeOwned + Default>(&self, section: &str) -> Result<T> {
        match self.get_value(section) {
            Ok(value) => serde_json::from_value(value)
                .map_err(|e| ConfigError::DeserializationError(e.to_string())),
            Err(ConfigError::KeyNotFound(_)) => Ok(T::default()),
            Err(e) => Err(e),
        }
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Get an integer value
    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    /// Get a boolean value
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.read()
            .map(|config| lookup(&config, key).is_some())
            .unwrap_or(false)
    }

    /// Get all top-level configuration keys
    pub fn keys(&self) -> Vec<String> {
        self.read()
            .map(|config| config.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Merge configuration from another manager (other wins on conflicts)
    pub fn merge(&self, other: &ConfigManager) -> Result<()> {
        let snapshot = other.read()?.clone();
        self.merge_value(Value::Object(snapshot))
    }

    /// Deserialize a section and validate it
    pub fn load_validated<T: DeserializeOwned + Default + Validate>(&self, section: &str) -> Result<T> {
        let validated: T = self.get_section(section)?;
        validated.validate()?;
        Ok(validated)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(config: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let first = segments.next()?;
    segments.try_fold(config.get(first)?, |value, segment| value.get(segment))
}

fn deep_merge(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        if let Value::Object(nested) = value {
            if let Some(Value::Object(existing)) = target.get_mut(&key) {
                deep_merge(existing, nested);
                continue;
            }
            target.insert(key, Value::Object(nested));
        } else {
            target.insert(key, value);
        }
    }
}
