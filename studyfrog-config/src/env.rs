// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::env;

/// Separator between nested key segments, e.g. `STUDYFROG_DISPATCHER__BASE_ID`.
pub const NESTING_SEPARATOR: &str = "__";

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load every matching environment variable as a nested object.
    pub fn load(&self) -> Result<Map<String, Value>> {
        Ok(self.load_from(env::vars()))
    }

    /// Same as [`load`](Self::load), but over an explicit set of variables.
    pub fn load_from<I>(&self, vars: I) -> Map<String, Value>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Map::new();

        for (key, value) in vars {
            let stripped = match &self.prefix {
                Some(prefix) => match key.strip_prefix(prefix.as_str()) {
                    Some(rest) if rest.starts_with('_') => rest.trim_start_matches('_'),
                    _ => continue,
                },
                None => key.as_str(),
            };

            if stripped.is_empty() {
                continue;
            }

            insert_path(&mut config, &key_path(stripped), parse_scalar(&value));
        }

        config
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = if let Some(ref prefix) = self.prefix {
            format!("{}_{}", prefix, key.to_uppercase())
        } else {
            key.to_uppercase()
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Split an environment key into lowercase path segments.
pub fn key_path(key: &str) -> Vec<String> {
    key.split(NESTING_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_lowercase())
        .collect()
}

/// Interpret a raw environment value.
///
/// Numbers, booleans and `null` become their JSON counterparts; anything else
/// stays a string. Quoted values are always strings.
pub fn parse_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => value,
        _ => Value::String(trimmed.trim_matches('"').trim_matches('\'').to_string()),
    }
}

/// Insert `value` at `path`, creating (or replacing non-object) intermediate nodes.
pub(crate) fn insert_path(map: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = map;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }

    current.insert(last.clone(), value);
}
