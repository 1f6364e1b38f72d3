use anyhow::{anyhow, Result};

// ConfigMap implements a low-level get/set config that is backed by an in-memory tree of toml
// nodes. It allows us to interact with a toml-based config programmatically, preserving any
// comments that were present when the toml was parsed.
#[derive(Clone, Debug)]
pub struct ConfigMap {
    pub root: toml_edit::Table,
}

impl ConfigMap {
    /// Returns the value stored at `key`, rendering integers and booleans
    /// the way they were written.
    pub fn get_string_value(&self, key: &str) -> Result<String> {
        match self.root.get(key) {
            Some(toml_edit::Item::Value(toml_edit::Value::String(s))) => Ok(s.value().to_string()),
            Some(toml_edit::Item::Value(toml_edit::Value::Integer(i))) => Ok(i.value().to_string()),
            Some(toml_edit::Item::Value(toml_edit::Value::Boolean(b))) => Ok(b.value().to_string()),
            Some(v) => Err(anyhow!("Expected string value for key '{}', found '{:?}'", key, v)),
            None => Err(anyhow!("Key '{}' not found", key)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    pub fn set_string_value(&mut self, key: &str, value: &str) -> Result<()> {
        self.root.insert(key, toml_edit::value(value));
        Ok(())
    }
}
