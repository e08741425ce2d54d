//! # Registry Configuration
//!
//! Pool sizing for the registry, loaded once at startup from TOML.
//!
//! ```toml
//! entity_chunk_size = 1024
//! component_chunk_size = 256
//! initial_entity_capacity = 10000
//! ```
//!
//! Missing keys fall back to [`RegistryConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Sizing parameters for a [`Registry`](crate::Registry).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Slots per entity pool chunk. Must be a power of two.
    pub entity_chunk_size: usize,
    /// Slots per component pool chunk. Must be a power of two.
    pub component_chunk_size: usize,
    /// Entities to reserve room for up front.
    pub initial_entity_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            entity_chunk_size: 1024,
            component_chunk_size: 256,
            initial_entity_capacity: 0,
        }
    }
}

impl RegistryConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidConfig`] on malformed TOML, unknown
    /// keys, or invalid values.
    pub fn from_toml_str(text: &str) -> RegistryResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| RegistryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Io`] if the file cannot be read, otherwise as
    /// [`RegistryConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks that chunk sizes are non-zero powers of two.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> RegistryResult<()> {
        for (field, value) in [
            ("entity_chunk_size", self.entity_chunk_size),
            ("component_chunk_size", self.component_chunk_size),
        ] {
            if !value.is_power_of_two() {
                return Err(RegistryError::InvalidConfig(format!(
                    "{field} must be a non-zero power of two, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RegistryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RegistryConfig::from_toml_str("component_chunk_size = 64").unwrap();
        assert_eq!(config.component_chunk_size, 64);
        assert_eq!(config.entity_chunk_size, 1024);
        assert_eq!(config.initial_entity_capacity, 0);
    }

    #[test]
    fn test_rejects_bad_chunk_size() {
        let err = RegistryConfig::from_toml_str("entity_chunk_size = 1000").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidConfig(msg) if msg.contains("entity_chunk_size")));

        let err = RegistryConfig::from_toml_str("component_chunk_size = 0").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(RegistryConfig::from_toml_str("chunk = 4").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = RegistryConfig::from_toml_file("/nonexistent/tessera.toml").unwrap_err();
        assert!(matches!(err, RegistryError::Io(_)));
    }
}
