//! Store configuration.
//!
//! ```json
//! { "backend": { "kind": "memory" }, "max_disjunction_values": 10 }
//! ```

use serde::{Deserialize, Serialize};

use crate::storage::BackendConfig;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    /// Override for the `in` / `array-contains-any` list cap.
    pub max_disjunction_values: Option<usize>,
}

impl StoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: StoreConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_disjunction_values == Some(0) {
            return Err(Error::Config("max_disjunction_values must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = StoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.backend, BackendConfig::Memory);
    }

    #[test]
    fn test_parse_memory_backend_with_cap() {
        let config = StoreConfig::from_json_str(
            r#"{ "backend": { "kind": "memory" }, "max_disjunction_values": 10 }"#,
        )
        .unwrap();
        assert_eq!(config.max_disjunction_values, Some(10));
    }

    #[test]
    fn test_zero_cap_rejected() {
        let err = StoreConfig::from_json_str(r#"{ "max_disjunction_values": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_backend_is_json_error() {
        let err = StoreConfig::from_json_str(r#"{ "backend": { "kind": "bolt" } }"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
