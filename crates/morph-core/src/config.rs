//! Engine configuration
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! max_depth = 32
//! cache_capacity = 512
//! fail_fast_default = true
//! ```

use morph_partial::ErrorMode;
use morph_plan::{PlannerConfig, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};

/// Settings shared by every derivation and execution of an [`Engine`](crate::Engine)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Deepest shape nesting the planner follows
    pub max_depth: usize,
    /// Maximum number of cached plans per plan kind
    pub cache_capacity: u64,
    /// Error mode for calls that do not choose one
    pub fail_fast_default: bool,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_fail_fast_default(mut self, fail_fast: bool) -> Self {
        self.fail_fast_default = fail_fast;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns error if the document is not valid TOML, has unknown keys,
    /// or sets a limit to zero.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns error if `max_depth` or `cache_capacity` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid {
                key: "max_depth",
                reason: "must be at least 1",
            });
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "cache_capacity",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn planner(&self) -> PlannerConfig {
        PlannerConfig::default().with_max_depth(self.max_depth)
    }

    #[inline]
    #[must_use]
    pub fn default_mode(&self) -> ErrorMode {
        ErrorMode::from_fail_fast(self.fail_fast_default)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            cache_capacity: 1_024,
            fail_fast_default: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Document failed to parse
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid engine configuration: `{key}` {reason}")]
    Invalid {
        key: &'static str,
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_documents_keep_defaults() {
        let config = EngineConfig::from_toml_str("max_depth = 8").unwrap();
        assert_eq!(config, EngineConfig::default().with_max_depth(8));
        assert_eq!(config.planner().max_depth, 8);
    }

    #[test]
    fn full_document() {
        let config = EngineConfig::from_toml_str(
            "max_depth = 16\ncache_capacity = 32\nfail_fast_default = true\n",
        )
        .unwrap();
        assert_eq!(config.cache_capacity, 32);
        assert_eq!(config.default_mode(), ErrorMode::FailFast);
    }

    #[test]
    fn rejects_unknown_keys_and_zero_limits() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_dept = 3"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("cache_capacity = 0"),
            Err(ConfigError::Invalid { key: "cache_capacity", .. })
        ));
    }
}
