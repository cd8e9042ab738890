use serde::{Deserialize, Serialize};

use crate::error::{ModifierError, ModifierResult};

/// Default leaf size for newly written data.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Default fan-out of interior nodes.
pub const DEFAULT_MAX_LINKS: usize = 174;

/// Tuning for how edits are laid out as new nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierConfig {
    /// Maximum bytes per new leaf.
    pub chunk_size: usize,
    /// Maximum children per interior node.
    pub max_links: usize,
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_links: DEFAULT_MAX_LINKS,
        }
    }
}

impl ModifierConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> ModifierResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| ModifierError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no tree can be built with.
    pub fn validate(&self) -> ModifierResult<()> {
        if self.chunk_size == 0 {
            return Err(ModifierError::InvalidConfig(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if self.max_links < 2 {
            return Err(ModifierError::InvalidConfig(format!(
                "max_links must be at least 2, got {}",
                self.max_links
            )));
        }
        Ok(())
    }
}
