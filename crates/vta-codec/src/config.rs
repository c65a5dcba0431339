//! Codec Configuration

use serde::{Deserialize, Serialize};
use vta_markup::RenderOptions;

/// Deepest indentation accepted per nesting level
const MAX_INDENT_WIDTH: usize = 16;

/// Codec configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Spaces per nesting level in rendered markup
    pub indent_width: usize,

    /// Write serial ids into the markup so edits keep element identity
    pub emit_serial_ids: bool,

    /// Lowest id handed to elements created while editing
    pub fresh_id_base: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indent_width: 4,
            emit_serial_ids: true,
            fresh_id_base: 1_000_000,
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("indent_width must be between 1 and 16, got {0}")]
    IndentWidth(usize),

    #[error("fresh_id_base must be positive, got {0}")]
    FreshIdBase(i64),
}

impl Config {
    /// Load from JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_INDENT_WIDTH).contains(&self.indent_width) {
            return Err(ConfigError::IndentWidth(self.indent_width));
        }
        if self.fresh_id_base <= 0 {
            return Err(ConfigError::FreshIdBase(self.fresh_id_base));
        }
        Ok(())
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            indent_width: self.indent_width,
            emit_serial_ids: self.emit_serial_ids,
        }
    }
}
