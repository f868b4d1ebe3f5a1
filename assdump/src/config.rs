//! Runtime options and the optional TOML configuration file.
//!
//! ```toml
//! [dumper]
//! flush_at_eof = true
//! caption_component_tag = 0x87
//! eof_hold_centis = 500
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::DumpError;
use crate::ts_analyzer::component_tag;

/// Options controlling caption extraction.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DumperConfig {
    /// Emit the last pending caption at end of stream.
    pub flush_at_eof: bool,
    /// Component tag identifying the caption stream in the PMT.
    pub caption_component_tag: u8,
    /// Display length of a caption flushed at end of stream.
    pub eof_hold_centis: u64,
}

impl Default for DumperConfig {
    fn default() -> Self {
        Self {
            flush_at_eof: false,
            caption_component_tag: component_tag::CAPTION,
            eof_hold_centis: 500,
        }
    }
}

/// Configuration file format.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub dumper: DumperConfig,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct LoggingSection {
    pub level: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, DumpError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DumpError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, DumpError> {
        toml::from_str(contents).map_err(|e| DumpError::Config(e.to_string()))
    }
}
