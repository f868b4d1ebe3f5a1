//! assdump library - ARIB caption extraction from ISDB transport streams
//!
//! This library locates the caption stream of an MPEG-TS recording, decodes
//! its statement bodies and writes them as an ASS subtitle script timed in
//! JST wall-clock time.

pub mod ass;
pub mod caption;
pub mod clock;
pub mod config;
pub mod datetime;
pub mod dumper;
pub mod error;
pub mod ts_analyzer;

// Re-export commonly used types
pub use config::{ConfigFile, DumperConfig};
pub use dumper::{CaptionDumper, DumpState, DumpSummary};
pub use error::{DumpError, ParseError};
