//! Error types for caption extraction.

use thiserror::Error;

/// Errors that abort the whole run.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Input could not be opened or read, or output could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A packet did not start with 0x47. No resynchronization is attempted.
    #[error("sync_byte failed at packet #{packet_index}: expected 0x47, got 0x{found:02X}")]
    SyncByte { packet_index: u64, found: u8 },

    /// Configuration file could not be loaded.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Structural errors local to one section or PES packet.
///
/// These are logged and the offending unit is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The section carries a table_id other than the one expected on this PID.
    #[error("Incorrect table_id: expected 0x{expected:02X}, got 0x{actual:02X}")]
    IncorrectTableId { expected: u8, actual: u8 },

    /// The data ends before the structure it declares.
    #[error("Truncated {0}")]
    Truncated(&'static str),

    /// PES start code prefix missing.
    #[error("Invalid PES header")]
    InvalidPesHeader,

    /// First byte of a TS packet is not 0x47.
    #[error("Invalid sync byte: 0x{0:02X}")]
    InvalidSyncByte(u8),

    /// MJD/BCD fields do not form a valid date and time.
    #[error("Invalid date/time")]
    InvalidDateTime,
}

pub type Result<T, E = DumpError> = std::result::Result<T, E>;
