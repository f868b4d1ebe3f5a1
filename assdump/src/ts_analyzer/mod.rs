//! MPEG-TS (Transport Stream) Analyzer Module.
//!
//! This module provides parsing functionality for MPEG-TS packets and the
//! PSI tables needed to locate and time ARIB captions.
//!
//! # Supported Tables
//! - PAT (Program Association Table) - PID 0x0000
//! - PMT (Program Map Table) - Variable PIDs from PAT
//! - TOT (Time Offset Table) - PID 0x0014

mod descriptors;
mod packet;
mod pat;
mod pid_table;
mod pmt;
mod psi;
mod tot;

pub use descriptors::{component_tags, parse_descriptor_loop, StreamIdentifierDescriptor};
pub use packet::{decode_pcr, AdaptationField, TsHeader, TsPacket, TsPacketReader, SYNC_BYTE, TS_PACKET_SIZE};
pub use pat::{PatEntry, PatTable};
pub use pid_table::{PidRole, PidTable};
pub use pmt::{PmtStream, PmtTable};
pub use psi::{PsiHeader, PsiSection};
pub use tot::TotTable;

/// Well-known PIDs in MPEG-TS.
pub mod pid {
    /// Program Association Table PID.
    pub const PAT: u16 = 0x0000;
    /// Time and Date / Time Offset Table PID.
    pub const TOT: u16 = 0x0014;
    /// Null packet PID (stuffing).
    pub const NULL: u16 = 0x1FFF;
}

/// Table IDs for PSI/SI tables.
pub mod table_id {
    /// Program Association Section.
    pub const PAT: u8 = 0x00;
    /// Program Map Section.
    pub const PMT: u8 = 0x02;
    /// Time Offset Section.
    pub const TOT: u8 = 0x73;
}

/// Descriptor tags used in PSI/SI tables.
pub mod descriptor_tag {
    /// Stream identifier descriptor (0x52).
    pub const STREAM_IDENTIFIER: u8 = 0x52;
}

/// Stream type constants.
pub mod stream_type {
    /// MPEG-2 PES Private Data.
    pub const PES_PRIVATE_DATA: u8 = 0x06;
}

/// Component tags assigned by ARIB TR-B14/B15.
pub mod component_tag {
    /// Default caption stream.
    pub const CAPTION: u8 = 0x87;
}
