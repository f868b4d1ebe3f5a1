//! PMT (Program Map Table) parsing.
//!
//! The PMT lists the elementary streams of one program. Captions travel in
//! a PES private data stream tagged with a stream identifier descriptor.

use super::descriptors;
use super::psi::PsiSection;
use super::{stream_type, table_id};
use crate::error::ParseError;

/// A single elementary stream entry in the PMT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtStream {
    /// Stream type.
    pub stream_type: u8,
    /// Elementary PID.
    pub elementary_pid: u16,
    /// ES info descriptors.
    pub descriptors: Vec<u8>,
}

impl PmtStream {
    /// Whether this stream is PES private data carrying `component_tag`.
    pub fn has_component_tag(&self, component_tag: u8) -> bool {
        self.stream_type == stream_type::PES_PRIVATE_DATA
            && descriptors::component_tags(&self.descriptors).any(|t| t == component_tag)
    }
}

/// Parsed PMT (Program Map Table).
#[derive(Debug, Clone, Default)]
pub struct PmtTable {
    /// Program number (service ID).
    pub program_number: u16,
    /// Version number.
    pub version_number: u8,
    /// PCR PID.
    pub pcr_pid: u16,
    /// Elementary streams.
    pub streams: Vec<PmtStream>,
}

impl PmtTable {
    /// Parse a PMT from a PSI section.
    ///
    /// Only the part of the section present in the first packet is seen;
    /// a stream entry cut off at the packet boundary is dropped.
    pub fn parse(section: &PsiSection) -> Result<Self, ParseError> {
        section.expect_table_id(table_id::PMT)?;

        let data = section.data;
        if data.len() < 4 {
            return Err(ParseError::Truncated("PMT"));
        }

        let pcr_pid = ((data[0] as u16 & 0x1F) << 8) | data[1] as u16;
        let program_info_length = ((data[2] as usize & 0x0F) << 8) | data[3] as usize;

        let mut pmt = PmtTable {
            program_number: section.header.table_id_extension,
            version_number: section.header.version_number,
            pcr_pid,
            streams: Vec::new(),
        };

        // Parse elementary stream loop
        let mut offset = 4 + program_info_length;
        while offset + 5 <= data.len() {
            let stream_type = data[offset];
            let elementary_pid = ((data[offset + 1] as u16 & 0x1F) << 8) | data[offset + 2] as u16;
            let es_info_length = ((data[offset + 3] as usize & 0x0F) << 8) | data[offset + 4] as usize;

            offset += 5;

            if offset + es_info_length > data.len() {
                break;
            }

            let descriptors = data[offset..offset + es_info_length].to_vec();
            offset += es_info_length;

            pmt.streams.push(PmtStream {
                stream_type,
                elementary_pid,
                descriptors,
            });
        }

        Ok(pmt)
    }

    /// First elementary stream carrying `component_tag`, if any.
    pub fn find_component(&self, component_tag: u8) -> Option<&PmtStream> {
        self.streams
            .iter()
            .find(|s| s.has_component_tag(component_tag))
    }
}
