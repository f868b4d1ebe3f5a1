//! PES reassembly for the caption stream.
//!
//! Caption PES packets do not declare a usable length, so a packet is
//! considered complete when the next payload-start packet arrives (or the
//! stream ends).

use log::trace;

use crate::clock::{ClockOffset, SystemClock};
use crate::error::ParseError;

/// A reassembled PES packet and the clock state when it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPes {
    pub data: Vec<u8>,
    /// PCR reading at the payload-start packet.
    pub started_at: SystemClock,
    /// Wall-clock calibration in effect at the payload-start packet.
    pub clock_offset: ClockOffset,
}

/// Boundary-driven PES accumulator. Holds at most one PES in flight.
#[derive(Debug, Default)]
pub struct PesAssembler {
    buffer: Vec<u8>,
    started_at: SystemClock,
    clock_offset: ClockOffset,
}

impl PesAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one TS payload.
    ///
    /// A payload-start packet completes the PES accumulated so far (if any)
    /// and begins a new one stamped with `now` and `clock_offset`.
    /// Continuation packets seen before any start are dropped.
    pub fn push(
        &mut self,
        payload: &[u8],
        payload_unit_start: bool,
        now: SystemClock,
        clock_offset: ClockOffset,
    ) -> Option<CompletedPes> {
        if payload_unit_start {
            let completed = self.finish();
            self.buffer.extend_from_slice(payload);
            self.started_at = now;
            self.clock_offset = clock_offset;
            completed
        } else {
            if self.buffer.is_empty() {
                trace!("Dropping caption continuation packet without a start");
            } else {
                self.buffer.extend_from_slice(payload);
            }
            None
        }
    }

    /// Take the PES in flight, leaving the assembler empty.
    pub fn finish(&mut self) -> Option<CompletedPes> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(CompletedPes {
            data: std::mem::take(&mut self.buffer),
            started_at: self.started_at,
            clock_offset: self.clock_offset,
        })
    }
}

/// Strip the PES header and the ARIB synchronized PES data header,
/// returning the data group bytes.
///
/// ```text
/// 00 00 01 | stream_id | PES_packet_length(2) | flags(2) | PES_header_data_length
/// header data ... | data_identifier | private_stream_id | reserved(4) + PES_data_packet_header_length(4)
/// PES data packet header ... | data_group
/// ```
pub fn strip_pes_headers(pes: &[u8]) -> Result<&[u8], ParseError> {
    if pes.len() < 9 {
        return Err(ParseError::Truncated("PES header"));
    }
    if pes[0..3] != [0x00, 0x00, 0x01] {
        return Err(ParseError::InvalidPesHeader);
    }

    let header_data_length = pes[8] as usize;
    let offset = 9 + header_data_length;
    if pes.len() < offset + 3 {
        return Err(ParseError::Truncated("PES data packet header"));
    }

    let data_packet_header_length = (pes[offset + 2] & 0x0F) as usize;
    let start = offset + 3 + data_packet_header_length;
    pes.get(start..)
        .ok_or(ParseError::Truncated("PES data packet header"))
}
