//! ARIB STD-B24 caption extraction.
//!
//! PES packets on the caption PID are reassembled, stripped down to their
//! data group, and every statement body found is decoded into a
//! [`CaptionUnit`].

mod data_group;
mod decoder;
pub mod gaiji;
mod pes;

pub use data_group::{DataGroup, DataGroupKind, DataUnit, STATEMENT_BODY};
pub use decoder::decode_statement_body;
pub use pes::{strip_pes_headers, CompletedPes, PesAssembler};

use crate::clock::{ClockOffset, SystemClock};
use crate::error::ParseError;

/// A decoded caption. It replaces whatever was on screen at `start` and
/// stays until the next caption arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionUnit {
    pub text: String,
    /// PCR reading when the carrying PES started.
    pub start: SystemClock,
    /// Wall-clock calibration in effect at `start`.
    pub clock_offset: ClockOffset,
}

impl CaptionUnit {
    /// True when the text holds nothing but spaces (or nothing at all).
    pub fn is_blank(&self) -> bool {
        self.text.chars().all(|c| c == ' ')
    }
}

/// Decode all statement bodies carried by one reassembled PES packet.
pub fn decode_pes(pes: &CompletedPes) -> Result<Vec<CaptionUnit>, ParseError> {
    let group = DataGroup::parse(strip_pes_headers(&pes.data)?)?;
    Ok(group
        .statement_bodies()
        .map(|body| CaptionUnit {
            text: decode_statement_body(body),
            start: pes.started_at,
            clock_offset: pes.clock_offset,
        })
        .collect())
}
