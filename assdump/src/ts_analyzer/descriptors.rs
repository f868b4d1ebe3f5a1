//! Descriptor parsing for PSI tables.
//!
//! Only the stream identifier descriptor is decoded; everything else is
//! walked over by tag and length.

use super::descriptor_tag;
use crate::error::ParseError;

/// Stream identifier descriptor (0x52, ARIB STD-B10 6.2.16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamIdentifierDescriptor {
    /// Component tag identifying the elementary stream within the service.
    pub component_tag: u8,
}

impl StreamIdentifierDescriptor {
    /// Parse a stream identifier descriptor body.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let component_tag = *data
            .first()
            .ok_or(ParseError::Truncated("stream identifier descriptor"))?;
        Ok(StreamIdentifierDescriptor { component_tag })
    }
}

/// Parse descriptors from a descriptor loop.
///
/// A descriptor whose declared length overruns the loop ends the walk.
pub fn parse_descriptor_loop(data: &[u8]) -> Vec<(u8, &[u8])> {
    let mut descriptors = Vec::new();
    let mut offset = 0;

    while offset + 2 <= data.len() {
        let tag = data[offset];
        let length = data[offset + 1] as usize;
        offset += 2;

        if offset + length > data.len() {
            break;
        }

        descriptors.push((tag, &data[offset..offset + length]));
        offset += length;
    }

    descriptors
}

/// Component tags of every stream identifier descriptor in a loop, in order.
pub fn component_tags(data: &[u8]) -> impl Iterator<Item = u8> + '_ {
    parse_descriptor_loop(data)
        .into_iter()
        .filter(|(tag, _)| *tag == descriptor_tag::STREAM_IDENTIFIER)
        .filter_map(|(_, body)| StreamIdentifierDescriptor::parse(body).ok())
        .map(|d| d.component_tag)
}
