//! MPEG-TS packet parsing.
//!
//! This module handles parsing of 188-byte MPEG Transport Stream packets
//! and reading them sequentially from a byte source.

use std::io::{self, Read};

use crate::clock::SystemClock;
use crate::error::ParseError;

/// TS packet size in bytes.
pub const TS_PACKET_SIZE: usize = 188;

/// TS sync byte (0x47).
pub const SYNC_BYTE: u8 = 0x47;

/// Parsed TS packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsHeader {
    /// Transport error indicator.
    pub transport_error: bool,
    /// Payload unit start indicator.
    pub payload_unit_start: bool,
    /// Transport priority.
    pub transport_priority: bool,
    /// Packet Identifier (13 bits).
    pub pid: u16,
    /// Transport scrambling control (2 bits).
    pub scrambling_control: u8,
    /// Adaptation field control (2 bits).
    pub adaptation_field_control: u8,
    /// Continuity counter (4 bits).
    pub continuity_counter: u8,
}

impl TsHeader {
    /// Decode the four header bytes. The caller has already checked the sync byte.
    fn decode(data: &[u8]) -> Self {
        TsHeader {
            transport_error: data[1] & 0x80 != 0,
            payload_unit_start: data[1] & 0x40 != 0,
            transport_priority: data[1] & 0x20 != 0,
            pid: ((data[1] as u16 & 0x1F) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_control: (data[3] >> 4) & 0x03,
            continuity_counter: data[3] & 0x0F,
        }
    }

    /// Check if packet has adaptation field.
    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control & 0x02 != 0
    }

    /// Check if packet has payload.
    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control & 0x01 != 0
    }
}

/// Adaptation field data.
#[derive(Debug, Clone, Default)]
pub struct AdaptationField {
    /// Adaptation field length.
    pub length: u8,
    /// Discontinuity indicator.
    pub discontinuity: bool,
    /// Random access indicator.
    pub random_access: bool,
    /// PCR flag.
    pub pcr_flag: bool,
    /// PCR value (if present).
    pub pcr: Option<SystemClock>,
}

impl AdaptationField {
    /// Parse the adaptation field starting at its length byte.
    fn parse(data: &[u8]) -> Self {
        let length = data[0];
        let body = &data[1..(1 + length as usize).min(data.len())];

        let Some(&flags) = body.first() else {
            return AdaptationField {
                length,
                ..Default::default()
            };
        };

        let pcr_flag = flags & 0x10 != 0;
        let pcr = if pcr_flag && body.len() >= 7 {
            Some(SystemClock::from_ticks(decode_pcr(&body[1..7])))
        } else {
            None
        };

        AdaptationField {
            length,
            discontinuity: flags & 0x80 != 0,
            random_access: flags & 0x40 != 0,
            pcr_flag,
            pcr,
        }
    }
}

/// Decode a 6-byte program_clock_reference field into 27 MHz ticks.
///
/// ```text
/// +--------+--------+--------+--------+--------+--------+
/// |BBBBBBBB|BBBBBBBB|BBBBBBBB|BBBBBBBB|B......E|EEEEEEEE|
/// +--------+--------+--------+--------+--------+--------+
/// ```
/// `B` is the 33-bit base (90 kHz), `E` the 9-bit extension (27 MHz).
pub fn decode_pcr(data: &[u8]) -> u64 {
    let pcr_base = ((data[0] as u64) << 25)
        | ((data[1] as u64) << 17)
        | ((data[2] as u64) << 9)
        | ((data[3] as u64) << 1)
        | ((data[4] as u64) >> 7);
    let pcr_ext = ((data[4] as u64 & 0x01) << 8) | data[5] as u64;
    pcr_base * 300 + pcr_ext
}

/// A parsed TS packet.
#[derive(Debug, Clone)]
pub struct TsPacket<'a> {
    /// Packet header.
    pub header: TsHeader,
    /// Adaptation field (if present).
    pub adaptation_field: Option<AdaptationField>,
    /// Payload data.
    pub payload: &'a [u8],
}

impl<'a> TsPacket<'a> {
    /// Parse a TS packet from raw bytes.
    ///
    /// A wrong sync byte is reported as [`ParseError::InvalidSyncByte`];
    /// the caller decides whether that is fatal.
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        if data.len() < TS_PACKET_SIZE {
            return Err(ParseError::Truncated("TS packet"));
        }

        if data[0] != SYNC_BYTE {
            return Err(ParseError::InvalidSyncByte(data[0]));
        }

        let header = TsHeader::decode(data);

        let mut offset = 4;
        let adaptation_field = if header.has_adaptation_field() {
            let af = AdaptationField::parse(&data[4..TS_PACKET_SIZE]);
            offset = 5 + af.length as usize;
            Some(af)
        } else {
            None
        };

        let payload = if header.has_payload() && offset < TS_PACKET_SIZE {
            &data[offset..TS_PACKET_SIZE]
        } else {
            &[]
        };

        Ok(TsPacket {
            header,
            adaptation_field,
            payload,
        })
    }

    /// PCR carried in this packet's adaptation field, if any.
    pub fn pcr(&self) -> Option<SystemClock> {
        self.adaptation_field.as_ref().and_then(|af| af.pcr)
    }

    /// Get the payload start offset for PSI sections.
    /// Only payload-start packets begin a section; the first byte is the pointer field.
    pub fn get_psi_payload(&self) -> Option<&'a [u8]> {
        if !self.header.payload_unit_start || self.payload.is_empty() {
            return None;
        }

        let pointer = self.payload[0] as usize;
        if pointer + 1 < self.payload.len() {
            Some(&self.payload[pointer + 1..])
        } else {
            None
        }
    }
}

/// Reads fixed 188-byte frames from a byte source until end of stream.
///
/// A trailing partial frame is treated as end of stream.
pub struct TsPacketReader<R> {
    reader: R,
}

impl<R: Read> TsPacketReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> Iterator for TsPacketReader<R> {
    type Item = io::Result<[u8; TS_PACKET_SIZE]>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = [0u8; TS_PACKET_SIZE];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => Some(Ok(buf)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_null_packet() {
        let mut packet = [0u8; 188];
        packet[0] = SYNC_BYTE;
        packet[1] = 0x1F; // PID high bits
        packet[2] = 0xFF; // PID low bits (NULL = 0x1FFF)
        packet[3] = 0x10; // adaptation_field_control = 01, has payload

        let parsed = TsPacket::parse(&packet).unwrap();
        assert_eq!(parsed.header.pid, 0x1FFF);
        assert!(!parsed.header.transport_error);
        assert!(parsed.header.has_payload());
        assert!(!parsed.header.has_adaptation_field());
        assert_eq!(parsed.payload.len(), 184);
    }

    #[test]
    fn test_header_fields() {
        let mut packet = [0u8; 188];
        packet[0] = SYNC_BYTE;
        packet[1] = 0x40 | 0x01; // payload_unit_start, PID high = 0x01
        packet[2] = 0x30;
        packet[3] = 0x1A; // payload only, CC = 10

        let parsed = TsPacket::parse(&packet).unwrap();
        assert_eq!(parsed.header.pid, 0x0130);
        assert!(parsed.header.payload_unit_start);
        assert_eq!(parsed.header.continuity_counter, 10);
        assert_eq!(parsed.header.scrambling_control, 0);
    }

    #[test]
    fn test_header_fields_all_pids() {
        for pid in [0u16, 1, 0x14, 0x100, 0x1ABC, 0x1FFF] {
            for cc in 0..16u8 {
                let mut packet = [0u8; 188];
                packet[0] = SYNC_BYTE;
                packet[1] = (pid >> 8) as u8;
                packet[2] = pid as u8;
                packet[3] = 0x30 | cc;
                let parsed = TsPacket::parse(&packet).unwrap();
                assert_eq!(parsed.header.pid, pid);
                assert_eq!(parsed.header.continuity_counter, cc);
                assert!(parsed.header.has_adaptation_field());
                assert!(parsed.header.has_payload());
            }
        }
    }

    #[test]
    fn test_invalid_sync_byte() {
        let mut packet = [0u8; 188];
        packet[0] = 0x00; // Invalid sync byte

        assert_eq!(
            TsPacket::parse(&packet).unwrap_err(),
            ParseError::InvalidSyncByte(0x00)
        );
    }

    #[test]
    fn test_decode_pcr() {
        let base: u64 = 0x1_2345_6789; // 33 bits
        let ext: u64 = 0x1A5; // 9 bits
        let bytes = [
            (base >> 25) as u8,
            (base >> 17) as u8,
            (base >> 9) as u8,
            (base >> 1) as u8,
            (((base & 1) << 7) as u8) | 0x7E | ((ext >> 8) as u8),
            ext as u8,
        ];
        assert_eq!(decode_pcr(&bytes), base * 300 + ext);
    }

    #[test]
    fn test_adaptation_field_with_pcr() {
        let mut packet = [0u8; 188];
        packet[0] = SYNC_BYTE;
        packet[1] = 0x01;
        packet[2] = 0x00;
        packet[3] = 0x30; // adaptation + payload
        packet[4] = 7; // adaptation_field_length
        packet[5] = 0x10; // PCR flag
        // base = 2, ext = 3
        packet[9] = 0x01;
        packet[11] = 0x03;

        let parsed = TsPacket::parse(&packet).unwrap();
        assert_eq!(parsed.pcr(), Some(SystemClock::from_ticks(2 * 300 + 3)));
        assert_eq!(parsed.payload.len(), 188 - 12);
    }

    #[test]
    fn test_adaptation_field_only() {
        let mut packet = [0xFFu8; 188];
        packet[0] = SYNC_BYTE;
        packet[1] = 0x01;
        packet[2] = 0x00;
        packet[3] = 0x20; // adaptation only
        packet[4] = 183;
        packet[5] = 0x00;

        let parsed = TsPacket::parse(&packet).unwrap();
        assert!(parsed.payload.is_empty());
        assert!(parsed.pcr().is_none());
    }

    #[test]
    fn test_psi_payload_pointer_field() {
        let mut packet = [0u8; 188];
        packet[0] = SYNC_BYTE;
        packet[1] = 0x40;
        packet[3] = 0x10;
        packet[4] = 2; // pointer_field
        packet[7] = 0x42;

        let parsed = TsPacket::parse(&packet).unwrap();
        assert_eq!(parsed.get_psi_payload().unwrap()[0], 0x42);

        packet[1] = 0x00; // not a section start
        let parsed = TsPacket::parse(&packet).unwrap();
        assert!(parsed.get_psi_payload().is_none());
    }

    #[test]
    fn test_reader_drops_partial_tail() {
        let mut data = vec![SYNC_BYTE; TS_PACKET_SIZE * 2];
        data.extend_from_slice(&[SYNC_BYTE; 100]);

        let packets: Vec<_> = TsPacketReader::new(&data[..])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(packets.len(), 2);
    }
}
