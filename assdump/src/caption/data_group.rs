//! Caption data group and data unit parsing (ARIB STD-B24 Volume 1, Part 3, Chapter 9).

use log::debug;
use nom::bytes::complete::take;
use nom::multi::many0;
use nom::number::complete::{be_u24, be_u8};
use nom::sequence::tuple;
use nom::IResult;

use crate::error::ParseError;

/// data_unit_parameter of a statement body (text).
pub const STATEMENT_BODY: u8 = 0x20;

/// What a data group carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataGroupKind {
    /// caption_management_data (group A 0x00, group B 0x20).
    Management,
    /// caption_data for one language.
    Caption,
}

impl DataGroupKind {
    pub fn from_id(data_group_id: u8) -> Self {
        match data_group_id {
            0x00 | 0x20 => DataGroupKind::Management,
            _ => DataGroupKind::Caption,
        }
    }
}

/// One data unit of a caption data group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUnit<'a> {
    pub parameter: u8,
    pub data: &'a [u8],
}

impl DataUnit<'_> {
    pub fn is_statement_body(&self) -> bool {
        self.parameter == STATEMENT_BODY
    }
}

/// A parsed data group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataGroup<'a> {
    /// 6-bit data_group_id.
    pub data_group_id: u8,
    pub kind: DataGroupKind,
    pub data_units: Vec<DataUnit<'a>>,
}

impl<'a> DataGroup<'a> {
    /// Parse a data group from the bytes following the PES data packet header.
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        match data_group(data) {
            Ok((_, group)) => Ok(group),
            Err(_) => Err(ParseError::Truncated("data group")),
        }
    }

    /// Statement bodies in transmission order.
    pub fn statement_bodies(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.data_units
            .iter()
            .filter(|u| u.is_statement_body())
            .map(|u| u.data)
    }
}

fn data_group(input: &[u8]) -> IResult<&[u8], DataGroup<'_>> {
    // data_group_id(6) + data_group_version(2), link numbers, data_group_size
    let (input, id_byte) = be_u8(input)?;
    let (input, _) = take(4usize)(input)?;
    let data_group_id = id_byte >> 2;
    let kind = DataGroupKind::from_id(data_group_id);

    // TMD and reserved bits; OTM/STM are not expected
    let (input, _tmd) = be_u8(input)?;
    let input = match kind {
        DataGroupKind::Management => {
            // language_tag, DMF, ISO 639 code, Format/TCS/rollup: 5 bytes each
            let (input, num_languages) = be_u8(input)?;
            let (input, _) = take(num_languages as usize * 5)(input)?;
            input
        }
        DataGroupKind::Caption => input,
    };

    let (input, data_units) = data_unit_loop(input)?;
    Ok((
        input,
        DataGroup {
            data_group_id,
            kind,
            data_units,
        },
    ))
}

fn data_unit_loop(input: &[u8]) -> IResult<&[u8], Vec<DataUnit<'_>>> {
    let (input, loop_length) = be_u24(input)?;
    let (input, units) = take(loop_length)(input)?;
    let (rest, data_units) = many0(data_unit)(units)?;
    if !rest.is_empty() {
        debug!("Ignoring {} trailing bytes in data unit loop", rest.len());
    }
    Ok((input, data_units))
}

fn data_unit(input: &[u8]) -> IResult<&[u8], DataUnit<'_>> {
    let (input, (_unit_separator, parameter, size)) = tuple((be_u8, be_u8, be_u24))(input)?;
    let (input, data) = take(size)(input)?;
    Ok((input, DataUnit { parameter, data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(parameter: u8, data: &[u8]) -> Vec<u8> {
        let len = data.len() as u32;
        let mut out = vec![0x1F, parameter, (len >> 16) as u8, (len >> 8) as u8, len as u8];
        out.extend_from_slice(data);
        out
    }

    fn with_loop(mut head: Vec<u8>, units: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = units.concat();
        let len = body.len() as u32;
        head.extend_from_slice(&[(len >> 16) as u8, (len >> 8) as u8, len as u8]);
        head.extend_from_slice(&body);
        head.extend_from_slice(&[0xAB, 0xCD]); // CRC16
        head
    }

    #[test]
    fn test_caption_data_group() {
        let head = vec![0x04, 0x00, 0x00, 0x00, 0x10, 0x00]; // data_group_id = 1
        let data = with_loop(head, &[unit(0x20, &[0xA3, 0xC1]), unit(0x35, &[1, 2, 3])]);

        let group = DataGroup::parse(&data).unwrap();
        assert_eq!(group.data_group_id, 0x01);
        assert_eq!(group.kind, DataGroupKind::Caption);
        assert_eq!(group.data_units.len(), 2);
        assert_eq!(group.data_units[1].parameter, 0x35);
        let bodies: Vec<&[u8]> = group.statement_bodies().collect();
        assert_eq!(bodies, vec![&[0xA3, 0xC1][..]]);
    }

    #[test]
    fn test_management_data_group_skips_languages() {
        // group B management (0x20), two languages
        let mut head = vec![0x80, 0x00, 0x00, 0x00, 0x20, 0x00, 0x02];
        head.extend_from_slice(&[0x00, b'j', b'p', b'n', 0x00]);
        head.extend_from_slice(&[0x20, b'e', b'n', b'g', 0x00]);
        let data = with_loop(head, &[unit(0x20, &[0x20])]);

        let group = DataGroup::parse(&data).unwrap();
        assert_eq!(group.data_group_id, 0x20);
        assert_eq!(group.kind, DataGroupKind::Management);
        assert_eq!(group.statement_bodies().count(), 1);
    }

    #[test]
    fn test_empty_loop() {
        let data = with_loop(vec![0x05, 0, 0, 0, 0, 0], &[]);
        let group = DataGroup::parse(&data).unwrap();
        assert!(group.data_units.is_empty());
    }

    #[test]
    fn test_truncated_loop() {
        let mut data = with_loop(vec![0x04, 0, 0, 0, 0, 0], &[unit(0x20, &[0xA3, 0xC1, 0xA3, 0xC2])]);
        data.truncate(12);
        assert_eq!(DataGroup::parse(&data), Err(ParseError::Truncated("data group")));
    }
}
