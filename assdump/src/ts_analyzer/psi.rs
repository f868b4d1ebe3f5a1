//! PSI (Program Specific Information) section parsing.
//!
//! This module handles the section header common to PAT, PMT and TOT.
//! Sections are parsed from the first packet of the section only; a
//! section longer than that packet is exposed truncated.

use crate::error::ParseError;

/// PSI section header (common to all PSI tables).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsiHeader {
    /// Table ID.
    pub table_id: u8,
    /// Section syntax indicator.
    pub section_syntax_indicator: bool,
    /// Section length (12 bits).
    pub section_length: u16,
    /// Table ID extension (for long sections).
    pub table_id_extension: u16,
    /// Version number (5 bits).
    pub version_number: u8,
    /// Current/next indicator.
    pub current_next_indicator: bool,
    /// Section number.
    pub section_number: u8,
    /// Last section number.
    pub last_section_number: u8,
}

/// A parsed PSI section.
#[derive(Debug, Clone)]
pub struct PsiSection<'a> {
    /// Section header.
    pub header: PsiHeader,
    /// Section data (after header, before CRC).
    pub data: &'a [u8],
    /// Whether the whole declared section was present.
    pub complete: bool,
}

impl<'a> PsiSection<'a> {
    /// Parse a PSI section from raw bytes.
    ///
    /// # Arguments
    /// * `data` - Slice containing the section data starting from table_id
    /// * `long_form` - Whether the table always uses the extended header
    ///   (PAT, PMT). TOT uses the short header regardless of the syntax bit.
    pub fn parse(data: &'a [u8], long_form: bool) -> Result<Self, ParseError> {
        if data.len() < 3 {
            return Err(ParseError::Truncated("section header"));
        }

        let table_id = data[0];
        let section_syntax_indicator = data[1] & 0x80 != 0;
        let section_length = ((data[1] as u16 & 0x0F) << 8) | data[2] as u16;

        let header = if long_form {
            if data.len() < 8 {
                return Err(ParseError::Truncated("extended section header"));
            }

            PsiHeader {
                table_id,
                section_syntax_indicator,
                section_length,
                table_id_extension: ((data[3] as u16) << 8) | data[4] as u16,
                version_number: (data[5] >> 1) & 0x1F,
                current_next_indicator: data[5] & 0x01 != 0,
                section_number: data[6],
                last_section_number: data[7],
            }
        } else {
            PsiHeader {
                table_id,
                section_syntax_indicator,
                section_length,
                table_id_extension: 0,
                version_number: 0,
                current_next_indicator: true,
                section_number: 0,
                last_section_number: 0,
            }
        };

        // Data range: after header, before the 4-byte CRC
        let total_length = 3 + section_length as usize;
        let data_start = if long_form { 8 } else { 3 };
        let declared_end = total_length.saturating_sub(4).max(data_start);
        let data_end = declared_end.min(data.len());

        Ok(PsiSection {
            header,
            data: &data[data_start..data_end],
            complete: data.len() >= total_length,
        })
    }

    /// Fail unless this section carries `expected` as its table_id.
    pub fn expect_table_id(&self, expected: u8) -> Result<(), ParseError> {
        if self.header.table_id == expected {
            Ok(())
        } else {
            Err(ParseError::IncorrectTableId {
                expected,
                actual: self.header.table_id,
            })
        }
    }
}
