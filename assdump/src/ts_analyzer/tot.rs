//! TOT (Time Offset Table) parsing.
//!
//! The TOT is transmitted on PID 0x0014 and carries the current date and
//! time in JST (ARIB STD-B10 Part 2, 5.2.9). The local time offset
//! descriptors that follow are not needed and are skipped.

use chrono::NaiveDateTime;

use super::psi::PsiSection;
use super::table_id;
use crate::datetime;
use crate::error::ParseError;

/// Parsed TOT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotTable {
    /// Current JST date and time.
    pub jst_time: NaiveDateTime,
}

impl TotTable {
    /// Parse a TOT from a short-form PSI section.
    pub fn parse(section: &PsiSection) -> Result<Self, ParseError> {
        section.expect_table_id(table_id::TOT)?;

        let jst: &[u8; 5] = section
            .data
            .get(..5)
            .and_then(|b| b.try_into().ok())
            .ok_or(ParseError::Truncated("TOT"))?;

        let jst_time = datetime::decode_jst_time(jst).ok_or(ParseError::InvalidDateTime)?;
        Ok(TotTable { jst_time })
    }

    /// Seconds since 1970-01-01 00:00:00 counted in JST.
    pub fn jst_seconds(&self) -> i64 {
        self.jst_time.and_utc().timestamp()
    }
}
