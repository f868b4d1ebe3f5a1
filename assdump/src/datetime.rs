//! BCD and Modified Julian Date decoding (ARIB STD-B10 Part 2, Appendix C).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Decode a two-digit packed BCD byte.
pub fn decode_bcd(n: u8) -> u8 {
    (n >> 4) * 10 + (n & 0x0F)
}

/// Convert a Modified Julian Date to a Gregorian calendar date.
pub fn mjd_to_date(mjd: u16) -> Option<NaiveDate> {
    let mjd = mjd as f64;
    let y = ((mjd - 15078.2) / 365.25).trunc();
    let y_days = (y * 365.25).trunc();
    let m = ((mjd - 14956.1 - y_days) / 30.6001).trunc();
    let day = mjd - 14956.0 - y_days - (m * 30.6001).trunc();
    let k = if m == 14.0 || m == 15.0 { 1.0 } else { 0.0 };

    let year = 1900 + (y + k) as i32;
    let month = (m - 1.0 - k * 12.0) as u32;
    NaiveDate::from_ymd_opt(year, month, day as u32)
}

/// Decode the 40-bit `JST_time` field: 16-bit MJD followed by BCD hh mm ss.
pub fn decode_jst_time(data: &[u8; 5]) -> Option<NaiveDateTime> {
    let mjd = u16::from_be_bytes([data[0], data[1]]);
    let date = mjd_to_date(mjd)?;
    let time = NaiveTime::from_hms_opt(
        decode_bcd(data[2]) as u32,
        decode_bcd(data[3]) as u32,
        decode_bcd(data[4]) as u32,
    )?;
    Some(date.and_time(time))
}
