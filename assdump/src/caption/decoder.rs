//! Statement body character decoding (ARIB STD-B24 subset).
//!
//! Caption text arrives as 8-bit codes with the kanji set invoked into GR,
//! which lines up with EUC-JP for JIS X 0208 characters. Control codes are
//! reduced to line breaks and spaces; colors and positioning are dropped.

use encoding_rs::EUC_JP;
use log::debug;

use super::gaiji;

/// Gaiji code emitted by encoders as filler; renders as nothing.
const SUPPRESSED_GAIJI: u16 = 0x7C21;

/// First 7-bit row of the ARIB additional symbol area (rows 85-94).
const GAIJI_FIRST_ROW: u8 = 0x75;

/// APR (active position return).
const APR: u8 = 0x0D;
/// CS (clear screen).
const CS: u8 = 0x0C;
const SP: u8 = 0x20;

/// Decode a statement body into text with `\n` escapes for line breaks.
pub fn decode_statement_body(data: &[u8]) -> String {
    let mut text = String::new();
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            0xA1..=0xFE => {
                let Some(&b2) = data.get(i + 1) else {
                    debug!("Statement body ends inside a 2-byte character");
                    break;
                };
                decode_double_byte(b, b2, &mut text);
                i += 1;
            }
            // color control
            0x80..=0x87 => {}
            APR => text.push_str("\\n"),
            CS | SP => text.push(' '),
            _ => {}
        }
        i += 1;
    }

    text
}

fn decode_double_byte(b1: u8, b2: u8, text: &mut String) {
    if b1 & 0x7F < GAIJI_FIRST_ROW {
        if let Some(s) = EUC_JP.decode_without_bom_handling_and_without_replacement(&[b1, b2]) {
            text.push_str(&s);
            return;
        }
    }

    let code = ((b1 as u16 & 0x7F) << 8) | (b2 as u16 & 0x7F);
    if code != SUPPRESSED_GAIJI {
        text.push_str(&gaiji::substitute(code));
    }
}
