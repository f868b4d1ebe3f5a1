//! ASS (Advanced SubStation Alpha) script output.

use std::io::{self, Write};

use crate::clock::SystemClock;

/// Script header, written once before the first Dialogue line.
pub const SCRIPT_HEADER: &str = "[Script Info]
ScriptType: v4.00+
Collisions: Normal
ScaledBorderAndShadow: yes
Timer: 100.0000

[Events]
";

/// Writes Dialogue lines, emitting the header lazily.
///
/// A script with no Dialogue lines is empty: not even the header is written.
#[derive(Debug)]
pub struct AssWriter<W: Write> {
    out: W,
    header_written: bool,
    lines_written: u64,
}

impl<W: Write> AssWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
            lines_written: 0,
        }
    }

    /// Write one Dialogue line spanning `[start, end]` (wall-clock times).
    pub fn write_dialogue(&mut self, start: SystemClock, end: SystemClock, text: &str) -> io::Result<()> {
        if !self.header_written {
            self.out.write_all(SCRIPT_HEADER.as_bytes())?;
            self.header_written = true;
        }
        writeln!(
            self.out,
            "Dialogue: 0,{},{},Default,,,,,,{}",
            format_timestamp(start),
            format_timestamp(end),
            text
        )?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// `HH:MM:SS.CC`
pub fn format_timestamp(t: SystemClock) -> String {
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        t.hour(),
        t.minute(),
        t.second(),
        t.centisecond()
    )
}
