//! PAT (Program Association Table), PID 0x0000.

use super::psi::PsiSection;
use super::table_id;
use crate::error::ParseError;

/// program_number → program_map_PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatEntry {
    pub program_number: u16,
    pub pmt_pid: u16,
}

#[derive(Debug, Clone, Default)]
pub struct PatTable {
    pub transport_stream_id: u16,
    pub version_number: u8,
    /// Programs in section order, program 0 excluded.
    pub programs: Vec<PatEntry>,
    /// PID announced by program 0.
    pub network_pid: Option<u16>,
}

impl PatTable {
    /// Parse the program loop of a PAT section.
    ///
    /// A loop cut short by the packet boundary yields the whole entries
    /// that fit.
    pub fn parse(section: &PsiSection) -> Result<Self, ParseError> {
        section.expect_table_id(table_id::PAT)?;

        let mut programs = Vec::with_capacity(section.data.len() / 4);
        let mut network_pid = None;
        for entry in section.data.chunks_exact(4) {
            let program_number = u16::from_be_bytes([entry[0], entry[1]]);
            let pid_val = u16::from_be_bytes([entry[2] & 0x1F, entry[3]]);
            match program_number {
                0 => network_pid = Some(pid_val),
                _ => programs.push(PatEntry {
                    program_number,
                    pmt_pid: pid_val,
                }),
            }
        }

        Ok(PatTable {
            transport_stream_id: section.header.table_id_extension,
            version_number: section.header.version_number,
            programs,
            network_pid,
        })
    }

    /// PMT PIDs in section order.
    pub fn pmt_pids(&self) -> impl Iterator<Item = u16> + '_ {
        self.programs.iter().map(|p| p.pmt_pid)
    }
}
