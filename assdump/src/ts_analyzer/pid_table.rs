//! Role assignment for packet identifiers.
//!
//! The table starts out knowing only the fixed PIDs (PAT, TOT) and is
//! filled in as PAT and PMT sections are decoded.

use super::pid;

/// What a packet on a given PID is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidRole {
    /// Program Association Table.
    Pat,
    /// A PMT announced by the PAT, not yet known to carry captions.
    PmtCandidate,
    /// The selected caption elementary stream.
    Caption,
    /// Time Offset Table.
    Tot,
    /// Nothing we decode.
    Unused,
}

/// PID → role mapping built from PAT and PMT.
#[derive(Debug, Clone, Default)]
pub struct PidTable {
    pmt_pids: Vec<u16>,
    caption_pid: Option<u16>,
    pcr_pid: Option<u16>,
}

impl PidTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a PID.
    ///
    /// PAT and TOT take precedence; the caption PID takes precedence over
    /// a PMT candidate sharing the same value.
    pub fn role(&self, pid_val: u16) -> PidRole {
        match pid_val {
            pid::PAT => PidRole::Pat,
            pid::TOT => PidRole::Tot,
            _ if self.caption_pid == Some(pid_val) => PidRole::Caption,
            _ if self.pmt_pids.contains(&pid_val) => PidRole::PmtCandidate,
            _ => PidRole::Unused,
        }
    }

    /// Record PMT PIDs from a PAT. Returns how many were new.
    pub fn add_pmt_candidates(&mut self, pids: impl IntoIterator<Item = u16>) -> usize {
        let mut added = 0;
        for pid in pids {
            if !self.pmt_pids.contains(&pid) {
                self.pmt_pids.push(pid);
                added += 1;
            }
        }
        added
    }

    /// Select the caption stream. Only the first selection takes effect.
    ///
    /// Returns false when a caption stream was already selected.
    pub fn select_caption(&mut self, caption_pid: u16, pcr_pid: u16) -> bool {
        if self.caption_pid.is_some() {
            return false;
        }
        self.caption_pid = Some(caption_pid);
        self.pcr_pid = Some(pcr_pid);
        true
    }

    pub fn pmt_candidates(&self) -> &[u16] {
        &self.pmt_pids
    }

    pub fn caption_pid(&self) -> Option<u16> {
        self.caption_pid
    }

    /// PCR PID of the program carrying captions.
    pub fn pcr_pid(&self) -> Option<u16> {
        self.pcr_pid
    }
}
