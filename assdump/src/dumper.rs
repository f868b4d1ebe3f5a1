//! Caption dumper - single pass over a transport stream.
//!
//! Packets are routed by PID role. PAT and PMT locate the caption stream
//! and its PCR PID, the TOT calibrates PCR time against JST, and each
//! decoded caption closes the interval of the caption before it.

use std::io::{Read, Write};

use log::{debug, info, trace, warn};

use crate::ass::AssWriter;
use crate::caption::{self, CaptionUnit, CompletedPes, PesAssembler};
use crate::clock::{ClockOffset, SystemClock};
use crate::config::DumperConfig;
use crate::error::{DumpError, ParseError, Result};
use crate::ts_analyzer::{pid, PatTable, PidRole, PidTable, PmtTable, PsiSection, TotTable, TsPacket, TsPacketReader};

/// Progress of caption stream discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpState {
    /// No PAT decoded yet.
    AwaitingPat,
    /// PMT candidates known, no PMT decoded yet.
    AwaitingPmt,
    /// PMTs decoded, none carries a caption stream.
    AwaitingCaptionPid,
    /// Caption PID selected.
    Streaming,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    /// TS packets processed.
    pub packets_processed: u64,
    /// Caption units decoded from statement bodies.
    pub captions_decoded: u64,
    /// Dialogue lines written.
    pub dialogue_lines: u64,
    /// PSI sections and PES packets skipped as malformed.
    pub sections_skipped: u64,
}

/// Everything that changes while walking one stream.
#[derive(Debug)]
struct Session {
    pids: PidTable,
    pmt_seen: bool,
    state: DumpState,
    /// Latest PCR on the program's PCR PID.
    pcr: SystemClock,
    clock_offset: ClockOffset,
    assembler: PesAssembler,
    /// Caption on screen, waiting for its successor to know its end.
    pending: Option<CaptionUnit>,
    /// Whether the caption displaced before `pending` was blank.
    last_blank: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            pids: PidTable::new(),
            pmt_seen: false,
            state: DumpState::AwaitingPat,
            pcr: SystemClock::default(),
            clock_offset: ClockOffset::default(),
            assembler: PesAssembler::new(),
            pending: None,
            last_blank: true,
        }
    }

    fn current_state(&self) -> DumpState {
        if self.pids.caption_pid().is_some() {
            DumpState::Streaming
        } else if self.pmt_seen {
            DumpState::AwaitingCaptionPid
        } else if !self.pids.pmt_candidates().is_empty() {
            DumpState::AwaitingPmt
        } else {
            DumpState::AwaitingPat
        }
    }
}

/// Extracts captions from a transport stream into an ASS script.
pub struct CaptionDumper<W: Write> {
    config: DumperConfig,
    session: Session,
    writer: AssWriter<W>,
    summary: DumpSummary,
}

impl<W: Write> CaptionDumper<W> {
    pub fn new(config: DumperConfig, out: W) -> Self {
        Self {
            config,
            session: Session::new(),
            writer: AssWriter::new(out),
            summary: DumpSummary::default(),
        }
    }

    /// Process a whole stream.
    ///
    /// On a fatal error the lines written so far are flushed before the
    /// error is returned. A sync byte failure still ends the caption PES
    /// in flight at a packet boundary, so it is decoded first.
    pub fn run<R: Read>(&mut self, input: R) -> Result<DumpSummary> {
        for packet in TsPacketReader::new(input) {
            let fed = packet
                .map_err(DumpError::from)
                .and_then(|buf| self.feed_packet(&buf));
            if let Err(e) = fed {
                if let DumpError::SyncByte { .. } = e {
                    if let Some(pes) = self.session.assembler.finish() {
                        self.process_pes(pes)?;
                    }
                }
                self.writer.flush()?;
                return Err(e);
            }
        }
        self.finish()
    }

    /// Process one 188-byte packet.
    pub fn feed_packet(&mut self, data: &[u8]) -> Result<()> {
        let packet = match TsPacket::parse(data) {
            Ok(packet) => packet,
            Err(ParseError::InvalidSyncByte(found)) => {
                return Err(DumpError::SyncByte {
                    packet_index: self.summary.packets_processed,
                    found,
                });
            }
            Err(e) => {
                debug!("Skipping packet: {}", e);
                return Ok(());
            }
        };
        self.summary.packets_processed += 1;

        let pid_val = packet.header.pid;
        if pid_val == pid::NULL {
            return Ok(());
        }

        if Some(pid_val) == self.session.pids.pcr_pid() {
            if let Some(pcr) = packet.pcr() {
                self.session.pcr = pcr;
            }
        }

        if !packet.header.has_payload() {
            return Ok(());
        }

        match self.session.pids.role(pid_val) {
            PidRole::Pat => self.process_pat(&packet),
            PidRole::PmtCandidate => self.process_pmt(&packet),
            PidRole::Tot => self.process_tot(&packet),
            PidRole::Caption => {
                let (now, offset) = (self.session.pcr, self.session.clock_offset);
                let start = packet.header.payload_unit_start;
                if let Some(pes) = self.session.assembler.push(packet.payload, start, now, offset) {
                    self.process_pes(pes)?;
                }
            }
            PidRole::Unused => {}
        }

        Ok(())
    }

    /// End of stream: decode the PES in flight and report.
    ///
    /// The newest caption has no successor and is dropped unless
    /// `flush_at_eof` is set.
    pub fn finish(&mut self) -> Result<DumpSummary> {
        if let Some(pes) = self.session.assembler.finish() {
            self.process_pes(pes)?;
        }

        if self.config.flush_at_eof {
            if let Some(last) = self.session.pending.take() {
                let end = last.start + SystemClock::from_centiseconds(self.config.eof_hold_centis);
                let offset = last.clock_offset;
                self.close_caption(last, end, offset)?;
            }
        } else if let Some(last) = &self.session.pending {
            debug!("Dropping final caption without successor: {:?}", last.text);
        }

        self.writer.flush()?;
        self.summary.dialogue_lines = self.writer.lines_written();
        Ok(self.summary.clone())
    }

    pub fn state(&self) -> DumpState {
        self.session.state
    }

    pub fn caption_pid(&self) -> Option<u16> {
        self.session.pids.caption_pid()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn process_pat(&mut self, packet: &TsPacket) {
        let Some(payload) = packet.get_psi_payload() else {
            return;
        };

        match PsiSection::parse(payload, true).and_then(|s| PatTable::parse(&s)) {
            Ok(pat) => {
                if let Some(network_pid) = pat.network_pid {
                    trace!("PAT network PID 0x{:04X}", network_pid);
                }
                for pmt_pid in pat.pmt_pids() {
                    if self.session.pids.add_pmt_candidates([pmt_pid]) > 0 {
                        info!("PMT candidate PID 0x{:04X}", pmt_pid);
                    }
                }
                self.update_state();
            }
            Err(e) => self.skip_section(pid::PAT, e),
        }
    }

    fn process_pmt(&mut self, packet: &TsPacket) {
        if self.session.pids.caption_pid().is_some() {
            return;
        }
        let Some(payload) = packet.get_psi_payload() else {
            return;
        };

        let pid_val = packet.header.pid;
        let parsed = PsiSection::parse(payload, true).and_then(|section| {
            if !section.complete {
                debug!(
                    "PMT on PID 0x{:04X} continues past its first packet; parsing {} bytes",
                    pid_val,
                    section.data.len()
                );
            }
            PmtTable::parse(&section)
        });
        match parsed {
            Ok(pmt) => {
                self.session.pmt_seen = true;
                if let Some(stream) = pmt.find_component(self.config.caption_component_tag) {
                    if self.session.pids.select_caption(stream.elementary_pid, pmt.pcr_pid) {
                        info!(
                            "Caption PID 0x{:04X} in program {}, PCR PID 0x{:04X}",
                            stream.elementary_pid, pmt.program_number, pmt.pcr_pid
                        );
                    }
                }
                self.update_state();
            }
            Err(e) => self.skip_section(pid_val, e),
        }
    }

    fn process_tot(&mut self, packet: &TsPacket) {
        let Some(payload) = packet.get_psi_payload() else {
            return;
        };

        match PsiSection::parse(payload, false).and_then(|s| TotTable::parse(&s)) {
            Ok(tot) => {
                let jst_seconds = tot.jst_seconds();
                if jst_seconds != 0 {
                    self.session.clock_offset = ClockOffset::calibrate(jst_seconds, self.session.pcr);
                    debug!(
                        "TOT {} at PCR {} -> offset {} cs",
                        tot.jst_time,
                        self.session.pcr.ticks(),
                        self.session.clock_offset.centiseconds()
                    );
                }
            }
            // TDT shares the PID; not worth counting
            Err(ParseError::IncorrectTableId { .. }) => {}
            Err(e) => self.skip_section(pid::TOT, e),
        }
    }

    fn process_pes(&mut self, pes: CompletedPes) -> Result<()> {
        match caption::decode_pes(&pes) {
            Ok(units) => {
                for unit in units {
                    self.on_caption(unit)?;
                }
            }
            Err(e) => {
                warn!("Skipping caption PES ({} bytes): {}", pes.data.len(), e);
                self.summary.sections_skipped += 1;
            }
        }
        Ok(())
    }

    fn on_caption(&mut self, unit: CaptionUnit) -> Result<()> {
        self.summary.captions_decoded += 1;
        trace!("Caption at {}: {:?}", unit.start.ticks(), unit.text);

        let (end, offset) = (unit.start, unit.clock_offset);
        if let Some(prev) = self.session.pending.replace(unit) {
            self.close_caption(prev, end, offset)?;
        }
        Ok(())
    }

    /// Write `caption` ending at `end` unless it is empty or continues a blank run.
    ///
    /// Both ends are converted with `offset`, the calibration in effect when
    /// the caption's successor started.
    fn close_caption(&mut self, caption: CaptionUnit, end: SystemClock, offset: ClockOffset) -> Result<()> {
        let blank = caption.is_blank();
        if !caption.text.is_empty() && !(blank && self.session.last_blank) {
            self.writer
                .write_dialogue(offset.apply(caption.start), offset.apply(end), &caption.text)?;
        }
        self.session.last_blank = blank;
        Ok(())
    }

    fn skip_section(&mut self, pid_val: u16, e: ParseError) {
        debug!("Skipping section on PID 0x{:04X}: {}", pid_val, e);
        self.summary.sections_skipped += 1;
    }

    fn update_state(&mut self) {
        let state = self.session.current_state();
        if state != self.session.state {
            info!("{:?} -> {:?}", self.session.state, state);
            self.session.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ass::SCRIPT_HEADER;
    use crate::ts_analyzer::TS_PACKET_SIZE;

    const PMT_PID: u16 = 0x01F0;
    const CAPTION_PID: u16 = 0x0130;
    const PCR_PID: u16 = 0x01FF;

    fn header(pid: u16, pusi: bool, afc: u8) -> Vec<u8> {
        vec![
            0x47,
            (if pusi { 0x40 } else { 0x00 }) | (pid >> 8) as u8,
            pid as u8,
            afc << 4,
        ]
    }

    fn payload_packet(pid: u16, pusi: bool, payload: &[u8]) -> Vec<u8> {
        let mut packet = header(pid, pusi, 0b01);
        packet.extend_from_slice(payload);
        packet.resize(TS_PACKET_SIZE, 0xFF);
        packet
    }

    fn pcr_packet(pid: u16, centis: u64) -> Vec<u8> {
        let base = centis * 900; // 90 kHz
        let mut packet = header(pid, false, 0b10);
        packet.extend_from_slice(&[
            183,
            0x10,
            (base >> 25) as u8,
            (base >> 17) as u8,
            (base >> 9) as u8,
            (base >> 1) as u8,
            ((base & 1) << 7) as u8 | 0x7E,
            0x00,
        ]);
        packet.resize(TS_PACKET_SIZE, 0xFF);
        packet
    }

    fn pat() -> Vec<u8> {
        payload_packet(
            pid::PAT,
            true,
            &[
                0x00, // pointer_field
                0x00, 0xB0, 0x11, 0x7F, 0xE1, 0xC1, 0x00, 0x00, //
                0x00, 0x00, 0xE0, 0x10, // network
                0x04, 0x00, 0xE0 | (PMT_PID >> 8) as u8, PMT_PID as u8, //
                0x00, 0x00, 0x00, 0x00,
            ],
        )
    }

    fn pmt(component_tag: u8) -> Vec<u8> {
        payload_packet(
            PMT_PID,
            true,
            &[
                0x00, //
                0x02, 0xB0, 0x15, 0x04, 0x00, 0xC1, 0x00, 0x00, //
                0xE0 | (PCR_PID >> 8) as u8, PCR_PID as u8, 0xF0, 0x00, //
                0x06, 0xE0 | (CAPTION_PID >> 8) as u8, CAPTION_PID as u8, 0xF0, 0x03, 0x52, 0x01, component_tag,
                0x00, 0x00, 0x00, 0x00,
            ],
        )
    }

    /// 2020-01-01 21:00:00 JST
    fn tot() -> Vec<u8> {
        tot_at(0x21)
    }

    /// 2020-01-01 on the hour, `hour_bcd` JST
    fn tot_at(hour_bcd: u8) -> Vec<u8> {
        payload_packet(
            pid::TOT,
            true,
            &[
                0x00, //
                0x73, 0x70, 0x0B, 0xE5, 0xE1, hour_bcd, 0x00, 0x00, 0xF0, 0x00, //
                0x00, 0x00, 0x00, 0x00,
            ],
        )
    }

    fn caption(statement: &[u8]) -> Vec<u8> {
        let unit_len = statement.len();
        let loop_len = 5 + unit_len;
        let mut pes = vec![
            0x00, 0x00, 0x01, 0xBD, 0x00, 0x00, 0x81, 0x80, 0x05, //
            0x21, 0x00, 0x01, 0x00, 0x01, //
            0x80, 0xFF, 0xF0, //
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00, //
            (loop_len >> 16) as u8, (loop_len >> 8) as u8, loop_len as u8, //
            0x1F, 0x20, (unit_len >> 16) as u8, (unit_len >> 8) as u8, unit_len as u8,
        ];
        pes.extend_from_slice(statement);
        payload_packet(CAPTION_PID, true, &pes)
    }

    const A: &[u8] = &[0xA3, 0xC1];
    const B: &[u8] = &[0xA3, 0xC2];
    const C: &[u8] = &[0xA3, 0xC3];
    const BLANK: &[u8] = &[0x20];

    fn run(config: DumperConfig, packets: &[Vec<u8>]) -> (Result<DumpSummary>, String) {
        let stream = packets.concat();
        let mut dumper = CaptionDumper::new(config, Vec::new());
        let result = dumper.run(&stream[..]);
        (result, String::from_utf8(dumper.into_inner()).unwrap())
    }

    fn prelude() -> Vec<Vec<u8>> {
        vec![pat(), pmt(0x87), pcr_packet(PCR_PID, 1000), tot()]
    }

    #[test]
    fn test_end_to_end_single_line() {
        let mut packets = prelude();
        packets.push(caption(A));
        packets.push(pcr_packet(PCR_PID, 1250));
        packets.push(caption(B));

        let (result, out) = run(DumperConfig::default(), &packets);
        let summary = result.unwrap();

        assert_eq!(
            out,
            format!(
                "{}Dialogue: 0,21:00:00.00,21:00:02.50,Default,,,,,,Ａ\n",
                SCRIPT_HEADER
            )
        );
        assert_eq!(summary.dialogue_lines, 1);
        assert_eq!(summary.captions_decoded, 2);
        assert_eq!(summary.packets_processed, 7);
    }

    #[test]
    fn test_final_caption_flushed_when_configured() {
        let mut packets = prelude();
        packets.push(caption(A));
        packets.push(pcr_packet(PCR_PID, 1250));
        packets.push(caption(B));

        let config = DumperConfig {
            flush_at_eof: true,
            ..Default::default()
        };
        let (result, out) = run(config, &packets);
        assert_eq!(result.unwrap().dialogue_lines, 2);
        assert!(out.ends_with("Dialogue: 0,21:00:02.50,21:00:07.50,Default,,,,,,Ｂ\n"));
    }

    #[test]
    fn test_blank_run_collapses() {
        let mut packets = prelude();
        for (i, text) in [A, BLANK, BLANK, B, C].iter().enumerate() {
            packets.push(pcr_packet(PCR_PID, 1000 + 100 * i as u64));
            packets.push(caption(text));
        }

        let (result, out) = run(DumperConfig::default(), &packets);
        result.unwrap();

        let lines: Vec<&str> = out.lines().filter(|l| l.starts_with("Dialogue")).collect();
        assert_eq!(
            lines,
            vec![
                "Dialogue: 0,21:00:00.00,21:00:01.00,Default,,,,,,Ａ",
                "Dialogue: 0,21:00:01.00,21:00:02.00,Default,,,,,, ",
                "Dialogue: 0,21:00:03.00,21:00:04.00,Default,,,,,,Ｂ",
            ]
        );
    }

    #[test]
    fn test_leading_blank_suppressed() {
        let mut packets = prelude();
        packets.push(caption(BLANK));
        packets.push(caption(A));
        packets.push(caption(B));

        let (result, out) = run(DumperConfig::default(), &packets);
        assert_eq!(result.unwrap().dialogue_lines, 1);
        assert!(out.ends_with(",Ａ\n"));
    }

    #[test]
    fn test_no_captions_no_header() {
        let (result, out) = run(DumperConfig::default(), &prelude());
        assert_eq!(result.unwrap().dialogue_lines, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_sync_error_keeps_previous_lines() {
        let mut packets = prelude();
        packets.push(caption(A));
        packets.push(pcr_packet(PCR_PID, 1100));
        packets.push(caption(B));
        packets.push(pcr_packet(PCR_PID, 1200));
        packets.push(caption(C));
        let mut bad = caption(A);
        bad[0] = 0x00;
        packets.push(bad);
        packets.push(caption(B));

        let (result, out) = run(DumperConfig::default(), &packets);
        assert!(matches!(
            result,
            Err(DumpError::SyncByte {
                packet_index: 9,
                found: 0x00
            })
        ));
        // C's PES ends at the broken packet and still closes B
        let lines: Vec<&str> = out.lines().filter(|l| l.starts_with("Dialogue")).collect();
        assert_eq!(
            lines,
            vec![
                "Dialogue: 0,21:00:00.00,21:00:01.00,Default,,,,,,Ａ",
                "Dialogue: 0,21:00:01.00,21:00:02.00,Default,,,,,,Ｂ",
            ]
        );
    }

    #[test]
    fn test_pcr_on_other_pid_ignored() {
        let mut packets = prelude();
        packets.push(caption(A));
        packets.push(pcr_packet(PCR_PID, 1100));
        packets.push(pcr_packet(0x0111, 9000));
        packets.push(caption(B));

        let (result, out) = run(DumperConfig::default(), &packets);
        result.unwrap();
        assert!(out.ends_with("Dialogue: 0,21:00:00.00,21:00:01.00,Default,,,,,,Ａ\n"));
    }

    #[test]
    fn test_pcr_before_pmt_ignored() {
        let packets = vec![
            pat(),
            pcr_packet(PCR_PID, 5000),
            pmt(0x87),
            caption(A),
            pcr_packet(PCR_PID, 100),
            caption(B),
        ];

        let (result, out) = run(DumperConfig::default(), &packets);
        result.unwrap();
        assert!(out.ends_with("Dialogue: 0,00:00:00.00,00:00:01.00,Default,,,,,,Ａ\n"));
    }

    #[test]
    fn test_line_timed_with_offset_at_successor_start() {
        let mut packets = prelude();
        packets.push(caption(A));
        packets.push(pcr_packet(PCR_PID, 1100));
        packets.push(caption(B));
        packets.push(tot_at(0x22));
        packets.push(pcr_packet(PCR_PID, 1200));
        packets.push(caption(C));

        let (result, out) = run(DumperConfig::default(), &packets);
        result.unwrap();
        let lines: Vec<&str> = out.lines().filter(|l| l.starts_with("Dialogue")).collect();
        assert_eq!(lines[0], "Dialogue: 0,21:00:00.00,21:00:01.00,Default,,,,,,Ａ");
        assert_eq!(lines[1], "Dialogue: 0,22:00:00.00,22:00:01.00,Default,,,,,,Ｂ");
    }

    #[test]
    fn test_huge_eof_hold_does_not_overflow() {
        let mut packets = prelude();
        packets.push(caption(A));

        let config = DumperConfig {
            flush_at_eof: true,
            eof_hold_centis: i64::MAX as u64,
            ..Default::default()
        };
        let (result, out) = run(config, &packets);
        assert_eq!(result.unwrap().dialogue_lines, 1);
        assert!(out.contains(",Ａ\n"));
    }

    #[test]
    fn test_state_progression() {
        let mut dumper = CaptionDumper::new(DumperConfig::default(), Vec::new());
        assert_eq!(dumper.state(), DumpState::AwaitingPat);

        dumper.feed_packet(&pat()).unwrap();
        assert_eq!(dumper.state(), DumpState::AwaitingPmt);

        dumper.feed_packet(&pmt(0x30)).unwrap();
        assert_eq!(dumper.state(), DumpState::AwaitingCaptionPid);
        assert_eq!(dumper.caption_pid(), None);

        dumper.feed_packet(&pmt(0x87)).unwrap();
        assert_eq!(dumper.state(), DumpState::Streaming);
        assert_eq!(dumper.caption_pid(), Some(CAPTION_PID));
    }

    #[test]
    fn test_unexpected_table_id_skipped() {
        let mut bad_pat = pat();
        bad_pat[5] = 0x42;

        let mut packets = vec![bad_pat];
        packets.extend(prelude());
        packets.push(caption(A));
        packets.push(caption(B));

        let (result, out) = run(DumperConfig::default(), &packets);
        let summary = result.unwrap();
        assert_eq!(summary.sections_skipped, 1);
        assert_eq!(summary.dialogue_lines, 1);
        assert!(out.contains(",Ａ\n"));
    }

    #[test]
    fn test_without_tot_times_are_pcr_relative() {
        let packets = vec![
            pat(),
            pmt(0x87),
            pcr_packet(PCR_PID, 6150),
            caption(A),
            pcr_packet(PCR_PID, 6200),
            caption(B),
        ];

        let (result, out) = run(DumperConfig::default(), &packets);
        result.unwrap();
        assert!(out.contains("Dialogue: 0,00:01:01.50,00:01:02.00,Default,,,,,,Ａ\n"));
    }

    #[test]
    fn test_caption_continuation_packets_reassembled() {
        // Statement body spanning two TS packets
        let text: Vec<u8> = [0xA4, 0xA2].repeat(100); // あ x100
        let unit_len = text.len();
        let loop_len = 5 + unit_len;
        let mut pes = vec![
            0x00, 0x00, 0x01, 0xBD, 0x00, 0x00, 0x81, 0x80, 0x00, //
            0x80, 0xFF, 0xF0, //
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00, //
            (loop_len >> 16) as u8, (loop_len >> 8) as u8, loop_len as u8, //
            0x1F, 0x20, (unit_len >> 16) as u8, (unit_len >> 8) as u8, unit_len as u8,
        ];
        pes.extend_from_slice(&text);
        let first = payload_packet(CAPTION_PID, true, &pes[..184]);
        let second = payload_packet(CAPTION_PID, false, &pes[184..]);

        let mut packets = prelude();
        packets.push(first);
        packets.push(second);
        packets.push(caption(B));

        let (result, out) = run(DumperConfig::default(), &packets);
        result.unwrap();
        assert!(out.contains(&format!(",{}\n", "あ".repeat(100))));
    }
}
