//! # Pipeline orchestrator
//!
//! Wires [`bytesrc::ByteSource`](crate::bytesrc::ByteSource) autodetection,
//! the container [`demux::Demuxer`](crate::demux::Demuxer) backends, the
//! MPEG-2/H.264 scanner and reorder buffer, the CEA-608/CEA-708 decoders,
//! and the subtitle encoders into one synchronous run. One `Pipeline` is
//! built per input; `run` drives it to EOF and returns everything it
//! produced.
//!
//! Grounded on `original_source/src/lib_ccx/general_loop.c`'s
//! `general_loop`/`process_hdcc`, which plays the same role: read a
//! payload, scan/reorder it, feed the 608/708 state machines, dispatch
//! completed screens to the selected writer.

use std::collections::HashMap;

use crate::bytesrc::ByteSource;
use crate::cctriplet::{CaptionTriplet, CcType};
use crate::cea608::decoder::{Cea608Decoder, Cea608Screen, Mode};
use crate::cea608::grid::Cell;
use crate::cea608::xds::XdsEvent;
use crate::cea708::{Cea708Decoder, Cea708Screen};
use crate::config::{Config, Extract, WriteFormat};
use crate::demux::gxf::GxfDemuxer;
use crate::demux::mp4::Mp4Demuxer;
use crate::demux::mxf::MxfDemuxer;
use crate::demux::ps::PsDemuxer;
use crate::demux::rcwt as rcwt_format;
use crate::demux::ts::TsDemuxer;
use crate::demux::{detect_stream_type, Demuxer, PesPayload, StreamKind};
use crate::encoder::raw::RawEncoder;
use crate::encoder::rcwt::RcwtEncoder;
use crate::encoder::{self, SubtitleEncoder};
use crate::error::{CcxError, Result};
use crate::notify::Notifier;
use crate::report::Report;
use crate::scanner::{h264, mpeg2, ReorderBuffer, ScannedUserData};
use crate::timing::{self, ClockJumpKind, TimingContext};

/// Bytes sniffed from the front of the input to autodetect its container,
/// then pushed back so the real demuxer sees them again.
const SNIFF_LEN: usize = 1024 * 1024;
const SNIFF_CHUNK: usize = 4096;

/// Chunk size used to feed a raw elementary stream (no container at all)
/// through the video user-data scanner a piece at a time. A marker that
/// straddles a chunk boundary is missed; real inputs this crate targets
/// are containerized, so this only matters for bare `.es`/`.264` files.
const ES_CHUNK_SIZE: usize = 4096;

/// Everything a completed run produced: the accumulated counters plus one
/// in-memory byte buffer per output channel (`"CC1"`, `"CC2"`, `"SVC3"`,
/// or `"ALL"` for the raw/RCWT passthrough formats). Nothing in this
/// crate opens a file or socket; handing these bytes to disk/stdout is
/// the external CLI collaborator's job.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub report: Report,
    pub channels: HashMap<String, Vec<u8>>,
}

/// How the selected input container feeds the rest of the pipeline.
enum Input {
    /// GXF/MXF: the demuxer has already decoded CDP ancillary data into
    /// wire triplets, so there's nothing left for the video scanner to
    /// do. Neither container carries a usable per-packet timestamp (see
    /// `demux::gxf`/`demux::mxf`), so a nominal NTSC-frame-spaced clock
    /// stands in for one.
    Direct(Box<dyn Demuxer>),
    /// TS/PS/raw-ES/MP4: payload bytes need scanning for embedded user
    /// data (or, for an MP4 caption track, direct triplet
    /// reinterpretation) and temporal reordering before they're in
    /// display order.
    Scanned(Box<dyn Demuxer>),
    /// The crate's own RCWT interchange format, replayed directly: it is
    /// already a sequence of `(fts, triplets)` blocks, bypassing
    /// `Demuxer` entirely.
    Rcwt(Box<dyn ByteSource>),
}

/// The top-level orchestrator: one instance per input.
pub struct Pipeline {
    cfg: Config,
    notifier: Box<dyn Notifier>,
    input: Input,
    report: Report,
    case_corrections: Option<HashMap<String, String>>,
}

impl Pipeline {
    /// Builds a pipeline over `source`, autodetecting its container by
    /// sniffing (and then pushing back) up to [`SNIFF_LEN`] bytes.
    /// Returns `Configuration` if the detected container has no
    /// demultiplexer implemented (M2TS, WTV, Matroska).
    pub fn new<S>(source: S, cfg: Config, notifier: Box<dyn Notifier>) -> Result<Self>
    where
        S: ByteSource + 'static,
    {
        cfg.validate()?;

        let case_corrections = match &cfg.sentence_cap_file {
            Some(path) => Some(crate::cea608::casefix::load_corrections(path)?),
            None => None,
        };

        let mut source: Box<dyn ByteSource> = Box::new(source);
        let sniff = sniff_bytes(&mut source)?;
        let kind = detect_stream_type(&sniff);

        let mut report = Report::new();
        report.detected_stream_kind = Some(kind);

        let input = match kind {
            StreamKind::Rcwt => {
                rcwt_format::read_header(&mut source)?;
                Input::Rcwt(source)
            }
            StreamKind::TransportStream | StreamKind::ElementaryStream | StreamKind::ProgramStream => {
                Input::Scanned(build_scanned_demuxer(kind, source))
            }
            StreamKind::Mp4 => Input::Scanned(Box::new(Mp4Demuxer::new(source))),
            StreamKind::Gxf => Input::Direct(Box::new(GxfDemuxer::new(source))),
            StreamKind::Mxf => Input::Direct(Box::new(MxfDemuxer::new(source))),
            StreamKind::M2ts | StreamKind::Wtv | StreamKind::Mkv => {
                return Err(CcxError::Configuration(format!(
                    "{:?} containers have no demultiplexer implemented",
                    kind
                )));
            }
        };

        Ok(Self {
            cfg,
            notifier,
            input,
            report,
            case_corrections,
        })
    }

    /// Drives the pipeline to EOF: demux, scan/reorder, decode, encode.
    pub fn run(&mut self) -> Result<PipelineOutput> {
        let bypass = matches!(
            self.cfg.write_format,
            WriteFormat::Rcwt | WriteFormat::Raw | WriteFormat::DvdRaw
        );

        let mut decoders608 = build_608_decoders(&self.cfg);
        let mut decoder708 = Cea708Decoder::new();
        let mut encoders: HashMap<String, Box<dyn SubtitleEncoder>> = HashMap::new();

        let mut rcwt_bypass = if self.cfg.write_format == WriteFormat::Rcwt {
            Some(RcwtEncoder::new())
        } else {
            None
        };
        let mut raw_bypass = match self.cfg.write_format {
            WriteFormat::Raw => Some(RawEncoder::new(false)),
            WriteFormat::DvdRaw => Some(RawEncoder::new(true)),
            _ => None,
        };

        let mut timing = TimingContext::new();
        let mut fps = (30_000u32, 1_001u32);
        let mut reorder = ReorderBuffer::new();
        let mut h264_counter: u16 = 0;
        let mut first_ms: Option<i64> = None;
        let mut last_ms: i64 = 0;
        let mut direct_clock_ms: i64 = 0;
        let mut credits_started = false;
        let mut screens_target_hit = false;

        'main: loop {
            if screens_target_hit {
                break;
            }

            let batches: Vec<ScannedUserData> = match &mut self.input {
                Input::Rcwt(source) => match rcwt_format::read_block(source) {
                    Ok(block) => vec![ScannedUserData {
                        temporal_reference: 0,
                        is_anchor: true,
                        triplets: block.triplets,
                        fts_ms: block.fts as i64,
                    }],
                    Err(CcxError::Eof) => break 'main,
                    Err(e) if e.is_recoverable() => {
                        self.report.structural_errors_skipped += 1;
                        continue 'main;
                    }
                    Err(e) => return Err(e),
                },
                Input::Direct(demuxer) => match demuxer.next_payload() {
                    Ok(payload) => {
                        let triplets = triplets_from_wire(&payload.data);
                        let fts_ms = direct_clock_ms;
                        direct_clock_ms += 33;
                        vec![ScannedUserData {
                            temporal_reference: 0,
                            is_anchor: true,
                            triplets,
                            fts_ms,
                        }]
                    }
                    Err(CcxError::Eof) => break 'main,
                    Err(e) if e.is_recoverable() => {
                        self.report.structural_errors_skipped += 1;
                        continue 'main;
                    }
                    Err(e) => return Err(e),
                },
                Input::Scanned(demuxer) => match demuxer.next_payload() {
                    Ok(payload) => {
                        let scanned = scan_payload(
                            &payload,
                            &mut timing,
                            &mut fps,
                            &mut h264_counter,
                            &mut self.report,
                        );
                        reorder.push(scanned)
                    }
                    Err(CcxError::Eof) => {
                        let remaining = reorder.drain();
                        if remaining.is_empty() {
                            break 'main;
                        }
                        remaining
                    }
                    Err(e) if e.is_recoverable() => {
                        self.report.structural_errors_skipped += 1;
                        continue 'main;
                    }
                    Err(e) => return Err(e),
                },
            };

            for batch in batches {
                if batch.triplets.is_empty() {
                    continue;
                }
                if let Some(start) = self.cfg.extraction_start_ms {
                    if batch.fts_ms < start {
                        continue;
                    }
                }
                if let Some(end) = self.cfg.extraction_end_ms {
                    if batch.fts_ms > end {
                        break 'main;
                    }
                }

                first_ms.get_or_insert(batch.fts_ms);
                last_ms = last_ms.max(batch.fts_ms);

                if bypass {
                    if let Some(enc) = rcwt_bypass.as_mut() {
                        enc.write_triplets(batch.fts_ms.max(0) as u64, &batch.triplets);
                    }
                    if let Some(enc) = raw_bypass.as_mut() {
                        enc.write_triplets(&batch.triplets);
                    }
                    continue;
                }

                if !credits_started {
                    credits_started = true;
                    inject_start_credit(&self.cfg, &mut encoders, batch.fts_ms)?;
                }

                for triplet in &batch.triplets {
                    dispatch_triplet(
                        triplet,
                        batch.fts_ms,
                        &self.cfg,
                        self.case_corrections.as_ref(),
                        &mut decoders608,
                        &mut decoder708,
                        &mut encoders,
                        &mut self.report,
                        self.notifier.as_mut(),
                    )?;
                }

                self.notifier.progress(
                    None,
                    (batch.fts_ms.max(0) / 60_000) as u32,
                    ((batch.fts_ms.max(0) / 1000) % 60) as u32,
                );

                if let Some(limit) = self.cfg.screens_to_process {
                    if self.report.total_screens() >= limit as u64 {
                        screens_target_hit = true;
                        break;
                    }
                }
            }
        }

        if !bypass {
            for screen in decoder708.flush(last_ms) {
                route_708_screen(screen, &self.cfg, &mut encoders, &mut self.report)?;
            }
            inject_end_credit(&self.cfg, &mut encoders, last_ms)?;
        }

        self.report.duration_ms = last_ms;
        self.report.cc_708_sequence_errors = 0; // not surfaced by `PacketReassembler`, see DESIGN.md
        let _ = decoder708.services_seen();

        let mut channels = HashMap::new();
        if let Some(mut enc) = rcwt_bypass {
            channels.insert("ALL".to_string(), enc.finish()?);
        }
        if let Some(mut enc) = raw_bypass {
            channels.insert("ALL".to_string(), enc.finish()?);
        }
        for (label, mut enc) in encoders {
            channels.insert(label, enc.finish()?);
        }

        Ok(PipelineOutput {
            report: std::mem::take(&mut self.report),
            channels,
        })
    }
}

/// Reads up to [`SNIFF_LEN`] bytes for container autodetection, then
/// pushes every byte it consumed back in front of the cursor so the real
/// demuxer reads the same bytes again. Tolerates an input shorter than
/// the sniff window (a short read at `Eof`/`TransientEof` just stops).
fn sniff_bytes(source: &mut Box<dyn ByteSource>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; SNIFF_CHUNK];
    while buf.len() + SNIFF_CHUNK <= SNIFF_LEN {
        match source.read_exact(&mut chunk) {
            Ok(()) => buf.extend_from_slice(&chunk),
            Err(CcxError::Eof) | Err(CcxError::TransientEof) => break,
            Err(e) => return Err(e),
        }
    }
    source.return_to_buffer(&buf);
    Ok(buf)
}

fn build_scanned_demuxer(kind: StreamKind, source: Box<dyn ByteSource>) -> Box<dyn Demuxer> {
    match kind {
        StreamKind::TransportStream => Box::new(TsDemuxer::new(source)),
        StreamKind::ProgramStream => Box::new(PsDemuxer::new(source)),
        _ => Box::new(RawEsDemuxer::new(source)),
    }
}

/// Feeds a containerless elementary stream to the scanner in fixed-size
/// chunks, since there's no framing to key access units off of.
struct RawEsDemuxer<S: ByteSource> {
    source: S,
}

impl<S: ByteSource> RawEsDemuxer<S> {
    fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: ByteSource> Demuxer for RawEsDemuxer<S> {
    fn next_payload(&mut self) -> Result<PesPayload> {
        let mut buf = vec![0u8; ES_CHUNK_SIZE];
        self.source.read_exact(&mut buf)?;
        Ok(PesPayload {
            stream_id: 0,
            pts: None,
            dts: None,
            data: buf.into(),
            is_unit_start: true,
        })
    }
}

fn triplets_from_wire(data: &[u8]) -> Vec<CaptionTriplet> {
    data.chunks_exact(3)
        .map(|c| CaptionTriplet::from_wire(c[0], c[1], c[2]))
        .collect()
}

/// Scans one demuxed payload for embedded caption user data, classifying
/// it as MPEG-2 (picture header present), H.264 (NAL units present), or,
/// failing both, an MP4 caption-track sample whose bytes are already
/// wire triplets. Computes the batch's `fts_ms` from the timing engine
/// before handing it to the reorder buffer, since reordering must never
/// recompute a timestamp once assigned.
fn scan_payload(
    payload: &PesPayload,
    timing: &mut TimingContext,
    fps: &mut (u32, u32),
    h264_counter: &mut u16,
    report: &mut Report,
) -> ScannedUserData {
    let data: &[u8] = &payload.data;

    if let Some(seq) = mpeg2::scan_sequence_header(data) {
        *fps = timing::frame_rate_for_code(seq.frame_rate_code);
    }

    let mut triplets = mpeg2::scan_user_data(data);
    let temporal_reference;
    let is_anchor;

    if let Some(pic) = mpeg2::scan_picture_header(data) {
        temporal_reference = pic.temporal_reference;
        is_anchor = matches!(pic.picture_coding_type, 1 | 2);
    } else {
        let nals = h264::split_nal_units(data);
        for nal in &nals {
            if nal.nal_type == 6 {
                triplets.extend(h264::extract_sei_captions(&nal.rbsp));
            }
        }
        let h264_anchor = nals.iter().any(|n| n.is_idr());

        if nals.is_empty() && triplets.is_empty() && !data.is_empty() && data.len() % 3 == 0 {
            // Not a video elementary stream at all: an MP4 caption-track
            // sample, already raw wire triplets.
            triplets = triplets_from_wire(data);
            is_anchor = true;
        } else {
            is_anchor = h264_anchor;
        }
        temporal_reference = *h264_counter;
        *h264_counter = h264_counter.wrapping_add(1);
    }

    let fts_ms = match payload.pts {
        Some(raw_pts) => {
            let corrected = timing.observe_raw_pts(raw_pts);
            if let Ok(jump) = timing.set_fts(corrected, temporal_reference as u32, *fps, is_anchor) {
                match jump {
                    ClockJumpKind::Rebased => {
                        report.clock_jumps += 1;
                        report.clock_jumps_accepted += 1;
                    }
                    ClockJumpKind::Refused => report.clock_jumps += 1,
                    ClockJumpKind::None => {}
                }
            }
            timing.get_fts(0, *fps)
        }
        None => {
            let step_ms = 1000 * fps.1 as i64 / fps.0.max(1) as i64;
            timing.advance_fts_global(step_ms);
            timing.get_fts(0, *fps)
        }
    };

    ScannedUserData {
        temporal_reference,
        is_anchor,
        triplets,
        fts_ms,
    }
}

fn build_608_decoders(cfg: &Config) -> HashMap<u8, Cea608Decoder> {
    fn restrict(requested: u8, allowed: &[u8], default: u8) -> u8 {
        if allowed.contains(&requested) {
            requested
        } else {
            default
        }
    }
    fn with_forced_rollup(mut dec: Cea608Decoder, cfg: &Config) -> Cea608Decoder {
        if cfg.forced_ru > 0 {
            dec.set_forced_rollup(Some(cfg.forced_ru));
        }
        dec
    }

    let mut map = HashMap::new();
    match cfg.extract {
        Extract::Field1 => {
            let channel = restrict(cfg.cc_channel, &[1, 3], 1);
            map.insert(1, with_forced_rollup(Cea608Decoder::new(1, channel), cfg));
        }
        Extract::Field2 => {
            let channel = restrict(cfg.cc_channel, &[2, 4], 2);
            map.insert(2, with_forced_rollup(Cea608Decoder::new(2, channel), cfg));
        }
        Extract::Both => {
            map.insert(1, with_forced_rollup(Cea608Decoder::new(1, 1), cfg));
            map.insert(2, with_forced_rollup(Cea608Decoder::new(2, 2), cfg));
        }
    }
    map
}

fn cc_channel_label(channel: u8) -> String {
    format!("CC{channel}")
}

fn service_label(service_number: u8) -> String {
    format!("SVC{service_number}")
}

fn dispatch_triplet(
    triplet: &CaptionTriplet,
    fts_ms: i64,
    cfg: &Config,
    case_corrections: Option<&HashMap<String, String>>,
    decoders608: &mut HashMap<u8, Cea608Decoder>,
    decoder708: &mut Cea708Decoder,
    encoders: &mut HashMap<String, Box<dyn SubtitleEncoder>>,
    report: &mut Report,
    notifier: &mut dyn Notifier,
) -> Result<()> {
    match triplet.cc_type {
        CcType::NtscF1 | CcType::NtscF2 => {
            let field = if triplet.cc_type == CcType::NtscF1 { 1 } else { 2 };
            if triplet.cc_valid {
                if field == 1 {
                    report.cc_blocks_field1 += 1;
                } else {
                    report.cc_blocks_field2 += 1;
                }
            }
            let Some(dec) = decoders608.get_mut(&field) else {
                return Ok(());
            };
            let (screen, xds) = dec.feed(triplet, fts_ms)?;
            if let Some(screen) = screen {
                route_608_screen(screen, cfg, case_corrections, encoders, report)?;
            }
            if let Some(event) = xds {
                match event {
                    XdsEvent::ProgramName(name) => notifier.xds_program_name(&name),
                    XdsEvent::NetworkName(name) | XdsEvent::CallLetters(name) => {
                        notifier.xds_network_call_letters(&name)
                    }
                }
            }
        }
        CcType::DtvccStart | CcType::DtvccData => {
            if triplet.cc_valid {
                report.cc_blocks_708 += 1;
            }
            for screen in decoder708.feed(triplet, fts_ms) {
                route_708_screen(screen, cfg, encoders, report)?;
            }
        }
    }
    Ok(())
}

fn route_608_screen(
    mut screen: Cea608Screen,
    cfg: &Config,
    case_corrections: Option<&HashMap<String, String>>,
    encoders: &mut HashMap<String, Box<dyn SubtitleEncoder>>,
    report: &mut Report,
) -> Result<()> {
    screen.start_ms += cfg.subs_delay_ms;
    screen.end_ms += cfg.subs_delay_ms;
    if screen.start_ms < 0 {
        return Ok(());
    }
    if cfg.sentence_cap {
        crate::cea608::decoder::apply_sentence_case(&mut screen);
        if let Some(corrections) = case_corrections {
            for line in screen.lines.iter_mut() {
                *line = crate::cea608::casefix::correct_case(line, corrections);
            }
        }
    }
    let label = cc_channel_label(screen.channel);
    report.record_screen(&label);
    let enc = encoders
        .entry(label.clone())
        .or_insert_with(|| encoder::new_encoder(cfg, label));
    enc.encode_608(&screen)
}

fn route_708_screen(
    mut screen: Cea708Screen,
    cfg: &Config,
    encoders: &mut HashMap<String, Box<dyn SubtitleEncoder>>,
    report: &mut Report,
) -> Result<()> {
    screen.start_ms += cfg.subs_delay_ms;
    screen.end_ms += cfg.subs_delay_ms;
    if screen.start_ms < 0 {
        return Ok(());
    }
    let label = service_label(screen.service_number);
    report.record_screen(&label);
    let enc = encoders
        .entry(label.clone())
        .or_insert_with(|| encoder::new_encoder(cfg, label));
    enc.encode_708(&screen)
}

/// Which output channel a start/end credit screen is synthesised onto:
/// the field/channel `Extract` would decode by default.
fn primary_channel_label(cfg: &Config) -> String {
    match cfg.extract {
        Extract::Field2 => {
            let channel = if [2, 4].contains(&cfg.cc_channel) { cfg.cc_channel } else { 2 };
            cc_channel_label(channel)
        }
        Extract::Field1 | Extract::Both => {
            let channel = if [1, 3].contains(&cfg.cc_channel) { cfg.cc_channel } else { 1 };
            cc_channel_label(channel)
        }
    }
}

fn credit_screen(text: &str, start_ms: i64, end_ms: i64, channel: u8) -> Cea608Screen {
    let width = text.chars().count().max(1);
    Cea608Screen {
        lines: vec![text.to_string()],
        cells: vec![vec![Cell::default(); width]],
        start_ms,
        end_ms,
        channel,
        mode: Mode::PopOn,
    }
}

fn inject_start_credit(
    cfg: &Config,
    encoders: &mut HashMap<String, Box<dyn SubtitleEncoder>>,
    first_caption_ms: i64,
) -> Result<()> {
    let Some(text) = &cfg.credits.start_credits_text else {
        return Ok(());
    };
    let Some((start, end)) = encoder::credits::schedule(&cfg.credits.start_window, first_caption_ms) else {
        return Ok(());
    };
    let label = primary_channel_label(cfg);
    let channel = label.trim_start_matches("CC").parse().unwrap_or(1);
    let screen = credit_screen(text, start, end, channel);
    encoders
        .entry(label.clone())
        .or_insert_with(|| encoder::new_encoder(cfg, label))
        .encode_608(&screen)
}

fn inject_end_credit(
    cfg: &Config,
    encoders: &mut HashMap<String, Box<dyn SubtitleEncoder>>,
    duration_ms: i64,
) -> Result<()> {
    let Some(text) = &cfg.credits.end_credits_text else {
        return Ok(());
    };
    let Some((start, end)) = encoder::credits::schedule(&cfg.credits.end_window, duration_ms) else {
        return Ok(());
    };
    let label = primary_channel_label(cfg);
    let channel = label.trim_start_matches("CC").parse().unwrap_or(1);
    let screen = credit_screen(text, start, end, channel);
    encoders
        .entry(label.clone())
        .or_insert_with(|| encoder::new_encoder(cfg, label))
        .encode_608(&screen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytesrc::RingByteSource;
    use crate::cctriplet::CcType;
    use std::io::Cursor;

    fn triplet(cc_type: CcType, valid: bool, b1: u8, b2: u8) -> CaptionTriplet {
        CaptionTriplet {
            cc_valid: valid,
            cc_type,
            b1,
            b2,
        }
    }

    fn rcwt_bytes(triplets: &[CaptionTriplet]) -> Vec<u8> {
        let mut out = Vec::new();
        rcwt_format::write_header(&mut out);
        rcwt_format::write_block(&mut out, 0, &[]);
        rcwt_format::write_block(&mut out, 2000, triplets);
        out
    }

    fn pop_on_triplets() -> Vec<CaptionTriplet> {
        vec![
            triplet(CcType::NtscF1, true, 0x14, 0x20), // RCL -> PopOn
            triplet(CcType::NtscF1, true, 0x13, 0x40), // PAC row 15 white
            triplet(CcType::NtscF1, true, b'H', b'I'),
            triplet(CcType::NtscF1, true, 0x14, 0x2F), // EOC
        ]
    }

    #[test]
    fn rcwt_input_pop_on_produces_one_srt_screen() {
        let bytes = rcwt_bytes(&pop_on_triplets());
        let source = RingByteSource::new(Cursor::new(bytes));
        let mut cfg = Config::default();
        cfg.write_format = WriteFormat::Srt;
        let mut pipeline = Pipeline::new(source, cfg, Box::new(crate::notify::NullNotifier)).unwrap();
        let out = pipeline.run().unwrap();
        assert_eq!(out.report.detected_stream_kind, Some(StreamKind::Rcwt));
        assert_eq!(out.report.screens_emitted.get("CC1"), Some(&1));
        let srt = String::from_utf8(out.channels["CC1"].clone()).unwrap();
        assert!(srt.contains("HI"), "expected decoded text in {srt}");
    }

    #[test]
    fn rcwt_passthrough_format_bypasses_decoding() {
        let bytes = rcwt_bytes(&pop_on_triplets());
        let source = RingByteSource::new(Cursor::new(bytes));
        let mut cfg = Config::default();
        cfg.write_format = WriteFormat::Rcwt;
        let mut pipeline = Pipeline::new(source, cfg, Box::new(crate::notify::NullNotifier)).unwrap();
        let out = pipeline.run().unwrap();
        assert!(out.report.screens_emitted.is_empty());
        assert!(out.channels["ALL"].starts_with(&rcwt_format::RCWT_HEADER));
    }

    #[test]
    fn unsupported_container_is_rejected_at_construction() {
        let mkv_magic = [0x1A, 0x45, 0xDF, 0xA3, 0, 0, 0, 0];
        let source = RingByteSource::new(Cursor::new(mkv_magic.to_vec()));
        let cfg = Config::default();
        let err = Pipeline::new(source, cfg, Box::new(crate::notify::NullNotifier)).unwrap_err();
        assert!(matches!(err, CcxError::Configuration(_)));
    }

    #[test]
    fn extraction_window_drops_batches_outside_it() {
        let mut bytes = Vec::new();
        rcwt_format::write_header(&mut bytes);
        rcwt_format::write_block(&mut bytes, 0, &pop_on_triplets());
        rcwt_format::write_block(&mut bytes, 50_000, &pop_on_triplets());
        let source = RingByteSource::new(Cursor::new(bytes));
        let mut cfg = Config::default();
        cfg.write_format = WriteFormat::Srt;
        cfg.extraction_end_ms = Some(10_000);
        let mut pipeline = Pipeline::new(source, cfg, Box::new(crate::notify::NullNotifier)).unwrap();
        let out = pipeline.run().unwrap();
        assert_eq!(out.report.screens_emitted.get("CC1"), Some(&1));
    }

    #[test]
    fn synthesized_pop_on_triplets_round_trip_through_srt() {
        // Synthesises the 608 triplet stream a "HI" pop-on caption
        // running from 0ms to 999ms would produce: one pair per 1/30s
        // frame, each carried at `(04, b1, b2)` (valid, field 1), per
        // the round-trip scenario this exercises.
        let mut bytes = Vec::new();
        rcwt_format::write_header(&mut bytes);
        rcwt_format::write_block(
            &mut bytes,
            0,
            &[
                triplet(CcType::NtscF1, true, 0x14, 0x20), // RCL -> PopOn
                triplet(CcType::NtscF1, true, 0x13, 0x40), // PAC row 15 white
            ],
        );
        rcwt_format::write_block(&mut bytes, 33, &[triplet(CcType::NtscF1, true, b'H', b'I')]);
        rcwt_format::write_block(
            &mut bytes,
            999,
            &[triplet(CcType::NtscF1, true, 0x14, 0x2F)], // EOC
        );

        let source = RingByteSource::new(Cursor::new(bytes));
        let mut cfg = Config::default();
        cfg.write_format = WriteFormat::Srt;
        let mut pipeline = Pipeline::new(source, cfg, Box::new(crate::notify::NullNotifier)).unwrap();
        let out = pipeline.run().unwrap();
        let srt = String::from_utf8(out.channels["CC1"].clone()).unwrap();

        assert!(srt.contains("HI"), "expected recovered text in {srt}");
        let expected_start_ms: i64 = 0;
        let expected_end_ms: i64 = 999;
        let (got_start, got_end) = parse_srt_first_timing(&srt);
        assert!(
            (got_start - expected_start_ms).abs() <= 33,
            "start {got_start} not within one frame of {expected_start_ms}"
        );
        assert!(
            (got_end - expected_end_ms).abs() <= 33,
            "end {got_end} not within one frame of {expected_end_ms}"
        );
    }

    fn parse_srt_first_timing(srt: &str) -> (i64, i64) {
        let line = srt
            .lines()
            .find(|l| l.contains("-->"))
            .expect("srt should contain a timing line");
        let (start, end) = line.split_once(" --> ").unwrap();
        (parse_srt_timestamp(start), parse_srt_timestamp(end))
    }

    fn parse_srt_timestamp(ts: &str) -> i64 {
        let (hms, ms) = ts.trim().split_once(',').unwrap();
        let mut parts = hms.split(':');
        let h: i64 = parts.next().unwrap().parse().unwrap();
        let m: i64 = parts.next().unwrap().parse().unwrap();
        let s: i64 = parts.next().unwrap().parse().unwrap();
        let ms: i64 = ms.parse().unwrap();
        ((h * 3600 + m * 60 + s) * 1000) + ms
    }

    #[test]
    fn subs_delay_shifts_timestamps_forward() {
        let bytes = rcwt_bytes(&pop_on_triplets());
        let source = RingByteSource::new(Cursor::new(bytes));
        let mut cfg = Config::default();
        cfg.write_format = WriteFormat::Srt;
        cfg.subs_delay_ms = 5_000;
        let mut pipeline = Pipeline::new(source, cfg, Box::new(crate::notify::NullNotifier)).unwrap();
        let out = pipeline.run().unwrap();
        let srt = String::from_utf8(out.channels["CC1"].clone()).unwrap();
        assert!(
            srt.contains("00:00:05,000 --> 00:00:07,000"),
            "expected delayed timestamps in {srt}"
        );
    }

    #[test]
    fn subs_delay_drops_screens_that_would_start_negative() {
        let bytes = rcwt_bytes(&pop_on_triplets());
        let source = RingByteSource::new(Cursor::new(bytes));
        let mut cfg = Config::default();
        cfg.write_format = WriteFormat::Srt;
        cfg.subs_delay_ms = -60_000; // the pop-on scenario starts at fts 0
        let mut pipeline = Pipeline::new(source, cfg, Box::new(crate::notify::NullNotifier)).unwrap();
        let out = pipeline.run().unwrap();
        assert!(out.report.screens_emitted.get("CC1").is_none());
    }

    #[test]
    fn sentence_cap_capitalizes_output_text() {
        let bytes = rcwt_bytes(&pop_on_triplets()); // "HI"
        let source = RingByteSource::new(Cursor::new(bytes));
        let mut cfg = Config::default();
        cfg.write_format = WriteFormat::Srt;
        cfg.sentence_cap = true;
        let mut pipeline = Pipeline::new(source, cfg, Box::new(crate::notify::NullNotifier)).unwrap();
        let out = pipeline.run().unwrap();
        let srt = String::from_utf8(out.channels["CC1"].clone()).unwrap();
        assert!(srt.contains("Hi"), "expected sentence-cased text in {srt}");
        assert!(!srt.contains("HI"));
    }

    #[test]
    fn sentence_cap_file_corrects_known_words() {
        let bytes = rcwt_bytes(&pop_on_triplets()); // "HI"
        let source = RingByteSource::new(Cursor::new(bytes));

        let dir = std::env::temp_dir();
        let path = dir.join(format!("ccx_core_pipeline_casefix_{}.txt", std::process::id()));
        std::fs::write(&path, "hi HELLO\n").unwrap();

        let mut cfg = Config::default();
        cfg.write_format = WriteFormat::Srt;
        cfg.sentence_cap = true;
        cfg.sentence_cap_file = Some(path.to_str().unwrap().to_string());
        let mut pipeline = Pipeline::new(source, cfg, Box::new(crate::notify::NullNotifier)).unwrap();
        let out = pipeline.run().unwrap();
        std::fs::remove_file(&path).ok();

        let srt = String::from_utf8(out.channels["CC1"].clone()).unwrap();
        assert!(srt.contains("HELLO"), "expected dictionary-corrected text in {srt}");
    }
}
