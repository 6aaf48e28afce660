//! Property-based coverage for the testable invariants that are most
//! naturally stated over arbitrary inputs rather than one fixed scenario.

use std::io::Cursor;

use quickcheck::{Arbitrary, Gen, TestResult};
use quickcheck_macros::quickcheck;

use ccx_core::bytesrc::RingByteSource;
use ccx_core::cctriplet::{CaptionTriplet, CcType};
use ccx_core::cea608::decoder::Cea608Decoder;
use ccx_core::config::{Config, WriteFormat};
use ccx_core::demux::rcwt as rcwt_format;
use ccx_core::notify::NullNotifier;
use ccx_core::pipeline::Pipeline;
use ccx_core::scanner::{ReorderBuffer, ScannedUserData};

/// A restricted byte in `0x20..=0x7E` so fed pairs decode as plain text
/// rather than accidentally tripping a control code's special handling.
#[derive(Debug, Clone, Copy)]
struct PrintableByte(u8);

impl Arbitrary for PrintableByte {
    fn arbitrary(g: &mut Gen) -> Self {
        let choices: Vec<u8> = (0x20u8..=0x7E).collect();
        PrintableByte(*g.choose(&choices).unwrap())
    }
}

fn text_triplet(a: PrintableByte, b: PrintableByte) -> CaptionTriplet {
    CaptionTriplet {
        cc_valid: true,
        cc_type: CcType::NtscF1,
        b1: a.0,
        b2: b.0,
    }
}

// §8 invariant 2: for a single field, consecutive emitted screens' start_ms
// never goes backwards, regardless of how much (plain-text) input is fed
// between them, as long as the feed timestamps themselves are non-decreasing.
#[quickcheck]
fn field_start_times_never_regress(pairs: Vec<(PrintableByte, PrintableByte)>) -> TestResult {
    if pairs.is_empty() {
        return TestResult::discard();
    }
    let mut dec = Cea608Decoder::new(1, 1);
    // RCL -> PopOn so ordinary text accumulates instead of being
    // dropped as unrecognised control noise.
    dec.feed(
        &CaptionTriplet {
            cc_valid: true,
            cc_type: CcType::NtscF1,
            b1: 0x14,
            b2: 0x20,
        },
        0,
    )
    .unwrap();

    let mut starts = Vec::new();
    for (i, (a, b)) in pairs.into_iter().enumerate() {
        let ms = (i as i64) * 33;
        let triplet = text_triplet(a, b);
        let Ok((screen, _)) = dec.feed(&triplet, ms) else {
            continue;
        };
        if let Some(screen) = screen {
            starts.push(screen.start_ms);
        }
        // Periodically force an EOC so PopOn actually emits something to
        // check, instead of only ever accumulating into the non-visible
        // buffer.
        if i % 5 == 4 {
            let (screen, _) = dec.feed(
                &CaptionTriplet {
                    cc_valid: true,
                    cc_type: CcType::NtscF1,
                    b1: 0x14,
                    b2: 0x2F,
                },
                ms + 1,
            )
            .unwrap();
            if let Some(screen) = screen {
                starts.push(screen.start_ms);
            }
        }
    }

    TestResult::from_bool(starts.windows(2).all(|w| w[0] <= w[1]))
}

// §8 invariant 10: whatever order temporal-reference-tagged batches are
// pushed in, the reorder buffer only ever releases them (within one
// anchor epoch) in non-decreasing display order.
#[quickcheck]
fn reorder_buffer_preserves_display_order(offsets: Vec<u8>) -> TestResult {
    if offsets.is_empty() || offsets.len() > 40 {
        return TestResult::discard();
    }
    let mut buf = ReorderBuffer::new();
    let mut released = Vec::new();

    released.extend(buf.push(make_batch(0, true)));
    for &offset in &offsets {
        // Keep offsets inside the buffer's window so nothing is forced
        // out early by a too-large gap, which would otherwise make an
        // early partial flush a legitimate (documented) exception.
        let tref = (offset % 90) as u16;
        released.extend(buf.push(make_batch(tref, false)));
    }
    released.extend(buf.push(make_batch(9999, true)));

    let trefs: Vec<u16> = released.iter().map(|b| b.temporal_reference).collect();
    TestResult::from_bool(trefs.windows(2).all(|w| w[0] <= w[1]))
}

fn make_batch(tref: u16, is_anchor: bool) -> ScannedUserData {
    ScannedUserData {
        temporal_reference: tref,
        is_anchor,
        triplets: vec![CaptionTriplet::from_wire(0x04, 0x20, 0x21)],
        fts_ms: 0,
    }
}

// §8 invariant 7: feeding the RCWT output of a run back into the pipeline
// in RCWT-input mode yields a byte-identical RCWT output, for an arbitrary
// (small) set of blocks.
#[derive(Debug, Clone)]
struct RcwtBlock {
    fts: u16,
    triplets: Vec<(PrintableByte, PrintableByte)>,
}

impl Arbitrary for RcwtBlock {
    fn arbitrary(g: &mut Gen) -> Self {
        let fts = u16::arbitrary(g);
        let len = usize::arbitrary(g) % 6;
        let triplets = (0..len)
            .map(|_| (PrintableByte::arbitrary(g), PrintableByte::arbitrary(g)))
            .collect();
        RcwtBlock { fts, triplets }
    }
}

fn run_rcwt_bypass(bytes: Vec<u8>) -> Vec<u8> {
    let source = RingByteSource::new(Cursor::new(bytes));
    let mut cfg = Config::default();
    cfg.write_format = WriteFormat::Rcwt;
    let mut pipeline = Pipeline::new(source, cfg, Box::new(NullNotifier)).unwrap();
    let out = pipeline.run().unwrap();
    out.channels["ALL"].clone()
}

#[quickcheck]
fn rcwt_round_trip_is_stable(blocks: Vec<RcwtBlock>) -> TestResult {
    if blocks.is_empty() || blocks.len() > 8 {
        return TestResult::discard();
    }
    let mut bytes = Vec::new();
    rcwt_format::write_header(&mut bytes);
    let mut last_fts = 0u64;
    for block in &blocks {
        // Blocks must arrive in non-decreasing fts order, same as any
        // real capture; an arbitrary u16 can't regress enough to matter
        // once accumulated monotonically.
        last_fts += block.fts as u64;
        let triplets: Vec<CaptionTriplet> = block
            .triplets
            .iter()
            .map(|(a, b)| text_triplet(*a, *b))
            .collect();
        rcwt_format::write_block(&mut bytes, last_fts, &triplets);
    }

    let first_pass = run_rcwt_bypass(bytes);
    let second_pass = run_rcwt_bypass(first_pass.clone());
    TestResult::from_bool(first_pass == second_pass)
}

