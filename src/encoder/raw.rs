//! # Raw / DVD-raw CC byte encoders
//!
//! Like [`super::rcwt`], these bypass CEA-608/708 decoding: `Raw` writes
//! the two data bytes of every valid triplet back to back with no
//! timing or framing at all; `DvdRaw` prefixes each pair with its
//! `cc_type` byte, the shape DVD subtitle rippers expect.
//!
//! Grounded on `original_source/src/lib_ccx/ccx_encoders_helpers.c`'s
//! `CCX_OF_RAW`/`CCX_OF_DVDRAW` handling.

use super::SubtitleEncoder;
use crate::cea608::decoder::Cea608Screen;
use crate::cea708::Cea708Screen;
use crate::cctriplet::CaptionTriplet;
use crate::error::Result;

pub struct RawEncoder {
    dvd_style: bool,
    buf: Vec<u8>,
}

impl RawEncoder {
    pub fn new(dvd_style: bool) -> Self {
        Self {
            dvd_style,
            buf: Vec::new(),
        }
    }

    /// Appends every valid triplet's data bytes (discarding invalid
    /// ones, matching the design's `cc_valid` handling elsewhere).
    pub fn write_triplets(&mut self, triplets: &[CaptionTriplet]) {
        for t in triplets {
            if !t.cc_valid {
                continue;
            }
            if self.dvd_style {
                self.buf.push(t.cc_type.to_bits());
            }
            self.buf.push(t.b1);
            self.buf.push(t.b2);
        }
    }
}

impl SubtitleEncoder for RawEncoder {
    fn encode_608(&mut self, _screen: &Cea608Screen) -> Result<()> {
        Ok(())
    }

    fn encode_708(&mut self, _screen: &Cea708Screen) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.buf))
    }
}
