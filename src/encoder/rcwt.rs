//! # RCWT passthrough encoder
//!
//! Writes raw caption triplets straight through, bypassing CEA-608/708
//! decoding entirely. The pipeline recognises `WriteFormat::Rcwt` and
//! feeds this via [`RcwtEncoder::write_triplets`] instead of the normal
//! `encode_608`/`encode_708` screen path (there is no screen to decode
//! to when the output format is itself raw triplets).
//!
//! Grounded on `crate::demux::rcwt`'s `write_header`/`write_block`.

use super::SubtitleEncoder;
use crate::cea608::decoder::Cea608Screen;
use crate::cea708::Cea708Screen;
use crate::cctriplet::CaptionTriplet;
use crate::demux::rcwt;
use crate::error::Result;

pub struct RcwtEncoder {
    buf: Vec<u8>,
    header_written: bool,
}

impl RcwtEncoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            header_written: false,
        }
    }

    /// Appends one `(fts, triplets)` block, writing the fixed header
    /// first if this is the first block in the run.
    pub fn write_triplets(&mut self, fts_ms: u64, triplets: &[CaptionTriplet]) {
        if !self.header_written {
            rcwt::write_header(&mut self.buf);
            self.header_written = true;
        }
        rcwt::write_block(&mut self.buf, fts_ms, triplets);
    }
}

impl Default for RcwtEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SubtitleEncoder for RcwtEncoder {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cctriplet::CcType;

    #[test]
    fn first_block_gets_the_header() {
        let mut enc = RcwtEncoder::new();
        enc.write_triplets(
            10,
            &[CaptionTriplet {
                cc_valid: true,
                cc_type: CcType::NtscF1,
                b1: 0x20,
                b2: 0x21,
            }],
        );
        let bytes = enc.finish().unwrap();
        assert_eq!(&bytes[..11], &rcwt::RCWT_HEADER);
    }
}
