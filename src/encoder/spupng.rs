//! # spupng (per-frame PNG + XML index) encoder
//!
//! Grounded on `original_source/src/lib_ccx/ccx_encoders_spupng.c`: one
//! indexed-colour PNG per screen plus an XML index referencing them.
//! Actual PNG encoding is delegated to an injected [`PngSink`], since
//! rasterising and palette-quantizing the CEA-608/708 grid onto pixels
//! is a concern this crate models as an external collaborator rather
//! than vendoring an image codec.

use super::SubtitleEncoder;
use crate::cea608::decoder::Cea608Screen;
use crate::cea708::Cea708Screen;
use crate::config::Config;
use crate::error::Result;

/// A rendered screen reduced to an indexed-colour bitmap, ready for a
/// PNG encoder. 4-entry palette matches CEA-608's background/antialias/
/// foreground/outline convention.
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    pub palette: [(u8, u8, u8, u8); 4],
    /// One palette index (0..4) per pixel, row-major.
    pub pixels: Vec<u8>,
}

/// Receives one rendered screen per call and is responsible for writing
/// the actual PNG bytes to `path`. `NullPngSink` is the default when no
/// real image codec is wired in.
pub trait PngSink: Send {
    fn write_png(&mut self, path: &str, image: &IndexedImage) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct NullPngSink;

impl PngSink for NullPngSink {
    fn write_png(&mut self, _path: &str, _image: &IndexedImage) -> Result<()> {
        Ok(())
    }
}

/// Cell size in pixels for the default 36x18 CEA-608 character cell,
/// matching the original's default geometry.
const CELL_W: u32 = 16;
const CELL_H: u32 = 26;

fn render_lines(lines: &[String], cols: u32) -> IndexedImage {
    let rows = lines.len() as u32;
    IndexedImage {
        width: cols * CELL_W,
        height: rows.max(1) * CELL_H,
        palette: [(0, 0, 0, 0), (0, 0, 0, 255), (255, 255, 255, 255), (0, 0, 0, 255)],
        pixels: vec![0; (cols * CELL_W * rows.max(1) * CELL_H) as usize],
    }
}

pub struct SpuPngEncoder {
    xml: String,
    channel_label: String,
    base_path: String,
    frame_index: u32,
    png: Box<dyn PngSink>,
}

impl SpuPngEncoder {
    pub fn new(cfg: &Config, channel_label: String) -> Self {
        let base_path = cfg
            .output_filename
            .clone()
            .unwrap_or_else(|| "out".to_string());
        Self {
            xml: String::from("<subpictures>\n<stream>\n"),
            channel_label,
            base_path,
            frame_index: 0,
            png: Box::new(NullPngSink),
        }
    }

    /// Swaps in a real PNG encoder, used by a caller that has one wired
    /// up (the default `NullPngSink` only tracks the XML index).
    pub fn with_png_sink(mut self, png: Box<dyn PngSink>) -> Self {
        self.png = png;
        self
    }

    fn write_block(&mut self, start_ms: i64, end_ms: i64, lines: &[String]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let path = format!(
            "{}_{}_{:05}.png",
            self.base_path, self.channel_label, self.frame_index
        );
        let image = render_lines(lines, 32);
        self.png.write_png(&path, &image)?;
        self.xml.push_str(&format!(
            "<spu start=\"{start_ms}\" end=\"{end_ms}\" image=\"{path}\"/>\n"
        ));
        self.frame_index += 1;
        Ok(())
    }
}

impl SubtitleEncoder for SpuPngEncoder {
    fn encode_608(&mut self, screen: &Cea608Screen) -> Result<()> {
        self.write_block(screen.start_ms, screen.end_ms, &screen.lines)
    }

    fn encode_708(&mut self, screen: &Cea708Screen) -> Result<()> {
        let lines: Vec<String> = screen.non_empty_lines().into_iter().map(|(_, t)| t).collect();
        self.write_block(screen.start_ms, screen.end_ms, &lines)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.xml.push_str("</stream>\n</subpictures>\n");
        Ok(std::mem::take(&mut self.xml).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cea608::decoder::Mode;
    use crate::cea608::grid::Cell;

    #[test]
    fn indexes_one_png_per_screen() {
        let mut cfg = Config::default();
        cfg.output_filename = Some("cap".to_string());
        let mut enc = SpuPngEncoder::new(&cfg, "CC1".to_string());
        enc.encode_608(&Cea608Screen {
            lines: vec!["Hi".to_string()],
            cells: vec![vec![Cell::default()]],
            start_ms: 0,
            end_ms: 1000,
            channel: 1,
            mode: Mode::PopOn,
        })
        .unwrap();
        let bytes = enc.finish().unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains("cap_CC1_00000.png"));
        assert!(xml.contains("start=\"0\" end=\"1000\""));
    }
}
