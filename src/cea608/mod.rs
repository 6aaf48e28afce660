//! # CEA-608 line-21 decoder
//!
//! A two-field, two-buffer, pop-on/roll-up/paint-on/text state machine
//! with a 15×32 character grid, PAC-driven colour/font/indent
//! attributes, parallel XDS extraction, and channel filtering.
//!
//! Grounded on `original_source/src/608.c` throughout; split into
//! submodules along the same lines the original keeps internally
//! separate (charset tables, PAC table, the grid, XDS, and the control
//! dispatch loop itself).

pub mod casefix;
pub mod charset;
pub mod decoder;
pub mod grid;
pub mod pac;
pub mod xds;

pub use decoder::{Cea608Decoder, Cea608Screen, Mode};
pub use grid::{Cea608Color, Cell, FontAttr};
pub use xds::{XdsDecoder, XdsEvent};
