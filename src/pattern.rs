//! Decoded pattern data model.
//!
//! A [`Pattern`] is produced once per decode call and never mutated;
//! re-decoding a new buffer replaces it wholesale. All types serialize so a
//! host shell can hand them across an IPC boundary.

use serde::{Deserialize, Serialize};

/// Pattern coordinates are tenths of a millimetre.
pub const UNITS_PER_MM: f32 = 10.0;

/// One decoded pen action, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StitchKind {
    /// A visible stitch.
    Stitch,
    /// Reposition without sewing (jump).
    Move,
    /// Thread trim.
    Trim,
    /// Color stop (block delimiter, consumed during assembly).
    Stop,
    /// Terminal end marker.
    End,
}

/// A stitch event at an absolute position. Coordinates are reconstructed
/// from cumulative deltas and are only meaningful relative to the pattern's
/// own origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stitch {
    pub x: i32,
    pub y: i32,
    pub kind: StitchKind,
}

/// Resolved identity of the thread used for one color block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    pub color_hex: String,
    pub name: String,
    pub catalog_index: usize,
}

/// The ordered run of stitches sewn with one thread before the next color
/// change. Never contains `Stop` or `End` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorBlock {
    pub thread: ThreadRef,
    pub stitches: Vec<Stitch>,
}

impl ColorBlock {
    /// Count of visible (`Stitch`-kind) entries in this block.
    pub fn stitch_count(&self) -> u32 {
        self.stitches
            .iter()
            .filter(|s| s.kind == StitchKind::Stitch)
            .count() as u32
    }
}

/// Bounding box of the visible stitches. `Move`/`Trim`/`Stop` positions do
/// not contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y) as u32
    }
}

/// A fully decoded stitch pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Human-readable label from the file header. Display metadata only.
    pub name: String,
    /// Visible footprint width in pattern units, 0 when `bounds` is `None`.
    pub width: u32,
    /// Visible footprint height in pattern units, 0 when `bounds` is `None`.
    pub height: u32,
    pub color_blocks: Vec<ColorBlock>,
    /// `None` when the pattern contains no visible stitches.
    pub bounds: Option<Bounds>,
    /// Visible stitches across all blocks; moves and trims are not counted.
    pub total_stitch_count: u32,
    /// Number of assembled color blocks (the header's declared count is
    /// advisory and may differ).
    pub color_count: u32,
}

impl Pattern {
    /// Physical size in millimetres.
    pub fn size_mm(&self) -> (f32, f32) {
        (
            self.width as f32 / UNITS_PER_MM,
            self.height as f32 / UNITS_PER_MM,
        )
    }

    /// Estimated sew time in minutes at a given machine speed.
    pub fn estimated_minutes(&self, stitches_per_minute: u32) -> f32 {
        if stitches_per_minute == 0 {
            return 0.0;
        }
        self.total_stitch_count as f32 / stitches_per_minute as f32
    }
}
