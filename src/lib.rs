//! Embroidery stitch-file decoding, thread color matching, and rendering.
//!
//! The crate decodes a signature-tagged binary stitch container into an
//! immutable [`Pattern`], matches arbitrary RGB colors against a fixed
//! palette of named machine threads using perceptual (CIELAB) distance, and
//! renders decoded patterns onto an RGBA pixel surface.
//!
//! Decoding and matching are synchronous pure functions over an in-memory
//! buffer; the only shared state is the read-only thread palette built once
//! on first use.

mod cursor;
mod decoder;
mod error;
mod pattern;
mod render;
mod stream;
mod threads;

pub use cursor::ByteCursor;
pub use decoder::{decode, decode_with, DecodeOptions, TruncationPolicy, SIGNATURE};
pub use error::FormatError;
pub use pattern::{Bounds, ColorBlock, Pattern, Stitch, StitchKind, ThreadRef, UNITS_PER_MM};
pub use render::{render_pattern, RenderOptions};
pub use threads::{
    assign_threads, delta_e76, find_closest_thread, hex_to_rgb, palette_len, rgb_to_hex,
    rgb_to_lab, search_threads, thread_at, thread_categories, ThreadDefinition,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// End to end: decode a synthetic file, resolve its thread, render it,
    /// and ship the pattern through serde the way a host shell would.
    #[test]
    fn test_decode_render_serialize_roundtrip() {
        let mut file = Vec::new();
        file.extend_from_slice(b"#PES");
        file.extend_from_slice(b"0001");
        file.extend_from_slice(&12u32.to_le_bytes());
        let mut section = vec![0u8; 532];
        section[..3].copy_from_slice(b"LA:");
        section[3..7].copy_from_slice(b"rose");
        section[48] = 0; // one color block
        section[49] = 4; // palette slot 4: Red
        file.extend_from_slice(&section);
        // square of four stitches, then end
        file.extend_from_slice(&[
            0x32, 0x00, // (50, 0)
            0x00, 0x32, // (50, 50)
            0x4E, 0x00, // (0, 50)  dx=-50
            0x00, 0x4E, // (0, 0)   dy=-50
            0xFF, 0x00,
        ]);

        let pattern = decode(&file).unwrap();
        assert_eq!(pattern.name, "rose");
        assert_eq!(pattern.total_stitch_count, 4);
        assert_eq!(pattern.color_blocks[0].thread.name, "Red");

        let canvas = render_pattern(&pattern, 200, 200, &RenderOptions::default());
        assert_eq!((canvas.width(), canvas.height()), (200, 200));

        let json = serde_json::to_string(&pattern).unwrap();
        let back: Pattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_stitch_count, pattern.total_stitch_count);
        assert_eq!(back.bounds, pattern.bounds);
    }
}
