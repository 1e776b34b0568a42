//! Stitch-file container and header decoding, and pattern assembly.
//!
//! The outer container is signature-tagged (`#PES`) and points at the
//! stitch-bearing sub-section through a little-endian offset word. The
//! sub-section carries a fixed 532-byte header (label, biased color count,
//! palette-index table) followed by the packed stitch stream.

use serde::Deserialize;

use crate::cursor::ByteCursor;
use crate::error::FormatError;
use crate::pattern::{ColorBlock, Pattern, Stitch, StitchKind};
use crate::stream::{decode_stream, StreamOutcome};
use crate::threads;

/// Container signature at offset 0.
pub const SIGNATURE: &[u8; 4] = b"#PES";

/// The section offset word lives at byte 8, after signature and version tag.
const SECTION_OFFSET_POS: usize = 8;
/// 3-byte marker preceding the label inside the sub-section.
const LABEL_MARKER_LEN: usize = 3;
/// Fixed-width label slot.
const LABEL_LEN: usize = 16;
/// Biased color-block count byte, relative to the section offset.
const COLOR_COUNT_POS: usize = 48;
/// Stitch data starts here regardless of label length or color count.
const STITCH_DATA_POS: usize = 532;

/// What to do when the stitch stream exhausts the buffer without an end
/// marker. The reference format tolerates this silently; stricter callers
/// can opt into an error instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TruncationPolicy {
    /// Keep whatever was decoded before the buffer ran out.
    #[default]
    Tolerate,
    /// Fail with [`FormatError::TruncatedStream`].
    Strict,
}

/// Decode configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DecodeOptions {
    #[serde(default)]
    pub truncation: TruncationPolicy,
}

/// Parsed sub-section header.
#[derive(Debug)]
struct SectionHeader {
    label: String,
    /// Stored byte is biased by +1; a stored 255 legitimately declares 256
    /// color blocks. Advisory only — assembly counts what it actually closes.
    declared_color_count: u16,
    palette_indices: Vec<u8>,
}

/// Decode a stitch file with the default (tolerant) options.
pub fn decode(bytes: &[u8]) -> Result<Pattern, FormatError> {
    decode_with(bytes, &DecodeOptions::default())
}

/// Decode a stitch file into an immutable [`Pattern`].
pub fn decode_with(bytes: &[u8], options: &DecodeOptions) -> Result<Pattern, FormatError> {
    let section_offset = read_container(bytes)?;
    let header = read_header(bytes, section_offset)?;

    log::debug!(
        "section header: label={:?}, declared colors={}, indices={:?}",
        header.label,
        header.declared_color_count,
        header.palette_indices
    );

    let mut cursor = ByteCursor::new(bytes);
    cursor.seek(section_offset + STITCH_DATA_POS);
    let outcome = decode_stream(cursor);

    if !outcome.complete {
        match options.truncation {
            TruncationPolicy::Strict => {
                return Err(FormatError::TruncatedStream { offset: bytes.len() });
            }
            TruncationPolicy::Tolerate => {
                log::warn!(
                    "stitch stream ended without end marker, keeping {} events",
                    outcome.events.len()
                );
            }
        }
    }

    let pattern = assemble(header, outcome);
    log::info!(
        "decoded pattern {:?}: {} stitches, {} colors, {}x{} units",
        pattern.name,
        pattern.total_stitch_count,
        pattern.color_count,
        pattern.width,
        pattern.height
    );
    Ok(pattern)
}

/// Validate the outer container and return the sub-section offset.
fn read_container(bytes: &[u8]) -> Result<usize, FormatError> {
    if bytes.len() < 4 || &bytes[..4] != SIGNATURE {
        return Err(FormatError::BadSignature);
    }

    let mut cursor = ByteCursor::new(bytes);
    cursor.seek(4);
    // 4-byte version tag, informational only
    let version = cursor.read_str(4)?;
    log::debug!("container version tag {:?}", version);

    debug_assert_eq!(cursor.position(), SECTION_OFFSET_POS);
    let offset = cursor.read_u32_le()?;
    if offset == 0 || offset as usize >= bytes.len() {
        return Err(FormatError::BadOffset {
            offset,
            len: bytes.len(),
        });
    }
    Ok(offset as usize)
}

/// Read the fixed-width sub-section header.
fn read_header(bytes: &[u8], section_offset: usize) -> Result<SectionHeader, FormatError> {
    let mut cursor = ByteCursor::new(bytes);

    cursor.seek(section_offset + LABEL_MARKER_LEN);
    let label = cursor.read_str(LABEL_LEN)?;

    cursor.seek(section_offset + COLOR_COUNT_POS);
    let declared_color_count = cursor.read_u8()? as u16 + 1;

    let mut palette_indices = Vec::with_capacity(declared_color_count as usize);
    for _ in 0..declared_color_count {
        palette_indices.push(cursor.read_u8()?);
    }

    Ok(SectionHeader {
        label,
        declared_color_count,
        palette_indices,
    })
}

/// Group the stitch-event sequence into ordered color blocks and compute
/// aggregate statistics.
fn assemble(header: SectionHeader, outcome: StreamOutcome) -> Pattern {
    let mut blocks: Vec<ColorBlock> = Vec::new();
    let mut buffer: Vec<Stitch> = Vec::new();
    let mut next_index = 0usize;

    let mut close_block = |buffer: &mut Vec<Stitch>, next_index: &mut usize| {
        if buffer.is_empty() {
            return;
        }
        let palette_index = match header.palette_indices.get(*next_index) {
            Some(&idx) => idx as usize,
            None => {
                // more blocks than the header declared
                log::warn!(
                    "palette-index table exhausted after {} entries, falling back to slot 0",
                    header.palette_indices.len()
                );
                0
            }
        };
        *next_index += 1;
        blocks.push(ColorBlock {
            thread: threads::thread_at(palette_index).to_ref(palette_index),
            stitches: std::mem::take(buffer),
        });
    };

    for event in &outcome.events {
        match event.kind {
            StitchKind::Stop => close_block(&mut buffer, &mut next_index),
            StitchKind::End => {
                close_block(&mut buffer, &mut next_index);
                break;
            }
            _ => buffer.push(*event),
        }
    }
    // tolerated truncation: keep the in-progress block
    close_block(&mut buffer, &mut next_index);

    let total_stitch_count = blocks.iter().map(ColorBlock::stitch_count).sum();
    let color_count = blocks.len() as u32;
    let (width, height) = outcome
        .bounds
        .map(|b| (b.width(), b.height()))
        .unwrap_or((0, 0));

    Pattern {
        name: header.label,
        width,
        height,
        color_blocks: blocks,
        bounds: outcome.bounds,
        total_stitch_count,
        color_count,
    }
}
