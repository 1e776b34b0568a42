//! Machine thread palette and perceptual color matching.
//!
//! The stitch format addresses threads by index into a fixed 64-color
//! machine palette. The table below is that reference set, with catalog
//! numbers and a coarse category per entry. LAB values are precomputed once
//! at first use and shared read-only for the process lifetime.

use palette::{white_point::D65, FromColor, Lab, Srgb};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::OnceLock;

use crate::pattern::ThreadRef;

/// Static reference entry in the fixed thread palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadDefinition {
    /// Catalog number, searched as a numeric string.
    pub number: &'static str,
    pub name: &'static str,
    pub hex: &'static str,
    pub category: &'static str,
}

/// Fixed machine palette: (catalog number, name, hex, category).
/// Order matters — stitch files index into this table, and matcher ties
/// resolve to the earliest entry.
const THREAD_TABLE: &[(&str, &str, &str, &str)] = &[
    ("007", "Prussian Blue", "#1A0A94", "Blue"),
    ("405", "Blue", "#0F75FF", "Blue"),
    ("534", "Teal Green", "#00934C", "Green"),
    ("070", "Corn Flower Blue", "#BABDFE", "Blue"),
    ("800", "Red", "#EC0000", "Red"),
    ("337", "Reddish Brown", "#E4995A", "Brown"),
    ("620", "Magenta", "#CC48AB", "Pink"),
    ("810", "Light Lilac", "#FDC4FA", "Purple"),
    ("612", "Lilac", "#DD84CD", "Purple"),
    ("502", "Mint Green", "#6BD38A", "Green"),
    ("214", "Deep Gold", "#E4A945", "Yellow"),
    ("208", "Orange", "#FFBD42", "Orange"),
    ("205", "Yellow", "#FFE600", "Yellow"),
    ("513", "Lime Green", "#6CD900", "Green"),
    ("328", "Brass", "#C1A941", "Yellow"),
    ("005", "Silver", "#B5AD97", "Gray"),
    ("328b", "Russet Brown", "#BA9C5F", "Brown"),
    ("017", "Cream Brown", "#FAF59E", "Brown"),
    ("707", "Pewter", "#808080", "Gray"),
    ("900", "Black", "#000000", "Black"),
    ("406", "Ultramarine", "#001CDF", "Blue"),
    ("669", "Royal Purple", "#DF00B8", "Purple"),
    ("707b", "Dark Gray", "#626262", "Gray"),
    ("058", "Dark Brown", "#69260D", "Brown"),
    ("086", "Deep Rose", "#FF0060", "Pink"),
    ("323", "Light Brown", "#BF8200", "Brown"),
    ("079", "Salmon Pink", "#F39178", "Pink"),
    ("030", "Vermilion", "#FF6805", "Orange"),
    ("001", "White", "#F0F0F0", "White"),
    ("613", "Violet", "#C832CD", "Purple"),
    ("542", "Seacrest", "#B0BF9B", "Green"),
    ("019", "Sky Blue", "#65BFEB", "Blue"),
    ("126", "Pumpkin", "#FFBA04", "Orange"),
    ("010", "Cream Yellow", "#FFF06C", "Yellow"),
    ("126b", "Khaki", "#FECA15", "Yellow"),
    ("337b", "Clay Brown", "#F38101", "Brown"),
    ("509", "Leaf Green", "#37A923", "Green"),
    ("415", "Peacock Blue", "#23465F", "Blue"),
    ("817", "Solid Gray", "#A6A695", "Gray"),
    ("542b", "Dark Sea Green", "#CEBFA6", "Green"),
    ("513b", "Dark Olive Green", "#96AA02", "Green"),
    ("109", "Linen", "#FFE3C6", "White"),
    ("085", "Pink", "#FF99D7", "Pink"),
    ("808", "Deep Green", "#007004", "Green"),
    ("203", "Lavender", "#EDCCFB", "Purple"),
    ("804", "Wisteria Violet", "#A08CC6", "Purple"),
    ("010b", "Beige", "#E9D7CE", "White"),
    ("807", "Carmine", "#E877A2", "Red"),
    ("333", "Amber Red", "#964437", "Red"),
    ("519", "Olive Green", "#4F5A20", "Green"),
    ("107", "Dark Fuchsia", "#C33F66", "Pink"),
    ("209", "Tangerine", "#FFB413", "Orange"),
    ("017b", "Light Blue", "#BCE3E8", "Blue"),
    ("507", "Emerald Green", "#18996D", "Green"),
    ("614", "Purple", "#8B2F89", "Purple"),
    ("515", "Moss Green", "#4D8C4C", "Green"),
    ("124", "Flesh Pink", "#FDC9C4", "Pink"),
    ("214b", "Harvest Gold", "#D9A83C", "Yellow"),
    ("420", "Electric Blue", "#1163A8", "Blue"),
    ("205b", "Lemon Yellow", "#F6F258", "Yellow"),
    ("027", "Fresh Green", "#CFE774", "Green"),
    ("821", "Applique Material", "#FFC8C8", "Special"),
    ("822", "Applique Position", "#C8C8FF", "Special"),
    ("823", "Applique", "#C8C8C8", "Special"),
];

/// Palette entries paired with their precomputed LAB values.
struct ThreadPalette {
    threads: Vec<ThreadDefinition>,
    labs: Vec<Lab<D65, f32>>,
}

static CACHED_PALETTE: OnceLock<ThreadPalette> = OnceLock::new();

impl ThreadPalette {
    fn global() -> &'static Self {
        CACHED_PALETTE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let threads: Vec<ThreadDefinition> = THREAD_TABLE
            .iter()
            .map(|&(number, name, hex, category)| ThreadDefinition {
                number,
                name,
                hex,
                category,
            })
            .collect();

        let labs: Vec<Lab<D65, f32>> = threads
            .iter()
            .map(|t| rgb_to_lab(hex_to_rgb(t.hex)))
            .collect();

        Self { threads, labs }
    }

    /// Index of the entry with minimum delta-E against `target`. Strict
    /// less-than keeps ties on the earliest palette entry, so results are
    /// deterministic and order-dependent.
    fn closest_index(&self, target: Lab<D65, f32>) -> usize {
        let mut best_idx = 0;
        let mut best_dist = f32::MAX;
        for (i, lab) in self.labs.iter().enumerate() {
            let dist = delta_e76(target, *lab);
            if dist < best_dist {
                best_dist = dist;
                best_idx = i;
            }
        }
        best_idx
    }
}

/// Convert hex string to RGB triple.
pub fn hex_to_rgb(hex: &str) -> [u8; 3] {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(hex.get(0..2).unwrap_or("0"), 16).unwrap_or(0);
    let g = u8::from_str_radix(hex.get(2..4).unwrap_or("0"), 16).unwrap_or(0);
    let b = u8::from_str_radix(hex.get(4..6).unwrap_or("0"), 16).unwrap_or(0);
    [r, g, b]
}

/// Convert RGB triple to hex string.
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Convert RGB [0-255] to CIELAB (D65).
pub fn rgb_to_lab(rgb: [u8; 3]) -> Lab<D65, f32> {
    let srgb = Srgb::new(
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    );
    Lab::from_color(srgb)
}

/// CIE76 delta-E: Euclidean distance in LAB space. Intentionally the
/// simplest perceptual metric — adequate for thread selection, not
/// colorimetrically exact.
pub fn delta_e76(a: Lab<D65, f32>, b: Lab<D65, f32>) -> f32 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// Find the palette thread perceptually closest to `hex`.
pub fn find_closest_thread(hex: &str) -> &'static ThreadDefinition {
    let palette = ThreadPalette::global();
    let idx = palette.closest_index(rgb_to_lab(hex_to_rgb(hex)));
    &palette.threads[idx]
}

/// Match a batch of colors against the palette in parallel. Used for
/// auto-assignment of image-derived colors.
pub fn assign_threads(hexes: &[String]) -> Vec<&'static ThreadDefinition> {
    let palette = ThreadPalette::global();
    hexes
        .par_iter()
        .map(|hex| {
            let idx = palette.closest_index(rgb_to_lab(hex_to_rgb(hex)));
            &palette.threads[idx]
        })
        .collect()
}

/// Case-insensitive substring match against thread names, or substring
/// match against catalog numbers. Results keep palette order.
pub fn search_threads(query: &str) -> Vec<&'static ThreadDefinition> {
    let palette = ThreadPalette::global();
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    palette
        .threads
        .iter()
        .filter(|t| t.name.to_lowercase().contains(&needle) || t.number.contains(&needle))
        .collect()
}

/// Distinct category labels present in the palette, first-seen order.
pub fn thread_categories() -> Vec<&'static str> {
    let palette = ThreadPalette::global();
    let mut seen = Vec::new();
    for t in &palette.threads {
        if !seen.contains(&t.category) {
            seen.push(t.category);
        }
    }
    seen
}

/// Palette entry for a stitch-file palette index. Out-of-range indices
/// clamp to slot 0, matching the decoder's tolerant fallback.
pub fn thread_at(index: usize) -> &'static ThreadDefinition {
    let palette = ThreadPalette::global();
    palette.threads.get(index).unwrap_or(&palette.threads[0])
}

/// Number of entries in the fixed palette.
pub fn palette_len() -> usize {
    ThreadPalette::global().threads.len()
}

impl ThreadDefinition {
    /// Resolve this definition into a block-level thread reference.
    pub fn to_ref(&self, catalog_index: usize) -> ThreadRef {
        ThreadRef {
            color_hex: self.hex.to_string(),
            name: self.name.to_string(),
            catalog_index,
        }
    }
}
