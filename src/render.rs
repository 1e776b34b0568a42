//! Pattern rendering onto an RGBA pixel surface.
//!
//! Projects a decoded pattern into a bounded viewport: uniform scale-to-fit
//! with padding, optional unit grid, a dashed hoop-boundary guide, and the
//! per-block stitch paths. Rendering is idempotent; the same pattern and
//! options always produce the same pixels.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;
use serde::Deserialize;

use crate::pattern::{Bounds, Pattern, StitchKind};
use crate::threads::hex_to_rgb;

/// Grid spacing in pattern units (100 units = 10 mm).
const GRID_STEP: f32 = 100.0;
/// Hoop guide size in pattern units (1000 units = 100 mm).
const HOOP_SIZE: f32 = 1000.0;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GRID_COLOR: Rgba<u8> = Rgba([230, 230, 230, 255]);
const HOOP_COLOR: Rgba<u8> = Rgba([160, 160, 160, 255]);
const JUMP_COLOR: Rgba<u8> = Rgba([190, 190, 190, 255]);

/// Renderer options. Width/height of the viewport are passed to
/// [`render_pattern`] directly.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RenderOptions {
    pub show_grid: bool,
    pub show_jumps: bool,
    pub line_width: f32,
    /// Padding in pixels around the fitted pattern.
    pub padding: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_grid: true,
            show_jumps: false,
            line_width: 1.0,
            padding: 20.0,
        }
    }
}

/// Uniform, aspect-preserving mapping from pattern units to viewport pixels.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    scale: f32,
    origin_x: f32,
    origin_y: f32,
    width: u32,
    height: u32,
}

impl Viewport {
    fn new(bounds: Option<Bounds>, width: u32, height: u32, padding: f32) -> Self {
        let usable_w = (width as f32 - 2.0 * padding).max(1.0);
        let usable_h = (height as f32 - 2.0 * padding).max(1.0);

        let (scale, min_x, min_y, pat_w, pat_h) = match bounds {
            Some(b) => {
                let pw = (b.width().max(1)) as f32;
                let ph = (b.height().max(1)) as f32;
                let scale = (usable_w / pw).min(usable_h / ph);
                (scale, b.min_x as f32, b.min_y as f32, pw, ph)
            }
            // nothing to fit; scale so the hoop guide fills the viewport
            None => ((usable_w.min(usable_h)) / HOOP_SIZE, 0.0, 0.0, 0.0, 0.0),
        };

        // center the bounding box within the padded viewport
        let origin_x = (width as f32 - pat_w * scale) / 2.0 - min_x * scale;
        let origin_y = (height as f32 - pat_h * scale) / 2.0 - min_y * scale;

        Self {
            scale,
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    fn to_px(&self, x: i32, y: i32) -> (f32, f32) {
        (
            self.origin_x + x as f32 * self.scale,
            self.origin_y + y as f32 * self.scale,
        )
    }
}

/// Render a decoded pattern into a fresh RGBA canvas of the given size.
pub fn render_pattern(
    pattern: &Pattern,
    width: u32,
    height: u32,
    options: &RenderOptions,
) -> RgbaImage {
    let width = width.max(1);
    let height = height.max(1);
    let viewport = Viewport::new(pattern.bounds, width, height, options.padding);

    log::debug!(
        "rendering {:?} into {}x{} at scale {:.3}",
        pattern.name,
        width,
        height,
        viewport.scale
    );

    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

    if options.show_grid {
        draw_grid(&mut canvas, &viewport);
    }
    draw_hoop_guide(&mut canvas, &viewport);

    for block in &pattern.color_blocks {
        draw_block(&mut canvas, &viewport, block, options);
    }

    canvas
}

/// Light grid at fixed pattern-unit intervals, aligned to the pattern origin.
fn draw_grid(canvas: &mut RgbaImage, viewport: &Viewport) {
    let step = GRID_STEP * viewport.scale;
    if step < 2.0 {
        return;
    }
    let (w, h) = (viewport.width as f32, viewport.height as f32);

    let mut x = viewport.origin_x % step;
    while x < w {
        if x >= 0.0 {
            draw_line_segment_mut(canvas, (x, 0.0), (x, h), GRID_COLOR);
        }
        x += step;
    }
    let mut y = viewport.origin_y % step;
    while y < h {
        if y >= 0.0 {
            draw_line_segment_mut(canvas, (0.0, y), (w, y), GRID_COLOR);
        }
        y += step;
    }
}

/// Dashed square for the fixed physical hoop, centered in the viewport.
/// A visual reference only, independent of the pattern bounds.
fn draw_hoop_guide(canvas: &mut RgbaImage, viewport: &Viewport) {
    let side = HOOP_SIZE * viewport.scale;
    let left = (viewport.width as f32 - side) / 2.0;
    let top = (viewport.height as f32 - side) / 2.0;
    let right = left + side;
    let bottom = top + side;

    draw_dashed_line(canvas, (left, top), (right, top), HOOP_COLOR);
    draw_dashed_line(canvas, (right, top), (right, bottom), HOOP_COLOR);
    draw_dashed_line(canvas, (right, bottom), (left, bottom), HOOP_COLOR);
    draw_dashed_line(canvas, (left, bottom), (left, top), HOOP_COLOR);
}

fn draw_block(
    canvas: &mut RgbaImage,
    viewport: &Viewport,
    block: &crate::pattern::ColorBlock,
    options: &RenderOptions,
) {
    let [r, g, b] = hex_to_rgb(&block.thread.color_hex);
    let color = Rgba([r, g, b, 255]);

    let mut prev: Option<(f32, f32)> = None;
    let mut pen_down = false;

    for stitch in &block.stitches {
        let pos = viewport.to_px(stitch.x, stitch.y);
        match stitch.kind {
            StitchKind::Stitch => {
                if let Some(last) = prev {
                    if pen_down {
                        stroke_line(canvas, last, pos, options.line_width, color);
                    } else if options.show_jumps {
                        draw_dashed_line(canvas, last, pos, JUMP_COLOR);
                    }
                }
                prev = Some(pos);
                pen_down = true;
            }
            StitchKind::Move | StitchKind::Trim => {
                // break the path; the pen repositions without sewing
                prev = Some(pos);
                pen_down = false;
            }
            // delimiters are consumed during assembly and never stored
            StitchKind::Stop | StitchKind::End => {}
        }
    }
}

/// Stroke a segment with an approximate pixel width by layering offset
/// 1-px lines perpendicular to the segment direction.
fn stroke_line(
    canvas: &mut RgbaImage,
    from: (f32, f32),
    to: (f32, f32),
    width: f32,
    color: Rgba<u8>,
) {
    let passes = width.round().max(1.0) as i32;
    if passes == 1 {
        draw_line_segment_mut(canvas, from, to, color);
        return;
    }

    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let len = (dx * dx + dy * dy).sqrt();
    let (nx, ny) = if len > f32::EPSILON {
        (-dy / len, dx / len)
    } else {
        (1.0, 0.0)
    };

    for i in 0..passes {
        let off = i as f32 - (passes - 1) as f32 / 2.0;
        draw_line_segment_mut(
            canvas,
            (from.0 + nx * off, from.1 + ny * off),
            (to.0 + nx * off, to.1 + ny * off),
            color,
        );
    }
}

/// 6-on/4-off dashed line, stepped along the segment.
fn draw_dashed_line(canvas: &mut RgbaImage, from: (f32, f32), to: (f32, f32), color: Rgba<u8>) {
    const DASH_ON: f32 = 6.0;
    const DASH_OFF: f32 = 4.0;

    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let len = (dx * dx + dy * dy).sqrt();
    if len < f32::EPSILON {
        return;
    }
    let (ux, uy) = (dx / len, dy / len);

    let mut t = 0.0;
    while t < len {
        let end = (t + DASH_ON).min(len);
        draw_line_segment_mut(
            canvas,
            (from.0 + ux * t, from.1 + uy * t),
            (from.0 + ux * end, from.1 + uy * end),
            color,
        );
        t += DASH_ON + DASH_OFF;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{ColorBlock, Stitch, ThreadRef};

    fn pattern_with(bounds: Bounds, stitches: Vec<Stitch>) -> Pattern {
        let total = stitches
            .iter()
            .filter(|s| s.kind == StitchKind::Stitch)
            .count() as u32;
        Pattern {
            name: "test".into(),
            width: bounds.width(),
            height: bounds.height(),
            color_blocks: vec![ColorBlock {
                thread: ThreadRef {
                    color_hex: "#EC0000".into(),
                    name: "Red".into(),
                    catalog_index: 4,
                },
                stitches,
            }],
            bounds: Some(bounds),
            total_stitch_count: total,
            color_count: 1,
        }
    }

    #[test]
    fn test_scale_is_uniform_and_padded() {
        let bounds = Bounds {
            min_x: 0,
            min_y: 0,
            max_x: 200,
            max_y: 100,
        };
        let viewport = Viewport::new(Some(bounds), 440, 440, 20.0);
        // min(400/200, 400/100) = 2.0, never a per-axis factor
        assert!((viewport.scale - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_centering_accounts_for_min_corner() {
        let bounds = Bounds {
            min_x: -50,
            min_y: -50,
            max_x: 50,
            max_y: 50,
        };
        let viewport = Viewport::new(Some(bounds), 240, 240, 20.0);
        // pattern center (0,0) should land on the viewport center
        let (cx, cy) = viewport.to_px(0, 0);
        assert!((cx - 120.0).abs() < 1e-3);
        assert!((cy - 120.0).abs() < 1e-3);
    }

    #[test]
    fn test_render_paints_stitch_path() {
        let bounds = Bounds {
            min_x: 0,
            min_y: 0,
            max_x: 100,
            max_y: 100,
        };
        let stitches = vec![
            Stitch {
                x: 0,
                y: 0,
                kind: StitchKind::Stitch,
            },
            Stitch {
                x: 100,
                y: 100,
                kind: StitchKind::Stitch,
            },
        ];
        let pattern = pattern_with(bounds, stitches);
        let options = RenderOptions {
            show_grid: false,
            show_jumps: false,
            line_width: 1.0,
            padding: 10.0,
        };
        let canvas = render_pattern(&pattern, 220, 220, &options);

        assert_eq!((canvas.width(), canvas.height()), (220, 220));
        // the path runs corner to corner through the center
        let center = canvas.get_pixel(110, 110);
        assert_eq!(center, &Rgba([0xEC, 0x00, 0x00, 255]));
    }

    #[test]
    fn test_jump_break_leaves_gap() {
        let bounds = Bounds {
            min_x: 0,
            min_y: 0,
            max_x: 100,
            max_y: 0,
        };
        // two stitches separated by a trim: no connecting line
        let stitches = vec![
            Stitch {
                x: 0,
                y: 0,
                kind: StitchKind::Stitch,
            },
            Stitch {
                x: 0,
                y: 0,
                kind: StitchKind::Trim,
            },
            Stitch {
                x: 100,
                y: 0,
                kind: StitchKind::Stitch,
            },
        ];
        let pattern = pattern_with(bounds, stitches);
        let options = RenderOptions {
            show_grid: false,
            show_jumps: false,
            line_width: 1.0,
            padding: 10.0,
        };
        let canvas = render_pattern(&pattern, 220, 220, &options);
        // midpoint of the would-be connection stays background
        let (mx, my) = {
            let viewport = Viewport::new(pattern.bounds, 220, 220, options.padding);
            viewport.to_px(50, 0)
        };
        let mid = canvas.get_pixel(mx as u32, my as u32);
        assert_eq!(mid, &BACKGROUND);
    }

    #[test]
    fn test_degenerate_pattern_renders_chrome_only() {
        let pattern = Pattern {
            name: "empty".into(),
            width: 0,
            height: 0,
            color_blocks: vec![],
            bounds: None,
            total_stitch_count: 0,
            color_count: 0,
        };
        let canvas = render_pattern(&pattern, 100, 100, &RenderOptions::default());
        assert_eq!((canvas.width(), canvas.height()), (100, 100));
    }
}
