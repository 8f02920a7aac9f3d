//! Rectangle-based building blocks: region blocks, map title blocks, and the
//! void placeholder used by the cropped output.

use crate::color::{parse_color, region_fill};
use crate::geom::point;
use crate::layer::Layer;
use crate::text::TextRaster;
use crate::{RenderOptions, Result};
use mmdiag_core::{MemoryRegion, RegionStats};
use tiny_skia::Color;

/// Per-edge dash run lengths (top, right, bottom, left). A value of 0 or 1
/// draws a solid edge; larger values alternate `value / 2` px of line with
/// the same amount of gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dash {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Dash {
    pub const SOLID: Dash = Dash::new(0, 0, 0, 0);

    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// Draws a filled rectangle with per-edge solid or dashed borders.
pub fn dashed_rectangle(
    width: u32,
    height: u32,
    dash: Dash,
    fill: Color,
    line: Color,
    stroke: u32,
) -> Result<Layer> {
    let mut layer = Layer::filled(width, height, fill)?;
    let (w, h) = (width as f32, height as f32);
    let s = stroke as f32;

    let horizontal_edge = |layer: &mut Layer, y: f32, run: u32| {
        if run > 1 {
            let mut x = 0u32;
            while x < width {
                layer.fill_region(x as f32, y, (run / 2) as f32, s, line);
                x += run;
            }
        } else {
            layer.fill_region(0.0, y, w, s, line);
        }
    };
    horizontal_edge(&mut layer, 0.0, dash.top);
    horizontal_edge(&mut layer, h - s, dash.bottom);

    let vertical_edge = |layer: &mut Layer, x: f32, run: u32| {
        if run > 1 {
            let mut y = 0u32;
            while y < height {
                layer.fill_region(x, y as f32, s, (run / 2) as f32, line);
                y += run;
            }
        } else {
            layer.fill_region(x, 0.0, s, h, line);
        }
    };
    vertical_edge(&mut layer, 0.0, dash.left);
    vertical_edge(&mut layer, w - s, dash.right);

    Ok(layer)
}

/// Rendered block for one memory region.
pub struct RegionBlock {
    pub name: String,
    pub layer: Layer,
    pub fill: Color,
}

/// Length of a dash run on a "cut off" bottom edge.
const CUT_OFF_DASH: u32 = 8;
const BORDER_STROKE: u32 = 2;

/// Renders a region as a bordered rectangle with an inset name label.
///
/// The block is `size / draw_scale` px tall. A region whose free space is
/// negative collides forward into its neighbour; its bottom edge is dashed as
/// a "cut off" cue. Any recorded collision switches the border to the warning
/// color. The label is pre-flipped for the final vertical flip and blended at
/// half opacity so the fill and border stay visible underneath.
pub fn region_block(
    name: &str,
    region: &MemoryRegion,
    stats: &RegionStats,
    options: &RenderOptions,
    text: &TextRaster,
) -> Result<RegionBlock> {
    let fill = region_fill(options.color_seed, name);
    let line = if stats.has_collisions() {
        parse_color("red")?
    } else {
        parse_color("black")?
    };
    let dash = if stats.remain < 0 {
        Dash::new(0, 0, CUT_OFF_DASH, 0)
    } else {
        Dash::SOLID
    };

    let height = (region.size.0 / options.draw_scale.max(1)).max(1) as u32;
    let mut layer = dashed_rectangle(options.width, height, dash, fill, line, BORDER_STROKE)?;

    let mut label = text.label(name, options.font_size, "white")?;
    let x = (options.width.saturating_sub(label.width()) / 2) as f64;
    layer.overlay(&mut label, point(x, 2.0), 128);

    Ok(RegionBlock {
        name: name.to_string(),
        layer,
        fill,
    })
}

/// Renders the dashed title banner shown with each memory map.
pub fn map_title_block(
    name: &str,
    width: u32,
    font_size: f64,
    text: &TextRaster,
) -> Result<Layer> {
    let mut label = text.label(name, font_size, "black")?;
    let mut layer = dashed_rectangle(
        width,
        label.height() + 10,
        Dash::new(CUT_OFF_DASH, 0, CUT_OFF_DASH, 0),
        parse_color("white")?,
        parse_color("black")?,
        BORDER_STROKE,
    )?;
    let x = (width.saturating_sub(label.width()) / 2) as f64;
    layer.overlay(&mut label, point(x, 5.0), 192);
    Ok(layer)
}

/// Height of the placeholder standing in for a collapsed void gap.
pub const VOID_BLOCK_PX: u32 = 40;

/// Renders the "SKIPPED" placeholder block used where the cropped output
/// collapses a void gap.
pub fn void_block(width: u32, font_size: f64, text: &TextRaster) -> Result<Layer> {
    let mut layer = dashed_rectangle(
        width,
        VOID_BLOCK_PX,
        Dash::new(CUT_OFF_DASH, 0, CUT_OFF_DASH, 0),
        parse_color("white")?,
        parse_color("black")?,
        BORDER_STROKE,
    )?;
    let mut label = text.label("SKIPPED", font_size, "grey")?;
    let x = (width.saturating_sub(label.width()) / 2) as f64;
    let y = (VOID_BLOCK_PX.saturating_sub(label.height()) / 2) as f64;
    layer.overlay(&mut label, point(x, y), 255);
    Ok(layer)
}
