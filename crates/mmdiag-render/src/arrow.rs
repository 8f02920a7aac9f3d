//! Directional link arrows.
//!
//! An arrow is drawn horizontally (rectangular tail, triangular head) on a
//! square canvas large enough to hold any rotation, rotated to the
//! source→destination angle, flipped to match the label convention, and
//! cropped to its tight bounding box. Because rotating a rectangle grows its
//! bounding box non-linearly with angle, final placement goes through an
//! explicit table of angle-bucket → offset rules; near-axis angles and the
//! four diagonal octants each get their own rule.

use crate::color::parse_color;
use crate::geom::{Bbox, Point, point};
use crate::layer::Layer;
use crate::{Error, Result};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Shader, Stroke, Transform};

#[derive(Debug, Clone)]
pub struct ArrowStyle {
    /// Pixel width of the arrowhead. Forced odd for exact centering.
    pub head_width: u32,
    /// Tail length as a percentage of the total arrow length, clamped to
    /// `[10, 90]`.
    pub tail_len: u32,
    /// Tail thickness as a percentage of the head width, clamped to
    /// `[10, 90]`.
    pub tail_width: u32,
    pub line: Color,
    pub fill: Color,
}

impl Default for ArrowStyle {
    fn default() -> Self {
        Self {
            head_width: 20,
            tail_len: 75,
            tail_width: 50,
            line: parse_color("black").expect("known color"),
            fill: parse_color("white").expect("known color"),
        }
    }
}

const ARROW_STROKE: f32 = 2.0;

/// Trimmed dimensions handed to the placement rules.
#[derive(Debug, Clone, Copy)]
struct TrimmedDims {
    width: i64,
    height: i64,
    /// Straight-line arrow length in px.
    length: i64,
    /// Cross-axis extent of the unrotated shape (head width plus stroke).
    cross: i64,
}

struct PlacementBucket {
    /// Half-open angle range `(lo, hi]` in degrees.
    lo: f64,
    hi: f64,
    place: fn(Point, TrimmedDims) -> Point,
}

/// Offset rules per angle bucket. Angles below −170° are normalized by +360°
/// first, so the table covers `(-170, 190]`.
const PLACEMENT: &[PlacementBucket] = &[
    // Near 0°: tail start sits on the source, shape extends to the right.
    PlacementBucket {
        lo: -10.0,
        hi: 10.0,
        place: |src, d| point(src.x, src.y - (d.cross / 2) as f64 + 1.0),
    },
    // Near 90°: pointing down the canvas.
    PlacementBucket {
        lo: 80.0,
        hi: 100.0,
        place: |src, d| point(src.x - (d.width / 2) as f64 + 2.0, src.y),
    },
    // Near −90°: pointing up the canvas.
    PlacementBucket {
        lo: -100.0,
        hi: -80.0,
        place: |src, d| point(src.x - (d.cross / 2) as f64, src.y - d.length as f64 + 1.0),
    },
    // Near 180°: extends to the left of the source.
    PlacementBucket {
        lo: 170.0,
        hi: 190.0,
        place: |src, d| {
            point(
                src.x - d.width as f64 + 1.0,
                src.y - (d.cross / 2) as f64 + 1.0,
            )
        },
    },
    // Down-right octant.
    PlacementBucket {
        lo: 10.0,
        hi: 80.0,
        place: |src, _| point(src.x, src.y),
    },
    // Down-left octant.
    PlacementBucket {
        lo: 100.0,
        hi: 170.0,
        place: |src, d| point(src.x - d.width as f64 + 2.0, src.y),
    },
    // Up-right octant.
    PlacementBucket {
        lo: -80.0,
        hi: -10.0,
        place: |src, d| point(src.x, src.y - d.height as f64 + 2.0),
    },
    // Up-left octant.
    PlacementBucket {
        lo: -170.0,
        hi: -100.0,
        place: |src, d| {
            point(
                src.x - d.width as f64 + 2.0,
                src.y - d.height as f64 + 2.0,
            )
        },
    },
];

fn place(degrees: f64, src: Point, dims: TrimmedDims) -> Point {
    let d = if degrees <= -170.0 {
        degrees + 360.0
    } else {
        degrees
    };
    for bucket in PLACEMENT {
        if d > bucket.lo && d <= bucket.hi {
            return (bucket.place)(src, dims);
        }
    }
    // Unreachable: the buckets tile (-170, 190].
    src
}

/// A rendered, trimmed arrow plus its placement position: overlaying the
/// layer at `pos` puts the tail start on the source point and the tip on the
/// destination point.
#[derive(Debug)]
pub struct Arrow {
    pub layer: Layer,
    pub pos: Point,
    /// Straight-line length between source and destination, in px.
    pub length: i64,
    /// Angle from source to destination, degrees in `(-180, 180]`.
    pub degrees: f64,
}

impl Arrow {
    pub fn new(src: Point, dst: Point, style: &ArrowStyle) -> Result<Self> {
        let length = (dst.x - src.x).hypot(dst.y - src.y) as i64;
        if length < 2 {
            return Err(Error::DegenerateArrow);
        }
        let degrees = (dst.y - src.y).atan2(dst.x - src.x).to_degrees();

        // Even head widths are impossible to center exactly.
        let head = if style.head_width % 2 == 0 {
            style.head_width.saturating_sub(1).max(1)
        } else {
            style.head_width
        };
        let tail_len = f64::from(style.tail_len.clamp(10, 90)) / 100.0;
        let tail_width = f64::from(style.tail_width.clamp(10, 90)) / 100.0;

        let l = length as f32;
        let h = head as f32;
        let body_w = h * tail_width as f32;
        let body_end = l * tail_len as f32;
        // Center the shape vertically so rotation about the canvas center
        // never clips it.
        let yzero = l / 2.0 - h / 2.0;

        let mut pb = PathBuilder::new();
        pb.move_to(0.0, yzero + h / 2.0 - body_w / 2.0);
        pb.line_to(body_end, yzero + h / 2.0 - body_w / 2.0);
        pb.line_to(body_end, yzero);
        pb.line_to(l, yzero + h / 2.0); // tip
        pb.line_to(body_end, yzero + h);
        pb.line_to(body_end, yzero + h / 2.0 + body_w / 2.0);
        pb.line_to(0.0, yzero + h / 2.0 + body_w / 2.0);
        pb.close();
        let path = pb.finish().ok_or(Error::DegenerateArrow)?;

        let side = length as u32;
        let mut layer = Layer::new(side, side)?;
        let center = l / 2.0;
        let transform = Transform::from_rotate_at(degrees as f32, center, center);

        let fill_paint = Paint {
            shader: Shader::SolidColor(style.fill),
            anti_alias: true,
            ..Paint::default()
        };
        let line_paint = Paint {
            shader: Shader::SolidColor(style.line),
            anti_alias: true,
            ..Paint::default()
        };
        let stroke = Stroke {
            width: ARROW_STROKE,
            ..Stroke::default()
        };
        layer
            .pixmap_mut()
            .fill_path(&path, &fill_paint, FillRule::Winding, transform, None);
        layer
            .pixmap_mut()
            .stroke_path(&path, &line_paint, &stroke, transform, None);

        // Match the label convention: the composed canvas is flipped before
        // final output.
        layer.flip_vertical();

        // Tight bounding box of the rotated shape, computed analytically so
        // placement does not depend on rasterization details.
        let cross = i64::from(head) + 2 * ARROW_STROKE as i64;
        let rad = degrees.to_radians();
        let (sin, cos) = (rad.sin().abs(), rad.cos().abs());
        let width = ((length as f64 * cos + cross as f64 * sin).round() as i64)
            .clamp(1, length);
        let height = ((length as f64 * sin + cross as f64 * cos).round() as i64)
            .clamp(1, length);
        let left = (side as i64 - width) / 2;
        let top = (side as i64 - height) / 2;
        layer.crop(Bbox::new(
            left as u32,
            top as u32,
            (left + width) as u32,
            (top + height) as u32,
        ))?;

        let dims = TrimmedDims {
            width,
            height,
            length,
            cross,
        };
        let pos = place(degrees, src, dims);

        Ok(Self {
            layer,
            pos,
            length,
            degrees,
        })
    }
}
