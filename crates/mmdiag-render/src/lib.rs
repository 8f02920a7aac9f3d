#![forbid(unsafe_code)]

//! Raster renderer for memory-map diagrams.
//!
//! Turns a validated [`mmdiag_core::Diagram`] plus its layout annotations
//! into pixel artifacts: a full-height diagram image, a void-cropped variant,
//! a tabular report image, and a markdown report. All drawing goes through
//! `tiny-skia`; text is rasterized via `usvg`/`resvg`.

pub mod arrow;
pub mod block;
pub mod color;
pub mod compose;
pub mod geom;
pub mod layer;
pub mod table;
pub mod text;

pub use arrow::{Arrow, ArrowStyle};
pub use compose::{DiagramArtifacts, render_diagram};
pub use layer::Layer;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to allocate a {width}x{height} pixmap")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("failed to parse generated SVG for text rendering")]
    SvgParse,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("failed to encode JPG")]
    JpegEncode,
    #[error("JPG output requires an opaque background color")]
    JpegOpaqueBackgroundRequired,
    #[error("invalid color '{value}'")]
    InvalidColor { value: String },
    #[error("arrow endpoints are coincident")]
    DegenerateArrow,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Rendering parameters supplied by the caller (documented defaults).
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Pixel width of a rendered memory-map block.
    pub width: u32,
    /// Label and table font size in px.
    pub font_size: f64,
    /// Bytes per pixel when converting region sizes to block heights.
    pub draw_scale: u64,
    /// Empty-gap length (in bytes) above which the cropped output collapses
    /// the gap into a placeholder block.
    pub void_threshold: u64,
    /// Seed for the deterministic region fill colors.
    pub color_seed: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 400,
            font_size: 12.0,
            draw_scale: 1,
            void_threshold: 0x3e8,
            color_seed: 0,
        }
    }
}
