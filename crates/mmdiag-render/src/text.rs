//! Text measurement and rasterization.
//!
//! Cell and label sizing uses a deterministic character-count measurer so
//! layout never depends on font I/O. Actual glyphs are rasterized by building
//! a minimal SVG document and rendering it through `usvg`/`resvg` into a
//! pixmap, which is then trimmed to the glyph bounding box.

use crate::layer::Layer;
use crate::{Error, Result};
use std::fmt::Write as _;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TextStyle {
    pub font_size: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self { font_size: 12.0 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;
}

/// Font-independent measurer: width from the longest line's char count,
/// height from the line count.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let char_width_factor = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let line_height_factor = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };

        let font_size = style.font_size.max(1.0);
        let lines: Vec<&str> = text.split('\n').collect();
        let max_chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        TextMetrics {
            width: max_chars as f64 * font_size * char_width_factor,
            height: lines.len() as f64 * font_size * line_height_factor,
            line_count: lines.len(),
        }
    }
}

/// Escapes the XML special characters of `text` for embedding in SVG.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Glyph rasterizer backed by the system font database.
pub struct TextRaster {
    fontdb: Arc<usvg::fontdb::Database>,
    measurer: DeterministicTextMeasurer,
}

impl Default for TextRaster {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRaster {
    pub fn new() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        Self {
            fontdb: Arc::new(fontdb),
            measurer: DeterministicTextMeasurer::default(),
        }
    }

    /// Renders `text` (possibly multi-line) into a trimmed transparent layer.
    ///
    /// The canvas starts oversized relative to the measured bounding box and
    /// is trimmed down to the rendered glyphs; when no glyph pixels land
    /// (e.g. no usable font on the host) the trim degrades gracefully and
    /// the oversized transparent canvas is returned.
    pub fn render(&self, text: &str, font_size: f64, color: &str) -> Result<Layer> {
        let style = TextStyle { font_size };
        let metrics = self.measurer.measure(text, &style);
        let width = (metrics.width * 2.0).ceil().max(8.0) as u32 + 16;
        let height = (metrics.height * 2.0).ceil().max(8.0) as u32 + 8;

        let line_height = font_size * 1.2;
        let mut body = String::new();
        for (i, line) in text.split('\n').enumerate() {
            let y = font_size + line_height * i as f64;
            let _ = write!(
                body,
                r#"<text x="1" y="{y}" font-family="sans-serif" font-size="{font_size}" fill="{color}">{}</text>"#,
                xml_escape(line)
            );
        }
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">{body}</svg>"#
        );

        let mut opt = usvg::Options::default();
        opt.fontdb = self.fontdb.clone();
        opt.font_family = "sans-serif".to_string();
        let tree = usvg::Tree::from_str(&svg, &opt).map_err(|_| Error::SvgParse)?;

        let mut layer = Layer::new(width, height)?;
        resvg::render(
            &tree,
            tiny_skia::Transform::identity(),
            &mut layer.pixmap_mut().as_mut(),
        );
        layer.trim();
        Ok(layer)
    }

    /// Renders a label that will sit on a canvas flipped vertically before
    /// final output: the glyphs are pre-flipped so they read right-side-up
    /// after the global flip.
    pub fn label(&self, text: &str, font_size: f64, color: &str) -> Result<Layer> {
        let mut layer = self.render(text, font_size, color)?;
        layer.flip_vertical();
        Ok(layer)
    }
}
