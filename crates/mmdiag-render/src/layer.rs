//! Raster canvas wrapper around `tiny_skia::Pixmap`.
//!
//! A [`Layer`] is one rectangular piece of the diagram (a region block, a
//! label, an arrow, a whole map). Layers are composed by alpha blending onto
//! a destination layer; the composited position is recorded so link arrows
//! can later be anchored on region midpoints.

use crate::geom::{Bbox, Point, point};
use crate::{Error, Result};
use tiny_skia::{Color, IntRect, Pixmap, PixmapPaint, Transform};

#[derive(Debug, Clone)]
pub struct Layer {
    pixmap: Pixmap,
    /// Absolute top-left position within the parent canvas, set at overlay
    /// time.
    pub abs_pos: Point,
    /// Absolute midpoint within the parent canvas, set at overlay time.
    pub abs_mid: Point,
}

impl Layer {
    /// New fully transparent layer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or(Error::PixmapAlloc { width, height })?;
        Ok(Self::from_pixmap(pixmap))
    }

    /// New layer filled with a solid color.
    pub fn filled(width: u32, height: u32, color: Color) -> Result<Self> {
        let mut layer = Self::new(width, height)?;
        layer.pixmap.fill(color);
        Ok(layer)
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            pixmap,
            abs_pos: point(0.0, 0.0),
            abs_mid: point(0.0, 0.0),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Alpha-composites `src` onto this layer at `at`, recording the
    /// absolute position and midpoint back on `src`.
    pub fn overlay(&mut self, src: &mut Layer, at: Point, alpha: u8) {
        src.abs_pos = at;
        src.abs_mid = point(
            at.x + f64::from(src.width() / 2),
            at.y + f64::from(src.height() / 2),
        );

        let paint = PixmapPaint {
            opacity: f32::from(alpha) / 255.0,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            at.x as i32,
            at.y as i32,
            src.pixmap.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
    }

    /// Fills an axis-aligned rectangle with a solid color (no blending math
    /// beyond source-over, no anti-aliasing).
    pub fn fill_region(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let paint = tiny_skia::Paint {
            shader: tiny_skia::Shader::SolidColor(color),
            anti_alias: false,
            ..tiny_skia::Paint::default()
        };
        if let Some(rect) = tiny_skia::Rect::from_xywh(x, y, w, h) {
            self.pixmap
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    /// Bounding box of all pixels that differ from the top-left corner pixel.
    /// `None` when the layer is uniform (or empty).
    pub fn content_bbox(&self) -> Option<Bbox> {
        let (w, h) = (self.width() as usize, self.height() as usize);
        if w == 0 || h == 0 {
            return None;
        }
        let data = self.pixmap.data();
        let background = &data[0..4];

        let mut bbox: Option<(usize, usize, usize, usize)> = None;
        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) * 4;
                if &data[i..i + 4] != background {
                    bbox = Some(match bbox {
                        None => (x, y, x + 1, y + 1),
                        Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x + 1), b.max(y + 1)),
                    });
                }
            }
        }
        bbox.map(|(l, t, r, b)| Bbox::new(l as u32, t as u32, r as u32, b as u32))
    }

    /// Trims uniform padding down to the content bounding box. When no
    /// content is found the layer is left untrimmed and a warning is logged.
    pub fn trim(&mut self) {
        match self.content_bbox() {
            Some(bbox) => {
                if let Err(err) = self.crop(bbox) {
                    tracing::warn!(%err, "failed to crop trimmed image");
                }
            }
            None => tracing::warn!("no content pixels found, leaving image untrimmed"),
        }
    }

    /// Crops the layer to `bbox`.
    pub fn crop(&mut self, bbox: Bbox) -> Result<()> {
        let rect = IntRect::from_ltrb(
            bbox.left as i32,
            bbox.top as i32,
            bbox.right as i32,
            bbox.bottom as i32,
        )
        .ok_or(Error::PixmapAlloc {
            width: bbox.width(),
            height: bbox.height(),
        })?;
        self.pixmap = self.pixmap.clone_rect(rect).ok_or(Error::PixmapAlloc {
            width: bbox.width(),
            height: bbox.height(),
        })?;
        Ok(())
    }

    /// Mirrors the layer top-to-bottom in place.
    pub fn flip_vertical(&mut self) {
        let w = self.width() as usize;
        let h = self.height() as usize;
        let row_bytes = w * 4;
        let data = self.pixmap.data_mut();
        for y in 0..h / 2 {
            let opposite = h - 1 - y;
            for i in 0..row_bytes {
                data.swap(y * row_bytes + i, opposite * row_bytes + i);
            }
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap.encode_png().map_err(|_| Error::PngEncode)
    }

    /// Flattens the layer over an opaque background and encodes it as JPEG.
    pub fn encode_jpeg(&self, quality: u8, background: Color) -> Result<Vec<u8>> {
        if background.alpha() != 1.0 {
            return Err(Error::JpegOpaqueBackgroundRequired);
        }
        let bg = background.to_color_u8();
        let (w, h) = (self.width(), self.height());

        // The pixmap buffer is premultiplied RGBA, so source-over onto an
        // opaque background is `src + bg * (255 - alpha) / 255` per band.
        let rgba = self.pixmap.data();
        let mut rgb = vec![0u8; (w as usize) * (h as usize) * 3];
        for (src, dst) in rgba.chunks_exact(4).zip(rgb.chunks_exact_mut(3)) {
            let inv = 255 - u16::from(src[3]);
            dst[0] = src[0].saturating_add((u16::from(bg.red()) * inv / 255) as u8);
            dst[1] = src[1].saturating_add((u16::from(bg.green()) * inv / 255) as u8);
            dst[2] = src[2].saturating_add((u16::from(bg.blue()) * inv / 255) as u8);
        }

        let mut out = Vec::new();
        let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
        enc.encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
            .map_err(|_| Error::JpegEncode)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point;

    fn set_pixel(layer: &mut Layer, x: u32, y: u32) {
        let w = layer.width() as usize;
        let data = layer.pixmap_mut().data_mut();
        let i = (y as usize * w + x as usize) * 4;
        data[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
    }

    #[test]
    fn zero_sized_layer_is_rejected() {
        assert!(matches!(
            Layer::new(0, 10),
            Err(Error::PixmapAlloc { .. })
        ));
    }

    #[test]
    fn trim_crops_to_content() {
        let mut layer = Layer::new(20, 20).unwrap();
        set_pixel(&mut layer, 5, 7);
        set_pixel(&mut layer, 12, 9);
        layer.trim();
        assert_eq!(layer.width(), 8);
        assert_eq!(layer.height(), 3);
    }

    #[test]
    fn trim_of_uniform_layer_degrades_gracefully() {
        let mut layer = Layer::filled(8, 8, Color::from_rgba8(10, 20, 30, 255)).unwrap();
        layer.trim();
        // Untrimmed, not an error.
        assert_eq!((layer.width(), layer.height()), (8, 8));
    }

    #[test]
    fn overlay_records_absolute_positions() {
        let mut dest = Layer::new(100, 100).unwrap();
        let mut src = Layer::filled(10, 20, Color::from_rgba8(1, 2, 3, 255)).unwrap();
        dest.overlay(&mut src, point(30.0, 40.0), 255);
        assert_eq!(src.abs_pos, point(30.0, 40.0));
        assert_eq!(src.abs_mid, point(35.0, 50.0));
    }

    #[test]
    fn overlay_blends_with_alpha() {
        let mut dest = Layer::filled(4, 4, Color::from_rgba8(0, 0, 0, 255)).unwrap();
        let mut src = Layer::filled(4, 4, Color::from_rgba8(255, 255, 255, 255)).unwrap();
        dest.overlay(&mut src, point(0.0, 0.0), 128);
        let px = dest.pixmap().pixel(1, 1).unwrap();
        // Half-opacity white over black lands mid-grey.
        assert!(px.red() > 100 && px.red() < 160);
    }

    #[test]
    fn flip_vertical_mirrors_rows() {
        let mut layer = Layer::new(3, 3).unwrap();
        set_pixel(&mut layer, 0, 0);
        layer.flip_vertical();
        assert_eq!(layer.pixmap().pixel(0, 0).unwrap().alpha(), 0);
        assert_eq!(layer.pixmap().pixel(0, 2).unwrap().alpha(), 255);
    }

    #[test]
    fn png_encoding_emits_signature() {
        let layer = Layer::filled(4, 4, Color::from_rgba8(0, 0, 0, 255)).unwrap();
        let bytes = layer.encode_png().unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn jpeg_encoding_requires_opaque_background() {
        let layer = Layer::new(4, 4).unwrap();
        let err = layer
            .encode_jpeg(90, Color::from_rgba8(0, 0, 0, 0))
            .unwrap_err();
        assert!(matches!(err, Error::JpegOpaqueBackgroundRequired));

        let bytes = layer
            .encode_jpeg(90, Color::from_rgba8(255, 255, 255, 255))
            .unwrap();
        assert!(bytes.starts_with(&[0xff, 0xd8]));
    }
}
