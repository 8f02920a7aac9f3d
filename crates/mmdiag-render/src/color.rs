//! Color parsing and the seeded region fill palette.

use crate::{Error, Result};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use tiny_skia::Color;

/// Parses a small CSS-ish color grammar: a few named colors plus
/// `#rgb[a]` / `#rrggbb[aa]` hex notation.
pub fn parse_color(text: &str) -> Result<Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Ok(Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Ok(Color::from_rgba8(255, 255, 255, 255)),
        "black" => return Ok(Color::from_rgba8(0, 0, 0, 255)),
        "red" => return Ok(Color::from_rgba8(255, 0, 0, 255)),
        "green" => return Ok(Color::from_rgba8(0, 128, 0, 255)),
        "grey" | "gray" => return Ok(Color::from_rgba8(128, 128, 128, 255)),
        "lightgrey" | "lightgray" => return Ok(Color::from_rgba8(211, 211, 211, 255)),
        _ => {}
    }

    fn hex2(b: &[u8]) -> Option<u8> {
        let hi = (*b.first()? as char).to_digit(16)? as u8;
        let lo = (*b.get(1)? as char).to_digit(16)? as u8;
        Some((hi << 4) | lo)
    }
    fn hex1(c: u8) -> Option<u8> {
        let v = (c as char).to_digit(16)? as u8;
        Some((v << 4) | v)
    }

    let invalid = || Error::InvalidColor {
        value: text.to_string(),
    };
    let hex = s.strip_prefix('#').ok_or_else(invalid)?;
    let bytes = hex.as_bytes();
    let color = match bytes.len() {
        3 => Color::from_rgba8(
            hex1(bytes[0]).ok_or_else(invalid)?,
            hex1(bytes[1]).ok_or_else(invalid)?,
            hex1(bytes[2]).ok_or_else(invalid)?,
            255,
        ),
        4 => Color::from_rgba8(
            hex1(bytes[0]).ok_or_else(invalid)?,
            hex1(bytes[1]).ok_or_else(invalid)?,
            hex1(bytes[2]).ok_or_else(invalid)?,
            hex1(bytes[3]).ok_or_else(invalid)?,
        ),
        6 => Color::from_rgba8(
            hex2(&bytes[0..2]).ok_or_else(invalid)?,
            hex2(&bytes[2..4]).ok_or_else(invalid)?,
            hex2(&bytes[4..6]).ok_or_else(invalid)?,
            255,
        ),
        8 => Color::from_rgba8(
            hex2(&bytes[0..2]).ok_or_else(invalid)?,
            hex2(&bytes[2..4]).ok_or_else(invalid)?,
            hex2(&bytes[4..6]).ok_or_else(invalid)?,
            hex2(&bytes[6..8]).ok_or_else(invalid)?,
        ),
        _ => return Err(invalid()),
    };
    Ok(color)
}

/// Highest value any fill color band may take. Fills stay dark so the white
/// region labels composited on top remain legible.
const MAX_FILL_BAND: u64 = 0x44;

/// Deterministic muted fill color for a region, derived from the seed and the
/// region identifier. Same inputs always give the same color.
pub fn region_fill(seed: u64, name: &str) -> Color {
    let mut hasher = FxHasher::default();
    seed.hash(&mut hasher);
    name.hash(&mut hasher);
    let h = hasher.finish();

    let band = |shift: u32| ((h >> shift) & 0xff) % (MAX_FILL_BAND + 1);
    Color::from_rgba8(band(0) as u8, band(16) as u8, band(32) as u8, 255)
}

/// `#rrggbb` form of an opaque color, for the markdown report.
pub fn color_hex(color: Color) -> String {
    let c = color.to_color_u8();
    format!("#{:02x}{:02x}{:02x}", c.red(), c.green(), c.blue())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_hex_colors() {
        assert_eq!(parse_color("white").unwrap().to_color_u8().red(), 255);
        assert_eq!(parse_color("#ff0000").unwrap().to_color_u8().red(), 255);
        assert_eq!(parse_color("#0f0").unwrap().to_color_u8().green(), 255);
        assert_eq!(parse_color("#00000080").unwrap().to_color_u8().alpha(), 128);
        assert!(parse_color("not-a-color").is_err());
        assert!(parse_color("#12345").is_err());
    }

    #[test]
    fn region_fill_is_seed_stable_and_muted() {
        let a = region_fill(7, "kernel");
        let b = region_fill(7, "kernel");
        assert_eq!(a.to_color_u8(), b.to_color_u8());

        let c = a.to_color_u8();
        assert!(u64::from(c.red()) <= MAX_FILL_BAND);
        assert!(u64::from(c.green()) <= MAX_FILL_BAND);
        assert!(u64::from(c.blue()) <= MAX_FILL_BAND);
        assert_eq!(c.alpha(), 255);
    }

    #[test]
    fn region_fill_varies_with_seed_and_name() {
        let base = region_fill(0, "kernel").to_color_u8();
        assert_ne!(base, region_fill(1, "kernel").to_color_u8());
        assert_ne!(base, region_fill(0, "rootfs").to_color_u8());
    }

    #[test]
    fn color_hex_formats_bands() {
        assert_eq!(color_hex(Color::from_rgba8(0x12, 0x00, 0xff, 255)), "#1200ff");
    }
}
