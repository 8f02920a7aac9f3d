//! Tabular report rendering.
//!
//! Draws a 2D grid of strings (optional header row) into a raster image:
//! every cell is rasterized first, column widths and row heights are taken
//! from the actual glyph bounding boxes, and the grid is drawn around them.

use crate::color::parse_color;
use crate::geom::point;
use crate::layer::Layer;
use crate::text::TextRaster;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone)]
pub struct TableColors {
    pub bg: String,
    pub cell_bg: String,
    pub header_bg: String,
    pub font: String,
    pub rowline: String,
    pub colline: String,
    /// Font color for cells carrying a `+` marker prefix.
    pub plus: String,
    /// Font color for cells carrying a `-` marker prefix.
    pub minus: String,
}

impl Default for TableColors {
    fn default() -> Self {
        Self {
            bg: "white".to_string(),
            cell_bg: "white".to_string(),
            header_bg: "lightgrey".to_string(),
            font: "black".to_string(),
            rowline: "black".to_string(),
            colline: "black".to_string(),
            plus: "green".to_string(),
            minus: "red".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableStyle {
    /// Cell padding: (left/right, top/bottom) in px.
    pub cell_pad: (u32, u32),
    /// Table margin: (top, right, bottom, left) in px.
    pub margin: (u32, u32, u32, u32),
    pub colors: TableColors,
    pub font_size: f64,
    /// Enables `+`/`-` prefix color coding.
    pub stock: bool,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            cell_pad: (20, 10),
            margin: (10, 10, 10, 10),
            colors: TableColors::default(),
            font_size: 12.0,
            stock: false,
        }
    }
}

/// Resolves a cell's marker prefix: returns the text to draw and whether the
/// `plus`/`minus` color applies. A leading `-` is kept when followed by a
/// digit (a negative number, not a marker).
pub(crate) fn stock_cell(text: &str) -> (String, Option<bool>) {
    if let Some(rest) = text.strip_prefix('+') {
        return (rest.to_string(), Some(true));
    }
    if let Some(rest) = text.strip_prefix('-') {
        let negative_number = rest.chars().next().is_some_and(|c| c.is_ascii_digit());
        if negative_number {
            return (text.to_string(), Some(false));
        }
        // Marker prefixes can repeat on each line of a multi-line cell.
        let stripped = text
            .lines()
            .map(|l| l.strip_prefix('-').unwrap_or(l))
            .collect::<Vec<_>>()
            .join("\n");
        return (stripped, Some(false));
    }
    (text.to_string(), None)
}

/// Renders `rows` (plus an optional `header`) as a grid image.
///
/// Header cells are always center-aligned; body columns follow `align`
/// (default left).
pub fn render_table(
    rows: &[Vec<String>],
    header: &[String],
    align: &[Align],
    style: &TableStyle,
    text: &TextRaster,
) -> Result<Layer> {
    let has_header = !header.is_empty();
    let mut table: Vec<&[String]> = Vec::new();
    if has_header {
        table.push(header);
    }
    for row in rows {
        table.push(row);
    }

    // Rasterize every cell up front; sizes come from real glyph boxes.
    let mut cells: Vec<Vec<Layer>> = Vec::with_capacity(table.len());
    let columns = table.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut col_widths = vec![0u32; columns];
    let mut row_heights = vec![0u32; table.len()];

    for (i, row) in table.iter().enumerate() {
        let mut rendered = Vec::with_capacity(row.len());
        for (j, cell) in row.iter().enumerate() {
            let (content, marker) = if style.stock && !(has_header && i == 0) {
                stock_cell(cell)
            } else {
                (cell.clone(), None)
            };
            let color = match marker {
                Some(true) => &style.colors.plus,
                Some(false) => &style.colors.minus,
                None => &style.colors.font,
            };
            let layer = text.render(&content, style.font_size, color)?;
            col_widths[j] = col_widths[j].max(layer.width());
            row_heights[i] = row_heights[i].max(layer.height());
            rendered.push(layer);
        }
        cells.push(rendered);
    }

    let (pad_x, pad_y) = style.cell_pad;
    let (m_top, m_right, m_bottom, m_left) = style.margin;
    let grid_w: u32 = col_widths.iter().sum::<u32>() + columns as u32 * 2 * pad_x;
    let grid_h: u32 = row_heights.iter().sum::<u32>() + table.len() as u32 * 2 * pad_y;

    let mut layer = Layer::filled(
        (grid_w + m_left + m_right).max(1),
        (grid_h + m_top + m_bottom).max(1),
        parse_color(&style.colors.bg)?,
    )?;
    layer.fill_region(
        m_left as f32,
        m_top as f32,
        grid_w as f32,
        grid_h as f32,
        parse_color(&style.colors.cell_bg)?,
    );
    if has_header {
        layer.fill_region(
            m_left as f32,
            m_top as f32,
            grid_w as f32,
            (row_heights[0] + 2 * pad_y) as f32,
            parse_color(&style.colors.header_bg)?,
        );
    }

    // Grid lines, including the closing edge after the last row/column.
    let rowline = parse_color(&style.colors.rowline)?;
    let mut y = m_top;
    for rh in &row_heights {
        layer.fill_region(m_left as f32, y as f32, grid_w as f32, 1.0, rowline);
        y += rh + 2 * pad_y;
    }
    layer.fill_region(m_left as f32, y as f32, grid_w as f32, 1.0, rowline);

    let colline = parse_color(&style.colors.colline)?;
    let mut x = m_left;
    for cw in &col_widths {
        layer.fill_region(x as f32, m_top as f32, 1.0, grid_h as f32, colline);
        x += cw + 2 * pad_x;
    }
    layer.fill_region(x as f32, m_top as f32, 1.0, grid_h as f32, colline);

    // Cell contents.
    let mut top = m_top + pad_y;
    for (i, row) in cells.iter_mut().enumerate() {
        let mut left = m_left + pad_x;
        for (j, cell) in row.iter_mut().enumerate() {
            let alignment = if has_header && i == 0 {
                Align::Center
            } else {
                align.get(j).copied().unwrap_or(Align::Left)
            };
            let slack = col_widths[j].saturating_sub(cell.width());
            let x = match alignment {
                Align::Left => left,
                Align::Center => left + slack / 2,
                Align::Right => left + slack,
            };
            layer.overlay(cell, point(f64::from(x), f64::from(top)), 255);
            left += col_widths[j] + 2 * pad_x;
        }
        top += row_heights[i] + 2 * pad_y;
    }

    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_prefix_rules() {
        assert_eq!(stock_cell("+None"), ("None".to_string(), Some(true)));
        assert_eq!(
            stock_cell("-rootfs @ 0x50"),
            ("rootfs @ 0x50".to_string(), Some(false))
        );
        // Negative number: the minus sign is data, not a marker.
        assert_eq!(stock_cell("-0x20"), ("-0x20".to_string(), Some(false)));
        assert_eq!(stock_cell("plain"), ("plain".to_string(), None));
    }

    #[test]
    fn multi_line_markers_are_stripped_per_line() {
        assert_eq!(
            stock_cell("-a @ 0x10\n-b @ 0x20"),
            ("a @ 0x10\nb @ 0x20".to_string(), Some(false))
        );
    }

    #[test]
    fn table_renders_deterministically() {
        let text = TextRaster::new();
        let rows = vec![
            vec!["kernel".to_string(), "0x10".to_string()],
            vec!["rootfs".to_string(), "0x50".to_string()],
        ];
        let header = vec!["Name".to_string(), "Origin".to_string()];
        let style = TableStyle::default();
        let a = render_table(&rows, &header, &[], &style, &text).unwrap();
        let b = render_table(&rows, &header, &[], &style, &text).unwrap();
        assert_eq!((a.width(), a.height()), (b.width(), b.height()));
        assert!(a.width() > 0 && a.height() > 0);
    }

    #[test]
    fn margins_and_padding_bound_the_grid() {
        let text = TextRaster::new();
        let rows = vec![vec!["x".to_string()]];
        let style = TableStyle::default();
        let layer = render_table(&rows, &[], &[], &style, &text).unwrap();
        // At minimum: margins plus one padded cell.
        assert!(layer.width() >= 10 + 10 + 2 * 20);
        assert!(layer.height() >= 10 + 10 + 2 * 10);
    }
}
