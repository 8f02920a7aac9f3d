//! Diagram composition.
//!
//! Builds the whole page in address-space coordinates (y grows with the
//! address) and flips it vertically once at the very end, so address 0 ends
//! up at the bottom of the output. Labels and arrows are pre-flipped by their
//! own renderers, which is what makes the single global flip sufficient.

use crate::arrow::{Arrow, ArrowStyle};
use crate::block::{VOID_BLOCK_PX, map_title_block, region_block, void_block};
use crate::color::{color_hex, parse_color};
use crate::geom::{Bbox, Point, point};
use crate::layer::Layer;
use crate::table::{Align, TableStyle, render_table, stock_cell};
use crate::text::TextRaster;
use crate::{Error, RenderOptions, Result};
use indexmap::IndexMap;
use mmdiag_core::{Diagram, MapAnnotations, layout_diagram};

/// Horizontal spacing between side-by-side map columns, in px.
const MAP_GUTTER: u32 = 40;

/// Everything one invocation produces.
pub struct DiagramArtifacts {
    /// Full-height diagram, one column per map.
    pub full: Layer,
    /// Same diagram with over-threshold void gaps collapsed to placeholders.
    pub cropped: Layer,
    /// The report rendered as a grid image.
    pub table: Layer,
    /// The report as a markdown table.
    pub report: String,
    /// Layout annotations, map name → region name → stats.
    pub annotations: IndexMap<String, MapAnnotations>,
}

/// Runs layout over `diagram` and renders the full artifact set.
pub fn render_diagram(diagram: &Diagram, options: &RenderOptions) -> Result<DiagramArtifacts> {
    let annotations = layout_diagram(diagram);
    let text = TextRaster::new();
    let scale = options.draw_scale.max(1);

    // Column positions: each map declares its own block width; a map that
    // leaves it unset inherits the configured default.
    let mut columns: Vec<(u32, u32)> = Vec::new();
    let mut next_x = 0u32;
    for map in diagram.memory_maps.values() {
        let w = if map.map_width > 0 {
            map.map_width as u32
        } else {
            options.width
        };
        columns.push((next_x, w));
        next_x += w + MAP_GUTTER;
    }

    // Column heights: the map body plus its title banner. The declared
    // diagram dimensions set the page minimum.
    let mut title_heights: Vec<u32> = Vec::with_capacity(columns.len());
    let mut page_h = ((diagram.diagram_height / scale) as u32).max(1);
    for ((map_name, map), &(_, w)) in diagram.memory_maps.iter().zip(&columns) {
        let map_px = (map.map_height / scale).max(1) as u32;
        let title_h = map_title_block(map_name, w, options.font_size, &text)?.height();
        title_heights.push(title_h);
        page_h = page_h.max(map_px + title_h);
    }
    let page_w = next_x
        .saturating_sub(MAP_GUTTER)
        .max(diagram.diagram_width as u32)
        .max(1);

    let mut page = Layer::new(page_w, page_h)?;

    // Region midpoints on the page, in pre-flip coordinates, for the arrows.
    let mut mids: IndexMap<(String, String), Point> = IndexMap::new();

    for (column, (map_name, map)) in diagram.memory_maps.iter().enumerate() {
        let (x, map_w) = columns[column];
        let map_px = (map.map_height / scale).max(1) as u32;
        let title_h = title_heights[column];
        let mut canvas = Layer::new(map_w, map_px + title_h)?;
        let map_options = RenderOptions {
            width: map_w,
            ..options.clone()
        };

        // Drawing order is origin order, not declaration order.
        let mut regions: Vec<_> = map.memory_regions.iter().collect();
        regions.sort_by_key(|(_, r)| r.origin);

        let stats = &annotations[map_name];
        for (region_name, region) in regions {
            let mut block =
                region_block(region_name, region, &stats[region_name], &map_options, &text)?;
            let y = (region.origin.0 / scale) as f64;
            canvas.overlay(&mut block.layer, point(0.0, y), 255);
            mids.insert(
                (map_name.clone(), region_name.clone()),
                block.layer.abs_mid,
            );
        }

        // Title banner sits above the map body in address space, which lands
        // it at the top once the page is flipped.
        let mut title = map_title_block(map_name, map_w, options.font_size, &text)?;
        canvas.overlay(&mut title, point(0.0, f64::from(map_px)), 255);

        page.overlay(&mut canvas, point(f64::from(x), 0.0), 255);

        // Shift the recorded mids from map-canvas to page coordinates.
        for ((m, _), mid) in mids.iter_mut() {
            if m == map_name {
                mid.x += f64::from(x);
            }
        }
        // The map canvas is dropped here; only the page copy survives.
    }

    for (map_name, map) in &diagram.memory_maps {
        for (region_name, region) in &map.memory_regions {
            let src = mids[&(map_name.clone(), region_name.clone())];
            for (target_map, target_region) in &region.links {
                let dst = mids[&(target_map.clone(), target_region.clone())];
                match Arrow::new(src, dst, &ArrowStyle::default()) {
                    Ok(mut arrow) => page.overlay(&mut arrow.layer, arrow.pos, 255),
                    Err(Error::DegenerateArrow) => {
                        tracing::warn!(
                            from = %region_name,
                            to = %target_region,
                            "link endpoints coincide, skipping arrow"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }

    let cropped = crop_voids(&page, &columns, options, &text)?;

    let mut full = page;
    full.flip_vertical();
    let mut cropped = cropped;
    cropped.flip_vertical();

    let (table, report) = build_report(diagram, &annotations, options, &text)?;

    Ok(DiagramArtifacts {
        full,
        cropped,
        table,
        report,
        annotations,
    })
}

/// Collapses empty horizontal bands longer than the void threshold into
/// fixed-height "SKIPPED" placeholders. Works on the pre-flip page.
fn crop_voids(
    page: &Layer,
    columns: &[(u32, u32)],
    options: &RenderOptions,
    text: &TextRaster,
) -> Result<Layer> {
    let scale = options.draw_scale.max(1);
    let threshold_px = (options.void_threshold / scale).max(1) as usize;
    let (w, h) = (page.width() as usize, page.height() as usize);

    let data = page.pixmap().data();
    let row_empty: Vec<bool> = (0..h)
        .map(|y| data[y * w * 4..(y + 1) * w * 4].iter().all(|&b| b == 0))
        .collect();

    // Maximal runs of rows, tagged void when empty and over the threshold.
    let mut bands: Vec<(usize, usize, bool)> = Vec::new();
    let mut start = 0usize;
    while start < h {
        let empty = row_empty[start];
        let mut end = start;
        while end < h && row_empty[end] == empty {
            end += 1;
        }
        bands.push((start, end, empty && end - start > threshold_px));
        start = end;
    }

    let out_h: usize = bands
        .iter()
        .map(|&(s, e, void)| if void { VOID_BLOCK_PX as usize } else { e - s })
        .sum();
    let mut out = Layer::new(page.width(), out_h.max(1) as u32)?;

    let mut y = 0u32;
    for &(s, e, void) in &bands {
        if void {
            for &(x, w) in columns {
                let mut block = void_block(w, options.font_size, text)?;
                out.overlay(&mut block, point(f64::from(x), f64::from(y)), 255);
            }
            y += VOID_BLOCK_PX;
        } else {
            let mut band = page.clone();
            band.crop(Bbox::new(0, s as u32, page.width(), e as u32))?;
            out.overlay(&mut band, point(0.0, f64::from(y)), 255);
            y += (e - s) as u32;
        }
    }
    Ok(out)
}

const REPORT_HEADER: [&str; 7] = [
    "Name",
    "Origin",
    "Size",
    "Free Space",
    "Collisions",
    "Links",
    "Draw Scale",
];

const REPORT_ALIGN: [Align; 7] = [
    Align::Left,
    Align::Right,
    Align::Right,
    Align::Right,
    Align::Left,
    Align::Left,
    Align::Center,
];

fn hex_dec(value: u64) -> String {
    format!("0x{value:x} ({value})")
}

fn remain_cell(remain: i64) -> String {
    if remain < 0 {
        let m = remain.unsigned_abs();
        format!("-0x{m:x} (-{m})")
    } else {
        hex_dec(remain as u64)
    }
}

/// One row per region across every map, in declaration order.
fn report_rows(
    diagram: &Diagram,
    annotations: &IndexMap<String, MapAnnotations>,
    options: &RenderOptions,
) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for (map_name, map) in &diagram.memory_maps {
        let stats = &annotations[map_name];
        for (region_name, region) in &map.memory_regions {
            let s = &stats[region_name];
            let collisions = if s.collisions.is_empty() {
                "+None".to_string()
            } else {
                s.collisions
                    .iter()
                    .map(|(name, boundary)| format!("-{name} @ 0x{boundary:x}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            let links = if region.links.is_empty() {
                "None".to_string()
            } else {
                region
                    .links
                    .iter()
                    .map(|(m, r)| format!("{m}.{r}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            rows.push(vec![
                format!("{region_name} ({map_name})"),
                hex_dec(region.origin.0),
                hex_dec(region.size.0),
                remain_cell(s.remain),
                collisions,
                links,
                format!("{}:1", options.draw_scale.max(1)),
            ]);
        }
    }
    rows
}

fn build_report(
    diagram: &Diagram,
    annotations: &IndexMap<String, MapAnnotations>,
    options: &RenderOptions,
    text: &TextRaster,
) -> Result<(Layer, String)> {
    let rows = report_rows(diagram, annotations, options);
    let header: Vec<String> = REPORT_HEADER.iter().map(|s| s.to_string()).collect();

    let style = TableStyle {
        font_size: options.font_size,
        stock: true,
        ..TableStyle::default()
    };
    let image = render_table(&rows, &header, &REPORT_ALIGN, &style, text)?;

    let plus_hex = color_hex(parse_color(&style.colors.plus)?);
    let minus_hex = color_hex(parse_color(&style.colors.minus)?);

    let mut report = format!("# {}\n\n", diagram.diagram_name);
    report.push_str(&format!("| {} |\n", REPORT_HEADER.join(" | ")));
    report.push_str(&format!("|{}\n", "---|".repeat(REPORT_HEADER.len())));
    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| {
                let (content, marker) = stock_cell(cell);
                let content = content.replace('\n', "<BR>");
                match marker {
                    Some(true) => {
                        format!("<span style='color:{plus_hex}'>{content}</span>")
                    }
                    Some(false) => {
                        format!("<span style='color:{minus_hex}'>{content}</span>")
                    }
                    None => content,
                }
            })
            .collect();
        report.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    Ok((image, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmdiag_core::{HexValue, MemoryMap, MemoryRegion};

    fn diagram(height: u64, regions: &[(&str, u64, u64)]) -> Diagram {
        let mut memory_regions = IndexMap::new();
        for (name, origin, size) in regions {
            memory_regions.insert(
                name.to_string(),
                MemoryRegion::new(HexValue(*origin), HexValue(*size)),
            );
        }
        let mut memory_maps = IndexMap::new();
        memory_maps.insert(
            "flash".to_string(),
            MemoryMap {
                map_height: height,
                map_width: 400,
                memory_regions,
            },
        );
        Diagram {
            diagram_name: "Memory Map".to_string(),
            diagram_height: height,
            diagram_width: 400,
            memory_maps,
        }
    }

    fn linked_diagram() -> Diagram {
        let mut d = diagram(0x3e8, &[("kernel", 0x10, 0x60)]);
        let mut dram_regions = IndexMap::new();
        let mut blob = MemoryRegion::new(HexValue(0x100), HexValue(0x60));
        blob.links.push(("flash".to_string(), "kernel".to_string()));
        dram_regions.insert("blob".to_string(), blob);
        d.memory_maps.insert(
            "dram".to_string(),
            MemoryMap {
                map_height: 0x3e8,
                map_width: 400,
                memory_regions: dram_regions,
            },
        );
        d
    }

    #[test]
    fn full_page_spans_every_map_column() {
        let d = linked_diagram();
        let artifacts = render_diagram(&d, &RenderOptions::default()).unwrap();
        assert_eq!(artifacts.full.width(), 2 * 400 + MAP_GUTTER);
        assert!(artifacts.full.height() >= 0x3e8);
    }

    #[test]
    fn map_width_sets_the_column_width() {
        let mut d = linked_diagram();
        d.memory_maps["flash"].map_width = 300;
        d.memory_maps["dram"].map_width = 500;
        d.diagram_width = 0;
        let artifacts = render_diagram(&d, &RenderOptions::default()).unwrap();
        assert_eq!(artifacts.full.width(), 300 + MAP_GUTTER + 500);
    }

    #[test]
    fn unset_map_width_falls_back_to_the_configured_default() {
        let mut d = diagram(0x3e8, &[("kernel", 0x10, 0x30)]);
        d.memory_maps["flash"].map_width = 0;
        d.diagram_width = 0;
        let options = RenderOptions {
            width: 320,
            ..RenderOptions::default()
        };
        let artifacts = render_diagram(&d, &options).unwrap();
        assert_eq!(artifacts.full.width(), 320);
    }

    #[test]
    fn declared_diagram_dimensions_set_the_page_minimum() {
        let mut d = diagram(0x100, &[("kernel", 0x10, 0x30)]);
        d.diagram_width = 1200;
        d.diagram_height = 0x300;
        let artifacts = render_diagram(&d, &RenderOptions::default()).unwrap();
        assert_eq!(artifacts.full.width(), 1200);
        assert!(artifacts.full.height() >= 0x300);
    }

    #[test]
    fn cropping_collapses_large_voids_only() {
        let d = diagram(0x3e8, &[("kernel", 0x10, 0x30), ("dtb", 0x300, 0x30)]);
        let options = RenderOptions {
            void_threshold: 0x80,
            ..RenderOptions::default()
        };
        let artifacts = render_diagram(&d, &options).unwrap();
        // Two gaps over the threshold (between the regions and above dtb)
        // collapse to 40 px placeholders each.
        assert!(artifacts.cropped.height() < artifacts.full.height());
        assert!(artifacts.cropped.height() >= 0x30 + 0x30 + 2 * VOID_BLOCK_PX);
    }

    #[test]
    fn cropping_keeps_everything_under_threshold() {
        let d = diagram(0x80, &[("a", 0x0, 0x40), ("b", 0x40, 0x40)]);
        let artifacts = render_diagram(&d, &RenderOptions::default()).unwrap();
        assert_eq!(artifacts.cropped.height(), artifacts.full.height());
    }

    #[test]
    fn rendering_twice_is_deterministic() {
        let d = diagram(0x3e8, &[("kernel", 0x10, 0x60), ("rootfs", 0x50, 0x50)]);
        let options = RenderOptions::default();
        let a = render_diagram(&d, &options).unwrap();
        let b = render_diagram(&d, &options).unwrap();
        assert_eq!(
            (a.full.width(), a.full.height()),
            (b.full.width(), b.full.height())
        );
        assert_eq!(a.annotations, b.annotations);
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn report_carries_collision_and_free_space_rows() {
        let d = diagram(0x3e8, &[("kernel", 0x10, 0x60), ("rootfs", 0x50, 0x50)]);
        let artifacts = render_diagram(&d, &RenderOptions::default()).unwrap();

        assert!(artifacts.report.starts_with("# Memory Map\n"));
        assert!(artifacts.report.contains("| Name | Origin |"));
        assert!(artifacts.report.contains("kernel (flash)"));
        assert!(artifacts.report.contains("0x10 (16)"));
        // Negative free space keeps its minus sign and is colored.
        assert!(artifacts.report.contains("-0x20 (-32)"));
        // Collision cells drop the marker and name the boundary.
        assert!(artifacts.report.contains("rootfs @ 0x50"));
        assert!(!artifacts.report.contains("+None"));
        assert!(artifacts.report.contains("None"));
    }

    #[test]
    fn collision_free_region_reports_none_in_green() {
        let d = diagram(0x3e8, &[("kernel", 0x10, 0x30)]);
        let artifacts = render_diagram(&d, &RenderOptions::default()).unwrap();
        assert!(artifacts.report.contains("<span style='color:#008000'>None</span>"));
    }

    #[test]
    fn remain_cell_formats_both_signs() {
        assert_eq!(remain_cell(0x328), "0x328 (808)");
        assert_eq!(remain_cell(-0x20), "-0x20 (-32)");
        assert_eq!(remain_cell(0), "0x0 (0)");
    }

    #[test]
    fn draw_scale_column_reports_ratio() {
        let d = diagram(0x3e8, &[("kernel", 0x10, 0x30)]);
        let options = RenderOptions {
            draw_scale: 4,
            ..RenderOptions::default()
        };
        let rows = report_rows(&d, &layout_diagram(&d), &options);
        assert_eq!(rows[0][6], "4:1");
    }
}
