use indexmap::IndexMap;
use mmdiag_core::{Diagram, HexValue, MemoryMap, MemoryRegion};
use mmdiag_render::color::parse_color;
use mmdiag_render::{RenderOptions, render_diagram};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Invalid(String),
    Io(std::io::Error),
    Model(mmdiag_core::Error),
    Render(mmdiag_render::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Invalid(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Model(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<mmdiag_core::Error> for CliError {
    fn from(value: mmdiag_core::Error) -> Self {
        Self::Model(value)
    }
}

impl From<mmdiag_render::Error> for CliError {
    fn from(value: mmdiag_render::Error) -> Self {
        Self::Render(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum RasterFormat {
    #[default]
    Png,
    Jpeg,
}

impl RasterFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

impl FromStr for RasterFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(()),
        }
    }
}

#[derive(Debug)]
struct Args {
    out: PathBuf,
    limit: HexValue,
    scale: u64,
    void_threshold: HexValue,
    name: Option<String>,
    width: u32,
    file: Option<PathBuf>,
    format: RasterFormat,
    font_size: f64,
    /// Raw (name, origin, size) triplets from the command line.
    regions: Vec<(String, String, String)>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            out: PathBuf::from("out/report.md"),
            limit: HexValue(0x3e8),
            scale: 1,
            void_threshold: HexValue(0x3e8),
            name: None,
            width: 400,
            file: None,
            format: RasterFormat::Png,
            font_size: 12.0,
            regions: Vec::new(),
        }
    }
}

const DEFAULT_MAP_NAME: &str = "Memory Map";

fn usage() -> &'static str {
    "mmdiag\n\
\n\
USAGE:\n\
  mmdiag [OPTIONS] (<name> <origin> <size>)...\n\
  mmdiag [OPTIONS] --file <path.json>\n\
\n\
OPTIONS:\n\
  -o, --out <path.md>          report path (default: out/report.md)\n\
  -l, --limit <0xHEX>          memory map height in bytes (default: 0x3e8)\n\
  -s, --scale <N>              draw scale, bytes per pixel (default: 1)\n\
  -v, --voidthreshold <0xHEX>  gap length collapsed in the cropped output (default: 0x3e8)\n\
  -n, --name <NAME>            memory map name (default: Memory Map)\n\
  -w, --width <N>              region block width in px (default: 400)\n\
  -f, --file <path.json>       structured description file instead of triplets\n\
      --format png|jpg         diagram raster format (default: png)\n\
      --font-size <N>          label font size in px (default: 12)\n\
\n\
NOTES:\n\
  - <origin> and <size> must be 0x-prefixed hex strings.\n\
  - Alongside the report, mmdiag writes <stem>_full, <stem>_cropped and\n\
    <stem>_table images next to the report path.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();
    let mut positionals: Vec<String> = Vec::new();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "-o" | "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = PathBuf::from(out);
            }
            "-l" | "--limit" => {
                let Some(limit) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.limit = HexValue::parse("limit", limit)?;
            }
            "-s" | "--scale" => {
                let Some(scale) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.scale = scale.parse::<u64>().map_err(|_| CliError::Usage(usage()))?;
                if args.scale == 0 {
                    return Err(CliError::Invalid("scale must be at least 1".to_string()));
                }
            }
            "-v" | "--voidthreshold" => {
                let Some(threshold) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.void_threshold = HexValue::parse("voidthreshold", threshold)?;
            }
            "-n" | "--name" => {
                let Some(name) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.name = Some(name.clone());
            }
            "-w" | "--width" => {
                let Some(width) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.width = width.parse::<u32>().map_err(|_| CliError::Usage(usage()))?;
            }
            "-f" | "--file" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.file = Some(PathBuf::from(path));
            }
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.format = fmt
                    .parse::<RasterFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--font-size" => {
                let Some(size) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.font_size = size.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !(args.font_size.is_finite() && args.font_size > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            value => positionals.push(value.to_string()),
        }
    }

    if args.out.extension().and_then(|e| e.to_str()) != Some("md") {
        return Err(CliError::Invalid(format!(
            "report path must end in .md, got '{}'",
            args.out.display()
        )));
    }

    if positionals.len() % 3 != 0 {
        return Err(CliError::Invalid(format!(
            "expected <name> <origin> <size> triplets, got {} trailing value(s)",
            positionals.len() % 3
        )));
    }
    for triplet in positionals.chunks_exact(3) {
        args.regions
            .push((triplet[0].clone(), triplet[1].clone(), triplet[2].clone()));
    }

    match (&args.file, args.regions.is_empty()) {
        (Some(_), false) => Err(CliError::Invalid(
            "--file and region triplets are mutually exclusive".to_string(),
        )),
        (None, true) => Err(CliError::Usage(usage())),
        _ => Ok(args),
    }
}

/// Builds a single-map diagram from the command-line triplets. Duplicate
/// region names keep the first occurrence; later ones are skipped with a
/// warning on stderr.
fn diagram_from_triplets(args: &Args) -> Result<Diagram, CliError> {
    let mut memory_regions: IndexMap<String, MemoryRegion> = IndexMap::new();
    for (name, origin, size) in &args.regions {
        if memory_regions.contains_key(name) {
            eprintln!("warning: duplicate region '{name}' skipped");
            continue;
        }
        let origin = HexValue::parse("origin", origin)?;
        let size = HexValue::parse("size", size)?;
        memory_regions.insert(name.clone(), MemoryRegion::new(origin, size));
    }

    let map_name = args.name.clone().unwrap_or_else(|| DEFAULT_MAP_NAME.to_string());
    let mut memory_maps = IndexMap::new();
    memory_maps.insert(
        map_name.clone(),
        MemoryMap {
            map_height: args.limit.0,
            map_width: u64::from(args.width),
            memory_regions,
        },
    );

    let diagram = Diagram {
        diagram_name: map_name,
        diagram_height: args.limit.0,
        diagram_width: u64::from(args.width),
        memory_maps,
    };
    diagram.validate()?;
    Ok(diagram)
}

fn load_diagram(args: &Args) -> Result<Diagram, CliError> {
    match &args.file {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let mut diagram = Diagram::from_json(&text)?;
            if let Some(name) = &args.name {
                diagram.diagram_name = name.clone();
            }
            Ok(diagram)
        }
        None => diagram_from_triplets(args),
    }
}

fn artifact_path(report: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = report
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    report.with_file_name(format!("{stem}_{suffix}.{ext}"))
}

fn encode(
    layer: &mmdiag_render::Layer,
    format: RasterFormat,
) -> Result<Vec<u8>, CliError> {
    match format {
        RasterFormat::Png => Ok(layer.encode_png()?),
        RasterFormat::Jpeg => Ok(layer.encode_jpeg(90, parse_color("white")?)?),
    }
}

fn run(argv: &[String]) -> Result<(), CliError> {
    let args = parse_args(argv)?;
    let diagram = load_diagram(&args)?;

    let options = RenderOptions {
        width: args.width,
        font_size: args.font_size,
        draw_scale: args.scale,
        void_threshold: args.void_threshold.0,
        ..RenderOptions::default()
    };
    let artifacts = render_diagram(&diagram, &options)?;

    if let Some(dir) = args.out.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    std::fs::write(&args.out, &artifacts.report)?;
    let ext = args.format.extension();
    for (suffix, layer) in [
        ("full", &artifacts.full),
        ("cropped", &artifacts.cropped),
        ("table", &artifacts.table),
    ] {
        let path = artifact_path(&args.out, suffix, ext);
        std::fs::write(&path, encode(layer, args.format)?)?;
        println!("wrote {}", path.display());
    }
    println!("wrote {}", args.out.display());
    Ok(())
}

fn main() {
    let argv: Vec<String> = std::env::args().collect();
    if let Err(err) = run(&argv) {
        match err {
            CliError::Usage(msg) => {
                eprintln!("{msg}");
                std::process::exit(2);
            }
            err => {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
    }
}
