// ============================================================================
// PixelPattern CLI: headless conversion of projects and images
// ============================================================================
//
// Usage examples:
//   PixelPattern -i sprite.json -o sprite.png --scale 16
//   PixelPattern -i photo.jpg --limit 64 -o photo.json      (rasterize an image)
//   PixelPattern -i "art/*.json" --output-dir out/ -f png
//   PixelPattern -i sprite.json -f pxb                       (binary project)
//
// Every file is processed on the current thread; PNG rendering still fans
// rows out over rayon.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::{MAX_SIZE, PixelGrid};
use crate::io::{self, DEFAULT_EXPORT_SCALE, ProjectError};
use crate::ops::import::import_image;
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelPattern headless converter.
#[derive(Parser, Debug)]
#[command(
    name = "PixelPattern",
    about = "Convert pixel-art projects and rasterize images without the editor",
    long_about = "Export JSON / PXB pixel-art projects to scaled PNG, convert between\n\
                  project formats, or rasterize ordinary images (PNG, JPEG, WEBP, BMP,\n\
                  GIF, TGA, ICO) into a project grid.\n\n\
                  Example:\n  \
                  PixelPattern -i sprite.json -o sprite.png --scale 16\n  \
                  PixelPattern -i \"shots/*.png\" --limit 64 --output-dir grids/ -f json"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.json", "refs/*.png").
    /// `.json` and `.pxb` are read as projects; anything else as an image.
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing. Files keep their stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, json, pxb.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Pixels per cell in PNG output (1-50).
    #[arg(long, default_value_t = DEFAULT_EXPORT_SCALE, value_name = "1-50")]
    pub scale: u32,

    /// Longest grid edge when rasterizing an image input (1-256).
    #[arg(long, default_value_t = MAX_SIZE, value_name = "1-256")]
    pub limit: u32,

    /// Mirror the session log to stderr and print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

/// What a CLI run writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Json,
    Binary,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Json => "json",
            OutputFormat::Binary => "pxb",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "json" => Some(OutputFormat::Json),
            "pxb" => Some(OutputFormat::Binary),
            _ => None,
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("error: {}", msg);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, format, args.scale, args.limit) {
            Ok(grid) => {
                log_info!(
                    "{} -> {} ({}x{})",
                    input_path.display(),
                    output_path.display(),
                    grid.width(),
                    grid.height()
                );
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}: {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing
// ============================================================================

/// Load one input as a grid and write it out. Returns the grid written.
pub fn run_one(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    scale: u32,
    limit: u32,
) -> Result<PixelGrid, ProjectError> {
    let grid = load_input(input, limit)?;
    match format {
        OutputFormat::Png => io::export_png(&grid, scale, output)?,
        OutputFormat::Json => io::save_json(&grid, output)?,
        OutputFormat::Binary => io::save_binary(&grid, output)?,
    }
    Ok(grid)
}

fn load_input(input: &Path, limit: u32) -> Result<PixelGrid, ProjectError> {
    if is_project_path(input) {
        return io::load_project(input);
    }
    let image = io::open_image(input)?;
    Ok(import_image(&image, limit)?)
}

fn is_project_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json") || e.eq_ignore_ascii_case("pxb"))
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// `--format` wins; otherwise infer from the output extension, then PNG.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<OutputFormat, String> {
    if let Some(f) = format_arg {
        return OutputFormat::from_name(f).ok_or_else(|| format!("unknown format '{}' (expected png, json or pxb)", f));
    }
    Ok(output
        .and_then(|o| o.extension())
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_name)
        .unwrap_or(OutputFormat::Png))
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output`
/// 2. `--output-dir` joined with the input stem
/// 3. Next to the input, with `_out` appended if it would overwrite it
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_flag_or_extension() {
        assert_eq!(parse_format(Some("PXB"), None), Ok(OutputFormat::Binary));
        assert!(parse_format(Some("tiff"), None).is_err());
        assert_eq!(parse_format(None, Some(Path::new("a/b.json"))), Ok(OutputFormat::Json));
        assert_eq!(parse_format(None, Some(Path::new("a/b.webp"))), Ok(OutputFormat::Png));
        assert_eq!(parse_format(None, None), Ok(OutputFormat::Png));
    }

    #[test]
    fn output_path_never_overwrites_input() {
        let p = build_output_path(Path::new("art/cat.json"), None, None, OutputFormat::Json);
        assert_eq!(p, Some(PathBuf::from("art/cat_out.json")));
        let p = build_output_path(Path::new("art/cat.json"), None, Some(Path::new("out")), OutputFormat::Png);
        assert_eq!(p, Some(PathBuf::from("out/cat.png")));
    }

    #[test]
    fn parses_arguments() {
        let args = CliArgs::try_parse_from(["PixelPattern", "-i", "a.json", "b.json", "--scale", "4", "-v"]).unwrap();
        assert_eq!(args.input, vec!["a.json", "b.json"]);
        assert_eq!(args.scale, 4);
        assert_eq!(args.limit, MAX_SIZE);
        assert!(args.verbose);
        assert!(CliArgs::try_parse_from(["PixelPattern"]).is_err());
    }

    #[test]
    fn converts_image_to_project_and_png() {
        let dir = std::env::temp_dir().join(format!("pixelpattern_cli_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let src = dir.join("src.png");
        image::RgbaImage::from_pixel(8, 4, image::Rgba([0, 128, 255, 255])).save(&src).unwrap();

        let json = dir.join("src.json");
        let grid = run_one(&src, &json, OutputFormat::Json, 10, 4).unwrap();
        assert_eq!((grid.width(), grid.height()), (4, 2));

        let png = dir.join("out.png");
        run_one(&json, &png, OutputFormat::Png, 3, MAX_SIZE).unwrap();
        let img = image::open(&png).unwrap();
        assert_eq!((img.width(), img.height()), (12, 6));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
