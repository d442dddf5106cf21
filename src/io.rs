use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canvas::{Cell, Color, GridError, PixelGrid};

/// Smallest / largest block size for PNG export.
pub const MIN_EXPORT_SCALE: u32 = 1;
pub const MAX_EXPORT_SCALE: u32 = 50;
pub const DEFAULT_EXPORT_SCALE: u32 = 10;

/// Error type for project / image file operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid project file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid binary project: {0}")]
    Binary(#[from] bincode::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error(transparent)]
    Grid(#[from] GridError),
}

// ============================================================================
// JSON PROJECT FORMAT
// ============================================================================

/// On-disk project: `{ "width": w, "height": h, "grid": ["#RRGGBB" | null, ...] }`.
#[derive(Serialize, Deserialize)]
pub struct ProjectFile {
    pub width: u32,
    pub height: u32,
    pub grid: Vec<Cell>,
}

impl ProjectFile {
    pub fn from_grid(grid: &PixelGrid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            grid: grid.cells().to_vec(),
        }
    }

    /// Validate the decoded shape and build a grid from it.
    pub fn into_grid(self) -> Result<PixelGrid, ProjectError> {
        check_shape(self.width, self.height, self.grid.len())?;
        Ok(PixelGrid::from_cells(self.width, self.height, self.grid)?)
    }
}

fn check_shape(width: u32, height: u32, cells: usize) -> Result<(), ProjectError> {
    crate::canvas::validate_dimensions(width, height)?;
    let expected = width as usize * height as usize;
    if cells != expected {
        return Err(ProjectError::InvalidFormat(format!(
            "grid has {} cells, expected {}x{} = {}",
            cells, width, height, expected
        )));
    }
    Ok(())
}

pub fn project_to_json(grid: &PixelGrid) -> Result<String, ProjectError> {
    Ok(serde_json::to_string(&ProjectFile::from_grid(grid))?)
}

/// Parse and validate a JSON project. Missing keys, bad colours, sizes out
/// of range and length mismatches are all errors.
pub fn project_from_json(text: &str) -> Result<PixelGrid, ProjectError> {
    let file: ProjectFile = serde_json::from_str(text)?;
    file.into_grid()
}

pub fn save_json(grid: &PixelGrid, path: &Path) -> Result<(), ProjectError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &ProjectFile::from_grid(grid))?;
    Ok(())
}

pub fn load_json(path: &Path) -> Result<PixelGrid, ProjectError> {
    let reader = BufReader::new(File::open(path)?);
    let file: ProjectFile = serde_json::from_reader(reader)?;
    file.into_grid()
}

// ============================================================================
// BINARY PROJECT FORMAT (.pxb)
// ============================================================================

const PXB_MAGIC: &str = "PXP1";

#[derive(Serialize, Deserialize)]
struct BinaryProjectFile {
    magic: String,
    width: u32,
    height: u32,
    cells: Vec<Option<[u8; 3]>>,
}

pub fn project_to_bytes(grid: &PixelGrid) -> Result<Vec<u8>, ProjectError> {
    let file = BinaryProjectFile {
        magic: PXB_MAGIC.to_string(),
        width: grid.width(),
        height: grid.height(),
        cells: grid.cells().iter().map(|c| c.map(|c| [c.r, c.g, c.b])).collect(),
    };
    Ok(bincode::serialize(&file)?)
}

pub fn project_from_bytes(raw: &[u8]) -> Result<PixelGrid, ProjectError> {
    let file: BinaryProjectFile = bincode::deserialize(raw)?;
    if file.magic != PXB_MAGIC {
        return Err(ProjectError::InvalidFormat(format!("unknown magic '{}'", file.magic)));
    }
    check_shape(file.width, file.height, file.cells.len())?;
    let cells = file
        .cells
        .into_iter()
        .map(|c| c.map(|[r, g, b]| Color::new(r, g, b)))
        .collect();
    Ok(PixelGrid::from_cells(file.width, file.height, cells)?)
}

pub fn save_binary(grid: &PixelGrid, path: &Path) -> Result<(), ProjectError> {
    std::fs::write(path, project_to_bytes(grid)?)?;
    Ok(())
}

pub fn load_binary(path: &Path) -> Result<PixelGrid, ProjectError> {
    project_from_bytes(&std::fs::read(path)?)
}

/// True for file names that should be read as a binary project.
pub fn is_binary_project(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pxb"))
}

/// Load either project format, chosen by extension.
pub fn load_project(path: &Path) -> Result<PixelGrid, ProjectError> {
    if is_binary_project(path) { load_binary(path) } else { load_json(path) }
}

pub fn save_project(grid: &PixelGrid, path: &Path) -> Result<(), ProjectError> {
    if is_binary_project(path) { save_binary(grid, path) } else { save_json(grid, path) }
}

// ============================================================================
// PNG EXPORT
// ============================================================================

pub fn clamp_export_scale(scale: u32) -> u32 {
    scale.clamp(MIN_EXPORT_SCALE, MAX_EXPORT_SCALE)
}

/// Render each cell as a `scale`×`scale` opaque block. Empty cells stay fully
/// transparent.
pub fn render_export(grid: &PixelGrid, scale: u32) -> Result<RgbaImage, ProjectError> {
    let scale = clamp_export_scale(scale);
    let gw = grid.width();
    let (w, h) = (gw * scale, grid.height() * scale);
    let row_bytes = w as usize * 4;
    let mut buf = vec![0u8; row_bytes * h as usize];

    buf.par_chunks_mut(row_bytes).enumerate().for_each(|(py, row)| {
        let gy = py as u32 / scale;
        for gx in 0..gw {
            let Some(c) = grid.get((gy * gw + gx) as usize) else { continue };
            let start = (gx * scale) as usize * 4;
            for px in row[start..start + scale as usize * 4].chunks_exact_mut(4) {
                px.copy_from_slice(&[c.r, c.g, c.b, 255]);
            }
        }
    });

    RgbaImage::from_raw(w, h, buf)
        .ok_or_else(|| ProjectError::InvalidFormat("export buffer size mismatch".into()))
}

/// PNG bytes of the scaled export raster.
pub fn encode_png(grid: &PixelGrid, scale: u32) -> Result<Vec<u8>, ProjectError> {
    let img = render_export(grid, scale)?;
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)?;
    Ok(bytes)
}

pub fn export_png(grid: &PixelGrid, scale: u32, path: &Path) -> Result<(), ProjectError> {
    render_export(grid, scale)?.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

// ============================================================================
// IMAGE DECODE
// ============================================================================

pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ProjectError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

pub fn open_image(path: &Path) -> Result<RgbaImage, ProjectError> {
    Ok(image::open(path)?.to_rgba8())
}

// ============================================================================
// FILE NAMES
// ============================================================================

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// `pixelart_<w>x<h>_<millis>.png`
pub fn default_export_name(grid: &PixelGrid) -> String {
    format!("pixelart_{}x{}_{}.png", grid.width(), grid.height(), unix_millis())
}

/// `project_<millis>.json`
pub fn default_project_name() -> String {
    format!("project_{}.json", unix_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> PixelGrid {
        let mut g = PixelGrid::new(3, 2).unwrap();
        g.set(0, Some(Color::new(0xAB, 0x00, 0x10)));
        g.set(4, Some(Color::WHITE));
        g
    }

    #[test]
    fn json_uses_null_for_empty_cells() {
        let json = project_to_json(&sample_grid()).unwrap();
        assert_eq!(
            json,
            r##"{"width":3,"height":2,"grid":["#AB0010",null,null,null,"#FFFFFF",null]}"##
        );
        assert_eq!(project_from_json(&json).unwrap(), sample_grid());
    }

    #[test]
    fn json_accepts_lowercase_colors() {
        let g = project_from_json(r##"{"width":1,"height":1,"grid":["#1a1c2c"]}"##).unwrap();
        assert_eq!(g.get(0).unwrap().to_hex(), "#1A1C2C");
    }

    #[test]
    fn json_rejects_malformed_projects() {
        for bad in [
            "not json",
            r#"{"height":1,"grid":[null]}"#,
            r#"{"width":1,"grid":[null]}"#,
            r#"{"width":1,"height":1}"#,
            r#"{"width":0,"height":1,"grid":[]}"#,
            r#"{"width":300,"height":1,"grid":[]}"#,
            r#"{"width":2,"height":1,"grid":[null]}"#,
            r#"{"width":1,"height":1,"grid":["red"]}"#,
            r#"{"width":1,"height":1,"grid":[""]}"#,
        ] {
            assert!(project_from_json(bad).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn binary_round_trip_and_magic_check() {
        let bytes = project_to_bytes(&sample_grid()).unwrap();
        assert_eq!(project_from_bytes(&bytes).unwrap(), sample_grid());
        assert!(project_from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(project_from_bytes(b"garbage").is_err());
    }

    #[test]
    fn export_blocks_and_transparency() {
        let img = render_export(&sample_grid(), 4).unwrap();
        assert_eq!(img.dimensions(), (12, 8));
        assert_eq!(img.get_pixel(0, 0).0, [0xAB, 0x00, 0x10, 255]);
        assert_eq!(img.get_pixel(3, 3).0, [0xAB, 0x00, 0x10, 255]);
        assert_eq!(img.get_pixel(4, 0).0, [0, 0, 0, 0]);
        // Cell (1,1) → pixels 4..8 × 4..8
        assert_eq!(img.get_pixel(7, 7).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(8, 7).0[3], 0);
    }

    #[test]
    fn export_scale_is_clamped() {
        assert_eq!(render_export(&sample_grid(), 0).unwrap().dimensions(), (3, 2));
        assert_eq!(render_export(&sample_grid(), 500).unwrap().dimensions(), (150, 100));
    }

    #[test]
    fn png_bytes_decode_back() {
        let bytes = encode_png(&sample_grid(), 2).unwrap();
        let img = decode_image(&bytes).unwrap();
        assert_eq!(img.dimensions(), (6, 4));
        assert_eq!(img.get_pixel(0, 0).0, [0xAB, 0x00, 0x10, 255]);
        assert_eq!(img.get_pixel(5, 0).0[3], 0);
    }

    #[test]
    fn decode_failure_is_an_error() {
        assert!(matches!(decode_image(b"nope"), Err(ProjectError::Image(_))));
    }

    #[test]
    fn default_names() {
        let name = default_export_name(&sample_grid());
        assert!(name.starts_with("pixelart_3x2_") && name.ends_with(".png"));
        assert!(default_project_name().starts_with("project_"));
    }
}
