use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Largest accepted grid edge, in cells.
pub const MAX_SIZE: u32 = 256;
/// Edge length of a freshly opened project.
pub const DEFAULT_SIZE: u32 = 32;
/// Rendered size of one cell at zoom 1.0, in pixels.
pub const BASE_CELL_SIZE: f32 = 20.0;

// ============================================================================
// COLOR
// ============================================================================

/// Opaque sRGB colour. Parsed case-insensitively, always displayed as `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}': expected 6 hex digits")]
pub struct ParseColorError(pub String);

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `RRGGBB`, any case.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_rgba(&self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s).ok_or_else(|| ParseColorError(s.to_string()))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One grid cell: `None` means nothing painted.
pub type Cell = Option<Color>;

// ============================================================================
// PIXEL GRID – row-major cell storage
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("invalid grid size {width}x{height}: both edges must be within 1..={max}", max = MAX_SIZE)]
    InvalidDimensions { width: u32, height: u32 },
}

/// Reject any size outside `1..=MAX_SIZE` before touching state.
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), GridError> {
    if (1..=MAX_SIZE).contains(&width) && (1..=MAX_SIZE).contains(&height) {
        Ok(())
    } else {
        Err(GridError::InvalidDimensions { width, height })
    }
}

/// Fixed-size grid of optional colours. `cells.len() == width * height` always.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl PixelGrid {
    /// A grid with every cell empty.
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        validate_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![None; (width * height) as usize],
        })
    }

    /// Adopt an existing cell buffer; its length must match the dimensions.
    pub fn from_cells(width: u32, height: u32, cells: Vec<Cell>) -> Result<Self, GridError> {
        validate_dimensions(width, height)?;
        if cells.len() != (width * height) as usize {
            return Err(GridError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height, cells })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// True when at least one cell holds a colour.
    pub fn has_content(&self) -> bool {
        self.cells.iter().any(Option::is_some)
    }

    pub fn painted_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// `y * width + x`, or `None` outside the grid.
    pub fn index_of(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some((y * self.width as i64 + x) as usize)
    }

    /// Inverse of [`index_of`](Self::index_of).
    pub fn coords_of(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.cells.len() {
            return None;
        }
        let w = self.width as usize;
        Some(((index % w) as u32, (index / w) as u32))
    }

    /// Out-of-range reads are empty rather than an error.
    pub fn get(&self, index: usize) -> Cell {
        self.cells.get(index).copied().flatten()
    }

    /// Write one cell. Returns `false` (and leaves the grid untouched) when the
    /// index is out of range or the cell already holds `value`.
    pub fn set(&mut self, index: usize, value: Cell) -> bool {
        match self.cells.get_mut(index) {
            Some(cell) if *cell != value => {
                *cell = value;
                true
            }
            _ => false,
        }
    }

    /// Replace the whole buffer with an empty one of the new size.
    /// Content is never preserved.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GridError> {
        *self = Self::new(width, height)?;
        Ok(())
    }

    /// Empty every cell, keeping the size.
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// In-bounds von Neumann neighbours (up, down, left, right).
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + use<> {
        let w = self.width as usize;
        let h = self.height as usize;
        let (x, y) = (index % w.max(1), index / w.max(1));
        let valid = index < self.cells.len();
        [
            (valid && y > 0).then(|| index - w),
            (valid && y + 1 < h).then(|| index + w),
            (valid && x > 0).then(|| index - 1),
            (valid && x + 1 < w).then(|| index + 1),
        ]
        .into_iter()
        .flatten()
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// A position in canvas pixel space (already relative to the canvas origin).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Screen-space bounding rectangle of the rendered canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    /// Client coordinates to canvas-relative pixel coordinates. The result may
    /// lie outside the canvas; pointer tracking keeps running past its edges.
    pub fn to_local(&self, client: Point) -> Point {
        Point::new(client.x - self.left, client.y - self.top)
    }
}

// ============================================================================
// VIEWPORT – zoom and pixel → cell mapping
// ============================================================================

/// Map a canvas pixel position to a grid index for the given cell size.
pub fn resolve(pixel_x: f32, pixel_y: f32, width: u32, height: u32, cell_size: f32) -> Option<usize> {
    if !(cell_size > 0.0) {
        return None;
    }
    let gx = (pixel_x / cell_size).floor();
    let gy = (pixel_y / cell_size).floor();
    // Written so NaN falls through to None.
    if !(gx >= 0.0 && gx < width as f32 && gy >= 0.0 && gy < height as f32) {
        return None;
    }
    Some(gy as usize * width as usize + gx as usize)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub base_cell_size: f32,
    zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            base_cell_size: BASE_CELL_SIZE,
            zoom: 1.0,
            min_zoom: 0.5,
            max_zoom: 3.0,
            zoom_step: 0.25,
        }
    }
}

impl Viewport {
    /// A viewport at zoom 1.0 with the given limits. Inverted limits are swapped.
    pub fn new(base_cell_size: f32, min_zoom: f32, max_zoom: f32, zoom_step: f32) -> Self {
        let (min_zoom, max_zoom) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        let mut vp = Self {
            base_cell_size,
            zoom: 1.0,
            min_zoom,
            max_zoom,
            zoom_step,
        };
        vp.reset_zoom();
        vp
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Current rendered cell size. Always derived from the live zoom factor.
    pub fn cell_size(&self) -> f32 {
        self.base_cell_size * self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + self.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - self.zoom_step);
    }

    pub fn reset_zoom(&mut self) {
        self.set_zoom(1.0);
    }

    pub fn resolve(&self, point: Point, grid: &PixelGrid) -> Option<usize> {
        resolve(point.x, point.y, grid.width(), grid.height(), self.cell_size())
    }

    /// Top-left pixel of the cell under `point`, for hover highlighting.
    pub fn hover_origin(&self, point: Point, grid: &PixelGrid) -> Option<Point> {
        let (x, y) = grid.coords_of(self.resolve(point, grid)?)?;
        let cs = self.cell_size();
        Some(Point::new(x as f32 * cs, y as f32 * cs))
    }

    /// Pixel-space centre of a cell.
    pub fn cell_center(&self, x: u32, y: u32) -> Point {
        let cs = self.cell_size();
        Point::new((x as f32 + 0.5) * cs, (y as f32 + 0.5) * cs)
    }
}
