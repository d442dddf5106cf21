// ============================================================================
// IMAGE IMPORT – rasterize a bitmap into grid cells
// ============================================================================

use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};

use crate::canvas::{Cell, Color, GridError, MAX_SIZE, PixelGrid};

/// Pixels with alpha below this become empty cells.
pub const ALPHA_THRESHOLD: u8 = 128;

/// Destination size for a `width`×`height` source under `size_limit`.
///
/// Sources that fit are kept as-is. Larger ones are scaled uniformly so the
/// longer edge equals the limit; each edge is floored and kept at least 1.
pub fn target_size(width: u32, height: u32, size_limit: u32) -> (u32, u32) {
    let limit = size_limit.max(1);
    if width <= limit && height <= limit {
        return (width, height);
    }
    let longer = width.max(height) as u64;
    let scale = |edge: u32| ((edge as u64 * limit as u64 / longer) as u32).max(1);
    (scale(width), scale(height))
}

/// Convert one RGBA sample to a cell. Alpha is thresholded, never kept.
pub fn pixel_to_cell(rgba: [u8; 4]) -> Cell {
    if rgba[3] < ALPHA_THRESHOLD {
        None
    } else {
        Some(Color::new(rgba[0], rgba[1], rgba[2]))
    }
}

/// Straight RGBA8 to normalised, premultiplied float RGBA.
fn premultiply(image: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let a = a as f32 / 255.0;
        Rgba([r as f32 / 255.0 * a, g as f32 / 255.0 * a, b as f32 / 255.0 * a, a])
    })
}

/// Premultiplied float RGBA back to straight RGBA8.
fn unpremultiply(px: [f32; 4]) -> [u8; 4] {
    let a = px[3].clamp(0.0, 1.0);
    if a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_u8(px[0] / a), to_u8(px[1] / a), to_u8(px[2] / a), to_u8(a)]
}

/// Rasterize `image` into a grid no larger than `size_limit` on either edge.
/// The limit itself is capped at [`MAX_SIZE`].
pub fn import_image(image: &RgbaImage, size_limit: u32) -> Result<PixelGrid, GridError> {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(GridError::InvalidDimensions { width: src_w, height: src_h });
    }
    let (w, h) = target_size(src_w, src_h, size_limit.clamp(1, MAX_SIZE));

    let cells: Vec<Cell> = if (w, h) == (src_w, src_h) {
        image.pixels().map(|p| pixel_to_cell(p.0)).collect()
    } else {
        // Resample premultiplied so transparent neighbours don't darken edges.
        imageops::resize(&premultiply(image), w, h, FilterType::Triangle)
            .pixels()
            .map(|p| pixel_to_cell(unpremultiply(p.0)))
            .collect()
    };

    PixelGrid::from_cells(w, h, cells)
}
