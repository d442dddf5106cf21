use image::RgbaImage;

use crate::canvas::{CanvasRect, Color, Point};

/// A decoded picture the user samples colours from.
#[derive(Clone, Debug)]
pub struct ReferenceImage {
    image: RgbaImage,
}

impl ReferenceImage {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Colour at bitmap coordinates, clamped into the image. Alpha is dropped.
    pub fn sample(&self, x: f32, y: f32) -> Option<Color> {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return None;
        }
        let clamp = |v: f32, max: u32| {
            if v.is_nan() { 0 } else { (v.floor().max(0.0) as u32).min(max - 1) }
        };
        let p = self.image.get_pixel(clamp(x, w), clamp(y, h));
        Some(Color::new(p[0], p[1], p[2]))
    }

    /// Sample at a client point on the image as displayed inside `displayed`,
    /// which may be scaled relative to the bitmap.
    pub fn sample_displayed(&self, client: Point, displayed: CanvasRect) -> Option<Color> {
        if !(displayed.width > 0.0 && displayed.height > 0.0) {
            return None;
        }
        let local = displayed.to_local(client);
        let sx = self.image.width() as f32 / displayed.width;
        let sy = self.image.height() as f32 / displayed.height;
        self.sample(local.x * sx, local.y * sy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn quadrants() -> ReferenceImage {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(3, 3, Rgba([0xAB, 0xCD, 0xEF, 10]));
        ReferenceImage::new(img)
    }

    #[test]
    fn sample_clamps_and_drops_alpha() {
        let r = quadrants();
        assert_eq!(r.sample(3.0, 3.0).unwrap().to_hex(), "#ABCDEF");
        assert_eq!(r.sample(99.0, 99.0).unwrap().to_hex(), "#ABCDEF");
        assert_eq!(r.sample(-5.0, -5.0), Some(Color::BLACK));
    }

    #[test]
    fn displayed_coordinates_are_scaled() {
        let r = quadrants();
        // Shown at 40x40 starting at (100, 100): 10 screen px per bitmap px.
        let rect = CanvasRect::new(100.0, 100.0, 40.0, 40.0);
        assert_eq!(r.sample_displayed(Point::new(135.0, 139.0), rect).unwrap().to_hex(), "#ABCDEF");
        assert_eq!(r.sample_displayed(Point::new(101.0, 101.0), rect), Some(Color::BLACK));
        assert_eq!(r.sample_displayed(Point::new(101.0, 101.0), CanvasRect::default()), None);
    }
}
