//! Offscreen raster layers and the primitives drawn into them.
//!
//! Everything here is immediate mode: filled triangles, anti-aliased line
//! segments, full-layer linear gradients and layer-over-layer compositing,
//! all with straight-alpha "source over" blending.

use std::path::Path;

use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::color::Rgba;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("pixel buffer of {len} bytes does not match a {width}x{height} layer")]
    BufferSize { width: u32, height: u32, len: usize },
    #[error("failed to encode layer: {0}")]
    Encode(#[from] image::ImageError),
}

/// A width x height RGBA pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Layer {
    /// Create a fully transparent layer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Raw RGBA8 bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Reallocate to a new size. Contents are cleared.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize((width as usize) * (height as usize), Rgba::TRANSPARENT);
    }

    pub fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize]
        } else {
            Rgba::TRANSPARENT
        }
    }

    /// Source-over blend `color` onto one pixel with extra `coverage` (0..1).
    #[inline]
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as u32 * self.width + x as u32) as usize;
        self.pixels[idx] = blend_over(self.pixels[idx], color, coverage);
    }

    /// Fill a triangle. Pixel centers on an edge count as inside, so
    /// neighbouring triangles overlap by at most one edge instead of leaving
    /// a crack.
    pub fn fill_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Rgba) {
        let area = edge(a, b, c);
        if area.abs() < 1e-9 {
            return;
        }
        // Orient counter-clockwise in the edge-function sense.
        let (b, c) = if area < 0.0 { (c, b) } else { (b, c) };

        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as i32;
        let max_x = a.x.max(b.x).max(c.x).ceil().min(self.width as f32 - 1.0) as i32;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as i32;
        let max_y = a.y.max(b.y).max(c.y).ceil().min(self.height as f32 - 1.0) as i32;
        if min_x > max_x || min_y > max_y {
            return;
        }

        for y in min_y..=max_y {
            let py = y as f32 + 0.5;
            for x in min_x..=max_x {
                let p = Vec2::new(x as f32 + 0.5, py);
                if edge(b, c, p) >= 0.0 && edge(c, a, p) >= 0.0 && edge(a, b, p) >= 0.0 {
                    self.blend_pixel(x, y, color, 1.0);
                }
            }
        }
    }

    /// Stroke the outline of a triangle.
    pub fn stroke_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, width: f32, color: Rgba) {
        self.stroke_line(a, b, width, color);
        self.stroke_line(b, c, width, color);
        self.stroke_line(c, a, width, color);
    }

    /// Anti-aliased line segment with round caps.
    pub fn stroke_line(&mut self, a: Vec2, b: Vec2, width: f32, color: Rgba) {
        let half = (width * 0.5).max(0.25);
        let pad = half + 1.0;
        let min_x = (a.x.min(b.x) - pad).floor().max(0.0) as i32;
        let max_x = (a.x.max(b.x) + pad).ceil().min(self.width as f32 - 1.0) as i32;
        let min_y = (a.y.min(b.y) - pad).floor().max(0.0) as i32;
        let max_y = (a.y.max(b.y) + pad).ceil().min(self.height as f32 - 1.0) as i32;
        if min_x > max_x || min_y > max_y {
            return;
        }

        let ab = b - a;
        let len2 = ab.length_squared();
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let t = if len2 > 0.0 { ((p - a).dot(ab) / len2).clamp(0.0, 1.0) } else { 0.0 };
                let dist = (p - (a + ab * t)).length();
                let coverage = (half - dist + 0.5).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_pixel(x, y, color, coverage);
                }
            }
        }
    }

    /// Blend a linear gradient over the whole layer. `stops` are
    /// `(offset, color)` pairs with ascending offsets in 0..1 along
    /// `start -> end`; positions before the first or after the last stop
    /// take the end colors.
    pub fn fill_linear_gradient(&mut self, start: Vec2, end: Vec2, stops: &[(f32, Rgba)]) {
        let Some(&(_, first)) = stops.first() else {
            return;
        };
        let axis = end - start;
        let len2 = axis.length_squared();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let t = if len2 > 0.0 { (p - start).dot(axis) / len2 } else { 0.0 };
                let color = sample_stops(stops, t).unwrap_or(first);
                if color.a > 0 {
                    self.blend_pixel(x, y, color, 1.0);
                }
            }
        }
    }

    /// Draw `src` over this layer. Both layers must share a size; extra
    /// pixels on either side are ignored.
    pub fn draw_layer(&mut self, src: &Layer) {
        let w = self.width.min(src.width);
        let h = self.height.min(src.height);
        for y in 0..h {
            for x in 0..w {
                let s = src.pixels[(y * src.width + x) as usize];
                if s.a == 0 {
                    continue;
                }
                let idx = (y * self.width + x) as usize;
                self.pixels[idx] = blend_over(self.pixels[idx], s, 1.0);
            }
        }
    }

    /// Mean relative luminance of opaque content (alpha-weighted).
    pub fn mean_luminance(&self) -> f32 {
        let mut sum = 0.0f64;
        let mut weight = 0.0f64;
        for p in &self.pixels {
            let a = p.alpha() as f64;
            sum += p.luminance() as f64 * a;
            weight += a;
        }
        if weight > 0.0 {
            (sum / weight) as f32
        } else {
            0.0
        }
    }

    pub fn to_image(&self) -> Result<image::RgbaImage, RasterError> {
        let bytes = self.as_bytes().to_vec();
        let len = bytes.len();
        image::RgbaImage::from_raw(self.width, self.height, bytes).ok_or(RasterError::BufferSize {
            width: self.width,
            height: self.height,
            len,
        })
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), RasterError> {
        let img = self.to_image()?;
        img.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
        log::debug!("wrote {}x{} layer to {:?}", self.width, self.height, path.as_ref());
        Ok(())
    }
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn sample_stops(stops: &[(f32, Rgba)], t: f32) -> Option<Rgba> {
    let (first_t, first) = *stops.first()?;
    let (last_t, last) = *stops.last()?;
    if t <= first_t {
        return Some(first);
    }
    if t >= last_t {
        return Some(last);
    }
    for pair in stops.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t >= t0 && t <= t1 {
            let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            let rgb = c0.rgb().lerp(c1.rgb(), f);
            let a = c0.alpha() + (c1.alpha() - c0.alpha()) * f;
            return Some(Rgba::from_rgba(rgb, a));
        }
    }
    Some(last)
}

/// Straight-alpha source-over.
#[inline]
fn blend_over(dst: Rgba, src: Rgba, coverage: f32) -> Rgba {
    let sa = src.alpha() * coverage.clamp(0.0, 1.0);
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }
    let da = dst.alpha();
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba::TRANSPARENT;
    }
    let rgb: Vec3 = (src.rgb() * sa + dst.rgb() * da * (1.0 - sa)) / out_a;
    Rgba::from_rgba(rgb, out_a)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = Rgba::new(255, 0, 0, 255);

    #[test]
    fn adjacent_triangles_leave_no_gap() {
        let mut layer = Layer::new(16, 16);
        let (a, b, c, d) = (
            Vec2::new(0.0, 0.0),
            Vec2::new(16.0, 0.0),
            Vec2::new(16.0, 16.0),
            Vec2::new(0.0, 16.0),
        );
        layer.fill_triangle(a, b, c, RED);
        layer.fill_triangle(a, c, d, RED);
        assert!(layer.pixels().iter().all(|p| *p == RED));
    }

    #[test]
    fn winding_does_not_matter() {
        let mut cw = Layer::new(8, 8);
        let mut ccw = Layer::new(8, 8);
        let (a, b, c) = (Vec2::new(1.0, 1.0), Vec2::new(7.0, 2.0), Vec2::new(3.0, 7.0));
        cw.fill_triangle(a, b, c, RED);
        ccw.fill_triangle(a, c, b, RED);
        assert_eq!(cw, ccw);
        assert!(cw.pixels().iter().any(|p| *p == RED));
    }

    #[test]
    fn half_alpha_over_opaque() {
        let mut layer = Layer::new(1, 1);
        layer.clear(Rgba::new(0, 0, 0, 255));
        layer.blend_pixel(0, 0, Rgba::new(255, 255, 255, 128), 1.0);
        let p = layer.get_pixel(0, 0);
        assert_eq!(p.a, 255);
        assert!((p.r as i32 - 128).abs() <= 1);
    }

    #[test]
    fn gradient_runs_between_stops() {
        let mut layer = Layer::new(10, 1);
        layer.fill_linear_gradient(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            &[(0.0, Rgba::new(0, 0, 0, 255)), (1.0, Rgba::new(255, 255, 255, 255))],
        );
        let left = layer.get_pixel(0, 0).r;
        let right = layer.get_pixel(9, 0).r;
        assert!(left < right);
    }

    #[test]
    fn stroke_touches_pixels_along_segment() {
        let mut layer = Layer::new(10, 10);
        layer.stroke_line(Vec2::new(1.0, 5.5), Vec2::new(9.0, 5.5), 1.0, RED);
        assert_eq!(layer.get_pixel(5, 5), RED);
        assert_eq!(layer.get_pixel(5, 1).a, 0);
    }

    #[test]
    fn to_image_matches_size() {
        let layer = Layer::new(3, 2);
        let img = layer.to_image().unwrap();
        assert_eq!(img.dimensions(), (3, 2));
    }
}
