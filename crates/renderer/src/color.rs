//! Color types: 8-bit RGBA pixels and HSL triples.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// RGBA pixel, straight (non-premultiplied) alpha.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgb(rgb: Vec3) -> Self {
        Self::from_rgba(rgb, 1.0)
    }

    pub fn from_rgba(rgb: Vec3, a: f32) -> Self {
        Self {
            r: to_u8(rgb.x),
            g: to_u8(rgb.y),
            b: to_u8(rgb.z),
            a: to_u8(a),
        }
    }

    /// Color channels as 0..1 floats.
    pub fn rgb(self) -> Vec3 {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32) / 255.0
    }

    pub fn alpha(self) -> f32 {
        self.a as f32 / 255.0
    }

    /// Relative luminance (Rec. 709 weights on linearized channels).
    pub fn luminance(self) -> f32 {
        let c = self.rgb();
        0.2126 * srgb_to_linear(c.x) + 0.7152 * srgb_to_linear(c.y) + 0.0722 * srgb_to_linear(c.z)
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Hue in degrees, saturation and lightness in percent (CSS convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub const fn new(h: f32, s: f32, l: f32) -> Self {
        Self { h, s, l }
    }

    /// All three channels are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.h.is_finite() && self.s.is_finite() && self.l.is_finite()
    }

    /// Convert to RGB in 0..1. Hue wraps, saturation and lightness clamp.
    pub fn to_rgb(self) -> Vec3 {
        let h = self.h.rem_euclid(360.0) / 360.0;
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);
        if s <= 0.0 {
            return Vec3::splat(l);
        }
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Vec3::new(
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    }

    pub fn to_rgba(self) -> Rgba {
        Rgba::from_rgb(self.to_rgb())
    }

    /// Component-wise lerp. Hue takes the short way around the circle.
    pub fn lerp(self, other: Hsl, t: f32) -> Hsl {
        let mut dh = (other.h - self.h).rem_euclid(360.0);
        if dh > 180.0 {
            dh -= 360.0;
        }
        Hsl {
            h: (self.h + dh * t).rem_euclid(360.0),
            s: lerp(self.s, other.s, t),
            l: lerp(self.l, other.l, t),
        }
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite smoothstep between `edge0` and `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if (edge1 - edge0).abs() < f32::EPSILON {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_primaries() {
        assert_eq!(Hsl::new(0.0, 100.0, 50.0).to_rgba(), Rgba::new(255, 0, 0, 255));
        assert_eq!(Hsl::new(120.0, 100.0, 50.0).to_rgba(), Rgba::new(0, 255, 0, 255));
        assert_eq!(Hsl::new(240.0, 100.0, 50.0).to_rgba(), Rgba::new(0, 0, 255, 255));
        assert_eq!(Hsl::new(77.0, 0.0, 100.0).to_rgba(), Rgba::new(255, 255, 255, 255));
    }

    #[test]
    fn hue_lerp_wraps_short_way() {
        let a = Hsl::new(350.0, 50.0, 50.0);
        let b = Hsl::new(10.0, 50.0, 50.0);
        let mid = a.lerp(b, 0.5);
        assert!(mid.h.abs() < 1e-3 || (mid.h - 360.0).abs() < 1e-3);
    }

    #[test]
    fn luminance_orders_grays() {
        let dark = Rgba::new(40, 40, 40, 255);
        let light = Rgba::new(200, 200, 200, 255);
        assert!(dark.luminance() < light.luminance());
    }

    #[test]
    fn smoothstep_edges() {
        assert_eq!(smoothstep(0.2, 0.8, 0.0), 0.0);
        assert_eq!(smoothstep(0.2, 0.8, 1.0), 1.0);
        assert!((smoothstep(0.2, 0.8, 0.5) - 0.5).abs() < 1e-6);
    }
}
