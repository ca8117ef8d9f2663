//! Render mesh: jittered points, a border ring and their triangulation.

use glam::Vec2;
use thiserror::Error;

use crate::river::River;
use crate::rng::{SeededRng, MESH_SALT};

/// Points per canvas side in the border ring.
pub const BORDER_POINTS_PER_SIDE: usize = 32;
/// Max jitter of an interior point as a fraction of the spacing.
pub const JITTER_FRAC: f32 = 0.35;
/// Points closer than this fraction of the spacing to a river edge are
/// snapped onto it.
pub const SHORE_SNAP_FRAC: f32 = 0.35;
/// Lowest accepted `tri_density`.
pub const MIN_TRI_DENSITY: f32 = 4.0;
/// Smallest signed area, in px², a triangle may keep after a snap.
pub const MIN_SNAP_AREA: f32 = 1e-2;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("canvas {width}x{height} is too small to mesh")]
    EmptyCanvas { width: f32, height: f32 },
    #[error("triangulation produced no triangles from {points} points")]
    Degenerate { points: usize },
    #[error("triangulation returned index {index} for {points} points")]
    IndexOutOfRange { index: u32, points: usize },
}

/// Turns a point set into triangles.
pub trait Triangulator {
    /// Flat list of vertex index triples into `points`.
    fn triangulate(&self, points: &[Vec2]) -> Vec<u32>;
}

/// Delaunay triangulation backed by the `delaunator` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelaunayTriangulator;

impl Triangulator for DelaunayTriangulator {
    fn triangulate(&self, points: &[Vec2]) -> Vec<u32> {
        let pts: Vec<delaunator::Point> = points
            .iter()
            .map(|p| delaunator::Point {
                x: p.x as f64,
                y: p.y as f64,
            })
            .collect();
        delaunator::triangulate(&pts)
            .triangles
            .into_iter()
            .map(|i| i as u32)
            .collect()
    }
}

/// Triangulated point set covering the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub width: f32,
    pub height: f32,
    /// Target distance between neighbouring points.
    pub spacing: f32,
    /// Points as triangulated.
    pub points: Vec<Vec2>,
    /// Points used for drawing; shoreline points pulled onto the river edge.
    pub render_points: Vec<Vec2>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Point spacing for a canvas and density.
    pub fn spacing_for(width: f32, height: f32, tri_density: f32) -> f32 {
        let density = if tri_density.is_finite() { tri_density.max(MIN_TRI_DENSITY) } else { MIN_TRI_DENSITY };
        (width.min(height) / density).max(1.0)
    }

    /// Scatter, triangulate and snap the shoreline.
    pub fn build(
        width: f32,
        height: f32,
        tri_density: f32,
        seed: u32,
        river: &River,
        triangulator: &dyn Triangulator,
    ) -> Result<Self, MeshError> {
        if !(width >= 1.0 && height >= 1.0) {
            return Err(MeshError::EmptyCanvas { width, height });
        }
        let spacing = Self::spacing_for(width, height, tri_density);
        let points = scatter_points(width, height, spacing, seed);

        let flat = triangulator.triangulate(&points);
        if flat.len() < 3 {
            return Err(MeshError::Degenerate { points: points.len() });
        }
        if let Some(&index) = flat.iter().find(|&&i| i as usize >= points.len()) {
            return Err(MeshError::IndexOutOfRange {
                index,
                points: points.len(),
            });
        }
        let triangles: Vec<[u32; 3]> = flat.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();

        let render_points = if river.is_enabled() {
            snap_shoreline(&points, &triangles, river, spacing * SHORE_SNAP_FRAC, width)
        } else {
            points.clone()
        };

        log::debug!(
            "mesh: {} points, {} triangles, spacing {:.1}px",
            points.len(),
            triangles.len(),
            spacing
        );

        Ok(Self {
            width,
            height,
            spacing,
            points,
            render_points,
            triangles,
        })
    }

    /// Corners of `tri` in render space.
    pub fn corners(&self, tri: [u32; 3]) -> [Vec2; 3] {
        tri.map(|i| self.render_points[i as usize])
    }
}

/// Jittered grid plus the border ring.
fn scatter_points(width: f32, height: f32, spacing: f32, seed: u32) -> Vec<Vec2> {
    let mut rng = SeededRng::for_feature(seed, MESH_SALT);
    let cols = (width / spacing).ceil() as usize;
    let rows = (height / spacing).ceil() as usize;
    let jitter = spacing * JITTER_FRAC;

    let mut points = Vec::with_capacity((cols + 1) * (rows + 1) + 4 * BORDER_POINTS_PER_SIDE);
    for j in 0..=rows {
        for i in 0..=cols {
            let x = i as f32 * spacing + rng.range(-jitter, jitter);
            let y = j as f32 * spacing + rng.range(-jitter, jitter);
            points.push(Vec2::new(x.clamp(0.0, width), y.clamp(0.0, height)));
        }
    }

    let last = (BORDER_POINTS_PER_SIDE - 1) as f32;
    for k in 0..BORDER_POINTS_PER_SIDE {
        let t = k as f32 / last;
        points.push(Vec2::new(t * width, 0.0));
        points.push(Vec2::new(t * width, height));
        // Corners already came from the top and bottom rows.
        if k > 0 && k + 1 < BORDER_POINTS_PER_SIDE {
            points.push(Vec2::new(0.0, t * height));
            points.push(Vec2::new(width, t * height));
        }
    }
    points
}

/// Twice the signed area of a triangle.
fn signed_area2([a, b, c]: [Vec2; 3]) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Where `p` lands if it sits within `tolerance` of a river bank.
fn bank_target(p: Vec2, river: &River, tolerance: f32, width: f32) -> Option<Vec2> {
    if p.x <= 0.0 || p.x >= width {
        return None;
    }
    let center = river.center(p.y);
    let half = river.width_at(p.y);
    let d = p.x - center;
    if (d.abs() - half).abs() >= tolerance {
        return None;
    }
    let side = if d >= 0.0 { 1.0 } else { -1.0 };
    let target = Vec2::new((center + side * half).clamp(0.0, width), p.y);
    (target != p).then_some(target)
}

/// Move points near a river bank laterally onto the bank. Points on the
/// left or right canvas edge stay put so the hull keeps covering the canvas.
/// A snap that would flip or collapse any incident triangle is skipped.
fn snap_shoreline(points: &[Vec2], triangles: &[[u32; 3]], river: &River, tolerance: f32, width: f32) -> Vec<Vec2> {
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); points.len()];
    for (t, tri) in triangles.iter().enumerate() {
        for &i in tri {
            incident[i as usize].push(t);
        }
    }
    let orientation: Vec<f32> = triangles
        .iter()
        .map(|tri| signed_area2(tri.map(|i| points[i as usize])).signum())
        .collect();

    let mut render = points.to_vec();
    let mut skipped = 0usize;
    for (i, &p) in points.iter().enumerate() {
        let Some(target) = bank_target(p, river, tolerance, width) else {
            continue;
        };
        render[i] = target;
        let keeps_orientation = incident[i].iter().all(|&t| {
            let area = signed_area2(triangles[t].map(|k| render[k as usize])) * orientation[t];
            area > 2.0 * MIN_SNAP_AREA
        });
        if !keeps_orientation {
            render[i] = p;
            skipped += 1;
        }
    }
    if skipped > 0 {
        log::debug!("shoreline snap skipped {} point(s) to keep triangles upright", skipped);
    }
    render
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeKind;
    use crate::heightfield::{HeightGrid, HeightModel};
    use crate::noise_field::NoiseField;

    fn no_river() -> River {
        River::disabled(300.0)
    }

    fn mountain_river(seed: u32, tri_density: f32) -> River {
        let model = HeightModel::new(BiomeKind::Mountainous, NoiseField::new(seed), 300.0, 180.0, 1.0);
        let grid = HeightGrid::build(300.0, 180.0, model.pixel_scale(), |x, y| model.height_no_river01(x, y));
        let spacing = Mesh::spacing_for(300.0, 180.0, tri_density);
        River::carve(&model, &grid, seed, River::min_width_for(spacing))
    }

    fn contains(tri: [Vec2; 3], p: Vec2) -> bool {
        let edge = |a: Vec2, b: Vec2| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        let (e0, e1, e2) = (edge(tri[0], tri[1]), edge(tri[1], tri[2]), edge(tri[2], tri[0]));
        let eps = 1e-3;
        (e0 >= -eps && e1 >= -eps && e2 >= -eps) || (e0 <= eps && e1 <= eps && e2 <= eps)
    }

    fn assert_covers_canvas(mesh: &Mesh) {
        assert!(!mesh.triangles.is_empty());
        let mut probes = Vec::new();
        for i in 0..=60 {
            let t = i as f32 / 60.0;
            probes.push(Vec2::new(t * 300.0, 0.5));
            probes.push(Vec2::new(t * 300.0, 179.5));
            probes.push(Vec2::new(0.5, t * 180.0));
            probes.push(Vec2::new(299.5, t * 180.0));
            probes.push(Vec2::new(t * 300.0, t * 180.0));
        }
        for p in probes {
            let covered = mesh.triangles.iter().any(|&tri| contains(mesh.corners(tri), p));
            assert!(covered, "no triangle covers {:?}", p);
        }
    }

    #[test]
    fn mesh_covers_the_whole_canvas() {
        let mesh = Mesh::build(300.0, 180.0, 28.0, 42, &no_river(), &DelaunayTriangulator).unwrap();
        assert_covers_canvas(&mesh);
    }

    #[test]
    fn snapped_mesh_keeps_triangles_upright_and_covers_the_canvas() {
        for seed in [0, 7, 42, 56] {
            for density in [28.0, 48.0, 80.0] {
                let river = mountain_river(seed, density);
                assert!(river.is_enabled());
                let mesh = Mesh::build(300.0, 180.0, density, seed, &river, &DelaunayTriangulator).unwrap();

                let mut total = 0.0f64;
                for &tri in &mesh.triangles {
                    let before = signed_area2(tri.map(|i| mesh.points[i as usize]));
                    let after = signed_area2(mesh.corners(tri));
                    assert!(
                        before * after >= 0.0,
                        "seed {} density {}: triangle {:?} flipped",
                        seed,
                        density,
                        tri
                    );
                    let [a, b, c] = mesh.corners(tri).map(|p| p.as_dvec2());
                    total += (b - a).perp_dot(c - a).abs() * 0.5;
                }
                let canvas = 300.0 * 180.0;
                assert!(
                    (total - canvas).abs() < 1.0,
                    "seed {} density {}: triangles cover {} px² of {}",
                    seed,
                    density,
                    total,
                    canvas
                );
                if seed == 42 && density == 28.0 {
                    assert_covers_canvas(&mesh);
                }
            }
        }
    }

    #[test]
    fn points_stay_in_bounds_and_ring_is_present() {
        let mesh = Mesh::build(300.0, 180.0, 28.0, 7, &no_river(), &DelaunayTriangulator).unwrap();
        for p in &mesh.points {
            assert!((0.0..=300.0).contains(&p.x) && (0.0..=180.0).contains(&p.y));
        }
        for corner in [
            Vec2::new(0.0, 0.0),
            Vec2::new(300.0, 0.0),
            Vec2::new(0.0, 180.0),
            Vec2::new(300.0, 180.0),
        ] {
            assert!(mesh.points.contains(&corner));
        }
    }

    #[test]
    fn density_controls_point_count() {
        let coarse = Mesh::build(300.0, 180.0, 10.0, 1, &no_river(), &DelaunayTriangulator).unwrap();
        let fine = Mesh::build(300.0, 180.0, 40.0, 1, &no_river(), &DelaunayTriangulator).unwrap();
        assert!(fine.points.len() > coarse.points.len());
        assert!(fine.triangles.len() > coarse.triangles.len());
    }

    #[test]
    fn same_seed_same_mesh() {
        let a = Mesh::build(300.0, 180.0, 28.0, 5, &no_river(), &DelaunayTriangulator).unwrap();
        let b = Mesh::build(300.0, 180.0, 28.0, 5, &no_river(), &DelaunayTriangulator).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shoreline_snap_moves_points_without_changing_topology() {
        let river = mountain_river(42, 28.0);
        assert!(river.is_enabled());

        let dry = Mesh::build(300.0, 180.0, 28.0, 42, &no_river(), &DelaunayTriangulator).unwrap();
        let wet = Mesh::build(300.0, 180.0, 28.0, 42, &river, &DelaunayTriangulator).unwrap();
        assert_eq!(dry.triangles, wet.triangles);
        assert_eq!(dry.points, wet.points);
        assert_ne!(wet.points, wet.render_points);

        for (orig, snapped) in wet.points.iter().zip(&wet.render_points) {
            assert_eq!(orig.y, snapped.y);
            if orig != snapped && snapped.x > 0.0 && snapped.x < 300.0 {
                let bank = (snapped.x - river.center(snapped.y)).abs();
                assert!((bank - river.width_at(snapped.y)).abs() < 1e-3);
            }
        }
    }

    struct NothingTriangulator;

    impl Triangulator for NothingTriangulator {
        fn triangulate(&self, _points: &[Vec2]) -> Vec<u32> {
            Vec::new()
        }
    }

    #[test]
    fn empty_triangulation_is_an_error() {
        let err = Mesh::build(300.0, 180.0, 28.0, 1, &no_river(), &NothingTriangulator).unwrap_err();
        assert!(matches!(err, MeshError::Degenerate { .. }));
        let err = Mesh::build(0.0, 180.0, 28.0, 1, &no_river(), &DelaunayTriangulator).unwrap_err();
        assert!(matches!(err, MeshError::EmptyCanvas { .. }));
    }
}
