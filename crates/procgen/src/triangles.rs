//! Per-triangle geometry precomputed once per mesh rebuild.

use glam::{Vec2, Vec3};

use crate::heightfield::HeightGrid;
use crate::mesh::Mesh;
use crate::river::River;

/// A triangle counts as water when its centroid is within this fraction of
/// the river half-width from the centerline.
pub const WATER_CLASSIFY_FRAC: f32 = 0.98;

/// Shading inputs for one mesh triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleRecord {
    /// Unit normal, always facing up (+z).
    pub normal: Vec3,
    pub centroid: Vec2,
    /// Mean normalized elevation of the three corners.
    pub elev01: f32,
    /// Closed fill path (render-space corners).
    pub path: [Vec2; 3],
    pub is_water: bool,
}

/// Build the record for every triangle of `mesh`.
pub fn build_triangle_records(mesh: &Mesh, grid: &HeightGrid, river: &River) -> Vec<TriangleRecord> {
    mesh.triangles
        .iter()
        .map(|&tri| {
            let path = mesh.corners(tri);
            let [p0, p1, p2] = path.map(|p| Vec3::new(p.x, p.y, grid.sample_px(p.x, p.y)));

            let mut normal = (p1 - p0).cross(p2 - p0);
            if normal.z < 0.0 {
                normal = -normal;
            }
            let normal = normal.try_normalize().unwrap_or(Vec3::Z);

            let centroid = (path[0] + path[1] + path[2]) / 3.0;
            let elev01 = path.iter().map(|p| grid.sample01(p.x, p.y)).sum::<f32>() / 3.0;
            let is_water = river.covers(centroid, WATER_CLASSIFY_FRAC);

            TriangleRecord {
                normal,
                centroid,
                elev01,
                path,
                is_water,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeKind;
    use crate::heightfield::HeightModel;
    use crate::mesh::DelaunayTriangulator;
    use crate::noise_field::NoiseField;

    fn records(kind: BiomeKind, seed: u32) -> (River, Vec<TriangleRecord>) {
        let (w, h) = (300.0, 180.0);
        let model = HeightModel::new(kind, NoiseField::new(seed), w, h, 1.0);
        let dry = HeightGrid::build(w, h, model.pixel_scale(), |x, y| model.height_no_river01(x, y));
        let spacing = Mesh::spacing_for(w, h, 28.0);
        let river = River::carve(&model, &dry, seed, River::min_width_for(spacing));
        let grid = HeightGrid::build(w, h, model.pixel_scale(), |x, y| model.height01(x, y, &river));
        let mesh = Mesh::build(w, h, 28.0, seed, &river, &DelaunayTriangulator).unwrap();
        let recs = build_triangle_records(&mesh, &grid, &river);
        (river, recs)
    }

    #[test]
    fn normals_are_unit_and_face_up() {
        let (_, recs) = records(BiomeKind::Alpine, 3);
        assert!(!recs.is_empty());
        for r in &recs {
            assert!((r.normal.length() - 1.0).abs() < 1e-4);
            assert!(r.normal.z >= 0.0);
            assert!((0.0..=1.0).contains(&r.elev01));
        }
    }

    #[test]
    fn desert_has_no_water() {
        let (_, recs) = records(BiomeKind::Desert, 42);
        assert!(!recs.is_empty());
        assert!(!recs.iter().any(|t| t.is_water));
    }

    #[test]
    fn mountainous_has_water_on_the_river() {
        let (river, recs) = records(BiomeKind::Mountainous, 42);
        assert!(recs.iter().any(|t| t.is_water));
        for r in recs.iter().filter(|t| t.is_water) {
            let d = (r.centroid.x - river.center(r.centroid.y)).abs();
            assert!(d <= WATER_CLASSIFY_FRAC * river.width_at(r.centroid.y) + 1e-4);
        }
    }
}
