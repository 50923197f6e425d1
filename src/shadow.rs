//! CPU mirror of the shadow test performed by the lit fragment shader.
//!
//! The GPU path renders depth from the sun into a texture and compares each
//! fragment's light-space depth against it. The same projection, texel
//! addressing and biased comparison are reproduced here so that shadow
//! behaviour can be checked without a device.

use glam::{Mat4, Vec2, Vec3};

/// Depth offset subtracted before comparing against the stored depth.
/// Must match `SHADOW_BIAS` in the lit shader.
pub const SHADOW_BIAS: f32 = 0.005;

/// Outcome of the shadow test for one surface point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Lit,
    Shadowed,
}

/// A world point expressed in shadow-map texture space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCoord {
    /// Texture coordinates, origin top-left like wgpu textures.
    pub uv: Vec2,
    /// Light clip-space depth in `[0, 1]` for points inside the volume.
    pub depth: f32,
}

impl ShadowCoord {
    pub fn project(light_space: Mat4, world: Vec3) -> Self {
        let clip = light_space * world.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        Self {
            uv: Vec2::new(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5),
            depth: ndc.z,
        }
    }

    /// Points the sun's volume does not cover are never shadowed.
    pub fn in_volume(&self) -> bool {
        (0.0..=1.0).contains(&self.uv.x) && (0.0..=1.0).contains(&self.uv.y) && self.depth <= 1.0
    }

    pub fn test(&self, stored_depth: f32) -> Visibility {
        if !self.in_volume() || self.depth - SHADOW_BIAS <= stored_depth {
            Visibility::Lit
        } else {
            Visibility::Shadowed
        }
    }
}

/// Largest edge length of a [`DepthRaster`] grid.
pub const MAX_RASTER_SIZE: u32 = 8192;

/// Square depth grid filled by rasterizing triangles from the sun.
#[derive(Debug, Clone)]
pub struct DepthRaster {
    size: u32,
    light_space: Mat4,
    depths: Vec<f32>,
}

impl DepthRaster {
    /// Creates a grid cleared to the far plane. `size` is clamped to
    /// `1..=MAX_RASTER_SIZE`.
    pub fn new(size: u32, light_space: Mat4) -> Self {
        let size = grid_size(size);
        Self {
            size,
            light_space,
            depths: vec![1.0; size as usize * size as usize],
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size as usize + x as usize
    }

    /// Rasterizes world-space triangles, keeping the nearest depth per texel.
    pub fn draw_triangles<I>(&mut self, triangles: I)
    where
        I: IntoIterator<Item = [Vec3; 3]>,
    {
        for triangle in triangles {
            self.draw_triangle(triangle);
        }
    }

    fn draw_triangle(&mut self, triangle: [Vec3; 3]) {
        let size = self.size as f32;
        let projected = triangle.map(|vertex| {
            let coord = ShadowCoord::project(self.light_space, vertex);
            (coord.uv * size, coord.depth)
        });
        let [(a, za), (b, zb), (c, zc)] = projected;

        let area = edge(a, b, c);
        if area.abs() <= f32::EPSILON {
            return;
        }

        let min = a.min(b).min(c).floor().max(Vec2::ZERO);
        let max = a.max(b).max(c).ceil().min(Vec2::splat(size));
        if min.x >= max.x || min.y >= max.y {
            return;
        }

        for y in min.y as u32..max.y as u32 {
            for x in min.x as u32..max.x as u32 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(b, c, p) / area;
                let w1 = edge(c, a, p) / area;
                let w2 = edge(a, b, p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let depth = w0 * za + w1 * zb + w2 * zc;
                if !(0.0..=1.0).contains(&depth) {
                    continue;
                }
                let index = self.index(x, y);
                let slot = &mut self.depths[index];
                if depth < *slot {
                    *slot = depth;
                }
            }
        }
    }

    /// Nearest-texel lookup, clamped to the grid edge.
    pub fn sample(&self, uv: Vec2) -> f32 {
        let last = (self.size - 1) as f32;
        let x = (uv.x * self.size as f32).floor().clamp(0.0, last) as u32;
        let y = (uv.y * self.size as f32).floor().clamp(0.0, last) as u32;
        self.depths[self.index(x, y)]
    }

    pub fn visibility(&self, world: Vec3) -> Visibility {
        let coord = ShadowCoord::project(self.light_space, world);
        coord.test(self.sample(coord.uv))
    }
}

fn grid_size(size: u32) -> u32 {
    size.clamp(1, MAX_RASTER_SIZE)
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{LightSpaceTransform, LightState};

    fn overhead_sun() -> Mat4 {
        // Sun straight above the origin; up must not be parallel to the
        // view direction so tilt it slightly.
        let light = LightState::new(Vec3::new(0.0, 20.0, 0.01));
        LightSpaceTransform::compute(&light).combined
    }

    fn quad(center: Vec3, half: f32) -> [[Vec3; 3]; 2] {
        let a = center + Vec3::new(-half, 0.0, -half);
        let b = center + Vec3::new(half, 0.0, -half);
        let c = center + Vec3::new(half, 0.0, half);
        let d = center + Vec3::new(-half, 0.0, half);
        [[a, b, c], [a, c, d]]
    }

    #[test]
    fn unoccluded_point_is_lit() {
        let light_space = overhead_sun();
        let mut raster = DepthRaster::new(256, light_space);
        raster.draw_triangles(quad(Vec3::ZERO, 10.0));
        assert_eq!(raster.visibility(Vec3::new(3.0, 0.0, 3.0)), Visibility::Lit);
    }

    #[test]
    fn point_under_occluder_is_shadowed() {
        let light_space = overhead_sun();
        let mut raster = DepthRaster::new(256, light_space);
        raster.draw_triangles(quad(Vec3::ZERO, 10.0));
        raster.draw_triangles(quad(Vec3::new(0.0, 5.0, 0.0), 2.0));

        assert_eq!(raster.visibility(Vec3::ZERO), Visibility::Shadowed);
        assert_eq!(raster.visibility(Vec3::new(6.0, 0.0, 6.0)), Visibility::Lit);
        // the occluder's own top face is not self-shadowed
        assert_eq!(raster.visibility(Vec3::new(0.0, 5.0, 0.0)), Visibility::Lit);
    }

    #[test]
    fn points_outside_the_volume_are_lit() {
        let light_space = overhead_sun();
        let mut raster = DepthRaster::new(64, light_space);
        raster.draw_triangles(quad(Vec3::new(0.0, 5.0, 0.0), 40.0));
        assert_eq!(raster.visibility(Vec3::new(30.0, 0.0, 0.0)), Visibility::Lit);
    }

    #[test]
    fn cleared_raster_reports_far_plane() {
        let raster = DepthRaster::new(8, overhead_sun());
        assert_eq!(raster.sample(Vec2::new(0.5, 0.5)), 1.0);
        assert_eq!(raster.sample(Vec2::new(-3.0, 7.0)), 1.0);
    }

    #[test]
    fn grid_size_stays_within_bounds() {
        assert_eq!(grid_size(0), 1);
        assert_eq!(grid_size(2048), 2048);
        assert_eq!(grid_size(65536), MAX_RASTER_SIZE);
        assert_eq!(grid_size(u32::MAX), MAX_RASTER_SIZE);
    }

    #[test]
    fn last_texel_is_addressable() {
        let mut raster = DepthRaster::new(3, overhead_sun());
        assert_eq!(raster.depths.len(), 9);
        assert_eq!(raster.index(2, 2), 8);
        raster.depths[8] = 0.25;
        assert_eq!(raster.sample(Vec2::new(0.99, 0.99)), 0.25);
        assert_eq!(raster.sample(Vec2::new(5.0, 5.0)), 0.25);
    }

    #[test]
    fn projection_maps_light_up_to_top_of_texture() {
        let light = LightState::new(Vec3::new(0.0, 0.0, 20.0));
        let light_space = LightSpaceTransform::compute(&light).combined;
        let coord = ShadowCoord::project(light_space, Vec3::new(0.0, 10.0, 0.0));
        assert!((coord.uv.x - 0.5).abs() < 1e-5);
        assert!((coord.uv.y - 0.25).abs() < 1e-5);
    }
}
