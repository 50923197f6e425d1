use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::frame::RenderUniforms;

/// Group 0 block of the lit and marker programs (`Globals` in WGSL).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct GlobalUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    light_space: [[f32; 4]; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    point_light_position: [f32; 4],
    fog_density: f32,
    have_point_light: u32,
    _padding: [f32; 2],
}

impl GlobalUniform {
    pub(crate) fn from_frame(uniforms: &RenderUniforms) -> Self {
        Self {
            view: uniforms.view.to_cols_array_2d(),
            projection: uniforms.projection.to_cols_array_2d(),
            light_space: uniforms.light_space.combined.to_cols_array_2d(),
            light_dir: uniforms.light_direction.extend(0.0).into(),
            light_color: uniforms.light_color.extend(1.0).into(),
            point_light_position: uniforms.point_light.position.extend(1.0).into(),
            fog_density: uniforms.fog_density,
            have_point_light: u32::from(uniforms.point_light.enabled),
            _padding: [0.0; 2],
        }
    }
}

/// Group 1 block shared by the lit, depth and marker programs.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ObjectConstants {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    color: [f32; 4],
}

impl ObjectConstants {
    pub(crate) fn new(model: Mat4, normal: Mat3, color: Vec3) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
            color: color.extend(1.0).into(),
        }
    }

    /// Markers are unlit, so the normal matrix is never read.
    pub(crate) fn marker(model: Mat4) -> Self {
        Self::new(model, Mat3::IDENTITY, Vec3::ONE)
    }
}

/// Group 0 block of the depth program.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct LightSpaceUniform {
    light_space: [[f32; 4]; 4],
}

impl LightSpaceUniform {
    pub(crate) fn new(light_space: Mat4) -> Self {
        Self {
            light_space: light_space.to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct SkyUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    zenith: [f32; 4],
    horizon: [f32; 4],
}

impl SkyUniform {
    pub(crate) fn new(view: Mat4, projection: Mat4, zenith: Vec3, horizon: Vec3) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            zenith: zenith.extend(1.0).into(),
            horizon: horizon.extend(1.0).into(),
        }
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    [
        matrix.x_axis.extend(0.0).into(),
        matrix.y_axis.extend(0.0).into(),
        matrix.z_axis.extend(0.0).into(),
    ]
}
