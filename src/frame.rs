use glam::{Mat3, Mat4, Vec3};

use crate::app::SceneState;
use crate::light::{LightSpaceTransform, PointLight};
use crate::scene::Scene;

/// Rasterization mode of the lit scene geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonFill {
    Point,
    Line,
    #[default]
    Fill,
}

/// Fixed rendering parameters chosen at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub window_size: (u32, u32),
    /// Requested edge length of the square shadow map; the renderer clamps
    /// it to what the device supports.
    pub shadow_resolution: u32,
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,
    pub clear_color: [f64; 3],
    pub field_of_view_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub sky_far: f32,
    /// Radians the rotating part advances every frame.
    pub spin_per_frame: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            window_size: (1920, 1080),
            shadow_resolution: 10_000,
            camera_speed: 0.1,
            mouse_sensitivity: 0.1,
            clear_color: [0.7, 0.7, 0.7],
            field_of_view_degrees: 45.0,
            near: 0.1,
            far: 80.0,
            sky_far: 1000.0,
            spin_per_frame: 0.01,
        }
    }
}

impl RenderSettings {
    pub fn camera_projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.field_of_view_degrees.to_radians(),
            aspect.max(0.01),
            self.near,
            self.far,
        )
    }

    /// The sky box keeps a square projection regardless of the window.
    pub fn sky_projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.field_of_view_degrees.to_radians(),
            1.0,
            self.near,
            self.sky_far,
        )
    }
}

/// Everything the shadow and main passes read for one frame. Built fresh
/// each frame and never carried over.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub sky_projection: Mat4,
    pub light_space: LightSpaceTransform,
    /// Sun direction in view space.
    pub light_direction: Vec3,
    pub light_color: Vec3,
    pub fog_density: f32,
    pub point_light: PointLight,
    /// One per scene mesh, in scene order.
    pub models: Vec<Mat4>,
    /// `inverse(transpose(mat3(view * model)))` per scene mesh.
    pub normal_matrices: Vec<Mat3>,
    pub sun_marker: Mat4,
    pub point_marker: Option<Mat4>,
    pub show_depth_map: bool,
    pub polygon_fill: PolygonFill,
}

impl RenderUniforms {
    pub fn compute(
        state: &SceneState,
        scene: &Scene,
        settings: &RenderSettings,
        aspect: f32,
    ) -> Self {
        let view = state.camera.view_matrix();
        let models = scene.model_matrices(state.spin_radians);
        let normal_matrices = models
            .iter()
            .map(|model| Mat3::from_mat4(view * *model).inverse().transpose())
            .collect();

        Self {
            view,
            projection: settings.camera_projection(aspect),
            sky_projection: settings.sky_projection(),
            light_space: LightSpaceTransform::compute(&state.light),
            light_direction: state.light.view_direction(view),
            light_color: state.light.color,
            fog_density: state.fog_density,
            point_light: state.point_light,
            models,
            normal_matrices,
            sun_marker: state.light.marker_model(),
            point_marker: state.point_light.marker_model(),
            show_depth_map: state.show_depth_map,
            polygon_fill: state.polygon_fill,
        }
    }
}
