//! Session state and the per-frame sequence that drives the renderer.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use log::{debug, warn};

use crate::camera::Camera;
use crate::frame::{PolygonFill, RenderSettings, RenderUniforms};
use crate::input::{Action, InputState, MouseTracker};
use crate::light::{LightSpaceTransform, LightState, PointLight};
use crate::obj::MeshData;
use crate::scene::Scene;
use crate::shadow::{DepthRaster, Visibility};

/// All mutable state of a viewing session. Input handlers write it, the
/// frame reads it; nothing else holds a copy across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    pub camera: Camera,
    pub light: LightState,
    pub point_light: PointLight,
    pub fog_density: f32,
    /// Rotation of the scene's rotating part, kept in `[0, TAU)`.
    pub spin_radians: f32,
    pub polygon_fill: PolygonFill,
    pub show_depth_map: bool,
}

impl SceneState {
    pub fn new(scene: &Scene) -> Self {
        let setup = scene.camera;
        Self {
            camera: Camera::new(setup.position, setup.target, setup.up),
            light: LightState::new(scene.sun_direction),
            point_light: PointLight {
                position: scene.point_light,
                enabled: false,
            },
            fog_density: 0.0,
            spin_radians: 0.0,
            polygon_fill: PolygonFill::Fill,
            show_depth_map: false,
        }
    }

    /// Applies one held-key action.
    pub fn apply(&mut self, action: Action, settings: &RenderSettings) {
        match action {
            Action::Move(direction) => self.camera.move_along(direction, settings.camera_speed),
            Action::SpinModel(degrees) => self.spin_by(degrees.to_radians()),
            Action::RotateLight(degrees) => self.light.rotate_by(degrees),
            Action::PolygonMode(Some(fill)) => self.polygon_fill = fill,
            Action::PolygonMode(None) => {
                warn!("polygon mode 4 is not a valid fill mode; keeping {:?}", self.polygon_fill)
            }
            Action::Fog(preset) => self.fog_density = preset.density(),
            Action::PointLight(enabled) => self.point_light.enabled = enabled,
        }
    }

    /// Applies every held key, then advances the rotating part by one
    /// frame's worth of spin.
    pub fn advance(&mut self, input: &InputState, settings: &RenderSettings) {
        for action in input.held_actions() {
            self.apply(action, settings);
        }
        self.spin_by(settings.spin_per_frame);
    }

    fn spin_by(&mut self, radians: f32) {
        self.spin_radians = (self.spin_radians + radians).rem_euclid(TAU);
    }

    /// Mouse look. Runs from the cursor callback, outside the frame
    /// sequence, so it may land before or after that frame's key moves.
    pub fn look(&mut self, mouse: &mut MouseTracker, cursor: Vec2) {
        let (pitch, yaw) = mouse.track(cursor);
        self.camera.rotate(pitch, yaw);
        debug!(
            "look pitch={:.1} yaw={:.1}",
            self.camera.orientation().pitch,
            self.camera.orientation().yaw
        );
    }

    pub fn toggle_depth_map(&mut self) {
        self.show_depth_map = !self.show_depth_map;
    }

    /// Whether the sun reaches `point`, answered on the CPU by rasterizing
    /// `meshes` (one per scene mesh) into a `resolution`² depth grid.
    pub fn sun_visibility(
        &self,
        scene: &Scene,
        meshes: &[MeshData],
        resolution: u32,
        point: Vec3,
    ) -> Visibility {
        let light_space = LightSpaceTransform::compute(&self.light);
        let mut raster = DepthRaster::new(resolution, light_space.combined);
        for (mesh, model) in meshes.iter().zip(scene.model_matrices(self.spin_radians)) {
            raster.draw_triangles(mesh.triangles(model));
        }
        raster.visibility(point)
    }
}

/// Sink for the GPU work of one frame, called in a fixed order by
/// [`run_frame`].
pub trait FrameTarget {
    type Error;

    /// Acquires whatever the frame draws into.
    fn begin_frame(&mut self) -> Result<(), Self::Error>;

    /// Renders scene depth from the sun.
    fn shadow_pass(&mut self, uniforms: &RenderUniforms);

    /// Renders the visible image, either lit or the depth-map view.
    fn main_pass(&mut self, uniforms: &RenderUniforms);

    fn present(&mut self);

    fn aspect_ratio(&self) -> f32;
}

/// One frame: input, light transform, shadow pass, main pass, present.
///
/// The uniforms, including the light-space matrix, are built once and
/// handed to both passes so casting and sampling see the same sun.
pub fn run_frame<T: FrameTarget>(
    state: &mut SceneState,
    input: &InputState,
    scene: &Scene,
    settings: &RenderSettings,
    target: &mut T,
) -> Result<RenderUniforms, T::Error> {
    state.advance(input, settings);
    let uniforms = RenderUniforms::compute(state, scene, settings, target.aspect_ratio());
    target.begin_frame()?;
    target.shadow_pass(&uniforms);
    target.main_pass(&uniforms);
    target.present();
    Ok(uniforms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::MoveDirection;
    use crate::input::{FogPreset, KeyCode, NamedKey};
    use crate::scene::SceneMesh;

    #[derive(Debug, Clone, PartialEq)]
    enum Step {
        Begin,
        Shadow(LightSpaceTransform),
        Main(LightSpaceTransform, bool),
        Present,
    }

    #[derive(Default)]
    struct Recorder {
        steps: Vec<Step>,
        fail_begin: bool,
    }

    impl FrameTarget for Recorder {
        type Error = &'static str;

        fn begin_frame(&mut self) -> Result<(), Self::Error> {
            if self.fail_begin {
                return Err("surface lost");
            }
            self.steps.push(Step::Begin);
            Ok(())
        }

        fn shadow_pass(&mut self, uniforms: &RenderUniforms) {
            self.steps.push(Step::Shadow(uniforms.light_space));
        }

        fn main_pass(&mut self, uniforms: &RenderUniforms) {
            self.steps
                .push(Step::Main(uniforms.light_space, uniforms.show_depth_map));
        }

        fn present(&mut self) {
            self.steps.push(Step::Present);
        }

        fn aspect_ratio(&self) -> f32 {
            16.0 / 9.0
        }
    }

    fn setup() -> (Scene, SceneState, RenderSettings) {
        let scene = Scene::default();
        let state = SceneState::new(&scene);
        (scene, state, RenderSettings::default())
    }

    #[test]
    fn frame_runs_passes_in_order_with_one_light_snapshot() {
        let (scene, mut state, settings) = setup();
        let mut input = InputState::new();
        input.set_key_down(KeyCode::Character('L'));
        let mut target = Recorder::default();

        let uniforms = run_frame(&mut state, &input, &scene, &settings, &mut target).unwrap();

        assert_eq!(state.light.angle_degrees, 1.0);
        let expected = LightSpaceTransform::compute(&state.light);
        assert_eq!(uniforms.light_space, expected);
        assert_eq!(
            target.steps,
            vec![
                Step::Begin,
                Step::Shadow(expected),
                Step::Main(expected, false),
                Step::Present,
            ]
        );
    }

    #[test]
    fn light_snapshot_tracks_rotation_across_frames() {
        let (scene, mut state, settings) = setup();
        let mut input = InputState::new();
        input.set_key_down(KeyCode::Character('J'));
        let mut target = Recorder::default();

        let first = run_frame(&mut state, &input, &scene, &settings, &mut target).unwrap();
        let second = run_frame(&mut state, &input, &scene, &settings, &mut target).unwrap();
        assert_ne!(first.light_space, second.light_space);
        assert_eq!(state.light.angle_degrees, -2.0);
    }

    #[test]
    fn failed_acquire_skips_passes_but_keeps_state_update() {
        let (scene, mut state, settings) = setup();
        let input = InputState::new();
        let mut target = Recorder {
            fail_begin: true,
            ..Recorder::default()
        };
        assert!(run_frame(&mut state, &input, &scene, &settings, &mut target).is_err());
        assert!(target.steps.is_empty());
        assert_eq!(state.spin_radians, settings.spin_per_frame);
    }

    #[test]
    fn held_keys_drive_the_reducer() {
        let (_, mut state, settings) = setup();
        let mut input = InputState::new();
        for name in ["W", "E", "X", "Equal", "2"] {
            input.set_key_down(KeyCode::from_name(name).unwrap());
        }
        let start_z = state.camera.position().z;
        state.advance(&input, &settings);

        assert!((state.camera.position().z - (start_z + 0.1)).abs() < 1e-5);
        assert!((state.spin_radians - (1f32.to_radians() + 0.01)).abs() < 1e-6);
        assert!(state.point_light.enabled);
        assert_eq!(state.fog_density, FogPreset::Dense.density());
        assert_eq!(state.polygon_fill, PolygonFill::Line);
    }

    #[test]
    fn spin_wraps_and_keeps_stepping() {
        let (_, mut state, settings) = setup();
        let input = InputState::new();
        state.spin_radians = TAU - settings.spin_per_frame / 2.0;
        state.advance(&input, &settings);
        assert!((state.spin_radians - settings.spin_per_frame / 2.0).abs() < 1e-5);

        state.apply(Action::SpinModel(-90.0), &settings);
        assert!(state.spin_radians >= 0.0 && state.spin_radians < TAU);

        // Far into a session the step must still move the part.
        for _ in 0..100_000 {
            state.advance(&input, &settings);
        }
        let before = state.spin_radians;
        state.advance(&input, &settings);
        assert!(state.spin_radians < TAU);
        assert_ne!(state.spin_radians, before);
    }

    #[test]
    fn invalid_polygon_mode_keeps_current_fill() {
        let (_, mut state, settings) = setup();
        state.apply(Action::PolygonMode(Some(PolygonFill::Point)), &settings);
        state.apply(Action::PolygonMode(None), &settings);
        assert_eq!(state.polygon_fill, PolygonFill::Point);
    }

    #[test]
    fn turn_keys_leave_camera_alone() {
        let (_, mut state, settings) = setup();
        let before = state.camera.clone();
        let mut input = InputState::new();
        input.set_key_down(KeyCode::Named(NamedKey::Left));
        input.set_key_down(KeyCode::Named(NamedKey::Right));
        state.advance(&input, &settings);
        assert_eq!(state.camera, before);
        state.apply(Action::Move(MoveDirection::TurnLeft), &settings);
        assert_eq!(state.camera, before);
    }

    #[test]
    fn mouse_look_rotates_camera_immediately() {
        let (_, mut state, _) = setup();
        let mut mouse = MouseTracker::new(Vec2::new(960.0, 540.0), 0.1);
        state.look(&mut mouse, Vec2::new(960.0, 1540.0));
        assert_eq!(state.camera.orientation().pitch, 89.0);
        state.look(&mut mouse, Vec2::new(0.0, 1540.0));
        assert_eq!(state.camera.orientation().yaw, -89.0);
    }

    #[test]
    fn roof_over_the_camera_blocks_the_sun() {
        let slab = SceneMesh {
            name: "Roof".into(),
            mesh: None,
            color: Vec3::ONE,
            pivot: None,
        };
        let scene = Scene {
            meshes: vec![slab],
            ..Scene::default()
        };
        let state = SceneState::new(&scene);
        let roof = MeshData::unit_cube();
        let open_sky = state.sun_visibility(&scene, &[], 256, Vec3::ZERO);
        assert_eq!(open_sky, Visibility::Lit);

        // A point just below the cube, on the line towards the sun.
        let below = -state.light.world_direction().normalize() * 1.0;
        let covered = state.sun_visibility(&scene, &[roof], 256, below);
        assert_eq!(covered, Visibility::Shadowed);
    }

    #[test]
    fn depth_map_toggle_flips() {
        let (_, mut state, _) = setup();
        state.toggle_depth_map();
        assert!(state.show_depth_map);
        state.toggle_depth_map();
        assert!(!state.show_depth_map);
    }
}
