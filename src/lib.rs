//! Shadow-mapped scene viewer.
//!
//! The crate renders a static scene lit by a rotatable sun, with shadows
//! produced by a depth pass from the sun's point of view. Everything that
//! decides what a frame looks like (camera, light transform, key bindings,
//! per-frame uniforms and the CPU shadow reference) is plain data and can
//! be exercised without a GPU; [`render::Renderer`] turns it into wgpu work.

pub mod app;
pub mod camera;
pub mod error;
pub mod frame;
pub mod input;
pub mod light;
pub mod obj;
pub mod render;
pub mod scene;
pub mod shadow;

pub use app::{run_frame, FrameTarget, SceneState};
pub use camera::{Camera, MoveDirection, Orientation};
pub use error::{GpuDiagnostic, GpuErrorKind, WindowInitError};
pub use frame::{PolygonFill, RenderSettings, RenderUniforms};
pub use input::{command_for, Action, Command, InputState, KeyCode, MouseTracker, NamedKey};
pub use light::{LightSpaceTransform, LightState, OrthoVolume, PointLight};
pub use obj::{load_obj_file, load_obj_from_str, MeshData, Vertex};
pub use render::Renderer;
pub use scene::{CameraSetup, Scene, SceneMesh};
pub use shadow::{DepthRaster, ShadowCoord, Visibility, MAX_RASTER_SIZE, SHADOW_BIAS};
