use std::env;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};
use log::{debug, info};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::{Window, WindowId};

use shadow_scene::{
    command_for, run_frame, Command, InputState, KeyCode, MouseTracker, NamedKey,
    RenderSettings, Renderer, Scene, SceneState, Visibility, WindowInitError,
};

/// Largest grid the headless sunlight check rasterizes.
const SUMMARY_RASTER_LIMIT: u32 = 2048;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let scene = Scene::load(&options.path)?;
    let mut settings = RenderSettings::default();
    if let Some(size) = options.shadow_size {
        settings.shadow_resolution = size;
    }

    println!("Loaded scene with {} meshes", scene.meshes.len());
    for mesh in &scene.meshes {
        let source = mesh.mesh.as_deref().unwrap_or("unit cube");
        match mesh.pivot {
            Some(pivot) => {
                println!(" - {} ({source}, rotates about {})", mesh.name, fmt_vec(pivot))
            }
            None => println!(" - {} ({source})", mesh.name),
        }
    }

    if options.summary_only {
        print_summary(&scene, &settings);
        return Ok(());
    }

    match run_interactive(scene, settings) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!("{err}. Use --summary-only to inspect the scene without a window.");
            }
            Err(err)
        }
    }
}

fn print_summary(scene: &Scene, settings: &RenderSettings) {
    let state = SceneState::new(scene);
    let camera = &state.camera;
    println!(
        "Camera at {} with target {}",
        fmt_vec(camera.position()),
        fmt_vec(scene.camera.target)
    );
    println!("Sun direction {}", fmt_vec(state.light.world_direction()));

    let meshes = scene.load_meshes();
    let resolution = settings.shadow_resolution.min(SUMMARY_RASTER_LIMIT);
    match state.sun_visibility(scene, &meshes, resolution, camera.position()) {
        Visibility::Lit => println!("Camera is in sunlight"),
        Visibility::Shadowed => println!("Camera is in shadow"),
    }
}

fn fmt_vec(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

fn run_interactive(scene: Scene, settings: RenderSettings) -> Result<()> {
    // Without a display some platforms panic instead of returning an error.
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut viewer = Viewer::new(scene, settings);
    event_loop
        .run_app(&mut viewer)
        .context("event loop terminated abnormally")?;

    match viewer.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct Viewer {
    scene: Scene,
    settings: RenderSettings,
    renderer: Option<Renderer>,
    state: SceneState,
    input: InputState,
    mouse: MouseTracker,
    last_error: Option<anyhow::Error>,
}

impl Viewer {
    fn new(scene: Scene, settings: RenderSettings) -> Self {
        let (width, height) = settings.window_size;
        let centre = Vec2::new(width as f32, height as f32) / 2.0;
        Self {
            state: SceneState::new(&scene),
            input: InputState::new(),
            mouse: MouseTracker::new(centre, settings.mouse_sensitivity),
            renderer: None,
            last_error: None,
            scene,
            settings,
        }
    }

    fn create_renderer(&self, event_loop: &ActiveEventLoop) -> Result<Renderer> {
        let (width, height) = self.settings.window_size;
        let attributes = Window::default_attributes()
            .with_title("Shadow Scene")
            .with_inner_size(PhysicalSize::new(width, height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        block_on(Renderer::new(window, &self.scene, &self.settings))
    }

    fn handle_keyboard(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(key) = map_keycode(code) else {
            return;
        };
        match event.state {
            ElementState::Pressed => {
                self.input.set_key_down(key);
                if event.repeat {
                    return;
                }
                match command_for(key) {
                    Some(Command::ToggleDepthMap) => {
                        self.state.toggle_depth_map();
                        let shown = if self.state.show_depth_map { "on" } else { "off" };
                        info!("depth map view {shown}");
                    }
                    Some(Command::Quit) => event_loop.exit(),
                    None => {}
                }
            }
            ElementState::Released => self.input.set_key_up(key),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let result = run_frame(
            &mut self.state,
            &self.input,
            &self.scene,
            &self.settings,
            renderer,
        );
        match result {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = renderer.window().inner_size();
                renderer.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.last_error = Some(anyhow!("GPU is out of memory"));
                event_loop.exit();
            }
            Err(err) => info!("skipping frame: {err}"),
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        match self.create_renderer(event_loop) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(err) => {
                self.last_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.renderer.as_ref().map(Renderer::window_id) != Some(window_id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(&event, event_loop),
            WindowEvent::CursorMoved { position, .. } => {
                let cursor = Vec2::new(position.x as f32, position.y as f32);
                self.state.look(&mut self.mouse, cursor);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_ref() {
            renderer.window().request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        debug!(
            "leaving with camera at {} and sun angle {:.0}",
            fmt_vec(self.state.camera.position()),
            self.state.light.angle_degrees
        );
    }
}

fn map_keycode(code: WinitKey) -> Option<KeyCode> {
    Some(match code {
        WinitKey::ArrowLeft => KeyCode::Named(NamedKey::Left),
        WinitKey::ArrowRight => KeyCode::Named(NamedKey::Right),
        WinitKey::ArrowUp => KeyCode::Named(NamedKey::Up),
        WinitKey::ArrowDown => KeyCode::Named(NamedKey::Down),
        WinitKey::Escape => KeyCode::Named(NamedKey::Escape),
        WinitKey::Minus => KeyCode::Named(NamedKey::Minus),
        WinitKey::Equal => KeyCode::Named(NamedKey::Equal),
        WinitKey::Digit0 => KeyCode::Digit(0),
        WinitKey::Digit1 => KeyCode::Digit(1),
        WinitKey::Digit2 => KeyCode::Digit(2),
        WinitKey::Digit3 => KeyCode::Digit(3),
        WinitKey::Digit4 => KeyCode::Digit(4),
        WinitKey::KeyA => KeyCode::Character('A'),
        WinitKey::KeyD => KeyCode::Character('D'),
        WinitKey::KeyE => KeyCode::Character('E'),
        WinitKey::KeyJ => KeyCode::Character('J'),
        WinitKey::KeyL => KeyCode::Character('L'),
        WinitKey::KeyM => KeyCode::Character('M'),
        WinitKey::KeyQ => KeyCode::Character('Q'),
        WinitKey::KeyS => KeyCode::Character('S'),
        WinitKey::KeyW => KeyCode::Character('W'),
        WinitKey::KeyX => KeyCode::Character('X'),
        WinitKey::KeyZ => KeyCode::Character('Z'),
        _ => return None,
    })
}

struct CliOptions {
    path: PathBuf,
    summary_only: bool,
    shadow_size: Option<u32>,
}

const USAGE: &str = "Usage: shadow-scene <scene.xml> [--summary-only] [--shadow-size <texels>]";

impl CliOptions {
    fn parse() -> Result<Self> {
        Self::from_args(env::args().skip(1))
    }

    fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let Some(path) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        let mut summary_only = false;
        let mut shadow_size = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--shadow-size" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--shadow-size needs a value. {USAGE}"))?;
                    let size = value
                        .parse::<u32>()
                        .ok()
                        .filter(|size| *size > 0)
                        .ok_or_else(|| anyhow!("invalid shadow map size {value:?}"))?;
                    shadow_size = Some(size);
                }
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(Self {
            path: PathBuf::from(path),
            summary_only,
            shadow_size,
        })
    }
}
