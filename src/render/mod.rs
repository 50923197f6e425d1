//! wgpu renderer: a depth pass from the sun followed by the lit main pass.

mod main_pass;
mod mesh;
pub mod shaders;
mod shadow_pass;
mod skybox;
mod uniforms;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use log::{error, info};
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::app::FrameTarget;
use crate::error::GpuDiagnostic;
use crate::frame::{RenderSettings, RenderUniforms};
use crate::obj::MeshData;
use crate::scene::Scene;

use main_pass::MainRenderStage;
use mesh::{object_layout, DepthBuffer, DrawObject, MeshBuffers};
use shadow_pass::ShadowMapStage;
use uniforms::{LightSpaceUniform, ObjectConstants};

/// Logs errors raised outside any pushed error scope.
fn log_uncaptured_errors() -> Arc<dyn wgpu::UncapturedErrorHandler> {
    Arc::new(|error: wgpu::Error| {
        error!("{}", GpuDiagnostic::from_wgpu("uncaptured", &error));
    })
}

const ERROR_FILTERS: [wgpu::ErrorFilter; 3] = [
    wgpu::ErrorFilter::OutOfMemory,
    wgpu::ErrorFilter::Validation,
    wgpu::ErrorFilter::Internal,
];

/// Window surface plus every GPU resource the two passes use.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    shadow: ShadowMapStage,
    main: MainRenderStage,
    /// Scene meshes in scene order, followed by the marker cube.
    meshes: Vec<MeshBuffers>,
    objects: Vec<DrawObject>,
    colors: Vec<Vec3>,
    sun_marker: DrawObject,
    point_marker: DrawObject,
    frame: Option<FrameInFlight>,
}

struct FrameInFlight {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

impl Renderer {
    /// Creates the device for `window` and uploads the scene's meshes.
    pub async fn new(
        window: Arc<Window>,
        scene: &Scene,
        settings: &RenderSettings,
    ) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: Default::default(),
            backend_options: Default::default(),
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        info!("using adapter {}", adapter.get_info().name);

        // Wireframe and point modes are optional; fill always works.
        let optional = wgpu::Features::POLYGON_MODE_LINE | wgpu::Features::POLYGON_MODE_POINT;
        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("renderer-device"),
            required_features: adapter.features() & optional,
            required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor)
            .await
            .context("failed to create GPU device")?;
        device.on_uncaptured_error(log_uncaptured_errors());

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no texture formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|mode| {
                    matches!(
                        mode,
                        wgpu::PresentMode::Mailbox | wgpu::PresentMode::Immediate
                    )
                })
                .unwrap_or(wgpu::PresentMode::Fifo),
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        push_error_scopes(&device);
        let depth = DepthBuffer::create(&device, config.width, config.height);
        let object_layout = object_layout(&device);
        let shadow = ShadowMapStage::new(&device, &object_layout, settings.shadow_resolution);
        info!("shadow map is {0}x{0}", shadow.map.size);
        let main = MainRenderStage::new(
            &device,
            &object_layout,
            &shadow.map,
            surface_format,
            settings.clear_color,
        );

        let mut meshes = Vec::with_capacity(scene.meshes.len() + 1);
        let mut objects = Vec::with_capacity(scene.meshes.len());
        for (index, (entry, data)) in scene.meshes.iter().zip(scene.load_meshes()).enumerate() {
            meshes.push(MeshBuffers::from_mesh(&device, &data, &entry.name));
            objects.push(DrawObject::new(&device, &object_layout, index, &entry.name));
        }
        let cube = meshes.len();
        meshes.push(MeshBuffers::from_mesh(&device, &MeshData::unit_cube(), "marker-cube"));
        let sun_marker = DrawObject::new(&device, &object_layout, cube, "sun-marker");
        let point_marker = DrawObject::new(&device, &object_layout, cube, "point-marker");
        pop_error_scopes(&device, "resource creation");

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            shadow,
            main,
            meshes,
            objects,
            colors: scene.meshes.iter().map(|entry| entry.color).collect(),
            sun_marker,
            point_marker,
            frame: None,
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Resizes the swap chain and depth buffer to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    fn upload_objects(&self, uniforms: &RenderUniforms) {
        let per_object = uniforms.models.iter().zip(&uniforms.normal_matrices);
        for ((object, color), (model, normal)) in
            self.objects.iter().zip(&self.colors).zip(per_object)
        {
            object.upload(&self.queue, &ObjectConstants::new(*model, *normal, *color));
        }
        self.sun_marker
            .upload(&self.queue, &ObjectConstants::marker(uniforms.sun_marker));
        if let Some(model) = uniforms.point_marker {
            self.point_marker
                .upload(&self.queue, &ObjectConstants::marker(model));
        }
    }
}

impl FrameTarget for Renderer {
    type Error = wgpu::SurfaceError;

    fn begin_frame(&mut self) -> Result<(), Self::Error> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        push_error_scopes(&self.device);
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        self.frame = Some(FrameInFlight {
            output,
            view,
            encoder,
        });
        Ok(())
    }

    fn shadow_pass(&mut self, uniforms: &RenderUniforms) {
        self.upload_objects(uniforms);
        self.shadow.upload(
            &self.queue,
            &LightSpaceUniform::new(uniforms.light_space.combined),
        );
        if let Some(frame) = self.frame.as_mut() {
            self.shadow
                .record(&mut frame.encoder, &self.objects, &self.meshes);
        }
    }

    fn main_pass(&mut self, uniforms: &RenderUniforms) {
        self.main.upload(&self.queue, uniforms);
        let mut markers = vec![&self.sun_marker];
        if uniforms.point_marker.is_some() {
            markers.push(&self.point_marker);
        }
        if let Some(frame) = self.frame.as_mut() {
            self.main.record(
                &mut frame.encoder,
                &frame.view,
                &self.depth,
                uniforms,
                &self.objects,
                &markers,
                &self.meshes,
            );
        }
    }

    fn present(&mut self) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        self.window.pre_present_notify();
        frame.output.present();
        pop_error_scopes(&self.device, "frame");
    }

    fn aspect_ratio(&self) -> f32 {
        if self.size.height == 0 {
            1.0
        } else {
            self.size.width as f32 / self.size.height as f32
        }
    }
}

fn push_error_scopes(device: &wgpu::Device) {
    for filter in ERROR_FILTERS {
        device.push_error_scope(filter);
    }
}

/// Pops the scopes pushed by [`push_error_scopes`] and logs what they caught.
fn pop_error_scopes(device: &wgpu::Device, stage: &'static str) {
    for _ in ERROR_FILTERS {
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            error!("{}", GpuDiagnostic::from_wgpu(stage, &error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncaptured_errors_are_logged_not_fatal() {
        let handler = log_uncaptured_errors();
        (*handler)(wgpu::Error::OutOfMemory {
            source: Box::new(std::io::Error::other("device exhausted")),
        });
    }
}
