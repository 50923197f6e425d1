use std::collections::HashMap;

use log::warn;

use crate::frame::{PolygonFill, RenderUniforms};

use super::mesh::{uniform_entry, vertex_layout, DepthBuffer, DrawObject, MeshBuffers};
use super::shaders;
use super::shadow_pass::ShadowMap;
use super::skybox::SkyBox;
use super::uniforms::GlobalUniform;

/// Rasterizer mode and the device feature it needs, if any.
pub(crate) fn polygon_mode(fill: PolygonFill) -> (wgpu::PolygonMode, wgpu::Features) {
    match fill {
        PolygonFill::Fill => (wgpu::PolygonMode::Fill, wgpu::Features::empty()),
        PolygonFill::Line => (wgpu::PolygonMode::Line, wgpu::Features::POLYGON_MODE_LINE),
        PolygonFill::Point => (wgpu::PolygonMode::Point, wgpu::Features::POLYGON_MODE_POINT),
    }
}

/// Everything drawn into the window: the lit scene, the light markers and
/// the sky, or the depth-map view in their place.
pub(crate) struct MainRenderStage {
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    lit_pipelines: HashMap<PolygonFill, wgpu::RenderPipeline>,
    marker_pipeline: wgpu::RenderPipeline,
    depth_view_pipeline: wgpu::RenderPipeline,
    depth_view_bind_group: wgpu::BindGroup,
    sky: SkyBox,
    clear_color: wgpu::Color,
}

impl MainRenderStage {
    pub(crate) fn new(
        device: &wgpu::Device,
        object_layout: &wgpu::BindGroupLayout,
        shadow_map: &ShadowMap,
        color_format: wgpu::TextureFormat,
        clear_color: [f64; 3],
    ) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals-bind-layout"),
            entries: &[
                uniform_entry::<GlobalUniform>(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals-uniform"),
            size: std::mem::size_of::<GlobalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals-bind-group"),
            layout: &globals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_map.compare_sampler),
                },
            ],
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene-pipeline-layout"),
            bind_group_layouts: &[&globals_layout, object_layout],
            push_constant_ranges: &[],
        });

        let lit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lit-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::lit_shader().into()),
        });
        let features = device.features();
        let mut lit_pipelines = HashMap::new();
        for fill in [PolygonFill::Fill, PolygonFill::Line, PolygonFill::Point] {
            let (mode, required) = polygon_mode(fill);
            if !features.contains(required) {
                warn!("{fill:?} polygon mode is not supported by this adapter; it will draw filled");
                continue;
            }
            let pipeline = scene_pipeline(
                device,
                &scene_layout,
                &lit_shader,
                mode,
                true,
                color_format,
                &format!("lit-{fill:?}-pipeline"),
            );
            lit_pipelines.insert(fill, pipeline);
        }

        let marker_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("marker-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::marker_shader().into()),
        });
        let marker_pipeline = scene_pipeline(
            device,
            &scene_layout,
            &marker_shader,
            wgpu::PolygonMode::Fill,
            false,
            color_format,
            "marker-pipeline",
        );

        let (depth_view_pipeline, depth_view_bind_group) =
            depth_view(device, shadow_map, color_format);

        Self {
            globals_buffer,
            globals_bind_group,
            lit_pipelines,
            marker_pipeline,
            depth_view_pipeline,
            depth_view_bind_group,
            sky: SkyBox::new(device, color_format),
            clear_color: wgpu::Color {
                r: clear_color[0],
                g: clear_color[1],
                b: clear_color[2],
                a: 1.0,
            },
        }
    }

    pub(crate) fn upload(&self, queue: &wgpu::Queue, uniforms: &RenderUniforms) {
        let globals = GlobalUniform::from_frame(uniforms);
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        self.sky.upload(queue, uniforms.view, uniforms.sky_projection);
    }

    /// Lit path: scene objects, then markers, then the sky. With the
    /// depth-map view enabled only the full-screen depth image is drawn.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        depth: &DepthBuffer,
        uniforms: &RenderUniforms,
        objects: &[DrawObject],
        markers: &[&DrawObject],
        meshes: &[MeshBuffers],
    ) {
        if uniforms.show_depth_map {
            self.record_depth_view(encoder, target);
            return;
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let lit = self
            .lit_pipelines
            .get(&uniforms.polygon_fill)
            .or_else(|| self.lit_pipelines.get(&PolygonFill::Fill));
        if let Some(pipeline) = lit {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.globals_bind_group, &[]);
            for object in objects {
                object.draw(&mut pass, meshes);
            }
        }

        pass.set_pipeline(&self.marker_pipeline);
        pass.set_bind_group(0, &self.globals_bind_group, &[]);
        for marker in markers {
            marker.draw(&mut pass, meshes);
        }

        self.sky.draw(&mut pass);
    }

    fn record_depth_view(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("depth-view-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.depth_view_pipeline);
        pass.set_bind_group(0, &self.depth_view_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    polygon_mode: wgpu::PolygonMode,
    with_normals: bool,
    color_format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[vertex_layout(with_normals)],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

fn depth_view(
    device: &wgpu::Device,
    shadow_map: &ShadowMap,
    color_format: wgpu::TextureFormat,
) -> (wgpu::RenderPipeline, wgpu::BindGroup) {
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("depth-view-layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                count: None,
            },
        ],
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("depth-view-bind-group"),
        layout: &layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&shadow_map.debug_sampler),
            },
        ],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("depth-view-shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::DEPTH_VIEW_SHADER.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("depth-view-pipeline-layout"),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("depth-view-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    });

    (pipeline, bind_group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fill_is_featureless() {
        assert_eq!(polygon_mode(PolygonFill::Fill).1, wgpu::Features::empty());
        assert_eq!(
            polygon_mode(PolygonFill::Line),
            (wgpu::PolygonMode::Line, wgpu::Features::POLYGON_MODE_LINE)
        );
        assert_eq!(polygon_mode(PolygonFill::Point).0, wgpu::PolygonMode::Point);
    }
}
