use log::warn;

use super::mesh::{uniform_entry, vertex_layout, DrawObject, MeshBuffers};
use super::shaders;
use super::uniforms::LightSpaceUniform;

/// Square depth texture written from the sun and sampled by the lit pass.
pub(crate) struct ShadowMap {
    _texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    /// Depth comparison sampler used while lighting.
    pub(crate) compare_sampler: wgpu::Sampler,
    /// Plain sampler used by the depth-map view.
    pub(crate) debug_sampler: wgpu::Sampler,
    pub(crate) size: u32,
}

impl ShadowMap {
    pub(crate) const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Creates the map at `requested` texels per side, or at the device
    /// limit when that is smaller.
    pub(crate) fn create(device: &wgpu::Device, requested: u32) -> Self {
        let limit = device.limits().max_texture_dimension_2d;
        let size = if requested > limit {
            warn!("shadow map of {requested} texels exceeds the device limit; using {limit}");
            limit
        } else {
            requested.max(1)
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow-map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let compare_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow-compare-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let debug_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow-debug-sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            compare_sampler,
            debug_sampler,
            size,
        }
    }
}

/// Depth-only pass that renders every scene object from the sun.
pub(crate) struct ShadowMapStage {
    pub(crate) map: ShadowMap,
    pipeline: wgpu::RenderPipeline,
    light_buffer: wgpu::Buffer,
    light_bind_group: wgpu::BindGroup,
}

impl ShadowMapStage {
    pub(crate) fn new(
        device: &wgpu::Device,
        object_layout: &wgpu::BindGroupLayout,
        requested_size: u32,
    ) -> Self {
        let map = ShadowMap::create(device, requested_size);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow-depth-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::depth_shader().into()),
        });

        let light_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow-light-layout"),
            entries: &[uniform_entry::<LightSpaceUniform>(
                0,
                wgpu::ShaderStages::VERTEX,
            )],
        });
        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shadow-light-uniform"),
            size: std::mem::size_of::<LightSpaceUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow-light-bind-group"),
            layout: &light_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow-pipeline-layout"),
            bind_group_layouts: &[&light_layout, object_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout(false)],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: ShadowMap::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: None,
            multiview: None,
            cache: None,
        });

        Self {
            map,
            pipeline,
            light_buffer,
            light_bind_group,
        }
    }

    pub(crate) fn upload(&self, queue: &wgpu::Queue, light: &LightSpaceUniform) {
        queue.write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(light));
    }

    /// Clears the map to the far plane and draws every object into it.
    pub(crate) fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        objects: &[DrawObject],
        meshes: &[MeshBuffers],
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadow-pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.light_bind_group, &[]);
        for object in objects {
            object.draw(&mut pass, meshes);
        }
    }
}
