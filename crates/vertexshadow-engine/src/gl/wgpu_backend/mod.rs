//! wgpu implementation of the GL-style seam.
//!
//! Calls mutate a CPU mirror of GL binding state. Each `draw_triangles`
//! snapshots that state into a draw record (pipeline key, vertex buffers,
//! uniform slot, texture) and [`WgpuGl::flush`] replays the records into a
//! single render pass.

mod pipeline;
mod texture;
mod uniforms;

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use glam::{Mat4, Vec4};
use image::{Rgba, RgbaImage};
use wgpu::util::DeviceExt;

use self::pipeline::{PipelineKey, PipelineTargets, VertexInput};
use self::texture::{GpuTexture, TextureRecord};
use self::uniforms::{UniformArena, UniformStaging};
use super::reflect::{ProgramLayout, UniformKind};
use super::{AttribLayout, GraphicsApi, ShaderError, TextureFilter};
use crate::device::Gpu;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferId(u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProgramId(u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(u32);

/// Resolved uniform: owning program plus byte offset into its block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    program: ProgramId,
    offset: u32,
    kind: UniformKind,
}

struct ProgramRecord {
    label: String,
    layout: ProgramLayout,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    /// Current uniform values, uploaded per draw.
    block: Vec<u8>,
}

#[derive(Debug, Copy, Clone, Default)]
struct AttribState {
    pointer: Option<(BufferId, AttribLayout)>,
    enabled: bool,
}

#[derive(Debug, Default)]
struct BindingState {
    program: Option<ProgramId>,
    array_buffer: Option<BufferId>,
    element_buffer: Option<BufferId>,
    texture: Option<TextureId>,
    attributes: BTreeMap<u32, AttribState>,
    depth_test: bool,
}

struct DrawCall {
    pipeline: PipelineKey,
    vertex_buffers: Vec<(BufferId, u64)>,
    element_buffer: BufferId,
    index_count: u32,
    uniform_offset: u32,
    texture: Option<TextureId>,
}

pub struct WgpuGl {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    samplers: HashMap<(TextureFilter, TextureFilter), wgpu::Sampler>,
    _fallback_texture: GpuTexture,
    fallback_bind_group: wgpu::BindGroup,

    buffers: Vec<wgpu::Buffer>,
    programs: Vec<ProgramRecord>,
    textures: Vec<TextureRecord>,

    state: BindingState,
    clear: Option<[f32; 4]>,
    draws: Vec<DrawCall>,
    staging: UniformStaging,
    arena: UniformArena,
}

impl WgpuGl {
    pub fn new(gpu: &Gpu<'_>) -> Self {
        let device = gpu.device().clone();
        let queue = gpu.queue().clone();

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vertexshadow uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vertexshadow texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vertexshadow pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        let white = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let fallback_texture = texture::upload_levels(&device, &queue, "vertexshadow white", &white, &[]);
        let fallback_sampler =
            device.create_sampler(&texture::sampler_descriptor(TextureFilter::Linear, TextureFilter::Linear));
        let fallback_bind_group =
            texture_bind_group(&device, &texture_layout, &fallback_texture.view, &fallback_sampler);

        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        let staging = UniformStaging::new(alignment);
        let arena = UniformArena::new(&device, &uniform_layout, staging.slot_size(), 16 * staging.slot_size() as u64);

        Self {
            device,
            queue,
            color_format: gpu.surface_format(),
            depth_format: gpu.depth_format(),
            uniform_layout,
            texture_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            samplers: HashMap::new(),
            _fallback_texture: fallback_texture,
            fallback_bind_group,
            buffers: Vec::new(),
            programs: Vec::new(),
            textures: Vec::new(),
            state: BindingState::default(),
            clear: None,
            draws: Vec::new(),
            staging,
            arena,
        }
    }

    /// Replays the draws recorded since the last flush into one render pass.
    pub fn flush(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) {
        self.realize_pending_textures();

        let clear = self.clear.take();
        let draws = std::mem::take(&mut self.draws);
        if draws.is_empty() && clear.is_none() {
            return;
        }

        self.arena
            .upload(&self.device, &self.queue, &self.uniform_layout, &self.staging);
        self.staging.clear();

        let (color_load, depth_load) = match clear {
            Some([r, g, b, a]) => (
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: f64::from(r),
                    g: f64::from(g),
                    b: f64::from(b),
                    a: f64::from(a),
                }),
                wgpu::LoadOp::Clear(1.0),
            ),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vertexshadow pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for draw in &draws {
            let Some(pipeline) = self.pipelines.get(&draw.pipeline) else {
                continue;
            };
            let Some(elements) = self.buffers.get(draw.element_buffer.0 as usize) else {
                continue;
            };

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, self.arena.bind_group(), &[draw.uniform_offset]);

            let textures = draw
                .texture
                .and_then(|id| self.textures.get(id.0 as usize))
                .and_then(|t| t.bind_group.as_ref())
                .unwrap_or(&self.fallback_bind_group);
            pass.set_bind_group(1, textures, &[]);

            for (slot, (buffer, offset)) in draw.vertex_buffers.iter().enumerate() {
                if let Some(buffer) = self.buffers.get(buffer.0 as usize) {
                    pass.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
                }
            }
            pass.set_index_buffer(elements.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }

    fn create_buffer(&mut self, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> BufferId {
        // Zero-sized buffers are invalid; keep one element of padding.
        let padded;
        let contents = if contents.is_empty() {
            padded = [0u8; 4];
            &padded[..]
        } else {
            contents
        };

        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        });
        self.buffers.push(buffer);
        BufferId(self.buffers.len() as u32 - 1)
    }

    fn write_uniform(&mut self, slot: Option<&UniformSlot>, kind: UniformKind, bytes: &[u8]) {
        let Some(slot) = slot else {
            return;
        };
        if self.state.program != Some(slot.program) {
            log::warn!("uniform upload ignored: owning program is not current");
            return;
        }
        if slot.kind != kind {
            log::warn!("uniform upload ignored: expected {:?}, got {kind:?}", slot.kind);
            return;
        }
        let Some(program) = self.programs.get_mut(slot.program.0 as usize) else {
            return;
        };
        let start = slot.offset as usize;
        if let Some(dst) = program.block.get_mut(start..start + bytes.len()) {
            dst.copy_from_slice(bytes);
        }
    }

    fn bound_texture(&mut self) -> Option<&mut TextureRecord> {
        let id = self.state.texture?.0 as usize;
        self.textures.get_mut(id)
    }

    /// Uploads every texture whose levels or sampler changed since the last
    /// flush. Each texture is uploaded at most once per frame.
    fn realize_pending_textures(&mut self) {
        for index in 0..self.textures.len() {
            let Some(record) = self.textures.get_mut(index) else {
                continue;
            };
            let work = record.take_work();
            if work.upload {
                if let Some(base) = &record.base {
                    let mips = if record.mipmapped {
                        texture::mip_chain(base)
                    } else {
                        Vec::new()
                    };
                    record.gpu = Some(texture::upload_levels(
                        &self.device,
                        &self.queue,
                        &record.label,
                        base,
                        &mips,
                    ));
                }
            }
            if work.rebind {
                self.refresh_texture_bind_group(index);
            }
        }
    }

    fn refresh_texture_bind_group(&mut self, index: usize) {
        let Some(record) = self.textures.get(index) else {
            return;
        };
        let key = (record.mag, record.min);
        let sampler = self
            .samplers
            .entry(key)
            .or_insert_with(|| self.device.create_sampler(&texture::sampler_descriptor(key.0, key.1)))
            .clone();

        let Some(record) = self.textures.get_mut(index) else {
            return;
        };
        record.bind_group = record
            .gpu
            .as_ref()
            .map(|gpu| texture_bind_group(&self.device, &self.texture_layout, &gpu.view, &sampler));
    }
}

fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("vertexshadow texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

impl GraphicsApi for WgpuGl {
    type Buffer = BufferId;
    type Program = ProgramId;
    type Texture = TextureId;
    type UniformLocation = UniformSlot;

    fn create_array_buffer(&mut self, label: &str, data: &[f32]) -> BufferId {
        self.create_buffer(label, bytemuck::cast_slice(data), wgpu::BufferUsages::VERTEX)
    }

    fn create_element_buffer(&mut self, label: &str, data: &[u16]) -> BufferId {
        // Index buffer sizes must be a multiple of 4 bytes.
        let mut padded = data.to_vec();
        if padded.len() % 2 == 1 {
            padded.push(0);
        }
        self.create_buffer(label, bytemuck::cast_slice(&padded), wgpu::BufferUsages::INDEX)
    }

    fn create_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, ShaderError> {
        let layout = ProgramLayout::from_wgsl(vertex_source, fragment_source)?;

        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(vertex_source.to_string())),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(fragment_source.to_string())),
        });

        log::debug!(
            "program `{label}`: {} attributes, {} uniforms, {} byte block",
            layout.attributes.len(),
            layout.uniforms.len(),
            layout.uniform_block_size
        );

        self.programs.push(ProgramRecord {
            label: label.to_string(),
            block: vec![0; layout.uniform_block_size as usize],
            layout,
            vertex,
            fragment,
        });
        Ok(ProgramId(self.programs.len() as u32 - 1))
    }

    fn attrib_location(&self, program: &ProgramId, name: &str) -> Option<u32> {
        let record = self.programs.get(program.0 as usize)?;
        record.layout.attribute(name).map(|a| a.location)
    }

    fn uniform_location(&self, program: &ProgramId, name: &str) -> Option<UniformSlot> {
        let record = self.programs.get(program.0 as usize)?;
        let info = record.layout.uniform(name)?;
        Some(UniformSlot {
            program: *program,
            offset: info.offset,
            kind: info.kind,
        })
    }

    fn use_program(&mut self, program: &ProgramId) {
        self.state.program = Some(*program);
    }

    fn uniform_matrix4(&mut self, location: Option<&UniformSlot>, value: &Mat4) {
        self.write_uniform(location, UniformKind::Mat4, bytemuck::bytes_of(value));
    }

    fn uniform_vec4(&mut self, location: Option<&UniformSlot>, value: Vec4) {
        self.write_uniform(location, UniformKind::Vec4, bytemuck::bytes_of(&value));
    }

    fn bind_array_buffer(&mut self, buffer: &BufferId) {
        self.state.array_buffer = Some(*buffer);
    }

    fn vertex_attrib_pointer(&mut self, location: u32, layout: AttribLayout) {
        let Some(buffer) = self.state.array_buffer else {
            log::warn!("vertex_attrib_pointer({location}) with no array buffer bound");
            return;
        };
        self.state.attributes.entry(location).or_default().pointer = Some((buffer, layout));
    }

    fn enable_vertex_attrib(&mut self, location: u32) {
        self.state.attributes.entry(location).or_default().enabled = true;
    }

    fn disable_vertex_attrib(&mut self, location: u32) {
        self.state.attributes.entry(location).or_default().enabled = false;
    }

    fn bind_element_buffer(&mut self, buffer: &BufferId) {
        self.state.element_buffer = Some(*buffer);
    }

    fn draw_triangles(&mut self, index_count: u32) {
        let Some(program_id) = self.state.program else {
            log::warn!("draw skipped: no program in use");
            return;
        };
        let Some(element_buffer) = self.state.element_buffer else {
            log::warn!("draw skipped: no element buffer bound");
            return;
        };
        let Some(program) = self.programs.get(program_id.0 as usize) else {
            return;
        };

        let mut inputs = Vec::with_capacity(program.layout.attributes.len());
        let mut vertex_buffers = Vec::with_capacity(program.layout.attributes.len());
        for attr in &program.layout.attributes {
            let bound = self
                .state
                .attributes
                .get(&attr.location)
                .filter(|a| a.enabled)
                .and_then(|a| a.pointer);
            let Some((buffer, layout)) = bound else {
                log::warn!(
                    "draw with `{}` skipped: attribute `{}` is not enabled",
                    program.label,
                    attr.name
                );
                return;
            };
            inputs.push(VertexInput {
                location: attr.location,
                components: layout.components,
                stride: layout.effective_stride(),
            });
            vertex_buffers.push((buffer, u64::from(layout.offset)));
        }

        let key = PipelineKey {
            program: program_id.0,
            inputs,
            depth_test: self.state.depth_test,
        };

        if !self.pipelines.contains_key(&key) {
            let targets = PipelineTargets {
                layout: &self.pipeline_layout,
                color_format: self.color_format,
                depth_format: self.depth_format,
            };
            let Some(created) = pipeline::create_pipeline(
                &self.device,
                &targets,
                &program.label,
                &program.vertex,
                &program.fragment,
                &key,
            ) else {
                log::warn!("draw with `{}` skipped: unsupported vertex layout", program.label);
                return;
            };
            log::debug!("created pipeline for `{}` ({} inputs)", program.label, key.inputs.len());
            self.pipelines.insert(key.clone(), created);
        }

        let uniform_offset = self.staging.push(&program.block);
        self.draws.push(DrawCall {
            pipeline: key,
            vertex_buffers,
            element_buffer,
            index_count,
            uniform_offset,
            texture: self.state.texture,
        });
    }

    fn create_texture(&mut self, label: &str) -> TextureId {
        self.textures.push(TextureRecord::new(label));
        TextureId(self.textures.len() as u32 - 1)
    }

    fn bind_texture(&mut self, texture: Option<&TextureId>) {
        self.state.texture = texture.copied();
    }

    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn tex_image_2d(&mut self, image: &RgbaImage) {
        let max = self.max_texture_dimension();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || width.max(height) > max {
            log::error!("tex_image_2d ignored: {width}x{height} outside 1..={max}");
            return;
        }
        let Some(record) = self.bound_texture() else {
            log::warn!("tex_image_2d with no texture bound");
            return;
        };
        record.set_image(image.clone());
    }

    fn generate_mipmap(&mut self) {
        if let Some(record) = self.bound_texture() {
            record.request_mipmaps();
        }
    }

    fn tex_filter(&mut self, mag: TextureFilter, min: TextureFilter) {
        if let Some(record) = self.bound_texture() {
            record.set_filter(mag, min);
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        // A full clear hides everything recorded before it.
        self.draws.clear();
        self.staging.clear();
        self.clear = Some(color);
    }

    fn enable_depth_test(&mut self) {
        self.state.depth_test = true;
    }
}
