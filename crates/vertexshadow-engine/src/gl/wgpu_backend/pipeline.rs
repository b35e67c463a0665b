use crate::gl::reflect::{FRAGMENT_ENTRY, VERTEX_ENTRY};

/// Vertex attribute as seen by a pipeline: one buffer slot per attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct VertexInput {
    pub(super) location: u32,
    pub(super) components: u8,
    pub(super) stride: u32,
}

/// Everything that selects a distinct render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub(super) program: u32,
    pub(super) inputs: Vec<VertexInput>,
    pub(super) depth_test: bool,
}

pub(super) fn vertex_format(components: u8) -> Option<wgpu::VertexFormat> {
    match components {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

pub(super) fn depth_state(format: wgpu::TextureFormat, depth_test: bool) -> wgpu::DepthStencilState {
    let (depth_write_enabled, depth_compare) = if depth_test {
        (true, wgpu::CompareFunction::Less)
    } else {
        (false, wgpu::CompareFunction::Always)
    };

    wgpu::DepthStencilState {
        format,
        depth_write_enabled,
        depth_compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

pub(super) struct PipelineTargets<'a> {
    pub(super) layout: &'a wgpu::PipelineLayout,
    pub(super) color_format: wgpu::TextureFormat,
    pub(super) depth_format: wgpu::TextureFormat,
}

pub(super) fn create_pipeline(
    device: &wgpu::Device,
    targets: &PipelineTargets<'_>,
    label: &str,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    key: &PipelineKey,
) -> Option<wgpu::RenderPipeline> {
    let attributes = key
        .inputs
        .iter()
        .map(|input| {
            Some([wgpu::VertexAttribute {
                format: vertex_format(input.components)?,
                offset: 0,
                shader_location: input.location,
            }])
        })
        .collect::<Option<Vec<_>>>()?;

    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
        .inputs
        .iter()
        .zip(&attributes)
        .map(|(input, attrs)| wgpu::VertexBufferLayout {
            array_stride: u64::from(input.stride),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attrs,
        })
        .collect();

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(targets.layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some(VERTEX_ENTRY),
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some(FRAGMENT_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: targets.color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(depth_state(targets.depth_format, key.depth_test)),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    Some(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_counts_map_to_float_formats() {
        assert_eq!(vertex_format(3), Some(wgpu::VertexFormat::Float32x3));
        assert_eq!(vertex_format(2), Some(wgpu::VertexFormat::Float32x2));
        assert_eq!(vertex_format(0), None);
        assert_eq!(vertex_format(5), None);
    }

    #[test]
    fn disabled_depth_test_neither_tests_nor_writes() {
        let off = depth_state(wgpu::TextureFormat::Depth24Plus, false);
        assert!(!off.depth_write_enabled);
        assert_eq!(off.depth_compare, wgpu::CompareFunction::Always);

        let on = depth_state(wgpu::TextureFormat::Depth24Plus, true);
        assert!(on.depth_write_enabled);
        assert_eq!(on.depth_compare, wgpu::CompareFunction::Less);
    }
}
