use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::gl::TextureFilter;

pub(super) const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// What a texture needs before its next use.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub(super) struct TextureWork {
    /// Rebuild the GPU texture from `base` (and its mips).
    pub(super) upload: bool,
    /// Recreate the bind group with the current sampler.
    pub(super) rebind: bool,
}

/// CPU-side state of a texture object plus its GPU realisation. Changes only
/// mark the record; the upload happens once, when the frame is flushed.
pub(super) struct TextureRecord {
    pub(super) label: String,
    pub(super) base: Option<RgbaImage>,
    pub(super) mipmapped: bool,
    pub(super) mag: TextureFilter,
    pub(super) min: TextureFilter,
    pub(super) gpu: Option<GpuTexture>,
    pub(super) bind_group: Option<wgpu::BindGroup>,
    levels_dirty: bool,
    sampler_dirty: bool,
}

impl TextureRecord {
    pub(super) fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            base: None,
            mipmapped: false,
            mag: TextureFilter::Linear,
            min: TextureFilter::Linear,
            gpu: None,
            bind_group: None,
            levels_dirty: false,
            sampler_dirty: false,
        }
    }

    /// Replaces level 0 and drops any mip chain.
    pub(super) fn set_image(&mut self, image: RgbaImage) {
        self.base = Some(image);
        self.mipmapped = false;
        self.levels_dirty = true;
    }

    /// Returns false when there is no level 0 to build from.
    pub(super) fn request_mipmaps(&mut self) -> bool {
        if self.base.is_none() {
            return false;
        }
        self.mipmapped = true;
        self.levels_dirty = true;
        true
    }

    pub(super) fn set_filter(&mut self, mag: TextureFilter, min: TextureFilter) {
        self.mag = mag;
        self.min = min;
        self.sampler_dirty = true;
    }

    /// Returns the pending work and marks the record clean.
    pub(super) fn take_work(&mut self) -> TextureWork {
        let work = TextureWork {
            upload: self.levels_dirty && self.base.is_some(),
            rebind: self.levels_dirty || self.sampler_dirty,
        };
        self.levels_dirty = false;
        self.sampler_dirty = false;
        work
    }
}

pub(super) struct GpuTexture {
    _texture: wgpu::Texture,
    pub(super) view: wgpu::TextureView,
}

/// Number of levels in a full mip chain for `width`×`height`.
pub(super) fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Levels 1.. of the mip chain, halving down to 1×1. Each level is filtered
/// from the one above it.
pub(super) fn mip_chain(base: &RgbaImage) -> Vec<RgbaImage> {
    let count = mip_level_count(base.width(), base.height());
    let mut levels: Vec<RgbaImage> = Vec::with_capacity(count.saturating_sub(1) as usize);

    for level in 1..count {
        let w = (base.width() >> level).max(1);
        let h = (base.height() >> level).max(1);
        let prev = levels.last().unwrap_or(base);
        let next = imageops::resize(prev, w, h, FilterType::Triangle);
        levels.push(next);
    }

    levels
}

/// Creates a sampled texture from `base` plus its reduced `mips`.
pub(super) fn upload_levels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    base: &RgbaImage,
    mips: &[RgbaImage],
) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: base.width(),
            height: base.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1 + mips.len() as u32,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (level, image) in std::iter::once(base).chain(mips).enumerate() {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: level as u32,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
        );
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        _texture: texture,
        view,
    }
}

pub(super) fn sampler_descriptor(
    mag: TextureFilter,
    min: TextureFilter,
) -> wgpu::SamplerDescriptor<'static> {
    let mag_filter = match mag {
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        TextureFilter::Linear | TextureFilter::LinearMipmapLinear => wgpu::FilterMode::Linear,
    };
    let (min_filter, mipmap_filter) = match min {
        TextureFilter::Nearest => (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest),
        TextureFilter::Linear => (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Nearest),
        TextureFilter::LinearMipmapLinear => {
            (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear)
        }
    };

    wgpu::SamplerDescriptor {
        label: Some("vertexshadow sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        mag_filter,
        min_filter,
        mipmap_filter,
        ..Default::default()
    }
}
