use std::num::NonZeroU64;

use crate::gl::reflect::MAX_UNIFORM_BLOCK;

/// Per-frame uniform staging: every draw gets its own aligned slot so that
/// uniform changes between draws in the same frame are preserved.
#[derive(Debug, Default)]
pub(super) struct UniformStaging {
    bytes: Vec<u8>,
    slot_size: usize,
}

impl UniformStaging {
    pub(super) fn new(alignment: u32) -> Self {
        let slot_size = (MAX_UNIFORM_BLOCK.max(alignment) as usize).next_multiple_of(alignment.max(1) as usize);
        Self {
            bytes: Vec::new(),
            slot_size,
        }
    }

    pub(super) fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Appends a snapshot of `block` and returns its dynamic offset.
    pub(super) fn push(&mut self, block: &[u8]) -> u32 {
        let offset = self.bytes.len();
        self.bytes.resize(offset + self.slot_size, 0);
        let len = block.len().min(self.slot_size);
        self.bytes[offset..offset + len].copy_from_slice(&block[..len]);
        offset as u32
    }

    pub(super) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(super) fn clear(&mut self) {
        self.bytes.clear();
    }
}

/// GPU buffer backing the staging area, grown on demand.
pub(super) struct UniformArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
}

impl UniformArena {
    pub(super) fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        slot_size: usize,
        capacity: u64,
    ) -> Self {
        let capacity = capacity.max(slot_size as u64);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vertexshadow uniform arena"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vertexshadow uniform bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(slot_size as u64),
                }),
            }],
        });

        Self {
            buffer,
            bind_group,
            capacity,
        }
    }

    /// Uploads `staging`, reallocating when it no longer fits.
    pub(super) fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        staging: &UniformStaging,
    ) {
        let needed = staging.bytes().len() as u64;
        if needed > self.capacity {
            let capacity = needed.next_power_of_two();
            log::debug!("growing uniform arena to {capacity} bytes");
            *self = Self::new(device, layout, staging.slot_size(), capacity);
        }
        if needed > 0 {
            queue.write_buffer(&self.buffer, 0, staging.bytes());
        }
    }

    pub(super) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
