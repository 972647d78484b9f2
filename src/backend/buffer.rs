// Allocator-backed GPU buffers
//
// A buffer handle and its allocation are created and destroyed strictly as a
// pair; the allocation is never reachable once the buffer is gone.

use ash::vk;
use bytemuck::Pod;
use gpu_allocator::vulkan::{AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;

use super::error::BackendError;
use super::VulkanDevice;

/// Zero-size requests fail here, not as a bind or draw error much later.
fn validate_size(size: vk::DeviceSize) -> Result<(), BackendError> {
    if size == 0 {
        return Err(BackendError::EmptyBuffer);
    }
    Ok(())
}

/// A `vk::Buffer` paired with the allocation backing it.
pub struct AllocatedBuffer {
    pub buffer: vk::Buffer,
    allocation: Option<gpu_allocator::vulkan::Allocation>,
    size: vk::DeviceSize,
}

impl AllocatedBuffer {
    /// Create a buffer of `size` bytes with the given usage and residency.
    pub fn new(
        device: &VulkanDevice,
        name: &str,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> Result<Self, BackendError> {
        validate_size(size)?;

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.device.create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.device.get_buffer_memory_requirements(buffer) };

        let allocation_result = {
            let mut guard = device.allocator()?;
            let allocator = guard.as_mut().ok_or(BackendError::AllocatorUnavailable)?;
            allocator.allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
        };

        let allocation = match allocation_result {
            Ok(allocation) => allocation,
            Err(e) => {
                // Don't leak the buffer handle when the memory never arrived
                unsafe { device.device.destroy_buffer(buffer, None) };
                return Err(e.into());
            }
        };

        let bind_result = unsafe {
            device
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        };
        if let Err(e) = bind_result {
            unsafe { device.device.destroy_buffer(buffer, None) };
            if let Ok(mut guard) = device.allocator() {
                if let Some(allocator) = guard.as_mut() {
                    let _ = allocator.free(allocation);
                }
            }
            return Err(e.into());
        }

        log::debug!("Created buffer '{}': {} bytes", name, size);

        Ok(Self {
            buffer,
            allocation: Some(allocation),
            size,
        })
    }

    /// Convenience: create a host-visible buffer and upload `data` into it.
    pub fn with_data<T: Pod>(
        device: &VulkanDevice,
        name: &str,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> Result<Self, BackendError> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let mut buffer = Self::new(
            device,
            name,
            bytes.len() as vk::DeviceSize,
            usage,
            MemoryLocation::CpuToGpu,
        )?;
        buffer.upload(data)?;
        Ok(buffer)
    }

    /// Copy the full slice through the host mapping. The buffer must be
    /// host-visible and at least as large as the slice.
    pub fn upload<T: Pod>(&mut self, data: &[T]) -> Result<(), BackendError> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let allocation = self
            .allocation
            .as_mut()
            .ok_or(BackendError::AllocatorUnavailable)?;
        let mapped = allocation
            .mapped_slice_mut()
            .ok_or(BackendError::AllocatorUnavailable)?;
        mapped[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Debug read-back of the mapped contents. None for unmapped memory.
    pub fn mapped_bytes(&self) -> Option<&[u8]> {
        self.allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_slice())
            .map(|mapped| &mapped[..self.size as usize])
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Destroy the buffer handle, then free its allocation, always as a pair.
    /// The caller guarantees the GPU is idle with respect to this buffer.
    /// A second call is a no-op.
    pub fn destroy(&mut self, device: &VulkanDevice) {
        let Some(allocation) = self.allocation.take() else {
            return;
        };
        unsafe { device.device.destroy_buffer(self.buffer, None) };
        if let Ok(mut guard) = device.allocator() {
            if let Some(allocator) = guard.as_mut() {
                if let Err(e) = allocator.free(allocation) {
                    log::error!("Failed to free buffer allocation: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_buffers_are_rejected() {
        assert!(matches!(
            validate_size(0),
            Err(BackendError::EmptyBuffer)
        ));
        assert!(validate_size(44).is_ok());
    }
}
