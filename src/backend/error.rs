// Typed errors for the Vulkan backend
//
// Creation/resource errors (BackendError) are fatal to initialization.
// Per-frame errors (FrameError) are classified recoverable or fatal so the
// driver can recreate the swapchain instead of dying on a resize.

use std::path::PathBuf;
use std::time::Duration;

use ash::vk;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),

    #[error("failed to load Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("GPU allocation failed: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    #[error("no GPU meets the device requirements (Vulkan 1.3, graphics + present)")]
    NoSuitableGpu,

    #[error("failed to read shader {path:?}: {source}")]
    ShaderLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("buffer size must be non-zero")]
    EmptyBuffer,

    #[error("allocator already torn down")]
    AllocatorUnavailable,

    #[error("pipeline description is missing {0}")]
    IncompletePipeline(&'static str),
}

/// Outcome of a single frame. Only `SwapchainOutOfDate` is recoverable; a
/// fence timeout means the GPU hung and everything else is a driver-level
/// failure.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("fence wait exceeded {0:?}; GPU work never completed")]
    FenceTimeout(Duration),

    #[error("swapchain is out of date and must be recreated")]
    SwapchainOutOfDate,

    #[error("Vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl FrameError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::SwapchainOutOfDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_out_of_date_is_recoverable() {
        assert!(FrameError::SwapchainOutOfDate.is_recoverable());
        assert!(!FrameError::FenceTimeout(Duration::from_secs(1)).is_recoverable());
        assert!(!FrameError::Vulkan(vk::Result::ERROR_DEVICE_LOST).is_recoverable());
        assert!(!FrameError::Backend(BackendError::EmptyBuffer).is_recoverable());
    }
}
