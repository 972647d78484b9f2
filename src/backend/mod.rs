// Backend module - Vulkan abstraction layer
//
// Design: Thin wrapper around ash with safety and ergonomics
// Performance: Zero-cost abstractions, explicit control

pub mod buffer;
pub mod commands;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use buffer::AllocatedBuffer;
pub use device::VulkanDevice;
pub use error::{BackendError, FrameError};
pub use swapchain::Swapchain;
