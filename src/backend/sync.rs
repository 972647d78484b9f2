// Synchronization primitives
//
// One fence (CPU<->GPU) plus two binary semaphores (GPU<->GPU) per frame
// slot. The fence starts signaled so the very first wait returns at once.

use std::sync::Arc;
use std::time::Duration;

use ash::vk;

use super::error::{BackendError, FrameError};
use super::VulkanDevice;

/// Upper bound on a fence wait. Hitting it means the GPU hung; the frame is
/// not retried.
pub const FENCE_TIMEOUT: Duration = Duration::from_secs(1);

/// Frame synchronization - one per frame in flight
pub struct FrameSync {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub in_flight_fence: vk::Fence,
}

impl FrameSync {
    pub fn new(device: &Arc<VulkanDevice>) -> Result<Self, BackendError> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let fence_info = vk::FenceCreateInfo::default()
            .flags(vk::FenceCreateFlags::SIGNALED); // Start signaled

        unsafe {
            Ok(Self {
                image_available: device.device.create_semaphore(&semaphore_info, None)?,
                render_finished: device.device.create_semaphore(&semaphore_info, None)?,
                in_flight_fence: device.device.create_fence(&fence_info, None)?,
            })
        }
    }

    /// Block until the GPU work that last used this slot has completed.
    pub fn wait(&self, device: &ash::Device) -> Result<(), FrameError> {
        let result = unsafe {
            device.wait_for_fences(
                &[self.in_flight_fence],
                true,
                FENCE_TIMEOUT.as_nanos() as u64,
            )
        };

        match result {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(FrameError::FenceTimeout(FENCE_TIMEOUT)),
            Err(e) => Err(e.into()),
        }
    }

    /// Return the fence to the unsignaled state. Call only once the frame is
    /// certain to submit, or the next wait will never wake up.
    pub fn reset(&self, device: &ash::Device) -> Result<(), FrameError> {
        unsafe { device.reset_fences(&[self.in_flight_fence])? };
        Ok(())
    }

    /// Submit the recorded command buffer: color output waits on
    /// `image_available`; completion signals `render_finished` and the fence.
    pub fn submit(
        &self,
        device: &ash::Device,
        queue: vk::Queue,
        cmd: vk::CommandBuffer,
    ) -> Result<(), FrameError> {
        let wait_semaphores = [self.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [cmd];
        let signal_semaphores = [self.render_finished];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe { device.queue_submit(queue, &[submit_info], self.in_flight_fence)? };
        Ok(())
    }

    pub fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.image_available, None);
            device.destroy_semaphore(self.render_finished, None);
            device.destroy_fence(self.in_flight_fence, None);
        }
    }
}
