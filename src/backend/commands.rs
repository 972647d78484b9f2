// Per-frame command recording
//
// One linear command list per frame: transition the swapchain image to a
// drawable layout, run a dynamic render pass with a single draw, transition
// back for presentation. The transition sequence is always
// UNDEFINED -> COLOR_ATTACHMENT_OPTIMAL -> PRESENT_SRC_KHR.

use ash::vk;

use super::error::FrameError;
use super::vertex::PushConstants;

const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

/// Everything one frame's draw needs, resolved by the driver.
pub struct FrameDraw {
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub vertex_buffer: vk::Buffer,
    pub vertex_count: u32,
    pub push_constants: PushConstants,
    pub clear_color: [f32; 4],
}

/// An image barrier plus the pipeline stages it runs between.
struct Transition<'a> {
    barrier: vk::ImageMemoryBarrier<'a>,
    src_stage: vk::PipelineStageFlags,
    dst_stage: vk::PipelineStageFlags,
}

/// UNDEFINED -> COLOR_ATTACHMENT_OPTIMAL: nothing to wait on, but color
/// writes must not start until the transition completes.
fn to_color_attachment(image: vk::Image) -> Transition<'static> {
    Transition {
        barrier: vk::ImageMemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(COLOR_RANGE),
        src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
        dst_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    }
}

/// COLOR_ATTACHMENT_OPTIMAL -> PRESENT_SRC_KHR: flush the color writes,
/// nothing downstream to block.
fn to_present(image: vk::Image) -> Transition<'static> {
    Transition {
        barrier: vk::ImageMemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .dst_access_mask(vk::AccessFlags::empty())
            .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(COLOR_RANGE),
        src_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_stage: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
    }
}

fn emit_transition(device: &ash::Device, cmd: vk::CommandBuffer, transition: &Transition) {
    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            transition.src_stage,
            transition.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            std::slice::from_ref(&transition.barrier),
        );
    }
}

/// Record one frame into `cmd`: reset, transition, dynamic render pass with a
/// single non-indexed draw, transition back, end.
pub fn record_frame(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    view: vk::ImageView,
    extent: vk::Extent2D,
    draw: &FrameDraw,
) -> Result<(), FrameError> {
    unsafe {
        device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;

        // Recorded fresh every frame, so let the driver optimize for one use
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        device.begin_command_buffer(cmd, &begin_info)?;

        emit_transition(device, cmd, &to_color_attachment(image));

        let clear_value = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: draw.clear_color,
            },
        };

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(clear_value);

        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment));

        device.cmd_begin_rendering(cmd, &rendering_info);

        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, draw.pipeline);

        // Viewport and scissor are pipeline dynamic state, set to the current
        // swapchain extent
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        device.cmd_set_viewport(cmd, 0, &[viewport]);

        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        device.cmd_set_scissor(cmd, 0, &[scissor]);

        device.cmd_bind_vertex_buffers(cmd, 0, &[draw.vertex_buffer], &[0]);

        device.cmd_push_constants(
            cmd,
            draw.pipeline_layout,
            vk::ShaderStageFlags::VERTEX,
            0,
            bytemuck::bytes_of(&draw.push_constants),
        );

        device.cmd_draw(cmd, draw.vertex_count, 1, 0, 0);

        device.cmd_end_rendering(cmd);

        emit_transition(device, cmd, &to_present(image));

        device.end_command_buffer(cmd)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn draw_transition_waits_for_nothing_and_blocks_color_writes() {
        let image = vk::Image::from_raw(1);
        let t = to_color_attachment(image);
        assert_eq!(t.barrier.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(t.barrier.new_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(t.barrier.src_access_mask, vk::AccessFlags::empty());
        assert_eq!(
            t.barrier.dst_access_mask,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        );
        assert_eq!(t.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(t.dst_stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(t.barrier.image, image);
    }

    #[test]
    fn present_transition_is_the_exact_inverse() {
        let image = vk::Image::from_raw(7);
        let t = to_present(image);
        assert_eq!(t.barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(t.barrier.new_layout, vk::ImageLayout::PRESENT_SRC_KHR);
        assert_eq!(
            t.barrier.src_access_mask,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        );
        assert_eq!(t.barrier.dst_access_mask, vk::AccessFlags::empty());
        assert_eq!(t.src_stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(t.dst_stage, vk::PipelineStageFlags::BOTTOM_OF_PIPE);
    }

    #[test]
    fn transitions_cover_the_full_color_subresource() {
        let t = to_color_attachment(vk::Image::from_raw(1));
        let range = t.barrier.subresource_range;
        assert_eq!(range.aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(range.base_mip_level, 0);
        assert_eq!(range.level_count, 1);
        assert_eq!(range.layer_count, 1);
    }
}
