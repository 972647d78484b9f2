// Graphics pipeline construction
//
// All fixed-function and shader-stage state is gathered into one description
// struct and consumed by a single build call. Viewport and scissor are
// dynamic state so a window resize never forces a pipeline rebuild; the
// attachment formats for dynamic rendering are part of the description.

use ash::vk;

use super::error::BackendError;

/// One shader stage of the pipeline.
#[derive(Clone, Copy)]
pub struct ShaderStage {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
}

/// Complete description of a graphics pipeline. Field assignment order does
/// not matter; `build` validates that the required pieces are present.
pub struct GraphicsPipelineDesc {
    pub shader_stages: Vec<ShaderStage>,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub samples: vk::SampleCountFlags,
    pub blend_attachment: vk::PipelineColorBlendAttachmentState,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: vk::CompareOp,
    pub layout: vk::PipelineLayout,
    pub color_format: vk::Format,
    pub depth_format: vk::Format,
}

impl Default for GraphicsPipelineDesc {
    fn default() -> Self {
        Self {
            shader_stages: Vec::new(),
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::NONE,
            front_face: vk::FrontFace::CLOCKWISE,
            samples: vk::SampleCountFlags::TYPE_1,
            // No blending, full RGBA write
            blend_attachment: vk::PipelineColorBlendAttachmentState {
                blend_enable: vk::FALSE,
                color_write_mask: vk::ColorComponentFlags::RGBA,
                ..Default::default()
            },
            depth_test: false,
            depth_write: false,
            depth_compare: vk::CompareOp::ALWAYS,
            layout: vk::PipelineLayout::null(),
            color_format: vk::Format::UNDEFINED,
            depth_format: vk::Format::UNDEFINED,
        }
    }
}

impl GraphicsPipelineDesc {
    fn validate(&self) -> Result<(), BackendError> {
        if self.shader_stages.is_empty() {
            return Err(BackendError::IncompletePipeline("shader stages"));
        }
        if self.shader_stages.iter().any(|s| s.module == vk::ShaderModule::null()) {
            return Err(BackendError::IncompletePipeline("a valid shader module"));
        }
        if self.layout == vk::PipelineLayout::null() {
            return Err(BackendError::IncompletePipeline("a pipeline layout"));
        }
        if self.color_format == vk::Format::UNDEFINED {
            return Err(BackendError::IncompletePipeline("a color attachment format"));
        }
        Ok(())
    }

    /// Build the immutable pipeline object. Either a valid handle comes back
    /// or a typed error; a handle that would fail on first bind is never
    /// returned.
    pub fn build(&self, device: &ash::Device) -> Result<vk::Pipeline, BackendError> {
        self.validate()?;

        let entry_point = c"main";
        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = self
            .shader_stages
            .iter()
            .map(|stage| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage.stage)
                    .module(stage.module)
                    .name(entry_point)
            })
            .collect();

        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&self.vertex_bindings)
            .vertex_attribute_descriptions(&self.vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(self.topology)
            .primitive_restart_enable(false);

        // Counts are baked in; the values are dynamic state set per frame
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(self.polygon_mode)
            .line_width(1.0)
            .cull_mode(self.cull_mode)
            .front_face(self.front_face)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(self.samples);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(self.depth_test)
            .depth_write_enable(self.depth_write)
            .depth_compare_op(self.depth_compare)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let color_blend_attachments = [self.blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_info =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        // Dynamic rendering: the pipeline must know its attachment formats
        let color_formats = [self.color_format];
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&color_formats)
            .depth_attachment_format(self.depth_format);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_info)
            .layout(self.layout)
            .push_next(&mut rendering_info);

        let pipelines = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, e)| e)?
        };

        pipelines
            .into_iter()
            .next()
            .ok_or(BackendError::IncompletePipeline("a pipeline object"))
    }
}

/// Create a pipeline layout carrying the given push-constant ranges. The
/// layout must stay alive for as long as any pipeline built against it.
pub fn create_pipeline_layout(
    device: &ash::Device,
    push_constant_ranges: &[vk::PushConstantRange],
) -> Result<vk::PipelineLayout, BackendError> {
    let layout_info =
        vk::PipelineLayoutCreateInfo::default().push_constant_ranges(push_constant_ranges);

    let layout = unsafe { device.create_pipeline_layout(&layout_info, None)? };
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn desc_with_stages() -> GraphicsPipelineDesc {
        GraphicsPipelineDesc {
            shader_stages: vec![
                ShaderStage {
                    stage: vk::ShaderStageFlags::VERTEX,
                    module: vk::ShaderModule::from_raw(1),
                },
                ShaderStage {
                    stage: vk::ShaderStageFlags::FRAGMENT,
                    module: vk::ShaderModule::from_raw(2),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn empty_description_is_rejected_before_any_device_call() {
        let desc = GraphicsPipelineDesc::default();
        assert!(matches!(
            desc.validate(),
            Err(BackendError::IncompletePipeline("shader stages"))
        ));
    }

    #[test]
    fn null_layout_is_rejected() {
        let desc = desc_with_stages();
        assert!(matches!(
            desc.validate(),
            Err(BackendError::IncompletePipeline("a pipeline layout"))
        ));
    }

    #[test]
    fn undefined_color_format_is_rejected() {
        let desc = GraphicsPipelineDesc {
            layout: vk::PipelineLayout::from_raw(3),
            ..desc_with_stages()
        };
        assert!(matches!(
            desc.validate(),
            Err(BackendError::IncompletePipeline("a color attachment format"))
        ));
    }

    #[test]
    fn complete_description_validates() {
        let desc = GraphicsPipelineDesc {
            layout: vk::PipelineLayout::from_raw(3),
            color_format: vk::Format::B8G8R8A8_SRGB,
            ..desc_with_stages()
        };
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn null_shader_module_is_rejected() {
        let desc = GraphicsPipelineDesc {
            shader_stages: vec![ShaderStage {
                stage: vk::ShaderStageFlags::VERTEX,
                module: vk::ShaderModule::null(),
            }],
            layout: vk::PipelineLayout::from_raw(3),
            color_format: vk::Format::B8G8R8A8_SRGB,
            ..Default::default()
        };
        assert!(matches!(
            desc.validate(),
            Err(BackendError::IncompletePipeline("a valid shader module"))
        ));
    }

    #[test]
    fn defaults_match_an_opaque_single_sample_pipeline() {
        let desc = GraphicsPipelineDesc::default();
        assert_eq!(desc.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(desc.polygon_mode, vk::PolygonMode::FILL);
        assert_eq!(desc.samples, vk::SampleCountFlags::TYPE_1);
        assert_eq!(desc.blend_attachment.blend_enable, vk::FALSE);
        assert_eq!(
            desc.blend_attachment.color_write_mask,
            vk::ColorComponentFlags::RGBA
        );
        assert!(!desc.depth_test);
    }
}
