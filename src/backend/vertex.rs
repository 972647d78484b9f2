// Vertex and push-constant layouts
//
// The shaders in shaders/ are written against these structs; the binding and
// attribute descriptions are derived from the struct layout itself so the two
// cannot drift apart silently.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Interleaved vertex: position + normal + color, with the UV scalars slotted
/// into the alignment gaps. 44 bytes per vertex.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub uv_x: f32,
    pub normal: Vec3,
    pub uv_y: f32,
    pub color: Vec3,
}

impl Vertex {
    pub const fn new(position: Vec3, normal: Vec3, color: Vec3) -> Self {
        Self {
            position,
            uv_x: 0.0,
            normal,
            uv_y: 0.0,
            color,
        }
    }

    /// One interleaved buffer at binding slot 0.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Attributes at locations 0..2 (position, normal, color), matching
    /// shaders/mesh.vert.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, normal) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, color) as u32,
            },
        ]
    }
}

/// Per-draw constants, pushed to the vertex stage. Must stay within the
/// 128-byte push-constant minimum every implementation guarantees.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PushConstants {
    pub transform: Mat4,
}

impl PushConstants {
    pub fn range() -> vk::PushConstantRange {
        vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: std::mem::size_of::<Self>() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn vertex_layout_matches_shader_expectations() {
        assert_eq!(size_of::<Vertex>(), 44);
        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, uv_x), 12);
        assert_eq!(offset_of!(Vertex, normal), 16);
        assert_eq!(offset_of!(Vertex, uv_y), 28);
        assert_eq!(offset_of!(Vertex, color), 32);
    }

    #[test]
    fn binding_covers_the_whole_vertex() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride as usize, size_of::<Vertex>());
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn attributes_point_at_their_fields() {
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs[0].offset as usize, offset_of!(Vertex, position));
        assert_eq!(attrs[1].offset as usize, offset_of!(Vertex, normal));
        assert_eq!(attrs[2].offset as usize, offset_of!(Vertex, color));
        for (location, attr) in attrs.iter().enumerate() {
            assert_eq!(attr.location as usize, location);
            assert_eq!(attr.binding, 0);
            assert_eq!(attr.format, vk::Format::R32G32B32_SFLOAT);
        }
    }

    #[test]
    fn push_constants_fit_the_declared_range() {
        assert_eq!(size_of::<PushConstants>(), 64);
        let range = PushConstants::range();
        assert_eq!(range.size as usize, size_of::<PushConstants>());
        assert_eq!(range.offset, 0);
        assert_eq!(range.stage_flags, vk::ShaderStageFlags::VERTEX);
    }

    #[test]
    fn vertex_buffer_size_is_count_times_stride() {
        let tri = [Vertex::default(); 3];
        assert_eq!(std::mem::size_of_val(&tri), 3 * size_of::<Vertex>());
        assert_eq!(bytemuck::cast_slice::<_, u8>(&tri).len(), 132);
    }
}
