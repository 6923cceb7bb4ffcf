//! Shared GPU types and utilities used by the shape renderers.

use bytemuck::{Pod, Zeroable};

use crate::coords::Projection;

// ── blend ─────────────────────────────────────────────────────────────────

pub(super) fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── projection uniform ────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct ProjectionUniform {
    pub projection: [[f32; 4]; 4],
}

impl ProjectionUniform {
    pub(super) fn from_projection(p: &Projection) -> Self {
        Self {
            projection: p.to_cols_array_2d(),
        }
    }
}

/// Minimum binding size for the projection uniform buffer.
///
/// A 4×4 f32 matrix is 64 bytes, so the size is non-zero by construction.
pub(super) fn projection_ubo_min_binding_size() -> Option<std::num::NonZeroU64> {
    std::num::NonZeroU64::new(std::mem::size_of::<ProjectionUniform>() as u64)
}

pub(super) fn projection_ubo_layout_entry() -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: projection_ubo_min_binding_size(),
        },
        count: None,
    }
}

// ── quad vertex ───────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub pos: [f32; 2], // 0..1
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

pub(super) const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [0.0, 0.0] },
    QuadVertex { pos: [1.0, 0.0] },
    QuadVertex { pos: [1.0, 1.0] },
    QuadVertex { pos: [0.0, 1.0] },
];

pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

pub(super) fn triangle_list_primitive() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Grows instance buffers in powers of two so steady-state frames never reallocate.
pub(super) fn grown_capacity(required: usize) -> usize {
    required.next_power_of_two().max(64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_uniform_is_a_mat4() {
        assert_eq!(std::mem::size_of::<ProjectionUniform>(), 64);
        assert!(projection_ubo_min_binding_size().is_some());
    }

    #[test]
    fn capacity_grows_by_powers_of_two() {
        assert_eq!(grown_capacity(1), 64);
        assert_eq!(grown_capacity(64), 64);
        assert_eq!(grown_capacity(65), 128);
        assert_eq!(grown_capacity(300), 512);
    }
}
