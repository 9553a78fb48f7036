/// Boundary between the scene and whatever rasterizes it
use nalgebra::{Matrix4, Point3};

use crate::light::LightDescriptor;
use crate::mesh::MeshBuffers;

/// Opaque handle to a vertex buffer owned by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Per-frame shading inputs shared by every draw call
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUniforms {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub camera_position: Point3<f32>,
    pub lights: Vec<LightDescriptor>,
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            camera_position: Point3::origin(),
            lights: Vec::new(),
        }
    }
}

/// A device that accepts interleaved buffers and triangle-list draws.
///
/// The record layout of an uploaded buffer is described by
/// [`MeshBuffers::layout`](crate::mesh::MeshBuffers); attribute offsets come
/// from [`VertexLayout::attributes`](crate::mesh::VertexLayout::attributes).
pub trait GraphicsDevice {
    /// Copy `buffers` to the device and return a handle for later draws
    fn upload(&mut self, buffers: &MeshBuffers) -> BufferHandle;

    fn set_uniforms(&mut self, uniforms: &FrameUniforms);

    /// Model matrix for subsequent draws
    fn set_transform(&mut self, transform: &Matrix4<f32>);

    /// Draw `count` records starting at record `first` as a triangle list
    fn draw_triangles(&mut self, buffer: BufferHandle, first: usize, count: usize);
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Upload { vertices: usize },
        Uniforms(FrameUniforms),
        Transform(Matrix4<f32>),
        Draw { buffer: BufferHandle, first: usize, count: usize },
    }

    /// Device double that records every call in order
    #[derive(Debug, Default)]
    pub struct RecordingDevice {
        pub calls: Vec<Call>,
        next: u32,
    }

    impl GraphicsDevice for RecordingDevice {
        fn upload(&mut self, buffers: &MeshBuffers) -> BufferHandle {
            self.calls.push(Call::Upload {
                vertices: buffers.vertex_count(),
            });
            self.next += 1;
            BufferHandle(self.next)
        }

        fn set_uniforms(&mut self, uniforms: &FrameUniforms) {
            self.calls.push(Call::Uniforms(uniforms.clone()));
        }

        fn set_transform(&mut self, transform: &Matrix4<f32>) {
            self.calls.push(Call::Transform(*transform));
        }

        fn draw_triangles(&mut self, buffer: BufferHandle, first: usize, count: usize) {
            self.calls.push(Call::Draw {
                buffer,
                first,
                count,
            });
        }
    }
}
