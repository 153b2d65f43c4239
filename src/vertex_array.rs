use std::rc::Rc;

use crate::backend::{GpuContext, RawId};
use crate::vertex::{Vertex2d, Vertex3d, VertexLayout};

/// A list of triangle vertices moved to GPU memory.
///
/// Clones share the GPU buffers; they are released when the last clone is
/// dropped. Equality compares the underlying buffer id — two arrays built
/// from identical vertex data are *not* equal, which is what makes the
/// render-state cache a cheap integer comparison: only callers who reuse
/// the same handle across draws benefit from elision.
#[derive(Clone, Default)]
pub struct VertexArray {
    inner: Option<Rc<VertexArrayInner>>,
}

struct VertexArrayInner {
    gpu: GpuContext,
    vao: RawId,
    vbo: RawId,
    len: usize,
}

impl Drop for VertexArrayInner {
    fn drop(&mut self) {
        self.gpu.delete_vertex_array(self.vao, self.vbo);
    }
}

impl VertexArray {
    /// Upload 2D triangle vertices.
    pub fn from_vertices(gpu: &GpuContext, vertices: &[Vertex2d]) -> VertexArray {
        Self::upload(gpu, bytemuck::cast_slice(vertices), vertices.len(), &Vertex2d::LAYOUT)
    }

    /// Upload 3D triangle vertices.
    pub fn from_vertices_3d(gpu: &GpuContext, vertices: &[Vertex3d]) -> VertexArray {
        Self::upload(gpu, bytemuck::cast_slice(vertices), vertices.len(), &Vertex3d::LAYOUT)
    }

    fn upload(gpu: &GpuContext, data: &[u8], len: usize, layout: &VertexLayout) -> VertexArray {
        let (vao, vbo) = gpu.create_vertex_array(data, layout);
        VertexArray {
            inner: Some(Rc::new(VertexArrayInner {
                gpu: gpu.clone(),
                vao,
                vbo,
                len,
            })),
        }
    }

    /// The number of vertices in the GPU array.
    pub fn size(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.len)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Make this array the active vertex source. A no-op for the empty
    /// array.
    pub fn bind(&self) {
        if let Some(inner) = &self.inner {
            inner.gpu.bind_vertex_array(inner.vao);
        }
    }

    /// The backend buffer id, `0` for the empty array.
    pub fn id(&self) -> RawId {
        self.inner.as_ref().map_or(0, |inner| inner.vbo)
    }
}

impl PartialEq for VertexArray {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for VertexArray {}

impl std::fmt::Debug for VertexArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexArray")
            .field("id", &self.id())
            .field("size", &self.size())
            .finish()
    }
}
