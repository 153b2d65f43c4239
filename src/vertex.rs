use bytemuck::{Pod, Zeroable};

/// One vertex attribute inside an interleaved buffer: `location` in the
/// shader, number of `f32` components, byte offset from the vertex start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: i32,
    pub offset: i32,
}

/// Interleaved layout of a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: i32,
    pub attributes: &'static [VertexAttribute],
}

/// The vertex format consumed by the 2D shader program.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub texture_coords: [f32; 2],
}

impl Vertex2d {
    pub const fn new(position: [f32; 2], texture_coords: [f32; 2]) -> Self {
        Vertex2d {
            position,
            texture_coords,
        }
    }

    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Vertex2d>() as i32,
        attributes: &[
            VertexAttribute {
                location: 0,
                components: 2,
                offset: 0,
            },
            VertexAttribute {
                location: 1,
                components: 2,
                offset: 8,
            },
        ],
    };
}

/// The vertex format consumed by the 3D shader program.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texture_coords: [f32; 2],
}

impl Vertex3d {
    pub const fn new(position: [f32; 3], normal: [f32; 3], texture_coords: [f32; 2]) -> Self {
        Vertex3d {
            position,
            normal,
            texture_coords,
        }
    }

    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Vertex3d>() as i32,
        attributes: &[
            VertexAttribute {
                location: 0,
                components: 3,
                offset: 0,
            },
            VertexAttribute {
                location: 1,
                components: 3,
                offset: 12,
            },
            VertexAttribute {
                location: 2,
                components: 2,
                offset: 24,
            },
        ],
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_cover_the_whole_stride() {
        assert_eq!(Vertex2d::LAYOUT.stride, 16);
        assert_eq!(Vertex3d::LAYOUT.stride, 32);
        let last = Vertex3d::LAYOUT.attributes.last().unwrap();
        assert_eq!(last.offset + last.components * 4, Vertex3d::LAYOUT.stride);
    }
}
