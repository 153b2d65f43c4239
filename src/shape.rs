//! Procedural mesh builders. Every function returns a
//! [`Transformable`] ready to be positioned and drawn; [`bezier`] is the
//! one pure-geometry helper, feeding [`path`].

use std::f32::consts::PI;

use ultraviolet::{Vec2, Vec3};

use crate::backend::GpuContext;
use crate::drawable::Transformable;
use crate::vertex::{Vertex2d, Vertex3d};
use crate::vertex_array::VertexArray;

/// Wrap an existing vertex array in a drawable.
pub fn from_vertex_array(vertex_array: VertexArray) -> Transformable {
    let mut drawable = Transformable::new();
    drawable.set_vertex_array(vertex_array);
    drawable
}

/// A line from `a` to `b` with the given thickness, as a quad.
pub fn line(gpu: &GpuContext, a: Vec2, b: Vec2, thickness: f32) -> Transformable {
    let dt = Vec2::new(b.y - a.y, -b.x + a.x).normalized() * thickness * 0.5;
    from_vertex_array(VertexArray::from_vertices(
        gpu,
        &[
            Vertex2d::new([a.x + dt.x, a.y + dt.y], [0.0, 0.0]),
            Vertex2d::new([b.x + dt.x, b.y + dt.y], [1.0, 0.0]),
            Vertex2d::new([b.x - dt.x, b.y - dt.y], [1.0, 1.0]),
            Vertex2d::new([a.x + dt.x, a.y + dt.y], [0.0, 0.0]),
            Vertex2d::new([b.x - dt.x, b.y - dt.y], [1.0, 1.0]),
            Vertex2d::new([a.x - dt.x, a.y - dt.y], [0.0, 1.0]),
        ],
    ))
}

/// The unit square `[0,1] x [0,1]`.
pub fn square(gpu: &GpuContext) -> Transformable {
    from_vertex_array(VertexArray::from_vertices(
        gpu,
        &[
            Vertex2d::new([0.0, 0.0], [0.0, 0.0]),
            Vertex2d::new([1.0, 0.0], [1.0, 0.0]),
            Vertex2d::new([1.0, 1.0], [1.0, 1.0]),
            Vertex2d::new([0.0, 0.0], [0.0, 0.0]),
            Vertex2d::new([1.0, 1.0], [1.0, 1.0]),
            Vertex2d::new([0.0, 1.0], [0.0, 1.0]),
        ],
    ))
}

/// A circle centered on its position. Subdivision grows with the radius.
pub fn circle(gpu: &GpuContext, radius: f32) -> Transformable {
    circle_with_subdivisions(gpu, radius, (16.0 + radius * 0.9) as u32)
}

/// A circle as a fan of `subdivisions` triangles.
pub fn circle_with_subdivisions(gpu: &GpuContext, radius: f32, subdivisions: u32) -> Transformable {
    let mut vertices = Vec::with_capacity(subdivisions as usize * 3);
    let mut p1 = Vec2::new(1.0, 0.0);
    let mut t1 = Vec2::new(0.5, 0.5) + p1 * 0.5;
    let zero = Vertex2d::new([0.0, 0.0], [0.0, 0.0]);
    for i in 1..=subdivisions {
        let angle = 2.0 * PI * i as f32 / subdivisions as f32;
        let p2 = Vec2::new(angle.cos(), angle.sin());
        let t2 = Vec2::new(0.5, 0.5) + p2 * 0.5;

        vertices.push(zero);
        vertices.push(Vertex2d::new(
            [radius * p1.x, radius * p1.y],
            [t1.x, t1.y],
        ));
        vertices.push(Vertex2d::new(
            [radius * p2.x, radius * p2.y],
            [t2.x, t2.y],
        ));
        p1 = p2;
        t1 = t2;
    }
    from_vertex_array(VertexArray::from_vertices(gpu, &vertices))
}

/// A centered rectangle with rounded corners. The radius is clamped to the
/// half extents.
pub fn rounded_rectangle(gpu: &GpuContext, width: f32, height: f32, radius: f32) -> Transformable {
    let radius = radius.clamp(0.0, (width * 0.5).min(height * 0.5));
    let width = width * 0.5 - radius;
    let height = height * 0.5 - radius;

    let mut vertices = Vec::new();
    let p0 = Vertex2d::new([0.0, 0.0], [0.0, 0.0]);
    let mut p1 = Vertex2d::new([width + radius, -height], [0.0, 0.0]);
    let mut p2 = Vertex2d::new([width + radius, height], [0.0, 0.0]);

    vertices.push(p0);
    vertices.push(p1);
    vertices.push(p2);

    let angle_delta = 2.0 * PI / 40.0;
    let mut angle = 0.0f32;
    while angle < 2.0 * PI {
        let center = if angle > 0.75 * 2.0 * PI {
            Vec2::new(width, -height)
        } else if angle > 0.5 * 2.0 * PI {
            Vec2::new(-width, -height)
        } else if angle > 0.25 * 2.0 * PI {
            Vec2::new(-width, height)
        } else {
            Vec2::new(width, height)
        };

        p1 = p2;
        p2 = Vertex2d::new(
            [
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            ],
            [0.0, 0.0],
        );

        vertices.push(p0);
        vertices.push(p1);
        vertices.push(p2);
        angle += angle_delta;
    }

    p1 = p2;
    p2 = Vertex2d::new([width + radius, -height], [0.0, 0.0]);
    vertices.push(p0);
    vertices.push(p1);
    vertices.push(p2);

    from_vertex_array(VertexArray::from_vertices(gpu, &vertices))
}

fn lerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

/// Evaluate a Bézier curve through De Casteljau reduction.
///
/// Returns `subdivision + 1` points from the first control point to the
/// last. Pure geometry: no GPU interaction. Feed the result to [`path`].
pub fn bezier(points: &[Vec2], subdivision: usize) -> Vec<Vec2> {
    let mut curve = Vec::with_capacity(subdivision + 1);
    for index in 0..=subdivision {
        let mut data = points.to_vec();
        let x = index as f32 / subdivision as f32;
        while data.len() >= 2 {
            for i in 0..data.len() - 1 {
                data[i] = lerp(data[i], data[i + 1], x);
            }
            data.pop();
        }
        curve.push(data[0]);
    }
    curve
}

/// A path of the given thickness along a sequence of connected lines, with
/// mitered joints.
///
/// Joints are the intersections of the segment edges offset by half the
/// thickness; near-parallel joints are skipped and spiked miters are
/// clamped to ten times the thickness.
pub fn path(gpu: &GpuContext, points: &[Vec2], thickness: f32) -> Transformable {
    let thickness = thickness * 0.5;

    // Edge lines of each segment, shifted by +/- thickness, in homogeneous
    // coordinates.
    let mut planes_left = Vec::with_capacity(points.len() - 1);
    let mut planes_right = Vec::with_capacity(points.len() - 1);
    for i in 1..points.len() {
        let previous = points[i - 1];
        let current = points[i];
        let plane = Vec3::new(previous.x, previous.y, 1.0)
            .cross(Vec3::new(current.x, current.y, 1.0));
        let shift = thickness * Vec2::new(plane.x, plane.y).mag();
        planes_left.push(plane - Vec3::new(0.0, 0.0, shift));
        planes_right.push(plane + Vec3::new(0.0, 0.0, shift));
    }

    // Intersect consecutive planes to get the path outline.
    let mut points_left = Vec::with_capacity(points.len());
    let mut points_right = Vec::with_capacity(points.len());

    // Cap the beginning.
    {
        let direction = (points[1] - points[0]).normalized();
        let normal = Vec2::new(direction.y, -direction.x);
        points_left.push(points[0] - normal * thickness);
        points_right.push(points[0] + normal * thickness);
    }

    let epsilon = 0.01;
    let mut i = 0;
    for j in 1..points.len() - 1 {
        let intersection_left = planes_left[i].cross(planes_left[j]);
        let intersection_right = planes_right[i].cross(planes_right[j]);
        if intersection_left.z * intersection_right.z < epsilon {
            continue;
        }
        let mut left =
            Vec2::new(intersection_left.x, intersection_left.y) / intersection_left.z;
        let mut right =
            Vec2::new(intersection_right.x, intersection_right.y) / intersection_right.z;
        if (left - right).mag() > 10.0 * thickness {
            let middle = (left + right) * 0.5;
            let direction = (right - left).normalized() * 5.0 * thickness;
            left = middle - direction;
            right = middle + direction;
        }
        points_left.push(left);
        points_right.push(right);
        i = j;
    }

    // Cap the end.
    {
        let last = points[points.len() - 1];
        let direction = (points[points.len() - 2] - last).normalized();
        let normal = Vec2::new(direction.y, -direction.x);
        points_left.push(last + normal * thickness);
        points_right.push(last - normal * thickness);
    }

    // Fill the outline with one quad per joint pair:
    // ...-A--C-...   A = points_left[i - 1]
    //     |\ |       B = points_right[i - 1]
    //     | \|       C = points_left[i]
    // ...-B--D-...   D = points_right[i]
    let mut vertices = Vec::with_capacity((points_left.len() - 1) * 6);
    for i in 1..points_left.len() {
        let a = points_left[i - 1];
        let b = points_right[i - 1];
        let c = points_left[i];
        let d = points_right[i];
        vertices.push(Vertex2d::new([a.x, a.y], [0.0, 0.0]));
        vertices.push(Vertex2d::new([b.x, b.y], [0.0, 0.0]));
        vertices.push(Vertex2d::new([d.x, d.y], [0.0, 0.0]));
        vertices.push(Vertex2d::new([a.x, a.y], [0.0, 0.0]));
        vertices.push(Vertex2d::new([d.x, d.y], [0.0, 0.0]));
        vertices.push(Vertex2d::new([c.x, c.y], [0.0, 0.0]));
    }

    from_vertex_array(VertexArray::from_vertices(gpu, &vertices))
}

/// A centered 1x1x1 cube.
pub fn cube(gpu: &GpuContext) -> Transformable {
    const M: f32 = -0.5;
    const Z: f32 = 0.0;
    const P: f32 = 0.5;
    const L: f32 = 0.0;
    const R: f32 = 1.0;
    let vertices = [
        Vertex3d::new([M, M, P], [Z, Z, P], [L, L]),
        Vertex3d::new([P, M, P], [Z, Z, P], [R, L]),
        Vertex3d::new([P, P, P], [Z, Z, P], [R, R]),
        Vertex3d::new([M, M, P], [Z, Z, P], [L, L]),
        Vertex3d::new([P, P, P], [Z, Z, P], [R, R]),
        Vertex3d::new([M, P, P], [Z, Z, P], [L, R]),
        Vertex3d::new([M, M, M], [Z, Z, M], [L, L]),
        Vertex3d::new([P, P, M], [Z, Z, M], [R, R]),
        Vertex3d::new([P, M, M], [Z, Z, M], [R, L]),
        Vertex3d::new([M, M, M], [Z, Z, M], [L, L]),
        Vertex3d::new([M, P, M], [Z, Z, M], [L, R]),
        Vertex3d::new([P, P, M], [Z, Z, M], [R, R]),
        Vertex3d::new([M, P, M], [Z, P, Z], [L, L]),
        Vertex3d::new([M, P, P], [Z, P, Z], [R, L]),
        Vertex3d::new([P, P, P], [Z, P, Z], [R, R]),
        Vertex3d::new([M, P, M], [Z, P, Z], [L, L]),
        Vertex3d::new([P, P, P], [Z, P, Z], [R, R]),
        Vertex3d::new([P, P, M], [Z, P, Z], [L, R]),
        Vertex3d::new([M, M, M], [Z, M, Z], [L, L]),
        Vertex3d::new([P, M, P], [Z, M, Z], [R, R]),
        Vertex3d::new([M, M, P], [Z, M, Z], [R, L]),
        Vertex3d::new([M, M, M], [Z, M, Z], [L, L]),
        Vertex3d::new([P, M, M], [Z, M, Z], [L, R]),
        Vertex3d::new([P, M, P], [Z, M, Z], [R, R]),
        Vertex3d::new([P, M, M], [P, Z, Z], [L, L]),
        Vertex3d::new([P, P, M], [P, Z, Z], [R, L]),
        Vertex3d::new([P, P, P], [P, Z, Z], [R, R]),
        Vertex3d::new([P, M, M], [P, Z, Z], [L, L]),
        Vertex3d::new([P, P, P], [P, Z, Z], [R, R]),
        Vertex3d::new([P, M, P], [P, Z, Z], [L, R]),
        Vertex3d::new([M, M, M], [M, Z, Z], [L, L]),
        Vertex3d::new([M, P, P], [M, Z, Z], [R, R]),
        Vertex3d::new([M, P, M], [M, Z, Z], [R, L]),
        Vertex3d::new([M, M, M], [M, Z, Z], [L, L]),
        Vertex3d::new([M, M, P], [M, Z, Z], [L, R]),
        Vertex3d::new([M, P, P], [M, Z, Z], [R, R]),
    ];
    let mut drawable = Transformable::with_matrix(ultraviolet::Mat4::identity());
    drawable.set_vertex_array(VertexArray::from_vertices_3d(gpu, &vertices));
    drawable
}

/// A centered sphere built by subdividing an octahedron `iterations` times.
pub fn icosphere(gpu: &GpuContext, iterations: u32) -> Transformable {
    let mut out: Vec<Vec3> = vec![
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(1.0, 0.0, 0.0),
    ];

    for _ in 0..iterations {
        let input = std::mem::take(&mut out);
        for triangle in input.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]];
            let d = (a + b + c).normalized();
            out.extend_from_slice(&[a, b, d, b, c, d, c, a, d]);
        }
    }

    let vertices: Vec<Vertex3d> = out
        .iter()
        .map(|p| {
            Vertex3d::new(
                [p.x * 0.5, p.y * 0.5, p.z * 0.5],
                [p.x, p.y, p.z],
                [p.x * 0.5 + 0.5, p.y * 0.5 + 0.5],
            )
        })
        .collect();

    let mut drawable = Transformable::with_matrix(ultraviolet::Mat4::identity());
    drawable.set_vertex_array(VertexArray::from_vertices_3d(gpu, &vertices));
    drawable
}

/// A centered 1x1 square in 3D space, facing +Z.
pub fn plane(gpu: &GpuContext) -> Transformable {
    const M: f32 = -0.5;
    const Z: f32 = 0.0;
    const P: f32 = 0.5;
    const L: f32 = 0.0;
    const R: f32 = 1.0;
    let vertices = [
        Vertex3d::new([M, M, Z], [Z, Z, P], [L, L]),
        Vertex3d::new([P, M, Z], [Z, Z, P], [R, L]),
        Vertex3d::new([P, P, Z], [Z, Z, P], [R, R]),
        Vertex3d::new([M, M, Z], [Z, Z, P], [L, L]),
        Vertex3d::new([P, P, Z], [Z, Z, P], [R, R]),
        Vertex3d::new([M, P, Z], [Z, Z, P], [L, R]),
    ];
    let mut drawable = Transformable::with_matrix(ultraviolet::Mat4::identity());
    drawable.set_vertex_array(VertexArray::from_vertices_3d(gpu, &vertices));
    drawable
}
