//! Primitive shapes and their tessellation.
//!
//! All primitives are centered on the origin with their height along +Y,
//! so a part is placed by translating its node to the part's center.

use bytemuck::{Pod, Zeroable};
use std::f32::consts::{PI, TAU};

pub const RADIAL_SEGMENTS: u32 = 24;
pub const SPHERE_WIDTH_SEGMENTS: u32 = 16;
pub const SPHERE_HEIGHT_SEGMENTS: u32 = 12;

/// Vertex uploaded to the GPU for every furniture part.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// Tessellated triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    fn add_quad(&mut self, corners: [[f32; 3]; 4], normal: [f32; 3]) {
        let base = self.vertices.len() as u32;
        for corner in corners {
            self.vertices.push(MeshVertex::new(corner, normal));
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

#[cfg(test)]
impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as (min, max). Empty meshes report zeroes.
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        let Some(first) = self.vertices.first() else {
            return ([0.0; 3], [0.0; 3]);
        };
        let mut min = first.position;
        let mut max = first.position;
        for vertex in &self.vertices[1..] {
            for axis in 0..3 {
                min[axis] = min[axis].min(vertex.position[axis]);
                max[axis] = max[axis].max(vertex.position[axis]);
            }
        }
        (min, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        open_ended: bool,
    },
    /// Apex at +Y, base at -Y.
    Cone {
        radius: f32,
        height: f32,
        open_ended: bool,
    },
    Sphere {
        radius: f32,
    },
}

impl Primitive {
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Primitive::Box {
            width,
            height,
            depth,
        }
    }

    pub fn cylinder(radius: f32, height: f32) -> Self {
        Primitive::Cylinder {
            radius_top: radius,
            radius_bottom: radius,
            height,
            open_ended: false,
        }
    }

    pub fn tapered_cylinder(radius_top: f32, radius_bottom: f32, height: f32) -> Self {
        Primitive::Cylinder {
            radius_top,
            radius_bottom,
            height,
            open_ended: false,
        }
    }

    #[cfg(test)]
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Box { .. } => "box",
            Primitive::Cylinder { .. } => "cylinder",
            Primitive::Cone { .. } => "cone",
            Primitive::Sphere { .. } => "sphere",
        }
    }

    pub fn tessellate(&self) -> MeshData {
        match *self {
            Primitive::Box {
                width,
                height,
                depth,
            } => box_mesh(width, height, depth),
            Primitive::Cylinder {
                radius_top,
                radius_bottom,
                height,
                open_ended,
            } => cylinder_mesh(radius_top, radius_bottom, height, RADIAL_SEGMENTS, open_ended),
            Primitive::Cone {
                radius,
                height,
                open_ended,
            } => cylinder_mesh(0.0, radius, height, RADIAL_SEGMENTS, open_ended),
            Primitive::Sphere { radius } => {
                sphere_mesh(radius, SPHERE_WIDTH_SEGMENTS, SPHERE_HEIGHT_SEGMENTS)
            }
        }
    }
}

fn box_mesh(width: f32, height: f32, depth: f32) -> MeshData {
    let (x, y, z) = (width * 0.5, height * 0.5, depth * 0.5);
    let mut mesh = MeshData::default();
    // +X, -X, +Y, -Y, +Z, -Z; each quad is CCW seen from outside.
    mesh.add_quad(
        [[x, -y, z], [x, -y, -z], [x, y, -z], [x, y, z]],
        [1.0, 0.0, 0.0],
    );
    mesh.add_quad(
        [[-x, -y, -z], [-x, -y, z], [-x, y, z], [-x, y, -z]],
        [-1.0, 0.0, 0.0],
    );
    mesh.add_quad(
        [[-x, y, z], [x, y, z], [x, y, -z], [-x, y, -z]],
        [0.0, 1.0, 0.0],
    );
    mesh.add_quad(
        [[-x, -y, -z], [x, -y, -z], [x, -y, z], [-x, -y, z]],
        [0.0, -1.0, 0.0],
    );
    mesh.add_quad(
        [[-x, -y, z], [x, -y, z], [x, y, z], [-x, y, z]],
        [0.0, 0.0, 1.0],
    );
    mesh.add_quad(
        [[x, -y, -z], [-x, -y, -z], [-x, y, -z], [x, y, -z]],
        [0.0, 0.0, -1.0],
    );
    mesh
}

fn cylinder_mesh(
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    segments: u32,
    open_ended: bool,
) -> MeshData {
    let n = segments.max(3);
    let half = height * 0.5;
    let mut mesh = MeshData::default();

    // Side normals tilt outward by the taper so lighting follows the slope.
    let slope = if height > 0.0 {
        (radius_bottom - radius_top) / height
    } else {
        0.0
    };
    for i in 0..=n {
        let theta = i as f32 / n as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        let normal = normalize([sin, slope, cos]);
        mesh.vertices.push(MeshVertex::new(
            [radius_top * sin, half, radius_top * cos],
            normal,
        ));
        mesh.vertices.push(MeshVertex::new(
            [radius_bottom * sin, -half, radius_bottom * cos],
            normal,
        ));
    }
    for i in 0..n {
        let top = i * 2;
        let bottom = top + 1;
        let next_top = top + 2;
        let next_bottom = top + 3;
        mesh.indices
            .extend_from_slice(&[top, bottom, next_top, bottom, next_bottom, next_top]);
    }

    if !open_ended {
        if radius_top > 0.0 {
            add_cap(&mut mesh, radius_top, half, n, true);
        }
        if radius_bottom > 0.0 {
            add_cap(&mut mesh, radius_bottom, -half, n, false);
        }
    }
    mesh
}

fn add_cap(mesh: &mut MeshData, radius: f32, y: f32, segments: u32, top: bool) {
    let normal = if top { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
    let center = mesh.vertices.len() as u32;
    mesh.vertices.push(MeshVertex::new([0.0, y, 0.0], normal));
    for i in 0..segments {
        let theta = i as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        mesh.vertices
            .push(MeshVertex::new([radius * sin, y, radius * cos], normal));
    }
    for i in 0..segments {
        let a = center + 1 + i;
        let b = center + 1 + (i + 1) % segments;
        if top {
            mesh.indices.extend_from_slice(&[center, a, b]);
        } else {
            mesh.indices.extend_from_slice(&[center, b, a]);
        }
    }
}

fn sphere_mesh(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let w = width_segments.max(3);
    let h = height_segments.max(2);
    let mut mesh = MeshData::default();

    for iy in 0..=h {
        let phi = iy as f32 / h as f32 * PI;
        for ix in 0..=w {
            let theta = ix as f32 / w as f32 * TAU;
            let normal = [
                -theta.cos() * phi.sin(),
                phi.cos(),
                theta.sin() * phi.sin(),
            ];
            mesh.vertices.push(MeshVertex::new(
                [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
            ));
        }
    }

    let row = w + 1;
    for iy in 0..h {
        for ix in 0..w {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            // Pole rows collapse to a point; skip their degenerate halves.
            if iy != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != h - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 1e-6 {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        [0.0, 0.0, 0.0]
    }
}
