use super::geometry::Primitive;
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Position plus XYZ Euler rotation in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
    };

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            rotation: Vec3::ZERO,
        }
    }

    pub fn with_rotation_x(mut self, angle: f32) -> Self {
        self.rotation.x = angle;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_rotation_translation(rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Index into a graph's material table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Packed 0xRRGGBB, sRGB.
    pub color: u32,
    /// Packed 0xRRGGBB, sRGB.
    pub emissive: u32,
    pub emissive_intensity: f32,
}

impl Material {
    pub fn standard(color: u32) -> Self {
        Self {
            color,
            emissive: 0x000000,
            emissive_intensity: 0.0,
        }
    }

    pub fn glowing(color: u32) -> Self {
        Self {
            color,
            emissive: color,
            emissive_intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub name: &'static str,
    pub primitive: Primitive,
    pub transform: Transform,
    pub material: MaterialHandle,
}

/// One furniture piece: a root group of primitive meshes over a shared material table.
#[derive(Debug, Clone, PartialEq)]
pub struct Object3DGraph {
    name: &'static str,
    transform: Transform,
    materials: Vec<Material>,
    meshes: Vec<MeshNode>,
}

impl Object3DGraph {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            transform: Transform::IDENTITY,
            materials: Vec::new(),
            meshes: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.push(material);
        MaterialHandle(self.materials.len() - 1)
    }

    pub fn add_mesh(
        &mut self,
        name: &'static str,
        primitive: Primitive,
        transform: Transform,
        material: MaterialHandle,
    ) {
        debug_assert!(material.0 < self.materials.len());
        self.meshes.push(MeshNode {
            name,
            primitive,
            transform,
            material,
        });
    }

    pub fn meshes(&self) -> &[MeshNode] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle.0)
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn reset_transform(&mut self) {
        self.transform = Transform::IDENTITY;
    }

    pub fn world_matrix(&self, node: &MeshNode) -> Mat4 {
        self.transform.matrix() * node.transform.matrix()
    }
}

pub fn rgb_components(packed: u32) -> [u8; 3] {
    [
        ((packed >> 16) & 0xFF) as u8,
        ((packed >> 8) & 0xFF) as u8,
        (packed & 0xFF) as u8,
    ]
}

/// Converts a packed sRGB color to linear floats for shading.
pub fn linear_rgb(packed: u32) -> [f32; 3] {
    rgb_components(packed).map(|channel| {
        let c = channel as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_matrix_composes_root_and_local() {
        let mut graph = Object3DGraph::new("test");
        let material = graph.add_material(Material::standard(0));
        graph.add_mesh("part", Primitive::Sphere { radius: 0.1 }, Transform::at(0.0, 1.0, 0.0), material);
        graph.transform_mut().position = Vec3::new(2.0, 0.0, 0.0);
        let p = graph.world_matrix(&graph.meshes()[0]).transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn packed_colors_unpack_in_rgb_order() {
        assert_eq!(rgb_components(0x2F6FDB), [0x2F, 0x6F, 0xDB]);
        assert_eq!(linear_rgb(0xFFFFFF), [1.0, 1.0, 1.0]);
        assert_eq!(linear_rgb(0x000000), [0.0, 0.0, 0.0]);
    }
}
