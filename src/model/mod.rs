//! Procedural furniture models.
//!
//! `build` maps a furniture kind and a color to a fresh [`Object3DGraph`].
//! Everything is assembled from primitives; no mesh assets are loaded.

mod geometry;
mod graph;

pub use geometry::{MeshVertex, Primitive};
pub use graph::{linear_rgb, rgb_components, Material, Object3DGraph, Transform};

use std::f32::consts::PI;

/// Fixed warm tone of the lamp bulb, independent of the selected color.
pub const BULB_COLOR: u32 = 0xFFF2B0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FurnitureKind {
    Chair,
    Table,
    Lamp,
}

impl FurnitureKind {
    /// Display order; the first entry is the startup selection.
    pub const ALL: [FurnitureKind; 3] = [FurnitureKind::Chair, FurnitureKind::Table, FurnitureKind::Lamp];

    pub fn label(self) -> &'static str {
        match self {
            FurnitureKind::Chair => "Chair",
            FurnitureKind::Table => "Coffee Table",
            FurnitureKind::Lamp => "Floor Lamp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChoice {
    pub name: &'static str,
    /// Packed 0xRRGGBB.
    pub rgb: u32,
}

/// Display order; the first entry is the startup selection.
pub const COLOR_CHOICES: [ColorChoice; 5] = [
    ColorChoice { name: "White", rgb: 0xFFFFFF },
    ColorChoice { name: "Oak", rgb: 0xC19A6B },
    ColorChoice { name: "Walnut", rgb: 0x5C4033 },
    ColorChoice { name: "Charcoal", rgb: 0x36454F },
    ColorChoice { name: "Blue", rgb: 0x2F6FDB },
];

impl ColorChoice {
    #[cfg(test)]
    pub fn by_name(name: &str) -> Option<ColorChoice> {
        COLOR_CHOICES
            .iter()
            .copied()
            .find(|choice| choice.name.eq_ignore_ascii_case(name))
    }
}

pub fn build(kind: FurnitureKind, color: ColorChoice) -> Object3DGraph {
    let graph = match kind {
        FurnitureKind::Chair => build_chair(color),
        FurnitureKind::Table => build_table(color),
        FurnitureKind::Lamp => build_lamp(color),
    };
    log::debug!(
        "Built {} in {} ({} meshes, {} materials)",
        kind.label(),
        color.name,
        graph.meshes().len(),
        graph.materials().len()
    );
    graph
}

fn build_chair(color: ColorChoice) -> Object3DGraph {
    let mut graph = Object3DGraph::new("chair");
    let body = graph.add_material(Material::standard(color.rgb));

    graph.add_mesh("seat", Primitive::cuboid(1.0, 0.1, 1.0), Transform::at(0.0, 0.5, 0.0), body);
    graph.add_mesh(
        "backrest",
        Primitive::cuboid(1.0, 1.0, 0.1),
        Transform::at(0.0, 1.0, -0.45),
        body,
    );
    for (x, z) in corners(0.4, 0.4) {
        graph.add_mesh("leg", Primitive::cylinder(0.05, 0.5), Transform::at(x, 0.25, z), body);
    }
    graph
}

fn build_table(color: ColorChoice) -> Object3DGraph {
    let mut graph = Object3DGraph::new("table");
    let body = graph.add_material(Material::standard(color.rgb));

    graph.add_mesh("top", Primitive::cuboid(2.0, 0.1, 1.5), Transform::at(0.0, 0.8, 0.0), body);
    for (x, z) in corners(0.9, 0.65) {
        graph.add_mesh("leg", Primitive::cuboid(0.1, 0.8, 0.1), Transform::at(x, 0.4, z), body);
    }
    graph
}

fn build_lamp(color: ColorChoice) -> Object3DGraph {
    let mut graph = Object3DGraph::new("lamp");
    let body = graph.add_material(Material::standard(color.rgb));
    let bulb = graph.add_material(Material::glowing(BULB_COLOR));

    graph.add_mesh(
        "base",
        Primitive::tapered_cylinder(0.3, 0.4, 0.1),
        Transform::at(0.0, 0.05, 0.0),
        body,
    );
    graph.add_mesh("pole", Primitive::cylinder(0.03, 1.5), Transform::at(0.0, 0.8, 0.0), body);
    graph.add_mesh(
        "shade",
        Primitive::Cone {
            radius: 0.3,
            height: 0.5,
            open_ended: true,
        },
        Transform::at(0.0, 1.6, 0.0).with_rotation_x(PI),
        body,
    );
    graph.add_mesh("bulb", Primitive::Sphere { radius: 0.1 }, Transform::at(0.0, 1.4, 0.0), bulb);
    graph
}

fn corners(x: f32, z: f32) -> [(f32, f32); 4] {
    [(x, z), (-x, z), (x, -z), (-x, -z)]
}
