//! Procedural geometry templates for the particle batches
//!
//! Every particle group shares one small flat-shaded solid. Templates are kept
//! as plain triangle soups (three vertices per face, one normal per face) so
//! the instance baker can stamp them out without index bookkeeping:
//! - Tetrahedron: fine leaves
//! - Octahedron: crystal leaves and logo points
//! - Cube: ribbon segments
//! - Icosahedron: nebula orbs, star core/halo and snow

use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::asset::RenderAssetUsages;

use crate::types::ParticleKind;

/// Flat-shaded triangle soup centered on the origin
#[derive(Clone, Debug, Default)]
pub struct GeometryTemplate {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl GeometryTemplate {
    /// Expand indexed faces into a flat soup with outward winding
    fn from_faces(vertices: &[Vec3], faces: &[[usize; 3]]) -> Self {
        let mut positions = Vec::with_capacity(faces.len() * 3);
        let mut normals = Vec::with_capacity(faces.len() * 3);

        for face in faces {
            let (a, mut b, mut c) = (vertices[face[0]], vertices[face[1]], vertices[face[2]]);
            let centroid = (a + b + c) / 3.0;
            let mut normal = (b - a).cross(c - a).normalize_or_zero();
            // Convex solids around the origin: the face normal must point away from it
            if normal.dot(centroid) < 0.0 {
                std::mem::swap(&mut b, &mut c);
                normal = -normal;
            }
            positions.extend_from_slice(&[a, b, c]);
            normals.extend_from_slice(&[normal; 3]);
        }

        Self { positions, normals }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Static single-instance mesh (star core, halo)
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::RENDER_WORLD);
        let positions: Vec<[f32; 3]> = self.positions.iter().map(|p| p.to_array()).collect();
        let normals: Vec<[f32; 3]> = self.normals.iter().map(|n| n.to_array()).collect();
        let indices: Vec<u32> = (0..positions.len() as u32).collect();
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        mesh.insert_indices(Indices::U32(indices));
        mesh
    }
}

pub fn tetrahedron(radius: f32) -> GeometryTemplate {
    let vertices: Vec<Vec3> = [
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
    ]
    .iter()
    .map(|v| v.normalize() * radius)
    .collect();
    let faces = [[2, 1, 0], [0, 3, 2], [1, 3, 0], [2, 3, 1]];
    GeometryTemplate::from_faces(&vertices, &faces)
}

pub fn octahedron(radius: f32) -> GeometryTemplate {
    let vertices = [
        Vec3::X * radius,
        Vec3::NEG_X * radius,
        Vec3::Y * radius,
        Vec3::NEG_Y * radius,
        Vec3::Z * radius,
        Vec3::NEG_Z * radius,
    ];
    let faces = [
        [0, 2, 4], [0, 4, 3], [0, 3, 5], [0, 5, 2],
        [1, 2, 5], [1, 5, 3], [1, 3, 4], [1, 4, 2],
    ];
    GeometryTemplate::from_faces(&vertices, &faces)
}

pub fn cuboid(size: f32) -> GeometryTemplate {
    let h = size / 2.0;
    let vertices = [
        Vec3::new(-h, -h, -h), // 0: bottom-left-back
        Vec3::new(h, -h, -h),  // 1: bottom-right-back
        Vec3::new(h, -h, h),   // 2: bottom-right-front
        Vec3::new(-h, -h, h),  // 3: bottom-left-front
        Vec3::new(-h, h, -h),  // 4: top-left-back
        Vec3::new(h, h, -h),   // 5: top-right-back
        Vec3::new(h, h, h),    // 6: top-right-front
        Vec3::new(-h, h, h),   // 7: top-left-front
    ];
    let faces = [
        [0, 1, 2], [0, 2, 3], // bottom
        [4, 6, 5], [4, 7, 6], // top
        [0, 7, 4], [0, 3, 7], // left
        [1, 5, 6], [1, 6, 2], // right
        [0, 4, 5], [0, 5, 1], // back
        [3, 2, 6], [3, 6, 7], // front
    ];
    GeometryTemplate::from_faces(&vertices, &faces)
}

pub fn icosahedron(radius: f32) -> GeometryTemplate {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let vertices: Vec<Vec3> = [
        Vec3::new(-1.0, t, 0.0), Vec3::new(1.0, t, 0.0), Vec3::new(-1.0, -t, 0.0), Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t), Vec3::new(0.0, 1.0, t), Vec3::new(0.0, -1.0, -t), Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0), Vec3::new(t, 0.0, 1.0), Vec3::new(-t, 0.0, -1.0), Vec3::new(-t, 0.0, 1.0),
    ]
    .iter()
    .map(|v| v.normalize() * radius)
    .collect();
    let faces = [
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];
    GeometryTemplate::from_faces(&vertices, &faces)
}

/// The shared solid each particle group is drawn with
pub fn template_for(kind: ParticleKind) -> GeometryTemplate {
    match kind {
        ParticleKind::FineLeaf => tetrahedron(0.5),
        ParticleKind::CrystalLeaf => octahedron(0.5),
        ParticleKind::Ribbon => cuboid(0.1),
        ParticleKind::Nebula => icosahedron(0.5),
        ParticleKind::Snow => icosahedron(0.3),
    }
}
