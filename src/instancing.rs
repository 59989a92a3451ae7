// Instance batch renderer binding - bakes a group's live transforms and colors
// into one mesh per group so the whole group is a single draw
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::asset::RenderAssetUsages;
use bevy::render::view::NoFrustumCulling;
use rayon::prelude::*;

use crate::animator::InstanceBuffer;
use crate::procedural_meshes::GeometryTemplate;
use crate::types::LiveParticle;

/// One rendered particle group: shared template, baked every frame
#[derive(Component)]
pub struct InstanceBatch {
    pub template: GeometryTemplate,
    /// Baked into vertex alpha; only blended and additive materials read it
    pub opacity: f32,
}

impl InstanceBatch {
    pub fn new(template: GeometryTemplate) -> Self {
        Self { template, opacity: 1.0 }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

/// CPU side of a baked batch, laid out the way the mesh attributes want it
#[derive(Default, Debug)]
pub struct BakedInstances {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
}

/// Stamp the template once per particle.
///
/// Non-finite particles collapse to a degenerate (zero-area) copy at the origin
/// so a single bad value never tears the whole batch.
pub fn bake_instances(template: &GeometryTemplate, particles: &[LiveParticle], opacity: f32, out: &mut BakedInstances) {
    let stride = template.vertex_count();
    let total = stride * particles.len();
    out.positions.resize(total, [0.0; 3]);
    out.normals.resize(total, [0.0; 3]);
    out.colors.resize(total, [0.0; 4]);
    if stride == 0 {
        return;
    }

    out.positions
        .par_chunks_mut(stride)
        .zip(out.normals.par_chunks_mut(stride))
        .zip(out.colors.par_chunks_mut(stride))
        .zip(particles.par_iter())
        .for_each(|(((positions, normals), colors), particle)| {
            if !particle.is_finite() {
                positions.fill([0.0; 3]);
                normals.fill([0.0, 1.0, 0.0]);
                colors.fill([0.0; 4]);
                return;
            }
            let transform = Transform {
                translation: particle.position,
                rotation: particle.rotation,
                scale: particle.scale,
            };
            let matrix = transform.compute_matrix();
            let color = [particle.color.x, particle.color.y, particle.color.z, opacity];
            for (i, (p, n)) in template.positions.iter().zip(&template.normals).enumerate() {
                positions[i] = matrix.transform_point3(*p).to_array();
                normals[i] = (particle.rotation * *n).to_array();
                colors[i] = color;
            }
        });
}

/// Empty dynamic mesh the uploader fills each frame
pub fn create_batch_mesh(template: &GeometryTemplate, capacity: usize) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    let vertices = template.vertex_count() * capacity;
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, vec![[0.0f32; 3]; vertices]);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, vec![[0.0f32, 1.0, 0.0]; vertices]);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, vec![[0.0f32; 4]; vertices]);
    mesh.insert_indices(Indices::U32((0..vertices as u32).collect()));
    mesh
}

/// Spawn bundle for a batch entity. Dispersed particles leave any
/// precomputed AABB, so culling is disabled.
pub fn batch_bundle(
    batch: InstanceBatch,
    buffer: InstanceBuffer,
    meshes: &mut Assets<Mesh>,
    material: Handle<StandardMaterial>,
) -> impl Bundle {
    let mesh = meshes.add(create_batch_mesh(&batch.template, buffer.particles.len()));
    (
        Mesh3d(mesh),
        MeshMaterial3d(material),
        Transform::default(),
        Visibility::default(),
        NoFrustumCulling,
        batch,
        buffer,
    )
}

fn write_attribute<T: Copy>(values: Option<&mut VertexAttributeValues>, data: &[T], pick: fn(&mut VertexAttributeValues) -> Option<&mut Vec<T>>) -> bool {
    match values.and_then(pick) {
        Some(existing) if existing.len() == data.len() => {
            existing.copy_from_slice(data);
            true
        }
        _ => false,
    }
}

fn float3(values: &mut VertexAttributeValues) -> Option<&mut Vec<[f32; 3]>> {
    match values {
        VertexAttributeValues::Float32x3(v) => Some(v),
        _ => None,
    }
}

fn float4(values: &mut VertexAttributeValues) -> Option<&mut Vec<[f32; 4]>> {
    match values {
        VertexAttributeValues::Float32x4(v) => Some(v),
        _ => None,
    }
}

/// Write baked data into an existing batch mesh, reallocating only when the
/// particle count changed
pub fn upload_to_mesh(mesh: &mut Mesh, baked: &BakedInstances) {
    let same_positions = write_attribute(mesh.attribute_mut(Mesh::ATTRIBUTE_POSITION), &baked.positions, float3);
    if !same_positions {
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, baked.positions.clone());
        mesh.insert_indices(Indices::U32((0..baked.positions.len() as u32).collect()));
    }
    if !write_attribute(mesh.attribute_mut(Mesh::ATTRIBUTE_NORMAL), &baked.normals, float3) {
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, baked.normals.clone());
    }
    if !write_attribute(mesh.attribute_mut(Mesh::ATTRIBUTE_COLOR), &baked.colors, float4) {
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, baked.colors.clone());
    }
}

/// System: last step of the frame, push every group's live buffer to its mesh
pub fn upload_instance_batches(
    mut meshes: ResMut<Assets<Mesh>>,
    batches: Query<(&InstanceBatch, &InstanceBuffer, &Mesh3d)>,
    mut scratch: Local<BakedInstances>,
) {
    for (batch, buffer, mesh_handle) in batches.iter() {
        let Some(mesh) = meshes.get_mut(&mesh_handle.0) else {
            continue;
        };
        bake_instances(&batch.template, &buffer.particles, batch.opacity, &mut scratch);
        upload_to_mesh(mesh, &scratch);
    }
}
