use anyhow::Context as _;

use crate::data_structures::{
    instance::Instance,
    model::ModelVertex,
    scene_graph::{MaterialRef, MeshData, SceneNode},
};

/**
 * Reads every primitive of a glTF mesh. Missing normals and texture coordinates
 * default to zero; primitives without an index accessor get sequential indices.
 */
pub fn load_primitives(mesh: &gltf::Mesh, buffers: &[Vec<u8>]) -> anyhow::Result<Vec<MeshData>> {
    let mesh_name = mesh.name().unwrap_or("unknown_mesh");
    let mut primitives = Vec::new();
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping primitive {} of {}: only triangle lists are drawn",
                primitive.index(),
                mesh_name
            );
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

        let mut vertices: Vec<ModelVertex> = reader
            .read_positions()
            .with_context(|| format!("primitive {} of {mesh_name} has no positions", primitive.index()))?
            .map(|position| ModelVertex {
                position,
                ..Default::default()
            })
            .collect();
        if let Some(normals) = reader.read_normals() {
            vertices
                .iter_mut()
                .zip(normals)
                .for_each(|(vertex, normal)| vertex.normal = normal);
        }
        if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
            vertices
                .iter_mut()
                .zip(tex_coords)
                .for_each(|(vertex, uv)| vertex.tex_coords = uv);
        }

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };
        if let Some(&max) = indices.iter().max() {
            anyhow::ensure!(
                (max as usize) < vertices.len(),
                "primitive {} of {mesh_name} indexes vertex {max} but has only {}",
                primitive.index(),
                vertices.len()
            );
        }

        let name = if mesh.primitives().len() > 1 {
            format!("{mesh_name}#{}", primitive.index())
        } else {
            mesh_name.to_string()
        };
        primitives.push(MeshData {
            name,
            vertices,
            indices,
            material: MaterialRef::Embedded(primitive.material().index()),
        });
    }
    Ok(primitives)
}

pub fn to_scene_node(node: gltf::Node, buffers: &[Vec<u8>]) -> anyhow::Result<SceneNode> {
    let meshes = match node.mesh() {
        Some(mesh) => load_primitives(&mesh, buffers)?,
        None => Vec::new(),
    };
    let (position, rotation, scale) = node.transform().decomposed();
    let local = Instance {
        position: position.into(),
        // glTF stores quaternions as [x, y, z, w]
        rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };
    let children = node
        .children()
        .map(|child| to_scene_node(child, buffers))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(SceneNode {
        name: node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Node{}", node.index())),
        index: Some(node.index()),
        local,
        world: local,
        meshes,
        children,
    })
}
