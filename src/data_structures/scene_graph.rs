//! Scene graph and hierarchical scene organization.
//!
//! The loaded model is a tree of [`SceneNode`]s mirroring the glTF node
//! hierarchy. It is owned by the [`PivotGroup`], an otherwise empty node whose
//! only job is to apply the user's drag rotation on top of the model.
//!
//! Everything here is plain CPU data. The GPU mirror lives in
//! [`crate::data_structures::model::Model`].

use std::sync::Arc;

use crate::data_structures::{
    instance::Instance,
    model::{MaterialSource, ModelVertex},
};

/// Which material a mesh is drawn with.
#[derive(Clone, Debug)]
pub enum MaterialRef {
    /// Index into the asset's own material list (`None` = glTF default material).
    Embedded(Option<usize>),
    /// The texture material loaded alongside the model.
    Shared(Arc<MaterialSource>),
}

/// One glTF primitive with its geometry in node-local space.
#[derive(Clone, Debug)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: MaterialRef,
}

impl MeshData {
    pub fn uses_material(&self, material: &MaterialSource) -> bool {
        match &self.material {
            MaterialRef::Shared(shared) => std::ptr::eq(Arc::as_ptr(shared), material),
            MaterialRef::Embedded(_) => false,
        }
    }

    pub fn triangles(&self) -> impl Iterator<Item = [&ModelVertex; 3]> {
        self.indices.chunks_exact(3).filter_map(|tri| {
            Some([
                self.vertices.get(tri[0] as usize)?,
                self.vertices.get(tri[1] as usize)?,
                self.vertices.get(tri[2] as usize)?,
            ])
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: String,
    /// glTF node index; `None` for synthetic containers such as the scene root.
    pub index: Option<usize>,
    pub local: Instance,
    pub world: Instance,
    pub meshes: Vec<MeshData>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn container(name: &str, children: Vec<SceneNode>) -> Self {
        Self {
            name: name.to_string(),
            children,
            ..Default::default()
        }
    }

    /// Recomputes `world` for this node and its subtree.
    pub fn update_world_transforms(&mut self, parent: &Instance) {
        self.world = parent * &self.local;
        let world = self.world;
        for child in self.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    pub fn traverse(&self, f: &mut dyn FnMut(&SceneNode)) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }

    pub fn traverse_mut(&mut self, f: &mut dyn FnMut(&mut SceneNode)) {
        f(self);
        for child in self.children.iter_mut() {
            child.traverse_mut(f);
        }
    }

    /// Depth-first over every mesh, handing out the owning node's world transform.
    pub fn visit_meshes(&self, f: &mut dyn FnMut(&Instance, &MeshData)) {
        self.traverse(&mut |node| {
            for mesh in &node.meshes {
                f(&node.world, mesh);
            }
        });
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |node| count += node.meshes.len());
        count
    }

    /// Points every mesh in the subtree at `material`, dropping whatever the
    /// asset embedded.
    pub fn apply_material_override(&mut self, material: &Arc<MaterialSource>) -> usize {
        let mut replaced = 0;
        self.traverse_mut(&mut |node| {
            for mesh in node.meshes.iter_mut() {
                mesh.material = MaterialRef::Shared(material.clone());
                replaced += 1;
            }
        });
        replaced
    }

    pub fn find_by_index(&self, index: usize) -> Option<&SceneNode> {
        if self.index == Some(index) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_by_index(index))
    }
}

/// Container node that carries the drag rotation and, once loaded, the model.
///
/// Rotation is kept as two unbounded Euler angles (radians) so repeated drags
/// accumulate without wrapping.
#[derive(Debug, Default)]
pub struct PivotGroup {
    pub rotation_x: f32,
    pub rotation_y: f32,
    model: Option<SceneNode>,
}

impl PivotGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rotate(&mut self, x: f32, y: f32) {
        self.rotation_x += x;
        self.rotation_y += y;
    }

    pub fn transform(&self) -> Instance {
        Instance::from_euler_xyz(self.rotation_x, self.rotation_y, 0.0)
    }

    /// Takes ownership of the model. A pivot holds at most one model; a second
    /// attach replaces the first and is reported.
    pub fn attach(&mut self, model: SceneNode) {
        if let Some(previous) = self.model.replace(model) {
            log::warn!("Replaced previously attached model {}", previous.name);
        }
        self.update_world_transforms();
    }

    pub fn model(&self) -> Option<&SceneNode> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut SceneNode> {
        self.model.as_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_none()
    }

    pub fn update_world_transforms(&mut self) {
        let pivot = self.transform();
        if let Some(model) = self.model.as_mut() {
            model.update_world_transforms(&pivot);
        }
    }
}
