//! GPU-side model data: vertices, meshes, the shared material and draw helpers.
//!
//! A [`Model`] is uploaded once from the CPU scene tree after the asset pipeline
//! finished. It mirrors the tree's meshes in depth-first order, which is also the
//! order [`Model::write_to_buffers`] walks when refreshing world transforms.

use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;

use crate::data_structures::{
    instance::Instance,
    scene_graph::{MeshData, SceneNode},
    texture::Texture,
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// A decoded base-colour texture that replaces every material of the model.
///
/// Loading happens off the render path, so this only holds pixels. The GPU
/// counterpart is [`Material`].
#[derive(Debug)]
pub struct MaterialSource {
    pub name: String,
    pub base_colour: image::RgbaImage,
}

impl MaterialSource {
    pub fn new(name: &str, image: image::DynamicImage) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            base_colour: image.to_rgba8(),
        })
    }
}

#[derive(Debug)]
pub struct Material {
    #[allow(unused)]
    pub name: String,
    #[allow(unused)]
    pub diffuse_texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<Self> {
        let sampler = diffuse_texture
            .sampler
            .as_ref()
            .context("diffuse texture was created without a sampler")?;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some(name),
        });

        Ok(Self {
            name: name.to_string(),
            diffuse_texture,
            bind_group,
        })
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    /// Holds exactly one [`InstanceRaw`](crate::data_structures::instance::InstanceRaw): the world transform.
    pub instance_buffer: wgpu::Buffer,
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub material: Material,
}

impl Model {
    /// Uploads every mesh below `root` and the single override material.
    pub fn from_scene(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        root: &SceneNode,
        source: &MaterialSource,
        layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<Self> {
        let diffuse_texture =
            Texture::from_rgba(device, queue, &source.base_colour, Some(&source.name), false)?;
        let material = Material::new(device, &source.name, diffuse_texture, layout)?;

        let mut meshes = Vec::new();
        root.visit_meshes(&mut |world: &Instance, mesh| {
            if !mesh.uses_material(source) {
                log::warn!(
                    "Mesh {} still references an embedded material, the override is used anyway",
                    mesh.name
                );
            }
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", mesh.name)),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", mesh.name)),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Instance Buffer", mesh.name)),
                contents: bytemuck::cast_slice(&[world.to_raw()]),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            meshes.push(Mesh {
                name: mesh.name.clone(),
                vertex_buffer,
                index_buffer,
                num_elements: drawable_elements(mesh),
                instance_buffer,
            });
        });
        log::info!("Uploaded {} meshes with material {}", meshes.len(), source.name);

        Ok(Self { meshes, material })
    }

    /// Writes the current world transforms of `root` into the instance buffers.
    ///
    /// `root` must be the tree this model was created from; its topology never
    /// changes after upload, only transforms do.
    pub fn write_to_buffers(&self, queue: &wgpu::Queue, root: &SceneNode) {
        let mut meshes = self.meshes.iter();
        root.visit_meshes(&mut |world: &Instance, _| match meshes.next() {
            Some(mesh) => queue.write_buffer(
                &mesh.instance_buffer,
                0,
                bytemuck::cast_slice(&[world.to_raw()]),
            ),
            None => log::warn!("Scene has more meshes than were uploaded"),
        });
    }
}

/// Index count to draw for `mesh`. Zero when it has no geometry, in which case
/// its buffers are empty and must not be bound.
pub fn drawable_elements(mesh: &MeshData) -> u32 {
    if mesh.vertices.is_empty() {
        0
    } else {
        mesh.indices.len() as u32
    }
}

impl Mesh {
    pub fn is_drawable(&self) -> bool {
        self.num_elements > 0
    }
}

pub trait DrawModel<'a> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a Mesh,
        material: &'a Material,
        instances: std::ops::Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b Mesh,
        material: &'b Material,
        instances: std::ops::Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::scene_graph::MaterialRef;

    fn mesh_data(vertices: usize, indices: Vec<u32>) -> MeshData {
        MeshData {
            name: "hoop".to_string(),
            vertices: vec![ModelVertex::default(); vertices],
            indices,
            material: MaterialRef::Embedded(None),
        }
    }

    #[test]
    fn empty_primitives_draw_nothing() {
        assert_eq!(drawable_elements(&mesh_data(3, vec![0, 1, 2])), 3);
        assert_eq!(drawable_elements(&mesh_data(3, vec![])), 0);
        assert_eq!(drawable_elements(&mesh_data(0, vec![0, 1, 2])), 0);
    }
}
