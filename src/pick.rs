//! Object picking.
//!
//! Picking is done on the CPU: a ray from the camera is tested against every
//! world-space triangle below the pivot. Only front faces count, matching what
//! the rasterizer draws with back-face culling enabled.

use cgmath::InnerSpace;

use crate::data_structures::scene_graph::SceneNode;

const EPSILON: f32 = 1e-7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: cgmath::Point3<f32>,
    /// Unit length.
    pub direction: cgmath::Vector3<f32>,
}

impl Ray {
    pub fn new(origin: cgmath::Point3<f32>, direction: cgmath::Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Distance along the ray to a counter-clockwise triangle, if the ray hits
    /// its front side in front of the origin.
    pub fn intersect_triangle(
        &self,
        a: cgmath::Point3<f32>,
        b: cgmath::Point3<f32>,
        c: cgmath::Point3<f32>,
    ) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det <= EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let distance = edge2.dot(q) * inv_det;
        (distance > EPSILON).then_some(distance)
    }

    pub fn at(&self, distance: f32) -> cgmath::Point3<f32> {
        self.origin + self.direction * distance
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Intersection {
    pub distance: f32,
    pub point: cgmath::Point3<f32>,
    pub node: String,
    pub mesh: String,
}

/// Every front-facing hit below `root`, nearest first. World transforms must be
/// current.
pub fn intersect_scene(ray: &Ray, root: &SceneNode) -> Vec<Intersection> {
    let mut hits = Vec::new();
    root.traverse(&mut |node| {
        for mesh in &node.meshes {
            for [a, b, c] in mesh.triangles() {
                let [a, b, c] = [a, b, c].map(|v| node.world.transform_point(v.position.into()));
                if let Some(distance) = ray.intersect_triangle(a, b, c) {
                    hits.push(Intersection {
                        distance,
                        point: ray.at(distance),
                        node: node.name.clone(),
                        mesh: mesh.name.clone(),
                    });
                }
            }
        }
    });
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{
        instance::Instance,
        model::ModelVertex,
        scene_graph::{MaterialRef, MeshData},
    };
    use cgmath::{Point3, Vector3};

    fn triangle_node(name: &str, z: f32) -> SceneNode {
        let vertex = |x: f32, y: f32| ModelVertex {
            position: [x, y, 0.0],
            ..Default::default()
        };
        let local = Instance::from(Vector3::new(0.0, 0.0, z));
        SceneNode {
            name: name.to_string(),
            local,
            world: local,
            meshes: vec![MeshData {
                name: format!("{name}_mesh"),
                vertices: vec![vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(0.0, 1.0)],
                indices: vec![0, 1, 2],
                material: MaterialRef::Embedded(None),
            }],
            ..Default::default()
        }
    }

    fn down_z() -> Ray {
        Ray::new(Point3::new(0.0, 0.0, 7.0), Vector3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn front_face_is_hit() {
        let ray = down_z();
        let d = ray
            .intersect_triangle(
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            )
            .unwrap();
        assert!((d - 7.0).abs() < 1e-5);
    }

    #[test]
    fn back_face_is_ignored() {
        let ray = down_z();
        assert_eq!(
            ray.intersect_triangle(
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
            ),
            None
        );
    }

    #[test]
    fn miss_outside_the_triangle() {
        let ray = Ray::new(Point3::new(5.0, 5.0, 7.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(
            ray.intersect_triangle(
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            )
            .is_none()
        );
    }

    #[test]
    fn triangles_behind_the_origin_are_ignored() {
        let ray = Ray::new(Point3::new(0.0, 0.0, -3.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(
            ray.intersect_triangle(
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            )
            .is_none()
        );
    }

    #[test]
    fn scene_hits_are_sorted_nearest_first() {
        let root = SceneNode::container("Scene", vec![triangle_node("far", -2.0), triangle_node("near", 1.0)]);
        let hits = intersect_scene(&down_z(), &root);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, "near");
        assert!((hits[0].distance - 6.0).abs() < 1e-5);
        assert_eq!(hits[1].mesh, "far_mesh");
        assert!((hits[1].point.z + 2.0).abs() < 1e-5);
    }
}
