//! Camera, projection and the wheel zoom controller.
//!
//! The camera never turns: it sits on the z axis looking towards the origin and
//! the wheel only moves it along that axis. Everything orientation-related is
//! done by rotating the pivot group instead.

use cgmath::{InnerSpace, SquareMatrix, Transform};

use crate::{config::ViewerConfig, pick::Ray};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: cgmath::Point3<f32>,
}

impl Camera {
    pub fn new<V: Into<cgmath::Point3<f32>>>(position: V) -> Self {
        Self {
            position: position.into(),
        }
    }

    pub fn calc_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::look_to_rh(
            self.position,
            -cgmath::Vector3::unit_z(),
            cgmath::Vector3::unit_y(),
        )
    }

    /// Ray from the camera through a point in normalized device coordinates
    /// (x and y in [-1, 1], y up).
    pub fn cast_ray(&self, ndc: cgmath::Vector2<f32>, projection: &Projection) -> Ray {
        let view_proj = projection.calc_matrix() * self.calc_matrix();
        let target = view_proj.invert().map(|inverse| {
            // Any depth inside the frustum works; 0.5 is well away from both planes.
            inverse.transform_point(cgmath::Point3::new(ndc.x, ndc.y, 0.5))
        });
        let direction = match target {
            Some(target) if (target - self.position).magnitude2() > 0.0 => {
                (target - self.position).normalize()
            }
            _ => -cgmath::Vector3::unit_z(),
        };
        Ray {
            origin: self.position,
            direction,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: cgmath::Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<cgmath::Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> cgmath::Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: cgmath::Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Moves the camera along z in response to wheel input and keeps it inside
/// `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomController {
    speed: f32,
    min: f32,
    max: f32,
}

impl ZoomController {
    pub fn new(speed: f32, min: f32, max: f32) -> Self {
        Self { speed, min, max }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.zoom_speed, config.zoom_min, config.zoom_max)
    }

    pub fn clamp(&self, z: f32) -> f32 {
        z.clamp(self.min, self.max)
    }

    /// `delta_y` follows the DOM convention: positive when scrolling away from the user.
    pub fn handle_wheel(&self, camera: &mut Camera, delta_y: f32) {
        camera.position.z = self.clamp(camera.position.z - delta_y * self.speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection() -> Projection {
        Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 1000.0)
    }

    #[test]
    fn centre_ray_points_down_the_view_axis() {
        let camera = Camera::new((0.0, 0.0, 7.0));
        let ray = camera.cast_ray(cgmath::Vector2::new(0.0, 0.0), &projection());
        assert_eq!(ray.origin, cgmath::Point3::new(0.0, 0.0, 7.0));
        assert!((ray.direction - cgmath::Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-4);
    }

    #[test]
    fn corner_ray_leans_towards_the_corner() {
        let camera = Camera::new((0.0, 0.0, 7.0));
        let ray = camera.cast_ray(cgmath::Vector2::new(1.0, 1.0), &projection());
        assert!(ray.direction.x > 0.0 && ray.direction.y > 0.0 && ray.direction.z < 0.0);
        assert!((ray.direction.magnitude() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn wheel_moves_and_clamps() {
        let zoom = ZoomController::new(0.1, 1.0, 20.0);
        let mut camera = Camera::new((0.0, 0.0, 7.0));
        zoom.handle_wheel(&mut camera, 10.0);
        assert!((camera.position.z - 6.0).abs() < 1e-6);
        zoom.handle_wheel(&mut camera, -1000.0);
        assert_eq!(camera.position.z, 20.0);
        zoom.handle_wheel(&mut camera, 1000.0);
        assert_eq!(camera.position.z, 1.0);
    }

    #[test]
    fn clamp_is_idempotent() {
        let zoom = ZoomController::new(0.1, 1.0, 20.0);
        for z in [-5.0, 0.0, 1.0, 7.5, 20.0, 300.0] {
            assert_eq!(zoom.clamp(zoom.clamp(z)), zoom.clamp(z));
        }
    }
}
