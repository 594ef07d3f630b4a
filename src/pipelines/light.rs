use cgmath::InnerSpace;
use wgpu::util::DeviceExt;

use crate::config::ViewerConfig;

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Ambient light plus one directional light.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// Unit vector pointing from the scene towards the light.
    direction: [f32; 3],
    directional_intensity: f32,
    colour: [f32; 3],
    ambient_intensity: f32,
    ambient_colour: [f32; 3],
    // Uniforms require 16 byte (4 float) spacing
    _padding: u32,
}

impl LightUniform {
    /// The directional light shines from `directional_position` towards the origin.
    pub fn from_config(config: &ViewerConfig) -> Self {
        let position = cgmath::Vector3::from(config.directional_position);
        let direction = if position.magnitude2() > 0.0 {
            position.normalize()
        } else {
            cgmath::Vector3::unit_y()
        };
        Self {
            direction: direction.into(),
            directional_intensity: config.directional.intensity,
            colour: config.directional.colour,
            ambient_intensity: config.ambient.intensity,
            ambient_colour: config.ambient.colour,
            _padding: 0,
        }
    }

    pub fn direction(&self) -> [f32; 3] {
        self.direction
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

impl LightResources {
    pub fn new(device: &wgpu::Device, config: &ViewerConfig) -> Self {
        let uniform = LightUniform::from_config(config);
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}
