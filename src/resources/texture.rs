use anyhow::Context as _;

use crate::resources::AssetLocation;

/// Bind group layout of the override material: base colour texture + sampler.
pub fn diffuse_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("Model texture_bind_group_layout"),
    })
}

/// Fetches and decodes an image. The format is guessed from the file contents.
pub async fn load_texture_image(
    location: &AssetLocation,
    file_name: &str,
) -> anyhow::Result<image::DynamicImage> {
    let data = location.load_binary(file_name).await?;
    image::load_from_memory(&data).with_context(|| format!("could not decode texture {file_name}"))
}
