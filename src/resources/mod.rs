//! Loading of the model, its buffers and the override texture.
//!
//! The viewer runs exactly one asset pipeline per session:
//! model -> buffers -> texture -> material override. Every step is awaited and
//! the first failure ends the whole pipeline with a single error, so callers
//! either get a fully textured model or nothing.

use std::sync::Arc;

use anyhow::Context as _;
use base64::Engine as _;

use crate::{
    config::ViewerConfig,
    data_structures::{
        animation::AnimationClip,
        model::MaterialSource,
        scene_graph::SceneNode,
    },
    resources::{animation::load_clips, mesh::to_scene_node, texture::load_texture_image},
};

pub mod animation;
pub mod mesh;
pub mod texture;

/// Where assets are fetched from: a directory natively, a base URL on the web.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetLocation {
    root: String,
}

impl AssetLocation {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &ViewerConfig) -> anyhow::Result<Self> {
        match &config.asset_root {
            Some(root) => Ok(Self::new(root.clone())),
            None => Self::default_root(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn default_root() -> anyhow::Result<Self> {
        let window = web_sys::window().context("no browser window")?;
        let href = window
            .location()
            .href()
            .map_err(|e| anyhow::anyhow!("could not read the page location: {e:?}"))?;
        Ok(Self::new(href))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn default_root() -> anyhow::Result<Self> {
        Ok(Self::new("assets"))
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    #[cfg(target_arch = "wasm32")]
    fn url(&self, file_name: &str) -> anyhow::Result<reqwest::Url> {
        let base = reqwest::Url::parse(&self.root)
            .with_context(|| format!("asset root {} is not a URL", self.root))?;
        base.join(file_name)
            .with_context(|| format!("cannot resolve {file_name} against {}", self.root))
    }

    pub async fn load_binary(&self, file_name: &str) -> anyhow::Result<Vec<u8>> {
        #[cfg(target_arch = "wasm32")]
        let data = {
            let url = self.url(file_name)?;
            reqwest::get(url.clone())
                .await
                .with_context(|| format!("request for {url} failed"))?
                .error_for_status()
                .with_context(|| format!("request for {url} failed"))?
                .bytes()
                .await?
                .to_vec()
        };
        #[cfg(not(target_arch = "wasm32"))]
        let data = {
            let path = std::path::Path::new(&self.root).join(file_name);
            tokio::fs::read(&path)
                .await
                .with_context(|| format!("could not read {}", path.display()))?
        };

        Ok(data)
    }
}

/// Resolves a URI found inside `base_file` relative to that file's directory.
///
/// glTF URIs are percent-encoded. Native loads read files, so the escapes are
/// decoded; on the web the result is joined onto a URL and stays encoded.
pub fn resolve_relative(base_file: &str, uri: &str) -> anyhow::Result<String> {
    #[cfg(not(target_arch = "wasm32"))]
    let uri = urlencoding::decode(uri)
        .with_context(|| format!("buffer URI {uri} does not decode to UTF-8"))?;
    Ok(match base_file.rfind('/') {
        Some(idx) => format!("{}/{}", &base_file[..idx], uri),
        None => uri.to_string(),
    })
}

/// Decodes a `data:` URI, which glTF exporters use to embed buffers in JSON.
pub fn decode_data_uri(uri: &str) -> anyhow::Result<Vec<u8>> {
    let rest = uri.strip_prefix("data:").context("not a data URI")?;
    let (header, payload) = rest.split_once(',').context("data URI without payload")?;
    anyhow::ensure!(
        header.ends_with(";base64"),
        "only base64 data URIs are supported, got {header}"
    );
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("data URI payload is not valid base64")
}

/// A parsed model: the scene root and the clips bundled with it.
#[derive(Debug)]
pub struct GltfAsset {
    pub scene: SceneNode,
    pub clips: Vec<AnimationClip>,
}

async fn load_buffers(
    gltf: &gltf::Gltf,
    location: &AssetLocation,
    file_name: &str,
) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        let data: Vec<u8> = match buffer.source() {
            gltf::buffer::Source::Bin => gltf
                .blob
                .as_deref()
                .context("buffer refers to a missing GLB binary chunk")?
                .into(),
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => decode_data_uri(uri)?,
            gltf::buffer::Source::Uri(uri) => {
                location.load_binary(&resolve_relative(file_name, uri)?).await?
            }
        };
        anyhow::ensure!(
            data.len() >= buffer.length(),
            "buffer {} is {} bytes, expected {}",
            buffer.index(),
            data.len(),
            buffer.length()
        );
        buffer_data.push(data);
    }
    Ok(buffer_data)
}

/// Builds the scene tree and clips from a parsed document and its buffers.
pub fn build_asset(gltf: &gltf::Gltf, buffers: &[Vec<u8>]) -> anyhow::Result<GltfAsset> {
    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .context("asset contains no scene")?;
    let children = scene
        .nodes()
        .map(|node| to_scene_node(node, buffers))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let scene = SceneNode::container(scene.name().unwrap_or("Scene"), children);
    let clips = load_clips(gltf, buffers)?;

    Ok(GltfAsset { scene, clips })
}

/// Parses a glTF/GLB document whose external buffers are fetched from `location`.
pub async fn parse_model_gltf(
    bytes: &[u8],
    location: &AssetLocation,
    file_name: &str,
) -> anyhow::Result<GltfAsset> {
    let gltf = gltf::Gltf::from_slice(bytes).with_context(|| format!("could not parse {file_name}"))?;
    let buffers = load_buffers(&gltf, location, file_name).await?;
    build_asset(&gltf, &buffers)
}

pub async fn load_model_gltf(location: &AssetLocation, file_name: &str) -> anyhow::Result<GltfAsset> {
    let bytes = location.load_binary(file_name).await?;
    parse_model_gltf(&bytes, location, file_name).await
}

/// Everything the viewer needs to go interactive.
#[derive(Debug)]
pub struct LoadedAssets {
    pub scene: SceneNode,
    pub clips: Vec<AnimationClip>,
    pub material: Arc<MaterialSource>,
}

/// Model, then texture, then material override. The scene returned here
/// already references only the loaded texture material.
pub async fn load_viewer_assets(
    location: &AssetLocation,
    model_path: &str,
    texture_path: &str,
) -> anyhow::Result<LoadedAssets> {
    let GltfAsset { mut scene, clips } = load_model_gltf(location, model_path)
        .await
        .with_context(|| format!("model {model_path} failed to load"))?;
    log::info!(
        "Loaded model {} with {} meshes and {} clips",
        model_path,
        scene.mesh_count(),
        clips.len()
    );

    let image = load_texture_image(location, texture_path)
        .await
        .with_context(|| format!("texture {texture_path} failed to load"))?;
    let material = MaterialSource::new(texture_path, image);
    let replaced = scene.apply_material_override(&material);
    log::info!("Applied {} to {} meshes", texture_path, replaced);

    Ok(LoadedAssets {
        scene,
        clips,
        material,
    })
}
