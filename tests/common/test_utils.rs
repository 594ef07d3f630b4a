#![allow(dead_code)]

use std::path::Path;

use base64::Engine as _;
use pivot_viewer::{
    data_structures::model::MaterialSource,
    resources::{GltfAsset, LoadedAssets, build_asset, decode_data_uri},
};

pub const MODEL_PATH: &str = "disco_hoops/scene.gltf";
pub const TEXTURE_PATH: &str = "disco_hoops/textures/material_1_baseColor.png";

/// Node index of the animated hoop inside the fixture.
pub const HOOP_NODE: usize = 1;

fn push_f32s(bytes: &mut Vec<u8>, values: &[f32]) {
    values.iter().for_each(|v| bytes.extend_from_slice(&v.to_le_bytes()));
}

/// One counter-clockwise triangle facing +z under a parent node, plus a one
/// second clip that moves the triangle from y = 0 to y = 2.
pub fn fixture_gltf(with_animation: bool) -> String {
    let mut bytes = Vec::new();
    // positions: 36 bytes
    push_f32s(&mut bytes, &[-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0]);
    // indices: 12 bytes
    [0u32, 1, 2].iter().for_each(|i| bytes.extend_from_slice(&i.to_le_bytes()));
    // keyframe times: 8 bytes
    push_f32s(&mut bytes, &[0.0, 1.0]);
    // translations: 24 bytes
    push_f32s(&mut bytes, &[0.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
    let uri = format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&bytes)
    );

    let animations = if with_animation {
        r#"[{
            "name": "bounce",
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "translation" } }],
            "samplers": [{ "input": 2, "output": 3, "interpolation": "LINEAR" }]
        }]"#
    } else {
        "[]"
    };

    format!(
        r#"{{
        "asset": {{ "version": "2.0" }},
        "scene": 0,
        "scenes": [{{ "name": "Sketchfab_Scene", "nodes": [0] }}],
        "nodes": [
            {{ "name": "root", "children": [1] }},
            {{ "name": "hoop", "mesh": 0 }}
        ],
        "meshes": [{{
            "name": "hoop",
            "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }}]
        }}],
        "materials": [{{ "name": "embedded" }}],
        "animations": {animations},
        "buffers": [{{ "byteLength": {len}, "uri": "{uri}" }}],
        "bufferViews": [
            {{ "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 }},
            {{ "buffer": 0, "byteOffset": 36, "byteLength": 12, "target": 34963 }},
            {{ "buffer": 0, "byteOffset": 48, "byteLength": 8 }},
            {{ "buffer": 0, "byteOffset": 56, "byteLength": 24 }}
        ],
        "accessors": [
            {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
               "min": [-1.0, -1.0, 0.0], "max": [1.0, 1.0, 0.0] }},
            {{ "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" }},
            {{ "bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR",
               "min": [0.0], "max": [1.0] }},
            {{ "bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3" }}
        ]
    }}"#,
        len = bytes.len(),
    )
}

pub fn fixture_png() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 40, 160, 255]));
    let mut png = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageFormat::Png)
        .expect("encoding a 2x2 PNG cannot fail");
    png.into_inner()
}

/// Writes the model and texture where the viewer expects them below `root`.
pub fn write_fixture_assets(root: &Path, with_animation: bool) {
    let textures = root.join("disco_hoops/textures");
    std::fs::create_dir_all(&textures).unwrap();
    std::fs::write(root.join(MODEL_PATH), fixture_gltf(with_animation)).unwrap();
    std::fs::write(root.join(TEXTURE_PATH), fixture_png()).unwrap();
}

/// The same result the asset pipeline produces, built without any I/O.
pub fn loaded_assets(with_animation: bool) -> LoadedAssets {
    let json = fixture_gltf(with_animation);
    let gltf = gltf::Gltf::from_slice(json.as_bytes()).unwrap();
    let buffers: Vec<Vec<u8>> = gltf
        .buffers()
        .map(|buffer| match buffer.source() {
            gltf::buffer::Source::Uri(uri) => decode_data_uri(uri).unwrap(),
            gltf::buffer::Source::Bin => panic!("fixture has no GLB chunk"),
        })
        .collect();
    let GltfAsset { mut scene, clips } = build_asset(&gltf, &buffers).unwrap();
    let image = image::load_from_memory(&fixture_png()).unwrap();
    let material = MaterialSource::new(TEXTURE_PATH, image);
    scene.apply_material_override(&material);
    LoadedAssets {
        scene,
        clips,
        material,
    }
}
