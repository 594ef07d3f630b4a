use pivot_viewer::{
    FixedStep, ViewerConfig, ViewerSession, ViewerState,
    resources::{AssetLocation, load_viewer_assets},
};

use crate::common::test_utils::{MODEL_PATH, TEXTURE_PATH, write_fixture_assets};

mod common;

/// Moves the embedded buffer into `file` next to the model, referenced as `uri`.
fn externalize_buffer(root: &std::path::Path, file: &str, uri: &str) {
    let json = std::fs::read_to_string(root.join(MODEL_PATH)).unwrap();
    let start = json.find("data:application").unwrap();
    let end = start + json[start..].find('"').unwrap();
    let payload = pivot_viewer::resources::decode_data_uri(&json[start..end]).unwrap();
    std::fs::write(root.join("disco_hoops").join(file), payload).unwrap();
    let json = format!("{}{uri}{}", &json[..start], &json[end..]);
    std::fs::write(root.join(MODEL_PATH), json).unwrap();
}

#[tokio::test]
async fn model_and_texture_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_assets(dir.path(), true);
    let location = AssetLocation::new(dir.path().to_string_lossy());

    let assets = load_viewer_assets(&location, MODEL_PATH, TEXTURE_PATH)
        .await
        .unwrap();
    assert_eq!(assets.scene.mesh_count(), 1);
    assert_eq!(assets.clips.len(), 1);
    assert_eq!(assets.material.base_colour.dimensions(), (2, 2));
    let material = assets.material.clone();
    assets
        .scene
        .visit_meshes(&mut |_, mesh| assert!(mesh.uses_material(&material)));

    let mut session = ViewerSession::new(ViewerConfig::default(), 640, 480);
    session.attach(assets);
    assert_eq!(session.state(), ViewerState::Interactive);
    assert!(session.mixer().is_some());
}

#[tokio::test]
async fn missing_texture_keeps_the_viewer_empty() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_assets(dir.path(), false);
    std::fs::remove_file(dir.path().join(TEXTURE_PATH)).unwrap();
    let location = AssetLocation::new(dir.path().to_string_lossy());

    let result = load_viewer_assets(&location, MODEL_PATH, TEXTURE_PATH).await;
    let err = result.as_ref().unwrap_err();
    assert!(format!("{err:#}").contains("failed to load"));

    let mut session = ViewerSession::new(ViewerConfig::default(), 640, 480);
    assert_eq!(session.finish_loading(result), ViewerState::Uninitialized);
    for _ in 0..10 {
        let report = session.tick(&mut FixedStep(0.01));
        assert!(report.hits.is_empty());
    }
    assert!(session.pivot().is_empty());
    assert!(session.mixer().is_none());
    assert_eq!(session.state(), ViewerState::Uninitialized);
}

#[tokio::test]
async fn successful_load_makes_the_viewer_interactive() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_assets(dir.path(), true);
    let location = AssetLocation::new(dir.path().to_string_lossy());

    let result = load_viewer_assets(&location, MODEL_PATH, TEXTURE_PATH).await;
    let mut session = ViewerSession::new(ViewerConfig::default(), 640, 480);
    assert_eq!(session.finish_loading(result), ViewerState::Interactive);
    assert!(!session.pivot().is_empty());
    assert!(session.tick(&mut FixedStep(0.01)).nearest().is_some());
}

#[tokio::test]
async fn corrupt_model_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_assets(dir.path(), false);
    std::fs::write(dir.path().join(MODEL_PATH), b"{ not gltf").unwrap();
    let location = AssetLocation::new(dir.path().to_string_lossy());

    let err = load_viewer_assets(&location, MODEL_PATH, TEXTURE_PATH)
        .await
        .unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains(&format!("model {MODEL_PATH} failed to load")), "{message}");
}

#[tokio::test]
async fn external_buffers_resolve_next_to_the_model() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_assets(dir.path(), false);
    externalize_buffer(dir.path(), "scene.bin", "scene.bin");

    let location = AssetLocation::new(dir.path().to_string_lossy());
    let assets = load_viewer_assets(&location, MODEL_PATH, TEXTURE_PATH)
        .await
        .unwrap();
    assert_eq!(assets.scene.mesh_count(), 1);
}

#[tokio::test]
async fn escaped_buffer_uris_are_decoded_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_assets(dir.path(), false);
    externalize_buffer(dir.path(), "scene part.bin", "scene%20part.bin");

    let location = AssetLocation::new(dir.path().to_string_lossy());
    let assets = load_viewer_assets(&location, MODEL_PATH, TEXTURE_PATH)
        .await
        .unwrap();
    assert_eq!(assets.scene.mesh_count(), 1);
}
