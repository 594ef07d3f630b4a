//! pivot-viewer
//!
//! A small cross-platform glTF viewer for native and WASM targets. It loads one
//! animated model, replaces every material with a single base-colour texture,
//! lights it with an ambient + directional rig and lets the user rotate it by
//! dragging and zoom with the wheel.
//!
//! High-level modules
//! - `camera`: camera, projection, uniforms and the wheel zoom controller
//! - `config`: the typed viewer configuration and its defaults
//! - `context`: central GPU and window context that owns device/queue/pipeline
//! - `data_structures`: scene tree, instances, animation, GPU models and textures
//! - `flow`: the winit event loop and frame scheduling
//! - `input`: pointer events and the drag gesture
//! - `pick`: CPU ray casting against the scene
//! - `pipelines`: the model render pipeline and the light rig
//! - `resources`: asset fetching and glTF/image decoding
//! - `session`: all mutable viewer state behind one headless API
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod input;
pub mod pick;
pub mod pipelines;
pub mod resources;
pub mod session;

pub use config::ViewerConfig;
pub use session::{FixedStep, FrameClock, FrameReport, ViewerSession, ViewerState};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    flow::run(ViewerConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
