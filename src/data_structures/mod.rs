//! Viewer data structures: scene tree, instances, animation, models, textures.
//!
//! - `scene_graph` holds the CPU node tree and the pivot group that owns it
//! - `instance` holds per-node transforms and their GPU layout
//! - `animation` holds clips and the mixer that plays them
//! - `model` contains mesh and material GPU resources uploaded from the tree
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod animation;
pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
