//! Render pipelines and the uniforms they bind.
//!
//! - `basic` is the textured, lit pipeline every mesh of the model is drawn with
//! - `light` holds the ambient + directional light rig uniform

pub mod basic;
pub mod light;
