//! Render pipelines and their bind group layouts.
//!
//! - `basic` builds the opaque pipelines and the material layout
//! - `transparent` builds the alpha blended pipeline on top of the basic shader
//! - `light` packs the scene lights into a uniform

pub mod basic;
pub mod light;
pub mod transparent;
