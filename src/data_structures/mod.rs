//! Engine data structures: models, lights, textures, scene graphs, and transforms.
//!
//! This module contains the core data types for scene representation:
//!
//! - `model` contains CPU-side mesh and material definitions
//! - `light` holds the hemisphere and directional light descriptions
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-node transformation data
//! - `scene_graph` enables hierarchical scene organization
//! - `skin` blends skinned vertices with their joints' transforms

pub mod instance;
pub mod light;
pub mod model;
pub mod scene_graph;
pub mod skin;
pub mod texture;
