//! gltf-stage
//!
//! A small showcase stage on top of wgpu and winit that runs natively and in
//! the browser. It puts a floor, a hemisphere and a directional light on
//! screen, loads four glTF models concurrently, places each with a fixed
//! transform and plays the robot's first animation at half speed. Double
//! clicking toggles fullscreen.
//!
//! High-level modules
//! - `stage`: scene bootstrap, model attachment, per-frame tick and resize
//! - `attach`: the model table and the generic attachment routine
//! - `camera`: perspective camera, orbit controls and camera uniforms
//! - `context`: GPU context implementing the `Renderer`
//! - `data_structures`: scene graph, transforms, meshes, materials and lights
//! - `flow`: the winit application shell
//! - `fullscreen`: double click detection and the fullscreen toggle
//! - `pipelines`: the basic and transparent pipelines and the light uniform
//! - `render`: the `Renderer` seam and draw collection
//! - `resources`: asset loading, glTF import and animation playback
//! - `viewport`: sizes and the resize handler
//!

pub mod attach;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod fullscreen;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod stage;
pub mod viewport;
