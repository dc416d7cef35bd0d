#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use futures::channel::oneshot;
use gltf_stage::{
    camera::{Camera, Controls},
    data_structures::{
        model::{Material, Mesh, Model, ModelVertex},
        scene_graph::{ContainerNode, ModelNode, Scene, SceneNode},
        skin::Skin,
    },
    fullscreen::FullscreenPlatform,
    render::{Renderer, collect_draws},
    resources::{
        LoadFuture, LoadedModel, ModelLoader,
        animation::{AnimationClip, Channel, Interpolation, Keyframes},
    },
    viewport::{Sizes, WindowMetrics},
};

pub(crate) const EPS: f32 = 1e-4;

pub(crate) fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < EPS,
        "expected {} but got {}",
        expected,
        actual
    );
}

pub(crate) fn assert_close3(actual: [f32; 3], expected: [f32; 3]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            (a - e).abs() < EPS,
            "expected {:?} but got {:?}",
            expected,
            actual
        );
    }
}

/// What the renderer saw during one `render` call.
#[derive(Clone, Debug)]
pub(crate) struct Frame {
    pub camera_position: [f32; 3],
    pub top_level_nodes: usize,
    pub draws: usize,
    /// Vertex positions of every draw, in draw order.
    pub vertices: Vec<Vec<[f32; 3]>>,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingRenderer {
    pub frames: Vec<Frame>,
    pub sizes: Vec<(u32, u32)>,
    pub pixel_ratios: Vec<f64>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        let draws = collect_draws(scene);
        self.frames.push(Frame {
            camera_position: camera.position.into(),
            top_level_nodes: scene.len(),
            draws: draws.len(),
            vertices: draws
                .iter()
                .map(|draw| draw.vertices().iter().map(|vertex| vertex.position).collect())
                .collect(),
        });
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.sizes.push((width, height));
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratios.push(ratio);
    }
}

/// Moves the camera by `step` along x on every update.
#[derive(Debug, Default)]
pub(crate) struct CountingControls {
    pub updates: u32,
    pub step: f32,
}

impl Controls for CountingControls {
    fn update(&mut self, camera: &mut Camera) {
        self.updates += 1;
        camera.position.x += self.step;
    }
}

pub(crate) struct FixedMetrics {
    pub size: Sizes,
    pub device_pixel_ratio: f64,
}

impl FixedMetrics {
    pub(crate) fn new(width: u32, height: u32, device_pixel_ratio: f64) -> Self {
        Self {
            size: Sizes::new(width, height),
            device_pixel_ratio,
        }
    }
}

impl WindowMetrics for FixedMetrics {
    fn logical_size(&self) -> Sizes {
        self.size
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeFullscreen {
    pub fullscreen: Cell<bool>,
    pub requests: Cell<u32>,
    pub exits: Cell<u32>,
}

impl FullscreenPlatform for FakeFullscreen {
    fn is_fullscreen(&self) -> bool {
        self.fullscreen.get()
    }

    fn request_fullscreen(&self) {
        self.requests.set(self.requests.get() + 1);
        self.fullscreen.set(true);
    }

    fn exit_fullscreen(&self) {
        self.exits.set(self.exits.get() + 1);
        self.fullscreen.set(false);
    }
}

/// Hands out futures that only resolve once the test calls [`ChannelLoader::complete`].
#[derive(Default)]
pub(crate) struct ChannelLoader {
    pending: RefCell<HashMap<String, oneshot::Sender<anyhow::Result<LoadedModel>>>>,
    pub requested: RefCell<Vec<String>>,
}

impl ChannelLoader {
    pub(crate) fn complete(&self, path: &str, result: anyhow::Result<LoadedModel>) {
        let sender = self
            .pending
            .borrow_mut()
            .remove(path)
            .unwrap_or_else(|| panic!("no pending load for {}", path));
        assert!(sender.send(result).is_ok(), "load future for {} was dropped", path);
    }
}

impl ModelLoader for ChannelLoader {
    fn load(&self, path: &str) -> LoadFuture {
        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().insert(path.to_string(), tx);
        self.requested.borrow_mut().push(path.to_string());
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("loader dropped the request")))
        })
    }
}

pub(crate) fn mesh_node(name: &str) -> Box<dyn SceneNode> {
    let model = Model {
        meshes: vec![Mesh::cube(1.0)],
        materials: vec![Material::new(&format!("{}-material", name))],
    };
    Box::new(ModelNode::new(name, model))
}

/// A loaded model whose root holds one mesh node per name.
pub(crate) fn loaded_model(children: &[&str]) -> LoadedModel {
    let mut root = ContainerNode::new("root");
    for name in children {
        root.add_child(mesh_node(name));
    }
    LoadedModel {
        scene: Box::new(root),
        animations: Vec::new(),
    }
}

/// Moves the root's first child from the origin to (1, 0, 0) over two seconds.
pub(crate) fn walk_clip(name: &str) -> AnimationClip {
    AnimationClip::new(
        name,
        vec![Channel {
            target: vec![0],
            timestamps: vec![0.0, 2.0],
            keyframes: Keyframes::Translation(vec![
                cgmath::Vector3::new(0.0, 0.0, 0.0),
                cgmath::Vector3::new(1.0, 0.0, 0.0),
            ]),
            interpolation: Interpolation::Linear,
        }],
    )
}

pub(crate) fn animated_model() -> LoadedModel {
    let mut model = loaded_model(&["body"]);
    model.animations = vec![walk_clip("walk"), walk_clip("idle")];
    model
}

/// A one-triangle mesh bound to every vertex with full weight on joint 0.
pub(crate) fn skinned_triangle() -> Mesh {
    let normal = [0.0, 0.0, 1.0];
    let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        .into_iter()
        .map(|position| ModelVertex {
            position,
            tex_coords: [0.0, 0.0],
            normal,
        })
        .collect();
    let mut mesh = Mesh::new("skinned-triangle", vertices, vec![0, 1, 2], 0);
    mesh.joints = vec![[0, 0, 0, 0]; 3];
    mesh.weights = vec![[1.0, 0.0, 0.0, 0.0]; 3];
    mesh
}

/// A skinned "body" with its single joint "hip" as a sibling.
///
/// The clip lifts the hip from the origin to (0, 4, 0) over two seconds.
pub(crate) fn skinned_model() -> LoadedModel {
    let mut body = ModelNode::new(
        "body",
        Model {
            meshes: vec![skinned_triangle()],
            materials: vec![Material::new("skin")],
        },
    );
    body.set_skin(Some(Skin::new(
        vec![vec![1]],
        vec![cgmath::Matrix4::from_scale(1.0)],
    )));
    let mut root = ContainerNode::new("root");
    root.add_child(Box::new(body));
    root.add_child(Box::new(ContainerNode::new("hip")));

    let lift = AnimationClip::new(
        "lift",
        vec![Channel {
            target: vec![1],
            timestamps: vec![0.0, 2.0],
            keyframes: Keyframes::Translation(vec![
                cgmath::Vector3::new(0.0, 0.0, 0.0),
                cgmath::Vector3::new(0.0, 4.0, 0.0),
            ]),
            interpolation: Interpolation::Linear,
        }],
    );
    LoadedModel {
        scene: Box::new(root),
        animations: vec![lift],
    }
}
