//! The models shown on the stage and how a loaded model is placed.

use std::f32::consts::PI;

use anyhow::Context as _;

use crate::{
    data_structures::{
        model::{Material, Mesh, Model},
        scene_graph::{ModelNode, NodeId, Scene, SceneNode},
    },
    resources::{LoadedModel, animation::AnimationMixer},
};

/// Which part of a loaded model is put on the stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selector {
    /// The model's root with all top-level nodes.
    Root,
    /// The top-level node at this index, detached from its siblings.
    Child(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelSpec {
    pub name: &'static str,
    /// Relative to the asset root.
    pub path: &'static str,
    pub selector: Selector,
    pub scale: [f32; 3],
    pub position: [f32; 3],
    /// XYZ Euler overrides in multiples of π. `None` keeps the component the model came with.
    pub rotation: [Option<f32>; 3],
    /// Play the model's first animation clip.
    pub animated: bool,
    /// Volume thickness forced onto every material of the model.
    pub thickness: Option<f32>,
}

pub static MODELS: [ModelSpec; 4] = [
    ModelSpec {
        name: "dragon",
        path: "models/DragonAttenuation/DragonAttenuation.gltf",
        selector: Selector::Child(1),
        scale: [3.0, 3.0, 3.0],
        position: [-27.0, 0.0, 35.0],
        rotation: [None, None, Some(0.7)],
        animated: false,
        thickness: Some(1.5),
    },
    ModelSpec {
        name: "fox",
        path: "models/Fox/Fox.gltf",
        selector: Selector::Root,
        scale: [0.2, 0.2, 0.2],
        position: [1.0, 0.0, 5.0],
        rotation: [None, Some(-0.25), None],
        animated: false,
        thickness: None,
    },
    ModelSpec {
        name: "helmet",
        path: "models/DamagedHelmet/DamagedHelmet.gltf",
        selector: Selector::Root,
        scale: [5.0, 5.0, 5.0],
        position: [27.0, 3.6, 30.0],
        rotation: [None, Some(-0.3), Some(-0.35)],
        animated: false,
        thickness: None,
    },
    ModelSpec {
        name: "robot",
        path: "models/BrainStem/BrainStem.gltf",
        selector: Selector::Root,
        scale: [25.0, 25.0, 25.0],
        position: [-20.0, 0.0, -20.0],
        rotation: [None, Some(0.25), None],
        animated: true,
        thickness: None,
    },
];

#[derive(Clone, Debug, PartialEq)]
pub enum LoadStatus {
    Pending,
    Attached(NodeId),
    Failed(String),
}

/// Result of a successful [`attach`].
#[derive(Debug)]
pub struct Attached {
    pub node: NodeId,
    /// Set for animated models that came with at least one clip.
    pub mixer: Option<AnimationMixer>,
}

/// Select, transform and insert a loaded model according to `spec`.
pub fn attach(scene: &mut Scene, spec: &ModelSpec, loaded: LoadedModel) -> anyhow::Result<Attached> {
    let LoadedModel {
        scene: mut root,
        animations,
    } = loaded;
    let (mut node, prefix) = match spec.selector {
        Selector::Root => (root, vec![]),
        Selector::Child(idx) => {
            let count = root.get_children().len();
            let child = root.take_child(idx).with_context(|| {
                format!("{} has {} top-level nodes, no child {}", spec.name, count, idx)
            })?;
            (child, vec![idx])
        }
    };

    rebase_skins(node.as_mut(), &prefix, spec.name);
    place(node.as_mut(), spec);
    if let Some(thickness) = spec.thickness {
        node.for_each_material_mut(&mut |material| material.thickness = thickness);
    }

    let id = scene.add(node);
    log::info!("{} model loading successful", spec.name);

    let mixer = if spec.animated {
        match animations.into_iter().next() {
            Some(clip) => {
                let clip = clip.rebase(&prefix);
                log::debug!("playing {} on {} ({}s)", clip.name, spec.name, clip.duration);
                let mut mixer = AnimationMixer::new(id);
                mixer.clip_action(clip).play();
                Some(mixer)
            }
            None => {
                log::warn!("{} should be animated but has no animation clips", spec.name);
                None
            }
        }
    } else {
        None
    };

    Ok(Attached { node: id, mixer })
}

/// Overwrite scale and position and the listed Euler components of `node`.
pub fn place(node: &mut dyn SceneNode, spec: &ModelSpec) {
    let local = node.local_transform_mut();
    local.scale = spec.scale.into();
    local.position = spec.position.into();
    let mut euler = local.euler();
    for (angle, turn) in euler.iter_mut().zip(spec.rotation) {
        if let Some(turn) = turn {
            *angle = turn * PI;
        }
    }
    local.set_euler(euler);
}

/// Re-address every skin below `node` to the selected subtree. Skins with joints
/// outside it are dropped and their meshes stay in the bind pose.
fn rebase_skins(node: &mut dyn SceneNode, prefix: &[usize], model: &str) {
    let rebased = node.skin_mut().map(|skin| skin.rebase(prefix));
    if rebased == Some(false) {
        log::warn!("{}: skin of {} has joints outside the selected node", model, node.name());
        node.set_skin(None);
    }
    for child in node.get_children_mut() {
        rebase_skins(child.as_mut(), prefix, model);
    }
}

/// A magenta cube standing in for a model that could not be loaded.
pub fn placeholder(spec: &ModelSpec) -> Box<dyn SceneNode> {
    let model = Model {
        meshes: vec![Mesh::cube(2.0)],
        materials: vec![Material::standard("placeholder", 0xff00ff, 0.0, 0.5)],
    };
    let mut node = ModelNode::new(&format!("{}-placeholder", spec.name), model);
    node.local_transform_mut().position = spec.position.into();
    Box::new(node)
}
