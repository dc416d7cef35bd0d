//! Scene graph and hierarchical scene organization.
//!
//! The [`Scene`] is the root container every stage component shares. Nodes are
//! boxed [`SceneNode`] trait objects that own their children; the root only
//! ever grows, so the index a node was inserted at stays a valid [`NodeId`]
//! for the lifetime of the scene.

use std::fmt::Debug;

use crate::data_structures::{
    instance::Instance,
    light::Light,
    model::{Material, Model},
    skin::Skin,
};

/// Position of a top-level node in the [`Scene`] root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// State every node carries regardless of what it renders.
#[derive(Debug)]
pub struct NodeBase {
    pub name: String,
    pub local: Instance,
    world: Instance,
    pub children: Vec<Box<dyn SceneNode>>,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl NodeBase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            local: Instance::default(),
            world: Instance::default(),
            children: Vec::new(),
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

pub trait SceneNode: Send + Debug {
    fn base(&self) -> &NodeBase;

    fn base_mut(&mut self) -> &mut NodeBase;

    fn model(&self) -> Option<&Model> {
        None
    }

    fn model_mut(&mut self) -> Option<&mut Model> {
        None
    }

    fn light(&self) -> Option<&Light> {
        None
    }

    fn skin(&self) -> Option<&Skin> {
        None
    }

    fn skin_mut(&mut self) -> Option<&mut Skin> {
        None
    }

    /// Bind `skin` to this node. Returns `false` for nodes that cannot carry one.
    fn set_skin(&mut self, _skin: Option<Skin>) -> bool {
        false
    }

    fn name(&self) -> &str {
        &self.base().name
    }

    fn get_local_transform(&self) -> &Instance {
        &self.base().local
    }

    fn local_transform_mut(&mut self) -> &mut Instance {
        &mut self.base_mut().local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.base_mut().local = instance;
    }

    /// World transform as of the last [`SceneNode::update_world_transforms`].
    fn get_world_transform(&self) -> &Instance {
        &self.base().world
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.base().children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.base_mut().children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.base_mut().children.push(child);
    }

    /// Detach the child at `idx`, handing ownership to the caller.
    fn take_child(&mut self, idx: usize) -> Option<Box<dyn SceneNode>> {
        let children = &mut self.base_mut().children;
        (idx < children.len()).then(|| children.remove(idx))
    }

    fn update_world_transforms(&mut self, parent: &Instance) {
        let base = self.base_mut();
        base.world = parent * &base.local;
        let world = base.world;
        for child in base.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn for_each_material_mut(&mut self, f: &mut dyn FnMut(&mut Material)) {
        if let Some(model) = self.model_mut() {
            model.materials.iter_mut().for_each(&mut *f);
        }
        for child in self.get_children_mut() {
            child.for_each_material_mut(f);
        }
    }
}

impl dyn SceneNode {
    /// Follow child indices from this node, e.g. `[1, 0]` is the first child of the second child.
    pub fn descendant(&self, path: &[usize]) -> Option<&(dyn SceneNode + 'static)> {
        match path.split_first() {
            None => Some(self),
            Some((idx, rest)) => self.get_children().get(*idx)?.descendant(rest),
        }
    }

    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut (dyn SceneNode + 'static)> {
        match path.split_first() {
            None => Some(self),
            Some((idx, rest)) => self.get_children_mut().get_mut(*idx)?.descendant_mut(rest),
        }
    }

    /// Depth-first search by name, including `self`.
    pub fn find(&self, name: &str) -> Option<&(dyn SceneNode + 'static)> {
        if self.name() == name {
            return Some(self);
        }
        self.get_children().iter().find_map(|child| child.find(name))
    }
}

/// A grouping node without geometry of its own.
#[derive(Debug)]
pub struct ContainerNode {
    base: NodeBase,
}

impl ContainerNode {
    pub fn new(name: &str) -> Self {
        Self {
            base: NodeBase::new(name),
        }
    }
}

impl SceneNode for ContainerNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }
}

/// A node drawing the meshes of one [`Model`].
#[derive(Debug)]
pub struct ModelNode {
    base: NodeBase,
    model: Model,
    skin: Option<Skin>,
}

impl ModelNode {
    pub fn new(name: &str, model: Model) -> Self {
        Self {
            base: NodeBase::new(name),
            model,
            skin: None,
        }
    }
}

impl SceneNode for ModelNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn model(&self) -> Option<&Model> {
        Some(&self.model)
    }

    fn model_mut(&mut self) -> Option<&mut Model> {
        Some(&mut self.model)
    }

    fn skin(&self) -> Option<&Skin> {
        self.skin.as_ref()
    }

    fn skin_mut(&mut self) -> Option<&mut Skin> {
        self.skin.as_mut()
    }

    fn set_skin(&mut self, skin: Option<Skin>) -> bool {
        self.skin = skin;
        true
    }
}

#[derive(Debug)]
pub struct LightNode {
    base: NodeBase,
    light: Light,
}

impl LightNode {
    pub fn new(name: &str, light: Light) -> Self {
        let mut base = NodeBase::new(name);
        base.cast_shadow = light.casts_shadow();
        Self { base, light }
    }
}

impl SceneNode for LightNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn light(&self) -> Option<&Light> {
        Some(&self.light)
    }
}

/// The scene graph root: an add-only list of top-level nodes.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Box<dyn SceneNode>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Box<dyn SceneNode>) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&(dyn SceneNode + 'static)> {
        self.nodes.get(id.0).map(|node| node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut (dyn SceneNode + 'static)> {
        self.nodes.get_mut(id.0).map(|node| node.as_mut())
    }

    pub fn nodes(&self) -> &[Box<dyn SceneNode>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First top-level node called `name`.
    pub fn find_top_level(&self, name: &str) -> Option<(NodeId, &(dyn SceneNode + 'static))> {
        self.nodes
            .iter()
            .enumerate()
            .find(|(_, node)| node.name() == name)
            .map(|(idx, node)| (NodeId(idx), node.as_ref()))
    }

    pub fn update_world_transforms(&mut self) {
        let identity = Instance::default();
        for node in self.nodes.iter_mut() {
            node.update_world_transforms(&identity);
        }
    }

    /// Every light in the graph with its world transform.
    pub fn lights(&self) -> Vec<(&Light, &Instance)> {
        fn collect<'a>(node: &'a dyn SceneNode, out: &mut Vec<(&'a Light, &'a Instance)>) {
            if !node.base().visible {
                return;
            }
            if let Some(light) = node.light() {
                out.push((light, node.get_world_transform()));
            }
            for child in node.get_children() {
                collect(child.as_ref(), out);
            }
        }
        let mut lights = Vec::new();
        for node in &self.nodes {
            collect(node.as_ref(), &mut lights);
        }
        lights
    }
}
