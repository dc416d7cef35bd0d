//! Render composition.
//!
//! The stage only talks to the GPU through [`Renderer`]. A renderer flattens
//! the scene graph with [`collect_draws`] into [`DrawItem`]s, one per mesh,
//! each carrying the world transform its node had after the last
//! [`Scene::update_world_transforms`]. Skinned meshes come with their vertices
//! already blended into the current pose.

use crate::{
    camera::Camera,
    data_structures::{
        instance::Instance,
        model::{Material, Mesh, ModelVertex},
        scene_graph::{Scene, SceneNode},
        skin::skin_vertices,
    },
};

pub trait Renderer {
    fn render(&mut self, scene: &Scene, camera: &Camera);

    /// Set the drawable size in logical pixels.
    fn set_size(&mut self, width: u32, height: u32);

    /// Set the ratio of physical to logical pixels of the backing surface.
    fn set_pixel_ratio(&mut self, ratio: f64);
}

/// One mesh to draw with its material and world transform.
#[derive(Clone, Debug)]
pub struct DrawItem<'a> {
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    pub transform: &'a Instance,
    /// Posed vertices replacing `mesh.vertices` for skinned meshes.
    pub skinned: Option<Vec<ModelVertex>>,
}

impl DrawItem<'_> {
    /// The vertices to upload this frame.
    pub fn vertices(&self) -> &[ModelVertex] {
        self.skinned.as_deref().unwrap_or(&self.mesh.vertices)
    }
}

/// Every visible mesh of the scene in depth-first order. Hidden nodes hide their subtree.
pub fn collect_draws(scene: &Scene) -> Vec<DrawItem<'_>> {
    // `top` is the top-level node joint paths are resolved from
    fn collect<'a>(
        top: &'a (dyn SceneNode + 'static),
        node: &'a (dyn SceneNode + 'static),
        out: &mut Vec<DrawItem<'a>>,
    ) {
        if !node.base().visible {
            return;
        }
        if let Some(model) = node.model() {
            let joint_matrices = node.skin().and_then(|skin| {
                let matrices = skin.joint_matrices(top, node.get_world_transform());
                if matrices.is_none() {
                    log::debug!("skin of {} cannot be posed, drawing its bind pose", node.name());
                }
                matrices
            });
            for mesh in &model.meshes {
                let skinned = joint_matrices
                    .as_deref()
                    .filter(|_| mesh.is_skinned())
                    .and_then(|matrices| skin_vertices(mesh, matrices));
                match model.material_of(mesh) {
                    Some(material) => out.push(DrawItem {
                        mesh,
                        material,
                        transform: node.get_world_transform(),
                        skinned,
                    }),
                    None => log::warn!(
                        "mesh {} of {} references missing material {}",
                        mesh.name,
                        node.name(),
                        mesh.material
                    ),
                }
            }
        }
        for child in node.get_children() {
            collect(top, child.as_ref(), out);
        }
    }
    let mut draws = Vec::new();
    for node in scene.nodes() {
        collect(node.as_ref(), node.as_ref(), &mut draws);
    }
    draws
}
