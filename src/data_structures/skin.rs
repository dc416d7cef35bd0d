//! Skeletal skinning on the CPU.
//!
//! A [`Skin`] names its joints by child-index paths from the top-level node
//! of the model it belongs to, the same addressing animation clips use. Every
//! frame the joint matrices are rebuilt from the joints' world transforms and
//! the mesh vertices are blended with them before upload.

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector4, Zero};

use crate::data_structures::{
    instance::Instance,
    model::{Mesh, ModelVertex},
    scene_graph::SceneNode,
};

#[derive(Clone, Debug)]
pub struct Skin {
    pub joints: Vec<Vec<usize>>,
    /// One per joint: takes a vertex from mesh space into the joint's bind space.
    pub inverse_bind_matrices: Vec<Matrix4<f32>>,
}

impl Skin {
    pub fn new(joints: Vec<Vec<usize>>, inverse_bind_matrices: Vec<Matrix4<f32>>) -> Self {
        Self {
            joints,
            inverse_bind_matrices,
        }
    }

    /// Re-address the joints to the subtree at `prefix`.
    ///
    /// Returns `false` and leaves the skin untouched if any joint lies outside it.
    pub fn rebase(&mut self, prefix: &[usize]) -> bool {
        if !self.joints.iter().all(|joint| joint.starts_with(prefix)) {
            return false;
        }
        for joint in self.joints.iter_mut() {
            joint.drain(..prefix.len());
        }
        true
    }

    /// `inverse(mesh world) * joint world * inverse bind` for every joint.
    ///
    /// `top` is the node the joint paths start from. `None` when a joint is
    /// missing or the mesh transform cannot be inverted.
    pub fn joint_matrices(
        &self,
        top: &(dyn SceneNode + 'static),
        mesh_world: &Instance,
    ) -> Option<Vec<Matrix4<f32>>> {
        let mesh_inverse = mesh_world.to_matrix().invert()?;
        self.joints
            .iter()
            .zip(&self.inverse_bind_matrices)
            .map(|(path, inverse_bind)| {
                let joint = top.descendant(path)?;
                Some(mesh_inverse * joint.get_world_transform().to_matrix() * *inverse_bind)
            })
            .collect()
    }
}

/// Blend the vertices of `mesh` with `joint_matrices`.
///
/// `None` if the mesh carries no per-vertex joint data.
pub fn skin_vertices(mesh: &Mesh, joint_matrices: &[Matrix4<f32>]) -> Option<Vec<ModelVertex>> {
    if mesh.joints.len() != mesh.vertices.len() || mesh.weights.len() != mesh.vertices.len() {
        return None;
    }
    let skinned = mesh
        .vertices
        .iter()
        .zip(mesh.joints.iter().zip(&mesh.weights))
        .map(|(vertex, (joints, weights))| {
            let mut blend = Matrix4::zero();
            let mut total = 0.0;
            for (joint, weight) in joints.iter().zip(weights) {
                if *weight == 0.0 {
                    continue;
                }
                if let Some(matrix) = joint_matrices.get(*joint as usize) {
                    blend = blend + *matrix * *weight;
                    total += *weight;
                }
            }
            if total == 0.0 {
                return *vertex;
            }
            let [px, py, pz] = vertex.position;
            let [nx, ny, nz] = vertex.normal;
            let position = (blend * Vector4::new(px, py, pz, 1.0)).truncate();
            let normal = (blend * Vector4::new(nx, ny, nz, 0.0)).truncate();
            ModelVertex {
                position: position.into(),
                normal: if normal.magnitude2() > 0.0 {
                    normal.normalize().into()
                } else {
                    vertex.normal
                },
                ..*vertex
            }
        })
        .collect();
    Some(skinned)
}
