//! glTF 2.0 import into CPU-side scene nodes and animation clips.

use std::{
    collections::HashMap,
    io::{BufReader, Cursor},
};

use anyhow::Context as _;

use crate::{
    data_structures::{
        instance::Instance,
        model::{self, ImageData, Material, Mesh, Model, ModelVertex},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        skin::Skin,
    },
    resources::{
        LoadedModel,
        animation::{AnimationClip, Channel, Interpolation, Keyframes},
        load_binary, resolve_relative,
    },
};

pub async fn load_model_gltf(location: &str) -> anyhow::Result<LoadedModel> {
    let gltf_text = load_binary(location).await?;
    let gltf_cursor = Cursor::new(gltf_text);
    let gltf_reader = BufReader::new(gltf_cursor);
    let gltf = gltf::Gltf::from_reader(gltf_reader).context("not a valid glTF file")?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .context("glb buffer references a missing binary chunk")?;
                buffer_data.push(blob.into());
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(&resolve_relative(location, uri)).await?;
                buffer_data.push(bin);
            }
        }
    }

    // Load images, shared by every material referencing them
    let mut images = Vec::new();
    for image in gltf.images() {
        let bytes = match image.source() {
            gltf::image::Source::View { view, mime_type: _ } => {
                let buffer = &buffer_data[view.buffer().index()];
                let end = view.offset() + view.length();
                buffer
                    .get(view.offset()..end)
                    .context("image buffer view out of bounds")?
                    .to_vec()
            }
            gltf::image::Source::Uri { uri, mime_type: _ } => {
                load_binary(&resolve_relative(location, uri)).await?
            }
        };
        // A broken texture should not cost us the whole model.
        match image::load_from_memory(&bytes) {
            Ok(decoded) => images.push(Some(ImageData::new(decoded.to_rgba8()))),
            Err(e) => {
                log::warn!("could not decode image {} in {}: {}", image.index(), location, e);
                images.push(None);
            }
        }
    }

    // Load materials
    let materials: Vec<Material> = gltf
        .materials()
        .map(|material| to_material(&material, &images, location))
        .collect();

    // Build the node tree of the default scene and remember where every glTF node ended up
    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .context("glTF file contains no scene")?;
    let mut paths: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut root: Box<dyn SceneNode> = Box::new(ContainerNode::new(scene.name().unwrap_or(location)));
    for (idx, node) in scene.nodes().enumerate() {
        let child = to_scene_node(node, vec![idx], &buffer_data, &materials, &mut paths);
        root.add_child(child);
    }

    // Skins reference joints anywhere in the tree, so they are bound once every node has a path
    for node in gltf.nodes() {
        let (Some(skin), Some(path)) = (node.skin(), paths.get(&node.index())) else {
            continue;
        };
        let Some(skin) = to_skin(&skin, &buffer_data, &paths) else {
            log::warn!("skin of node {} references joints outside the scene", node.index());
            continue;
        };
        if let Some(target) = root.descendant_mut(path) {
            if !target.set_skin(Some(skin)) {
                log::warn!("node {} has a skin but no mesh", node.index());
            }
        }
    }

    let animations = gltf
        .animations()
        .map(|animation| to_clip(&animation, &buffer_data, &paths))
        .collect();

    Ok(LoadedModel {
        scene: root,
        animations,
    })
}

fn to_material(material: &gltf::Material, images: &[Option<ImageData>], location: &str) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}#{}", location, material.index().unwrap_or(0)));
    let base_color_texture = pbr
        .base_color_texture()
        .and_then(|info| images.get(info.texture().source().index()).cloned().flatten());
    Material {
        base_color: pbr.base_color_factor(),
        base_color_texture,
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        thickness: material
            .volume()
            .map(|volume| volume.thickness_factor())
            .unwrap_or(0.0),
        double_sided: material.double_sided(),
        ..Material::new(&name)
    }
}

fn to_scene_node(
    node: gltf::Node,
    path: Vec<usize>,
    buf: &[Vec<u8>],
    materials: &[Material],
    paths: &mut HashMap<usize, Vec<usize>>,
) -> Box<dyn SceneNode> {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));
    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => Box::new(ModelNode::new(&name, to_model(&mesh, buf, materials))),
        None => Box::new(ContainerNode::new(&name)),
    };
    let (translation, rotation, scale) = node.transform().decomposed();
    scene_node.set_local_transform(Instance {
        position: translation.into(),
        // glTF stores quaternions as [x, y, z, w]
        rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    });
    for (idx, child) in node.children().enumerate() {
        let mut child_path = path.clone();
        child_path.push(idx);
        let child_node = to_scene_node(child, child_path, buf, materials, paths);
        scene_node.add_child(child_node);
    }
    paths.insert(node.index(), path);

    scene_node
}

/// Every primitive becomes one [`Mesh`]; the model only carries the materials its primitives use.
fn to_model(mesh: &gltf::Mesh, buf: &[Vec<u8>], materials: &[Material]) -> Model {
    let mut model = Model::default();
    let mut material_slots: HashMap<Option<usize>, usize> = HashMap::new();
    let mesh_name = mesh.name().unwrap_or("unknown_mesh");

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "skipping primitive {} of {}: only triangle lists are supported, got {:?}",
                primitive.index(),
                mesh_name,
                primitive.mode()
            );
            continue;
        }
        let reader = primitive.reader(|buffer| buf.get(buffer.index()).map(Vec::as_slice));

        let mut vertices: Vec<ModelVertex> = match reader.read_positions() {
            Some(positions) => positions
                .map(|position| ModelVertex {
                    position,
                    ..Default::default()
                })
                .collect(),
            None => {
                log::warn!("primitive {} of {} has no positions", primitive.index(), mesh_name);
                continue;
            }
        };
        if let Some(normals) = reader.read_normals() {
            vertices
                .iter_mut()
                .zip(normals)
                .for_each(|(vertex, normal)| vertex.normal = normal);
        }
        if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
            vertices
                .iter_mut()
                .zip(tex_coords)
                .for_each(|(vertex, uv)| vertex.tex_coords = uv);
        }

        let joints: Vec<[u16; 4]> = reader
            .read_joints(0)
            .map(|joints| joints.into_u16().collect())
            .unwrap_or_default();
        let weights: Vec<[f32; 4]> = reader
            .read_weights(0)
            .map(|weights| weights.into_f32().collect())
            .unwrap_or_default();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };

        let material_index = primitive.material().index();
        let slot = *material_slots.entry(material_index).or_insert_with(|| {
            let material = material_index
                .and_then(|idx| materials.get(idx).cloned())
                .unwrap_or_else(|| model::Material::new("default"));
            model.materials.push(material);
            model.materials.len() - 1
        });

        let mut mesh = Mesh::new(mesh_name, vertices, indices, slot);
        if joints.len() == mesh.vertices.len() && weights.len() == mesh.vertices.len() {
            mesh.joints = joints;
            mesh.weights = weights;
        } else if !joints.is_empty() {
            log::warn!("primitive {} of {} has incomplete skinning attributes", primitive.index(), mesh_name);
        }
        model.meshes.push(mesh);
    }
    model
}

fn to_skin(skin: &gltf::Skin, buf: &[Vec<u8>], paths: &HashMap<usize, Vec<usize>>) -> Option<Skin> {
    let joints = skin
        .joints()
        .map(|joint| paths.get(&joint.index()).cloned())
        .collect::<Option<Vec<_>>>()?;
    let reader = skin.reader(|buffer| buf.get(buffer.index()).map(Vec::as_slice));
    let inverse_bind_matrices = match reader.read_inverse_bind_matrices() {
        Some(matrices) => matrices.map(cgmath::Matrix4::from).collect(),
        // glTF defaults every inverse bind matrix to identity
        None => vec![cgmath::Matrix4::from_scale(1.0); joints.len()],
    };
    Some(Skin::new(joints, inverse_bind_matrices))
}

fn to_clip(
    animation: &gltf::Animation,
    buf: &[Vec<u8>],
    paths: &HashMap<usize, Vec<usize>>,
) -> AnimationClip {
    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation{}", animation.index()));
    let mut channels = Vec::new();
    for channel in animation.channels() {
        let Some(target) = paths.get(&channel.target().node().index()) else {
            log::warn!(
                "animation {} targets node {} which is not part of the scene",
                name,
                channel.target().node().index()
            );
            continue;
        };
        let reader = channel.reader(|buffer| buf.get(buffer.index()).map(Vec::as_slice));
        let timestamps: Vec<f32> = match reader.read_inputs() {
            Some(inputs) => inputs.collect(),
            None => {
                log::warn!("no timestamps found in channel {} of {}", channel.index(), name);
                continue;
            }
        };
        let keyframes = match reader.read_outputs() {
            Some(gltf::animation::util::ReadOutputs::Translations(translations)) => {
                Keyframes::Translation(translations.map(Into::into).collect())
            }
            Some(gltf::animation::util::ReadOutputs::Rotations(rotations)) => Keyframes::Rotation(
                rotations
                    .into_f32()
                    .map(|[x, y, z, w]| cgmath::Quaternion::new(w, x, y, z))
                    .collect(),
            ),
            Some(gltf::animation::util::ReadOutputs::Scales(scales)) => {
                Keyframes::Scale(scales.map(Into::into).collect())
            }
            // TODO: implement morphing
            Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) => Keyframes::Other,
            None => {
                log::warn!("no keyframes found in channel {} of {}", channel.index(), name);
                continue;
            }
        };
        let interpolation = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        };
        channels.push(Channel {
            target: target.clone(),
            timestamps,
            keyframes,
            interpolation,
        });
    }
    AnimationClip::new(&name, channels)
}
