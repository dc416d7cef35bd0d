use std::{future::Future, pin::Pin};

use anyhow::Context as _;

use crate::data_structures::scene_graph::SceneNode;

/**
 * This module contains all logic for loading models, textures and animations from external files.
 */
pub mod animation;
pub mod gltf_import;

use animation::AnimationClip;

/// A parsed model before it is attached to the scene.
///
/// `scene` is a container whose children are the file's top-level nodes, in
/// file order. It is never collapsed, so `scene.get_children()[i]` always
/// refers to the i-th top-level node.
#[derive(Debug)]
pub struct LoadedModel {
    pub scene: Box<dyn SceneNode>,
    pub animations: Vec<AnimationClip>,
}

#[cfg(not(target_arch = "wasm32"))]
pub type LoadFuture = Pin<Box<dyn Future<Output = anyhow::Result<LoadedModel>> + Send>>;
#[cfg(target_arch = "wasm32")]
pub type LoadFuture = Pin<Box<dyn Future<Output = anyhow::Result<LoadedModel>>>>;

/// Anything that can turn an asset path into a [`LoadedModel`] asynchronously.
pub trait ModelLoader {
    fn load(&self, path: &str) -> LoadFuture;
}

/// Base location every relative asset path is resolved against.
///
/// Natively this is a directory, on the web a base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRoot(String);

impl AssetRoot {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        Self(root.trim_end_matches('/').to_string())
    }

    /// The platform default: `./assets` natively, `<origin>/assets` on the web.
    pub fn platform_default() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            let origin = web_sys::window()
                .and_then(|window| window.location().origin().ok())
                .unwrap_or_default();
            Self::new(format!("{}/assets", origin))
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            Self::new("./assets")
        }
    }

    pub fn resolve(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }
}

/// Resolve `uri` relative to the directory of `base`.
pub fn resolve_relative(base: &str, uri: &str) -> String {
    match base.rfind('/') {
        Some(idx) => format!("{}/{}", &base[..idx], uri),
        None => uri.to_string(),
    }
}

pub async fn load_binary(location: &str) -> anyhow::Result<Vec<u8>> {
    if location.starts_with("data:") {
        anyhow::bail!("embedded data URIs are not supported, export the glTF with external buffers or as .glb");
    }
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = reqwest::Url::parse(location).with_context(|| format!("invalid url {}", location))?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = tokio::fs::read(location)
        .await
        .with_context(|| format!("could not read {}", location))?;

    Ok(data)
}

/// Loads `.gltf`/`.glb` files from an [`AssetRoot`].
#[derive(Clone, Debug)]
pub struct GltfLoader {
    root: AssetRoot,
}

impl GltfLoader {
    pub fn new(root: AssetRoot) -> Self {
        Self { root }
    }
}

impl ModelLoader for GltfLoader {
    fn load(&self, path: &str) -> LoadFuture {
        let location = self.root.resolve(path);
        Box::pin(async move {
            gltf_import::load_model_gltf(&location)
                .await
                .with_context(|| format!("failed to load model {}", location))
        })
    }
}
