//! The stage: scene bootstrap, model attachment, the per-frame tick and resizing.

use std::f32::consts::PI;

use instant::Duration;

use crate::{
    attach::{self, LoadStatus, MODELS},
    camera::{Camera, Controls},
    config::StageConfig,
    data_structures::{
        light::Light,
        model::{Material, Mesh, Model},
        scene_graph::{LightNode, ModelNode, Scene, SceneNode},
    },
    render::Renderer,
    resources::{LoadFuture, LoadedModel, ModelLoader, animation::AnimationMixer},
    viewport::{self, Sizes, WindowMetrics},
};

#[derive(Debug)]
pub struct Stage {
    scene: Scene,
    camera: Camera,
    sizes: Sizes,
    mixer: Option<AnimationMixer>,
    loads: Vec<LoadStatus>,
    config: StageConfig,
}

impl Stage {
    /// Set up the camera, the floor and both lights. No model is loaded yet.
    pub fn new(config: StageConfig, sizes: Sizes) -> Self {
        let mut camera = Camera::new(cgmath::Deg(75.0), sizes.aspect(), 0.1, 1000.0);
        camera.position = cgmath::Point3::new(70.0, 40.0, 10.0);

        let mut scene = Scene::new();
        scene.add(floor());

        let mut hemisphere = LightNode::new("hemisphere-light", Light::hemisphere(0xffffff, 0xffffff, 0.75));
        hemisphere.local_transform_mut().position = (0.0, 50.0, 0.0).into();
        scene.add(Box::new(hemisphere));

        let mut directional = LightNode::new(
            "directional-light",
            Light::directional(0xffffff, 0.75).with_shadow([1024, 1024]),
        );
        directional.local_transform_mut().position = (-8.0, 12.0, 8.0).into();
        scene.add(Box::new(directional));

        scene.update_world_transforms();

        Self {
            scene,
            camera,
            sizes,
            mixer: None,
            loads: Vec::new(),
            config,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn sizes(&self) -> Sizes {
        self.sizes
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.mixer.as_ref()
    }

    pub fn loads(&self) -> &[LoadStatus] {
        &self.loads
    }

    /// Whether every issued load has either attached or failed.
    pub fn is_ready(&self) -> bool {
        !self.loads.iter().any(|status| *status == LoadStatus::Pending)
    }

    /// Publish `mixer` as the stage's animation controller.
    ///
    /// The slot is filled at most once. Returns `false` and drops `mixer` when
    /// it is already bound.
    pub fn bind_mixer(&mut self, mixer: AnimationMixer) -> bool {
        if let Some(bound) = &self.mixer {
            log::warn!(
                "animation mixer already bound to {:?}, ignoring mixer for {:?}",
                bound.root(),
                mixer.root()
            );
            return false;
        }
        self.mixer = Some(mixer);
        true
    }

    /// Start loading every model. The futures are independent and may complete in any order;
    /// hand each result to [`Stage::on_model_loaded`] with its index.
    pub fn issue_loads(&mut self, loader: &dyn ModelLoader) -> Vec<(usize, LoadFuture)> {
        self.loads = vec![LoadStatus::Pending; MODELS.len()];
        MODELS
            .iter()
            .enumerate()
            .map(|(idx, spec)| {
                log::debug!("loading {} from {}", spec.name, spec.path);
                (idx, loader.load(spec.path))
            })
            .collect()
    }

    pub fn on_model_loaded(&mut self, index: usize, result: anyhow::Result<LoadedModel>) {
        let Some(spec) = MODELS.get(index) else {
            log::warn!("load completed for unknown model {}", index);
            return;
        };
        match self.loads.get(index) {
            Some(LoadStatus::Pending) => (),
            status => {
                log::warn!("ignoring load result for {} with status {:?}", spec.name, status);
                return;
            }
        }

        let status = match result.and_then(|loaded| attach::attach(&mut self.scene, spec, loaded)) {
            Ok(attached) => {
                if let Some(mixer) = attached.mixer {
                    self.bind_mixer(mixer);
                }
                LoadStatus::Attached(attached.node)
            }
            Err(e) => {
                log::error!("could not load {} from {}: {:#}", spec.name, spec.path, e);
                self.scene.add(attach::placeholder(spec));
                LoadStatus::Failed(format!("{:#}", e))
            }
        };
        self.loads[index] = status;
    }

    /// One frame: move the camera, draw, then advance the animation by the scaled `delta`.
    pub fn tick(&mut self, controls: &mut dyn Controls, renderer: &mut dyn Renderer, delta: Duration) {
        controls.update(&mut self.camera);

        self.scene.update_world_transforms();
        renderer.render(&self.scene, &self.camera);

        if let Some(mixer) = &mut self.mixer {
            mixer.update(delta.as_secs_f32() * self.config.animation_speed);
            mixer.apply(&mut self.scene);
        }
    }

    /// Re-read the window geometry and draw one frame at the new size.
    pub fn resize(&mut self, metrics: &dyn WindowMetrics, renderer: &mut dyn Renderer) -> bool {
        let resized = viewport::on_resize(
            metrics,
            &mut self.sizes,
            &mut self.camera,
            renderer,
            self.config.max_pixel_ratio,
        );
        if resized {
            self.scene.update_world_transforms();
            renderer.render(&self.scene, &self.camera);
        }
        resized
    }
}

fn floor() -> Box<dyn SceneNode> {
    let model = Model {
        meshes: vec![Mesh::plane(100.0, 100.0)],
        materials: vec![Material::standard("floor", 0x2e8b57, 0.0, 0.5)],
    };
    let mut floor = ModelNode::new("floor", model);
    floor.base_mut().receive_shadow = true;
    let local = floor.local_transform_mut();
    local.set_euler([-PI * 0.5, 0.0, 0.0]);
    local.position.y = -0.1;
    Box::new(floor)
}
