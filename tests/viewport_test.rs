use gltf_stage::{
    camera::Camera,
    config::StageConfig,
    data_structures::scene_graph::Scene,
    render::Renderer,
    stage::Stage,
    viewport::{self, Sizes, SurfaceSize, clamp_pixel_ratio},
};

use crate::common::test_utils::{FixedMetrics, RecordingRenderer, assert_close};

mod common;

#[test]
fn should_clamp_the_pixel_ratio_to_two() {
    assert_eq!(clamp_pixel_ratio(3.0, 2.0), 2.0);
    assert_eq!(clamp_pixel_ratio(2.0, 2.0), 2.0);
    assert_eq!(clamp_pixel_ratio(1.5, 2.0), 1.5);
    assert_eq!(clamp_pixel_ratio(1.0, 2.0), 1.0);
}

#[test]
fn should_resize_camera_and_renderer() {
    let mut sizes = Sizes::new(800, 600);
    let mut camera = Camera::new(cgmath::Deg(75.0), sizes.aspect(), 0.1, 1000.0);
    let before = camera.projection_matrix();
    let mut renderer = RecordingRenderer::default();

    let resized = viewport::on_resize(
        &FixedMetrics::new(1920, 1080, 3.0),
        &mut sizes,
        &mut camera,
        &mut renderer,
        2.0,
    );

    assert!(resized);
    assert_eq!(sizes, Sizes::new(1920, 1080));
    assert_close(camera.aspect, 1920.0 / 1080.0);
    assert_ne!(camera.projection_matrix(), before);
    assert_eq!(renderer.sizes, vec![(1920, 1080)]);
    assert_eq!(renderer.pixel_ratios, vec![2.0]);
    // on_resize alone does not draw
    assert!(renderer.frames.is_empty());
}

#[test]
fn should_keep_a_low_pixel_ratio_unchanged() {
    let mut stage = Stage::new(StageConfig::default(), Sizes::new(800, 600));
    let mut renderer = RecordingRenderer::default();

    stage.resize(&FixedMetrics::new(1024, 768, 1.5), &mut renderer);

    assert_eq!(renderer.pixel_ratios, vec![1.5]);
}

#[test]
fn should_render_once_after_a_resize() {
    let mut stage = Stage::new(StageConfig::default(), Sizes::new(800, 600));
    let mut renderer = RecordingRenderer::default();

    assert!(stage.resize(&FixedMetrics::new(640, 480, 1.0), &mut renderer));

    assert_eq!(stage.sizes(), Sizes::new(640, 480));
    assert_close(stage.camera().aspect, 640.0 / 480.0);
    assert_eq!(renderer.frames.len(), 1);
    assert_eq!(renderer.frames[0].top_level_nodes, 3);
}

#[test]
fn should_ignore_a_zero_sized_window() {
    let mut stage = Stage::new(StageConfig::default(), Sizes::new(800, 600));
    let mut renderer = RecordingRenderer::default();

    assert!(!stage.resize(&FixedMetrics::new(0, 0, 2.0), &mut renderer));
    assert!(!stage.resize(&FixedMetrics::new(1024, 0, 2.0), &mut renderer));

    assert_eq!(stage.sizes(), Sizes::new(800, 600));
    assert_close(stage.camera().aspect, 800.0 / 600.0);
    assert!(renderer.sizes.is_empty());
    assert!(renderer.pixel_ratios.is_empty());
    assert!(renderer.frames.is_empty());
}

#[test]
fn should_follow_consecutive_resizes() {
    let mut stage = Stage::new(StageConfig::default(), Sizes::new(800, 600));
    let mut renderer = RecordingRenderer::default();

    stage.resize(&FixedMetrics::new(1000, 500, 1.0), &mut renderer);
    stage.resize(&FixedMetrics::new(500, 1000, 2.5), &mut renderer);

    assert_close(stage.camera().aspect, 0.5);
    assert_eq!(renderer.sizes, vec![(1000, 500), (500, 1000)]);
    assert_eq!(renderer.pixel_ratios, vec![1.0, 2.0]);
    assert_eq!(renderer.frames.len(), 2);
}

/// Tracks the surface the way the GPU renderer does and records every configure.
struct SurfaceRenderer {
    surface: SurfaceSize,
    configured: Vec<[u32; 2]>,
}

impl Renderer for SurfaceRenderer {
    fn render(&mut self, _scene: &Scene, _camera: &Camera) {
        if let Some(size) = self.surface.take_reconfigure() {
            self.configured.push(size);
        }
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.surface.set_logical(Sizes::new(width, height));
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.surface.set_pixel_ratio(ratio);
    }
}

#[test]
fn should_configure_the_surface_once_per_resize() {
    let mut stage = Stage::new(StageConfig::default(), Sizes::new(800, 600));
    let mut renderer = SurfaceRenderer {
        surface: SurfaceSize::new(Sizes::new(800, 600), 1.0),
        configured: Vec::new(),
    };

    stage.resize(&FixedMetrics::new(1920, 1080, 3.0), &mut renderer);

    assert_eq!(renderer.configured, vec![[3840, 2160]]);
}

#[test]
fn should_hand_out_a_changed_surface_size_only_once() {
    let mut surface = SurfaceSize::new(Sizes::new(800, 600), 1.0);
    assert_eq!(surface.take_reconfigure(), None);

    surface.set_logical(Sizes::new(1000, 500));
    surface.set_pixel_ratio(2.0);

    assert_eq!(surface.take_reconfigure(), Some([2000, 1000]));
    assert_eq!(surface.take_reconfigure(), None);
}

#[test]
fn should_not_reconfigure_for_unchanged_values() {
    let mut surface = SurfaceSize::new(Sizes::new(800, 600), 1.5);

    surface.set_logical(Sizes::new(800, 600));
    surface.set_pixel_ratio(1.5);

    assert_eq!(surface.take_reconfigure(), None);
}

#[test]
fn should_round_the_physical_size() {
    let surface = SurfaceSize::new(Sizes::new(333, 101), 1.5);

    assert_eq!(surface.physical_size(), [500, 152]);
    assert_eq!(surface.logical(), Sizes::new(333, 101));
    assert_eq!(surface.pixel_ratio(), 1.5);
}
