use cgmath::{Deg, InnerSpace, Point3};
use gltf_stage::camera::{Camera, Controls, OrbitControls};
use winit::{dpi::PhysicalSize, event::WindowEvent};

use crate::common::test_utils::{assert_close, assert_close3};

mod common;

const SCREEN_HEIGHT: u32 = 600;

fn camera() -> Camera {
    let mut camera = Camera::new(Deg(75.0), 800.0 / 600.0, 0.1, 1000.0);
    camera.position = Point3::new(0.0, 0.0, 10.0);
    camera
}

fn azimuth(camera: &Camera) -> f32 {
    let offset = camera.position - camera.target;
    offset.x.atan2(offset.z)
}

fn undamped() -> OrbitControls {
    let mut controls = OrbitControls::new(SCREEN_HEIGHT);
    controls.enable_damping = false;
    controls
}

#[test]
fn should_apply_a_damped_share_of_the_rotation_per_update() {
    let mut camera = camera();
    let mut controls = OrbitControls::new(SCREEN_HEIGHT);

    controls.rotate_left(1.0);
    controls.update(&mut camera);
    assert_close(azimuth(&camera), -0.05);
    assert_close(camera.position.x, -10.0 * 0.05_f32.sin());

    // the remaining 95% keeps decaying by the same factor
    controls.update(&mut camera);
    assert_close(azimuth(&camera), -0.05 - 0.95 * 0.05);
}

#[test]
fn should_settle_on_the_full_rotation() {
    let mut camera = camera();
    let mut controls = OrbitControls::new(SCREEN_HEIGHT);

    controls.rotate_left(1.0);
    for _ in 0..400 {
        controls.update(&mut camera);
    }

    assert!((azimuth(&camera) + 1.0).abs() < 1e-3, "azimuth is {}", azimuth(&camera));
    assert_close((camera.position - camera.target).magnitude(), 10.0);
}

#[test]
fn should_rotate_at_once_without_damping() {
    let mut camera = camera();
    let mut controls = undamped();

    controls.rotate_left(0.5);
    controls.update(&mut camera);
    controls.update(&mut camera);

    assert_close(azimuth(&camera), -0.5);
}

#[test]
fn should_keep_the_camera_off_the_poles() {
    for (turn, pole) in [(-10.0, -10.0), (10.0, 10.0)] {
        let mut camera = camera();
        let mut controls = undamped();

        controls.rotate_up(turn);
        controls.update(&mut camera);

        // still in front of the target, so the view stays well defined
        assert_close(camera.position.y, pole);
        assert!(camera.position.z > 0.0, "camera reached the pole: {:?}", camera.position);
        let view: [[f32; 4]; 4] = camera.view_matrix().into();
        assert!(view.iter().flatten().all(|v| v.is_finite()), "{:?}", view);
    }
}

#[test]
fn should_scale_the_radius_with_the_wheel() {
    let mut camera = camera();
    let mut controls = OrbitControls::new(SCREEN_HEIGHT);

    controls.dolly(1.0);
    controls.update(&mut camera);
    assert_close3(camera.position.into(), [0.0, 0.0, 9.5]);

    controls.dolly(-1.0);
    controls.update(&mut camera);
    assert_close3(camera.position.into(), [0.0, 0.0, 10.0]);
}

#[test]
fn should_clamp_the_radius_to_the_distance_limits() {
    let mut camera = camera();
    let mut controls = OrbitControls::new(SCREEN_HEIGHT);
    controls.max_distance = 12.0;
    controls.min_distance = 8.0;

    controls.dolly(-10.0);
    controls.update(&mut camera);
    assert_close(camera.position.z, 12.0);

    controls.dolly(20.0);
    controls.update(&mut camera);
    assert_close(camera.position.z, 8.0);
}

#[test]
fn should_move_the_target_when_panning() {
    let mut camera = camera();
    let mut controls = undamped();

    controls.pan(100.0, 0.0);
    controls.update(&mut camera);

    // dragging right moves the target left by the visible width of 100 pixels
    let per_pixel = 2.0 * 10.0 * 37.5_f32.to_radians().tan() / SCREEN_HEIGHT as f32;
    assert_close3(camera.target.into(), [-100.0 * per_pixel, 0.0, 0.0]);
    assert_close3((camera.position - camera.target).into(), [0.0, 0.0, 10.0]);
}

#[test]
fn should_damp_the_pan_like_the_rotation() {
    let mut camera = camera();
    let mut controls = OrbitControls::new(SCREEN_HEIGHT);

    controls.pan(0.0, 100.0);
    controls.update(&mut camera);

    let per_pixel = 2.0 * 10.0 * 37.5_f32.to_radians().tan() / SCREEN_HEIGHT as f32;
    assert_close(camera.target.y, 0.05 * 100.0 * per_pixel);
}

#[test]
fn should_scale_the_pan_with_the_window_height() {
    let mut camera = camera();
    let mut controls = undamped();

    controls.handle_window_events(&WindowEvent::Resized(PhysicalSize::new(800, 300)));
    controls.pan(100.0, 0.0);
    controls.update(&mut camera);

    let per_pixel = 2.0 * 10.0 * 37.5_f32.to_radians().tan() / 300.0;
    assert_close(camera.target.x, -100.0 * per_pixel);
}

#[test]
fn should_not_drift_without_input() {
    let mut camera = camera();
    let mut controls = OrbitControls::new(SCREEN_HEIGHT);

    for _ in 0..10 {
        controls.update(&mut camera);
    }

    assert_close3(camera.position.into(), [0.0, 0.0, 10.0]);
    assert_close3(camera.target.into(), [0.0, 0.0, 0.0]);
}
