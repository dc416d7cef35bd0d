//! Viewport sizing and the resize handler.

use winit::window::Window;

use crate::{camera::Camera, render::Renderer};

/// Logical size of the drawable area in CSS pixels (points natively).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sizes {
    pub width: u32,
    pub height: u32,
}

impl Sizes {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Where the resize handler reads the current window geometry from.
pub trait WindowMetrics {
    fn logical_size(&self) -> Sizes;

    fn device_pixel_ratio(&self) -> f64;
}

impl WindowMetrics for Window {
    fn logical_size(&self) -> Sizes {
        let size = self.inner_size().to_logical::<f64>(self.scale_factor());
        Sizes::new(size.width.round() as u32, size.height.round() as u32)
    }

    // winit reports `devicePixelRatio` as the scale factor on the web
    fn device_pixel_ratio(&self) -> f64 {
        self.scale_factor()
    }
}

pub fn clamp_pixel_ratio(device_pixel_ratio: f64, max_pixel_ratio: f64) -> f64 {
    device_pixel_ratio.min(max_pixel_ratio)
}

/// Re-read the window geometry and push it into the camera and renderer.
///
/// Returns `false` without touching anything when either dimension is zero,
/// which is what a minimised window reports.
pub fn on_resize(
    metrics: &dyn WindowMetrics,
    sizes: &mut Sizes,
    camera: &mut Camera,
    renderer: &mut dyn Renderer,
    max_pixel_ratio: f64,
) -> bool {
    let new_sizes = metrics.logical_size();
    if new_sizes.width == 0 || new_sizes.height == 0 {
        log::debug!("ignoring resize to {}x{}", new_sizes.width, new_sizes.height);
        return false;
    }
    *sizes = new_sizes;

    camera.aspect = sizes.aspect();
    camera.update_projection_matrix();

    renderer.set_size(sizes.width, sizes.height);
    renderer.set_pixel_ratio(clamp_pixel_ratio(metrics.device_pixel_ratio(), max_pixel_ratio));
    true
}

/// Logical size and pixel ratio of the drawing surface.
///
/// Changes are batched: setting the size and then the ratio marks the surface
/// dirty once, and [`SurfaceSize::take_reconfigure`] hands out the new physical
/// size a single time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSize {
    logical: Sizes,
    pixel_ratio: f64,
    dirty: bool,
}

impl SurfaceSize {
    pub fn new(logical: Sizes, pixel_ratio: f64) -> Self {
        Self {
            logical,
            pixel_ratio,
            dirty: false,
        }
    }

    pub fn logical(&self) -> Sizes {
        self.logical
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn set_logical(&mut self, logical: Sizes) {
        if logical != self.logical {
            self.logical = logical;
            self.dirty = true;
        }
    }

    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        if ratio != self.pixel_ratio {
            self.pixel_ratio = ratio;
            self.dirty = true;
        }
    }

    /// Logical size times the pixel ratio, rounded.
    pub fn physical_size(&self) -> [u32; 2] {
        let scale = |v: u32| (v as f64 * self.pixel_ratio).round() as u32;
        [scale(self.logical.width), scale(self.logical.height)]
    }

    /// The physical size to configure the surface with, if it changed since the last call.
    pub fn take_reconfigure(&mut self) -> Option<[u32; 2]> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.physical_size())
    }
}
