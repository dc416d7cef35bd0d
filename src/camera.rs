//! Perspective camera, orbit controls and the camera uniform.

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A perspective camera looking at `target`.
///
/// The projection matrix is cached and only rebuilt by
/// [`Camera::update_projection_matrix`], so changing `aspect` has no effect
/// until that is called.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: cgmath::Deg<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    projection: Matrix4<f32>,
}

impl Camera {
    pub fn new(fovy: cgmath::Deg<f32>, aspect: f32, znear: f32, zfar: f32) -> Self {
        let mut camera = Self {
            position: Point3::new(0.0, 0.0, 1.0),
            target: Point3::origin(),
            up: Vector3::unit_y(),
            fovy,
            aspect,
            znear,
            zfar,
            projection: Matrix4::from_scale(1.0),
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection = perspective(self.fovy, self.aspect, self.znear, self.zfar);
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.projection * self.view_matrix()
    }
}

/// Anything that moves the camera once per frame.
pub trait Controls {
    fn update(&mut self, camera: &mut Camera);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum DragState {
    #[default]
    None,
    Rotate,
    Pan,
}

/// Orbits the camera around its target.
///
/// Left drag rotates, right drag pans in screen space and the wheel dollies.
/// Input is accumulated by [`OrbitControls::handle_window_events`] or the
/// `rotate_left`, `rotate_up`, `pan` and `dolly` calls and applied
/// on the next [`Controls::update`].
#[derive(Debug)]
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub damping_factor: f32,
    pub enable_damping: bool,
    pub min_distance: f32,
    pub max_distance: f32,

    drag: DragState,
    cursor: Option<PhysicalPosition<f64>>,
    screen_height: f32,
    // accumulated input, consumed by update
    theta_delta: f32,
    phi_delta: f32,
    pan_delta: [f32; 2],
    scale: f32,
    pan_offset: Vector3<f32>,
}

impl OrbitControls {
    pub fn new(screen_height: u32) -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            damping_factor: 0.05,
            enable_damping: true,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            drag: DragState::None,
            cursor: None,
            screen_height: screen_height.max(1) as f32,
            theta_delta: 0.0,
            phi_delta: 0.0,
            pan_delta: [0.0, 0.0],
            scale: 1.0,
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    /// Queue a rotation of `angle` radians around the up axis.
    pub fn rotate_left(&mut self, angle: f32) {
        self.theta_delta -= angle;
    }

    /// Queue a rotation of `angle` radians towards the top pole.
    pub fn rotate_up(&mut self, angle: f32) {
        self.phi_delta -= angle;
    }

    /// Queue a pan by a screen-space offset in pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pan_delta[0] += dx * self.pan_speed;
        self.pan_delta[1] += dy * self.pan_speed;
    }

    /// Queue a wheel step. Positive values move towards the target.
    pub fn dolly(&mut self, scroll: f32) {
        let step = 0.95_f32.powf(self.zoom_speed * scroll.abs());
        if scroll > 0.0 {
            self.scale *= step;
        } else if scroll < 0.0 {
            self.scale /= step;
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => self.screen_height = size.height.max(1) as f32,
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => DragState::Rotate,
                    (ElementState::Pressed, MouseButton::Right) => DragState::Pan,
                    (ElementState::Released, _) => DragState::None,
                    _ => self.drag,
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(last) = self.cursor {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    match self.drag {
                        DragState::Rotate => {
                            self.rotate_left(2.0 * PI * dx / self.screen_height * self.rotate_speed);
                            self.rotate_up(2.0 * PI * dy / self.screen_height * self.rotate_speed);
                        }
                        DragState::Pan => self.pan(dx, dy),
                        DragState::None => (),
                    }
                }
                self.cursor = Some(*position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = DragState::None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.dolly(scroll);
            }
            _ => (),
        }
    }
}

impl Controls for OrbitControls {
    fn update(&mut self, camera: &mut Camera) {
        let offset = camera.position - camera.target;
        let mut radius = offset.magnitude();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        // pan in the camera's screen plane, scaled so the target follows the cursor
        if self.pan_delta != [0.0, 0.0] {
            let forward = (-offset).normalize();
            let right = forward.cross(camera.up).normalize();
            let up = right.cross(forward);
            let target_distance = radius * (Rad::from(camera.fovy).0 / 2.0).tan();
            let per_pixel = 2.0 * target_distance / self.screen_height;
            self.pan_offset += right * (-self.pan_delta[0] * per_pixel) + up * (self.pan_delta[1] * per_pixel);
            self.pan_delta = [0.0, 0.0];
        }

        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.theta_delta * factor;
        phi += self.phi_delta * factor;
        const EPS: f32 = 0.000001;
        phi = phi.clamp(EPS, PI - EPS);
        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        camera.target += self.pan_offset * factor;

        let offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.position = camera.target + offset;

        if self.enable_damping {
            self.theta_delta *= 1.0 - self.damping_factor;
            self.phi_delta *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
        self.scale = 1.0;
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: cgmath::Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.build_view_projection_matrix().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of the camera: uniform buffer and its bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device) -> Self {
        use wgpu::util::DeviceExt;

        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, camera: &Camera) {
        self.uniform.update_view_proj(camera);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
