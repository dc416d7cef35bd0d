//! Node transformation data.
//!
//! A transform is stored as position, rotation (quaternion) and scale and is
//! packed into a GPU-friendly matrix form when a node is drawn.

use std::ops::Mul;

use cgmath::{InnerSpace, Matrix, One, Rad, Rotation3, SquareMatrix};

use crate::data_structures::model;

/// Per-node transformation: position, rotation (as quaternion), and scale.
///
/// Composition follows the usual scene graph rule: `parent * child` yields the
/// child's transform expressed in the parent's space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Euler angles of the rotation in `XYZ` order, in radians.
    pub fn euler(&self) -> [f32; 3] {
        euler_xyz_from_quaternion(self.rotation)
    }

    /// Replace the rotation with the given `XYZ` order euler angles (radians).
    pub fn set_euler(&mut self, angles: [f32; 3]) {
        self.rotation = quaternion_from_euler_xyz(angles);
    }

    pub fn to_raw(&self, color: [f32; 4]) -> InstanceRaw {
        let world_matrix = self.to_matrix();
        let det = world_matrix.determinant();
        let handedness = det.signum();
        // Non-uniform scales need the inverse transpose to keep normals perpendicular.
        let normal = cgmath::Matrix3::from_cols(
            world_matrix.x.truncate(),
            world_matrix.y.truncate(),
            world_matrix.z.truncate(),
        )
        .invert()
        .map(|m| m.transpose())
        .unwrap_or_else(|| cgmath::Matrix3::from(self.rotation));
        InstanceRaw {
            model: world_matrix.into(),
            normal: normal.into(),
            handedness,
            color,
        }
    }
}

/// Rotation matrix for `XYZ` order euler angles is `Rx * Ry * Rz`.
pub fn quaternion_from_euler_xyz([x, y, z]: [f32; 3]) -> cgmath::Quaternion<f32> {
    cgmath::Quaternion::from_angle_x(Rad(x))
        * cgmath::Quaternion::from_angle_y(Rad(y))
        * cgmath::Quaternion::from_angle_z(Rad(z))
}

pub fn euler_xyz_from_quaternion(q: cgmath::Quaternion<f32>) -> [f32; 3] {
    let m = cgmath::Matrix3::from(q.normalize());
    // cgmath matrices are column major: m.c.r
    let (m11, m12, m13) = (m.x.x, m.y.x, m.z.x);
    let (m22, m23) = (m.y.y, m.z.y);
    let (m32, m33) = (m.y.z, m.z.z);
    let y = m13.clamp(-1.0, 1.0).asin();
    if m13.abs() < 0.999_999_9 {
        [(-m23).atan2(m33), y, (-m12).atan2(m11)]
    } else {
        // gimbal lock, fold everything into x
        [m32.atan2(m22), y, 0.0]
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    handedness: f32,
    color: [f32; 4],
}

/**
 * As we store vertex data directly in the GPU memory we need to tell what the bytes refer to:
 *
 * offset: zero as we want to use the full space.
 * stride: length of an instance
 *
 * Stride layout here: world matrix (four 4d vectors), normal matrix (three 3d vectors),
 * handedness and the material base colour.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // We need to switch from using a step mode of Vertex to Instance
            // This means that our shaders will only change to use the next
            // instance when the shader starts processing a new instance
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // A mat4 takes up 4 vertex slots as it is technically 4 vec4s.
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 26]>() as wgpu::BufferAddress,
                    shader_location: 13,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}
