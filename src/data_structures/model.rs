//! CPU-side geometry and material data.
//!
//! Meshes and materials live on the CPU until the renderer first draws them.
//! Each carries a process-unique id that the renderer uses to key its GPU
//! caches, so the scene itself stays free of device handles.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(u64);

/// Decoded RGBA8 image shared between materials.
#[derive(Clone, Debug)]
pub struct ImageData {
    pub id: ImageId,
    pub image: Arc<image::RgbaImage>,
}

impl ImageData {
    pub fn new(image: image::RgbaImage) -> Self {
        Self {
            id: ImageId(next_id()),
            image: Arc::new(image),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub id: MeshId,
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    /// Index into the owning [`Model::materials`].
    pub material: usize,
    /// Per-vertex joint indices into the node's skin. Empty for rigid meshes.
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

impl Mesh {
    pub fn new(name: &str, vertices: Vec<ModelVertex>, indices: Vec<u32>, material: usize) -> Self {
        Self {
            id: MeshId(next_id()),
            name: name.to_string(),
            vertices,
            indices,
            material,
            joints: Vec::new(),
            weights: Vec::new(),
        }
    }

    pub fn is_skinned(&self) -> bool {
        !self.joints.is_empty()
    }

    /// A `width` x `height` plane in the XY plane facing +Z, centred on the origin.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        let normal = [0.0, 0.0, 1.0];
        let vertices = vec![
            ModelVertex { position: [-hw, hh, 0.0], tex_coords: [0.0, 0.0], normal },
            ModelVertex { position: [hw, hh, 0.0], tex_coords: [1.0, 0.0], normal },
            ModelVertex { position: [-hw, -hh, 0.0], tex_coords: [0.0, 1.0], normal },
            ModelVertex { position: [hw, -hh, 0.0], tex_coords: [1.0, 1.0], normal },
        ];
        Self::new("plane", vertices, vec![0, 2, 1, 2, 3, 1], 0)
    }

    /// An axis aligned cube with edge length `size`, centred on the origin.
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        // (normal, u axis, v axis) per face
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (n, u, v) in faces {
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, 1.0), (1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)] {
                let position = [
                    (n[0] + su * u[0] + sv * v[0]) * h,
                    (n[1] + su * u[1] + sv * v[1]) * h,
                    (n[2] + su * u[2] + sv * v[2]) * h,
                ];
                vertices.push(ModelVertex {
                    position,
                    tex_coords: [(su + 1.0) / 2.0, (1.0 - sv) / 2.0],
                    normal: n,
                });
            }
            indices.extend_from_slice(&[base, base + 2, base + 1, base + 2, base + 3, base + 1]);
        }
        Self::new("cube", vertices, indices, 0)
    }
}

#[derive(Clone, Debug)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    /// Linear RGBA.
    pub base_color: [f32; 4],
    pub base_color_texture: Option<ImageData>,
    pub metalness: f32,
    pub roughness: f32,
    /// Volume thickness for transmissive materials.
    pub thickness: f32,
    pub double_sided: bool,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            id: MaterialId(next_id()),
            name: name.to_string(),
            base_color: [1.0; 4],
            base_color_texture: None,
            metalness: 1.0,
            roughness: 1.0,
            thickness: 0.0,
            double_sided: false,
        }
    }

    /// A standard material from an sRGB `0xRRGGBB` colour.
    pub fn standard(name: &str, hex: u32, metalness: f32, roughness: f32) -> Self {
        let [r, g, b] = srgb_hex_to_linear(hex);
        Self {
            base_color: [r, g, b, 1.0],
            metalness,
            roughness,
            ..Self::new(name)
        }
    }
}

pub fn srgb_hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

#[derive(Clone, Debug, Default)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    pub fn material_of(&self, mesh: &Mesh) -> Option<&Material> {
        self.materials.get(mesh.material)
    }
}
