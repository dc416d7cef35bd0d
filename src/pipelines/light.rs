use wgpu::util::DeviceExt;

use cgmath::InnerSpace;

use crate::data_structures::{light::Light, scene_graph::Scene};

/// GPU handles of the scene lighting.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = LightUniform::default();
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, scene: &Scene) {
        self.uniform = LightUniform::from_scene(scene);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// One hemisphere and one directional light.
///
/// Directions point from the surface towards the light. Colours are linear
/// and already multiplied by the light's intensity.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub sky_color: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    pub ground_color: [f32; 3],
    _padding2: u32,
    pub hemisphere_direction: [f32; 3],
    _padding3: u32,
    pub directional_color: [f32; 3],
    _padding4: u32,
    pub directional_direction: [f32; 3],
    _padding5: u32,
}

impl Default for LightUniform {
    fn default() -> Self {
        Self {
            sky_color: [0.0; 3],
            _padding: 0,
            ground_color: [0.0; 3],
            _padding2: 0,
            hemisphere_direction: [0.0, 1.0, 0.0],
            _padding3: 0,
            directional_color: [0.0; 3],
            _padding4: 0,
            directional_direction: [0.0, 1.0, 0.0],
            _padding5: 0,
        }
    }
}

impl LightUniform {
    /// Pack the first light of each kind found in `scene`.
    ///
    /// Both kinds take their direction from the node's world position, as seen from the origin.
    pub fn from_scene(scene: &Scene) -> Self {
        let mut uniform = Self::default();
        let (mut hemisphere, mut directional) = (false, false);
        for (light, transform) in scene.lights() {
            let direction = {
                let p = transform.position;
                if p.magnitude2() > 0.0 {
                    p.normalize().into()
                } else {
                    [0.0, 1.0, 0.0]
                }
            };
            match *light {
                Light::Hemisphere {
                    sky_color,
                    ground_color,
                    intensity,
                } if !hemisphere => {
                    hemisphere = true;
                    uniform.sky_color = sky_color.map(|c| c * intensity);
                    uniform.ground_color = ground_color.map(|c| c * intensity);
                    uniform.hemisphere_direction = direction;
                }
                Light::Directional {
                    color, intensity, ..
                } if !directional => {
                    directional = true;
                    uniform.directional_color = color.map(|c| c * intensity);
                    uniform.directional_direction = direction;
                }
                _ => log::debug!("only one light of each kind is supported, ignoring {:?}", light),
            }
        }
        uniform
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}
