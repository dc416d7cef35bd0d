//! The wgpu device, surface and GPU caches behind [`Renderer`].

use std::{collections::HashMap, iter, sync::Arc};

use anyhow::Context as _;
use cgmath::InnerSpace;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources},
    data_structures::{
        instance::InstanceRaw,
        model::{ImageId, Material, MaterialId, Mesh, MeshId},
        scene_graph::Scene,
        texture::Texture,
    },
    pipelines::{
        basic::{self, MaterialUniform},
        light::LightResources,
        transparent,
    },
    render::{DrawItem, Renderer, collect_draws},
    viewport::{Sizes, SurfaceSize, WindowMetrics},
};

#[derive(Debug)]
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
}

#[derive(Debug)]
struct Pipelines {
    basic: wgpu::RenderPipeline,
    double_sided: wgpu::RenderPipeline,
    transparent: wgpu::RenderPipeline,
}

/// Owns everything GPU related. Meshes, materials and textures are uploaded
/// the first time they are drawn and cached by their id from then on.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    depth_texture: Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub clear_colour: wgpu::Color,
    camera: CameraResources,
    light: LightResources,
    pipelines: Pipelines,
    material_layout: wgpu::BindGroupLayout,
    white: Texture,
    sampler: wgpu::Sampler,
    meshes: HashMap<MeshId, GpuMesh>,
    materials: HashMap<MaterialId, wgpu::BindGroup>,
    textures: HashMap<ImageId, Texture>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    surface_size: SurfaceSize,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>, clear_colour: wgpu::Color) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let logical = window.logical_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::default();

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter can draw to this surface")?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                ..Default::default()
            })
            .await
            .context("could not open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colour and relies on an sRGB surface for the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no texture format")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = CameraResources::new(&device);
        let light = LightResources::new(&device);
        let material_layout = basic::material_layout(&device);
        let layout = basic::mk_pipeline_layout(
            &device,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );
        let pipelines = Pipelines {
            basic: basic::mk_basic_pipeline(&device, config.format, &layout, false),
            double_sided: basic::mk_basic_pipeline(&device, config.format, &layout, true),
            transparent: transparent::mk_transparent_pipeline(&device, config.format, &layout),
        };

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let white = Texture::create_white(&device, &queue);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("default sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let instance_capacity = 64;
        let instance_buffer = mk_instance_buffer(&device, instance_capacity);

        let mut ctx = Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            clear_colour,
            camera,
            light,
            pipelines,
            material_layout,
            white,
            sampler,
            meshes: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            instance_buffer,
            instance_capacity,
            surface_size: SurfaceSize::new(logical, 1.0),
            is_surface_configured: false,
        };
        ctx.configure_surface(ctx.surface_size.physical_size());
        Ok(ctx)
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Physical size of the surface: logical size times the pixel ratio.
    pub fn physical_size(&self) -> [u32; 2] {
        self.surface_size.physical_size()
    }

    fn configure_surface(&mut self, [width, height]: [u32; 2]) {
        if width == 0 || height == 0 {
            self.is_surface_configured = false;
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.is_surface_configured = true;
    }

    fn prepare_mesh(&mut self, mesh: &Mesh) {
        if self.meshes.contains_key(&mesh.id) {
            return;
        }
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
                contents: bytemuck::cast_slice(&mesh.vertices),
                // skinned meshes are re-posed every frame
                usage: if mesh.is_skinned() {
                    wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST
                } else {
                    wgpu::BufferUsages::VERTEX
                },
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", mesh.name)),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.meshes.insert(
            mesh.id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                num_elements: mesh.indices.len() as u32,
            },
        );
    }

    fn prepare_material(&mut self, material: &Material) {
        if self.materials.contains_key(&material.id) {
            return;
        }
        if let Some(image) = &material.base_color_texture {
            if !self.textures.contains_key(&image.id) {
                let texture = Texture::from_rgba(
                    &self.device,
                    &self.queue,
                    &image.image,
                    Some(&material.name),
                );
                self.textures.insert(image.id, texture);
            }
        }
        let texture = material
            .base_color_texture
            .as_ref()
            .and_then(|image| self.textures.get(&image.id))
            .unwrap_or(&self.white);
        let sampler = texture.sampler.as_ref().unwrap_or(&self.sampler);
        let params = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Buffer"),
                contents: bytemuck::cast_slice(&[MaterialUniform::from(material)]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
            label: Some(&material.name),
        });
        self.materials.insert(material.id, bind_group);
    }

    fn write_instances(&mut self, raws: &[InstanceRaw]) {
        if raws.len() > self.instance_capacity {
            self.instance_capacity = raws.len().next_power_of_two();
            self.instance_buffer = mk_instance_buffer(&self.device, self.instance_capacity);
        }
        self.queue
            .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(raws));
    }
}

fn mk_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl Renderer for Context {
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        if let Some(size) = self.surface_size.take_reconfigure() {
            self.configure_surface(size);
        }
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return;
        }

        let mut opaque: Vec<DrawItem> = Vec::new();
        let mut double_sided: Vec<DrawItem> = Vec::new();
        let mut blended: Vec<DrawItem> = Vec::new();
        for draw in collect_draws(scene) {
            self.prepare_mesh(draw.mesh);
            self.prepare_material(draw.material);
            if let (Some(vertices), Some(gpu)) = (&draw.skinned, self.meshes.get(&draw.mesh.id)) {
                self.queue
                    .write_buffer(&gpu.vertex_buffer, 0, bytemuck::cast_slice(vertices));
            }
            if draw.material.base_color[3] < 1.0 {
                blended.push(draw);
            } else if draw.material.double_sided {
                double_sided.push(draw);
            } else {
                opaque.push(draw);
            }
        }
        // back to front
        let eye = cgmath::Vector3::new(camera.position.x, camera.position.y, camera.position.z);
        blended.sort_by(|a, b| {
            let da = (a.transform.position - eye).magnitude2();
            let db = (b.transform.position - eye).magnitude2();
            db.total_cmp(&da)
        });

        let raws: Vec<InstanceRaw> = opaque
            .iter()
            .chain(&double_sided)
            .chain(&blended)
            .map(|draw| draw.transform.to_raw(draw.material.base_color))
            .collect();
        if !raws.is_empty() {
            self.write_instances(&raws);
        }
        self.camera.update(&self.queue, camera);
        self.light.update(&self.queue, scene);

        let (output, suboptimal) = match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output) => (output, false),
            wgpu::CurrentSurfaceTexture::Suboptimal(output) => (output, true),
            // Reconfigure the surface if it's lost or outdated
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                self.configure_surface(self.surface_size.physical_size());
                return;
            }
            _ => {
                log::error!("Unable to render, no surface texture available");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            if !raws.is_empty() {
                render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                render_pass.set_bind_group(1, &self.camera.bind_group, &[]);
                render_pass.set_bind_group(2, &self.light.bind_group, &[]);

                let batches = [
                    (&self.pipelines.basic, &opaque),
                    (&self.pipelines.double_sided, &double_sided),
                    (&self.pipelines.transparent, &blended),
                ];
                let mut instance = 0u32;
                for (pipeline, draws) in batches {
                    if draws.is_empty() {
                        continue;
                    }
                    render_pass.set_pipeline(pipeline);
                    for draw in draws {
                        let (Some(mesh), Some(material)) = (
                            self.meshes.get(&draw.mesh.id),
                            self.materials.get(&draw.material.id),
                        ) else {
                            instance += 1;
                            continue;
                        };
                        render_pass.set_bind_group(0, material, &[]);
                        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        render_pass
                            .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..mesh.num_elements, 0, instance..instance + 1);
                        instance += 1;
                    }
                }
            }
        }
        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        if suboptimal {
            self.configure_surface(self.surface_size.physical_size());
        }
    }

    // Both only record the change; the surface is configured once at the next render.
    fn set_size(&mut self, width: u32, height: u32) {
        self.surface_size.set_logical(Sizes::new(width, height));
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.surface_size.set_pixel_ratio(ratio);
    }
}
