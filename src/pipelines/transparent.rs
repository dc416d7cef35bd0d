use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    pipelines::basic::{PipelineOptions, mk_render_pipeline, shader},
};

/**
 * Pipeline for materials whose base colour alpha is below `1.0`.
 *
 * Shares the basic shader. Blended surfaces are drawn after all opaque ones,
 * test against depth but do not write it and are never culled.
 */
pub fn mk_transparent_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layout: &wgpu::PipelineLayout,
) -> wgpu::RenderPipeline {
    mk_render_pipeline(
        device,
        layout,
        color_format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        PipelineOptions {
            label: "Transparent Pipeline",
            cull_mode: None,
            depth_write_enabled: false,
        },
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader(),
    )
}
