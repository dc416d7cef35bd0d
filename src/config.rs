//! Runtime configuration of the stage.

use instant::Duration;

use crate::resources::AssetRoot;

/// Environment variable overriding the asset root on native targets.
pub const ASSETS_ENV: &str = "GLTF_STAGE_ASSETS";

#[derive(Clone, Debug)]
pub struct StageConfig {
    pub asset_root: AssetRoot,
    /// Id of the `<canvas>` element the stage renders into on the web.
    pub canvas_id: String,
    pub clear_colour: wgpu::Color,
    /// Factor applied to the frame delta before it reaches the animation mixer.
    pub animation_speed: f32,
    pub max_pixel_ratio: f64,
    pub double_click_interval: Duration,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            asset_root: AssetRoot::platform_default(),
            canvas_id: "canvas".to_string(),
            clear_colour: wgpu::Color::BLACK,
            animation_speed: 0.5,
            max_pixel_ratio: 2.0,
            double_click_interval: Duration::from_millis(300),
        }
    }
}

impl StageConfig {
    /// The defaults with [`ASSETS_ENV`] applied when it is set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        #[cfg(not(target_arch = "wasm32"))]
        if let Ok(root) = std::env::var(ASSETS_ENV) {
            log::info!("loading assets from {}", root);
            config.asset_root = AssetRoot::new(root);
        }
        config
    }
}
