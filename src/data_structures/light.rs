//! Light sources that can be placed in the scene graph.

use crate::data_structures::model::srgb_hex_to_linear;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowConfig {
    pub map_size: [u32; 2],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    /// Sky/ground gradient lighting, blended by the surface normal's up component.
    Hemisphere {
        sky_color: [f32; 3],
        ground_color: [f32; 3],
        intensity: f32,
    },
    /// Parallel light shining from the node's position towards the origin.
    Directional {
        color: [f32; 3],
        intensity: f32,
        shadow: Option<ShadowConfig>,
    },
}

impl Light {
    pub fn hemisphere(sky: u32, ground: u32, intensity: f32) -> Self {
        Light::Hemisphere {
            sky_color: srgb_hex_to_linear(sky),
            ground_color: srgb_hex_to_linear(ground),
            intensity,
        }
    }

    pub fn directional(color: u32, intensity: f32) -> Self {
        Light::Directional {
            color: srgb_hex_to_linear(color),
            intensity,
            shadow: None,
        }
    }

    pub fn with_shadow(self, map_size: [u32; 2]) -> Self {
        match self {
            Light::Directional {
                color, intensity, ..
            } => Light::Directional {
                color,
                intensity,
                shadow: Some(ShadowConfig { map_size }),
            },
            other => {
                log::warn!("only directional lights cast shadows, ignoring shadow config");
                other
            }
        }
    }

    pub fn casts_shadow(&self) -> bool {
        matches!(self, Light::Directional { shadow: Some(_), .. })
    }
}
