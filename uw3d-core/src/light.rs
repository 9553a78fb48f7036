/// Light descriptors handed to the shading stage
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Shared colour and falloff parameters of every light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightParams {
    pub color: Vector3<f32>,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub ambient_strength: f32,
    pub ambient_color: Vector3<f32>,
    pub specular_strength: f32,
    pub specular_phong: f32,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            color: Vector3::new(1.0, 1.0, 1.0),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
            ambient_strength: 0.1,
            ambient_color: Vector3::new(1.0, 1.0, 1.0),
            specular_strength: 0.5,
            specular_phong: 16.0,
        }
    }
}

/// A light as it appears in scene files and frame uniforms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LightDescriptor {
    Directional {
        direction: Vector3<f32>,
        #[serde(flatten)]
        params: LightParams,
    },
    Point {
        position: Point3<f32>,
        #[serde(flatten)]
        params: LightParams,
    },
}

impl LightDescriptor {
    pub fn directional(direction: Vector3<f32>) -> Self {
        LightDescriptor::Directional {
            direction,
            params: LightParams::default(),
        }
    }

    pub fn point(position: Point3<f32>) -> Self {
        LightDescriptor::Point {
            position,
            params: LightParams::default(),
        }
    }

    pub fn params(&self) -> &LightParams {
        match self {
            LightDescriptor::Directional { params, .. } | LightDescriptor::Point { params, .. } => {
                params
            }
        }
    }

    pub fn params_mut(&mut self) -> &mut LightParams {
        match self {
            LightDescriptor::Directional { params, .. } | LightDescriptor::Point { params, .. } => {
                params
            }
        }
    }

    /// Unit vector from `surface` towards the light
    pub fn direction_to_light(&self, surface: &Point3<f32>) -> Vector3<f32> {
        let towards = match self {
            LightDescriptor::Directional { direction, .. } => -direction,
            LightDescriptor::Point { position, .. } => position - surface,
        };
        towards.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
    }

    /// `1 / (constant + linear * d + quadratic * d^2)` for point lights, 1 otherwise
    pub fn attenuation(&self, surface: &Point3<f32>) -> f32 {
        match self {
            LightDescriptor::Directional { .. } => 1.0,
            LightDescriptor::Point { position, params } => {
                let d = (position - surface).norm();
                let denominator = params.constant + params.linear * d + params.quadratic * d * d;
                if denominator > f32::EPSILON {
                    1.0 / denominator
                } else {
                    1.0
                }
            }
        }
    }
}
