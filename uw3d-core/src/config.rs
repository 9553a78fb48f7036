/// Scene description files
///
/// A scene is a TOML document listing the models to load, the lights and the
/// camera and control settings:
///
/// ```toml
/// [camera]
/// view = "third_person"
///
/// [[lights]]
/// kind = "directional"
/// direction = [0.0, -1.0, -0.3]
///
/// [[models]]
/// path = "submarine.obj"
/// position = [0.0, -4.0, 0.0]
/// tangent_space = true
/// box_offset = 1.2
/// player = true
/// ```
///
/// Relative model paths are resolved against the directory of the file.
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::controls::ControlsConfig;
use crate::light::LightDescriptor;
use crate::mesh::{BuildOptions, DegenerateUvPolicy, VertexLayout};
use crate::projection::{Camera, CameraMode, ProjectionMode};
use crate::transform::Pose;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{count} models are marked as the player, at most one is allowed")]
    MultiplePlayers { count: usize },

    #[error("model {path} has a zero scale component")]
    ZeroScale { path: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub view: CameraMode,
    pub projection: ProjectionMode,
    pub yaw: f32,
    pub pitch: f32,
    pub radius: f32,
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub ortho_extent: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            view: CameraMode::ThirdPerson,
            projection: ProjectionMode::Perspective,
            yaw: crate::projection::DEFAULT_YAW,
            pitch: crate::projection::DEFAULT_PITCH,
            radius: 10.0,
            fov_deg: 45.0,
            near: 0.1,
            far: 100.0,
            ortho_extent: 15.0,
        }
    }
}

impl CameraConfig {
    /// Camera for a viewport of `width` x `height`
    pub fn build(&self, width: u32, height: u32, sensitivity: f32) -> Camera {
        let mut camera = Camera::new(width, height);
        camera.view = self.view;
        camera.mode = self.projection;
        camera.radius = self.radius;
        camera.fov = self.fov_deg.to_radians();
        camera.near = self.near;
        camera.far = self.far;
        camera.ortho_extent = self.ortho_extent;
        camera.sensitivity = sensitivity;
        camera.set_orientation(self.yaw, self.pitch);
        camera
    }
}

fn default_axis() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "default_axis")]
    pub axis: [f32; 3],
    /// Base rotation about `axis`, in degrees
    #[serde(default)]
    pub theta_deg: f32,
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    /// Build the 14-float tangent-space layout instead of the 8-float one
    #[serde(default)]
    pub tangent_space: bool,
    /// Fail loading on zero-area UV triangles instead of zeroing their tangents
    #[serde(default)]
    pub strict_uv: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_offset: Option<f32>,
    #[serde(default)]
    pub player: bool,
}

impl ModelConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            position: [0.0; 3],
            axis: default_axis(),
            theta_deg: 0.0,
            scale: default_scale(),
            tangent_space: false,
            strict_uv: false,
            box_offset: None,
            player: false,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(
            Point3::from(self.position),
            Vector3::from(self.axis),
            self.theta_deg.to_radians(),
            Vector3::from(self.scale),
        )
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            layout: if self.tangent_space {
                VertexLayout::TangentSpace
            } else {
                VertexLayout::Regular
            },
            degenerate_uv: if self.strict_uv {
                DegenerateUvPolicy::Reject
            } else {
                DegenerateUvPolicy::Zero
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub lights: Vec<LightDescriptor>,
    pub models: Vec<ModelConfig>,
    /// Directory relative model paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl SceneConfig {
    /// Load and validate a scene file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let count = self.models.iter().filter(|m| m.player).count();
        if count > 1 {
            return Err(ConfigError::MultiplePlayers { count });
        }
        if let Some(model) = self.models.iter().find(|m| m.scale.contains(&0.0)) {
            return Err(ConfigError::ZeroScale {
                path: model.path.display().to_string(),
            });
        }
        Ok(())
    }

    /// Path of a model asset, resolved against `base_dir`
    pub fn resolve(&self, model: &ModelConfig) -> PathBuf {
        if model.path.is_absolute() {
            model.path.clone()
        } else {
            self.base_dir.join(&model.path)
        }
    }
}
