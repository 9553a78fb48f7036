/// UW3D Core Library - geometry pipeline and scene state
///
/// This library turns OBJ assets into interleaved vertex buffers (optionally
/// with a per-triangle tangent frame for normal mapping), keeps a pose and
/// transformation matrix per model, and drives the per-frame scene update
/// against any [`GraphicsDevice`].

pub mod config;
pub mod controls;
pub mod device;
pub mod geometry;
pub mod light;
pub mod mesh;
pub mod model;
pub mod obj;
pub mod projection;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use config::{ConfigError, SceneConfig};
pub use controls::{Command, ControlsConfig, FrameInput};
pub use device::{BufferHandle, FrameUniforms, GraphicsDevice};
pub use geometry::{Face, IndexTriple, Shape, VertexPool};
pub use light::{LightDescriptor, LightParams};
pub use mesh::{MeshBuffers, MeshError, VertexLayout};
pub use model::{Model, ModelError};
pub use projection::{Camera, CameraMode, ProjectionMode};
pub use scene::{SceneError, SceneState};
pub use transform::{Pose, Transform};
