/// Scene state owned by the render loop
use log::{debug, info};
use nalgebra::{Point3, Vector3};
use std::path::Path;
use thiserror::Error;

use crate::config::{ConfigError, SceneConfig};
use crate::controls::{Command, ControlsConfig, FrameInput};
use crate::device::{FrameUniforms, GraphicsDevice};
use crate::light::LightDescriptor;
use crate::model::{Model, ModelError};
use crate::projection::Camera;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("scene configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Every model, light and the camera of a running scene.
///
/// At most one model is the player; input moves it and the camera follows it.
#[derive(Debug, Clone)]
pub struct SceneState {
    pub models: Vec<Model>,
    pub camera: Camera,
    pub lights: Vec<LightDescriptor>,
    pub controls: ControlsConfig,
    player: Option<usize>,
}

impl SceneState {
    pub fn new(camera: Camera, lights: Vec<LightDescriptor>, controls: ControlsConfig) -> Self {
        Self {
            models: Vec::new(),
            camera,
            lights,
            controls,
            player: None,
        }
    }

    /// Read a scene file and load every model it lists
    pub fn load(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Self, SceneError> {
        let config = SceneConfig::from_file(path)?;
        Self::from_config(&config, width, height)
    }

    pub fn from_config(config: &SceneConfig, width: u32, height: u32) -> Result<Self, SceneError> {
        config.validate()?;
        let camera = config
            .camera
            .build(width, height, config.controls.look_sensitivity);
        let mut scene = Self::new(camera, config.lights.clone(), config.controls);

        for entry in &config.models {
            let mut model =
                Model::load(config.resolve(entry), entry.pose(), entry.build_options())?;
            if let Some(box_offset) = entry.box_offset {
                model = model.with_box_offset(box_offset);
            }
            let index = scene.add_model(model);
            if entry.player {
                scene.set_player(index);
            }
        }

        info!(
            "scene loaded: {} models, {} lights",
            scene.models.len(),
            scene.lights.len()
        );
        Ok(scene)
    }

    pub fn add_model(&mut self, model: Model) -> usize {
        self.models.push(model);
        self.models.len() - 1
    }

    /// Mark `index` as the piloted model; out-of-range indices clear the player
    pub fn set_player(&mut self, index: usize) {
        self.player = (index < self.models.len()).then_some(index);
    }

    pub fn player(&self) -> Option<&Model> {
        self.player.and_then(|index| self.models.get(index))
    }

    /// Point the camera follows: the player, or the origin without one
    pub fn focus(&self) -> Point3<f32> {
        self.player()
            .map(Model::position)
            .unwrap_or_else(Point3::origin)
    }

    pub fn upload_all<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        let pending = self.models.iter().filter(|m| !m.is_uploaded()).count();
        for model in &mut self.models {
            model.upload(device);
        }
        debug!("uploaded {pending} of {} models", self.models.len());
    }

    /// Apply one frame of input to the player and camera
    pub fn apply_input(&mut self, input: &FrameInput, dt: f32) {
        for command in &input.commands {
            match command {
                Command::ToggleView => self.camera.toggle_view(),
                Command::ToggleProjection => self.camera.toggle_projection(),
                command if command.is_movement() => self.steer(*command, dt),
                _ => {}
            }
        }

        let delta = input.mouse_delta;
        if delta.x != 0.0 || delta.y != 0.0 {
            self.camera.process_mouse_movement(delta.x, delta.y, true);
        }
    }

    fn steer(&mut self, command: Command, dt: f32) {
        let Some(index) = self.player else {
            return;
        };
        let controls = self.controls;
        let (before, rest) = self.models.split_at_mut(index);
        let Some((player, after)) = rest.split_first_mut() else {
            return;
        };
        let others = || before.iter().chain(after.iter());

        let turn = controls.turn_rate.to_radians() * dt;
        let climb = Vector3::new(0.0, controls.climb_speed * dt, 0.0);
        let delta = match command {
            Command::Forward => player.heading() * controls.speed * dt,
            Command::Back => -player.heading() * controls.speed * dt,
            Command::Ascend => climb,
            Command::Descend => -climb,
            Command::TurnLeft => {
                player.rotate_on_axis(turn, Vector3::y());
                return;
            }
            Command::TurnRight => {
                player.rotate_on_axis(-turn, Vector3::y());
                return;
            }
            _ => return,
        };
        let delta = clamp_to_seabed(player.position().y, delta, controls.seabed);
        let moved = player.move_checked(delta, others());

        if moved {
            debug!("player depth {:.2}", player.depth());
        } else {
            debug!("player blocked at {:?}", player.position());
        }
    }

    /// View, projection, eye and lights for the current camera
    pub fn uniforms(&self) -> FrameUniforms {
        let focus = self.focus();
        FrameUniforms {
            view: self.camera.view_matrix(&focus),
            projection: self.camera.projection_matrix(),
            camera_position: self.camera.eye(&focus),
            lights: self.lights.clone(),
        }
    }

    pub fn draw<D: GraphicsDevice + ?Sized>(&self, device: &mut D) {
        for model in &self.models {
            model.draw(device);
        }
    }

    /// One frame after input has been polled: move the player, recompute the
    /// view, push uniforms, then issue every draw call. Presenting and event
    /// polling are left to the caller.
    pub fn frame<D: GraphicsDevice + ?Sized>(
        &mut self,
        input: &FrameInput,
        device: &mut D,
        dt: f32,
    ) {
        self.apply_input(input, dt);
        let uniforms = self.uniforms();
        device.set_uniforms(&uniforms);
        self.draw(device);
    }
}

/// Shorten a downward move so it stops at `seabed`; a model already below
/// it may still rise
fn clamp_to_seabed(height: f32, mut delta: Vector3<f32>, seabed: Option<f32>) -> Vector3<f32> {
    if let Some(seabed) = seabed {
        if delta.y < 0.0 {
            delta.y = delta.y.max((seabed - height).min(0.0));
        }
    }
    delta
}
