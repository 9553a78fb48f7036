/// Navigation commands for the piloted model
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// One discrete input held or pressed during a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Forward,
    Back,
    TurnLeft,
    TurnRight,
    Ascend,
    Descend,
    ToggleView,
    ToggleProjection,
    Quit,
}

impl Command {
    /// Whether the command changes the piloted model's pose
    pub fn is_movement(self) -> bool {
        matches!(
            self,
            Command::Forward
                | Command::Back
                | Command::TurnLeft
                | Command::TurnRight
                | Command::Ascend
                | Command::Descend
        )
    }
}

/// Everything polled from the input devices for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    pub commands: Vec<Command>,
    /// Pointer movement since the previous frame, in pixels (y up)
    pub mouse_delta: Vector2<f32>,
}

impl FrameInput {
    pub fn with(commands: &[Command]) -> Self {
        Self {
            commands: commands.to_vec(),
            ..Self::default()
        }
    }

    pub fn contains(&self, command: Command) -> bool {
        self.commands.contains(&command)
    }

    pub fn quit_requested(&self) -> bool {
        self.contains(Command::Quit)
    }
}

/// Movement tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Units per second along the heading
    pub speed: f32,
    /// Units per second along world Y
    pub climb_speed: f32,
    /// Degrees per second
    pub turn_rate: f32,
    /// Degrees of yaw/pitch per pixel of mouse movement
    pub look_sensitivity: f32,
    /// Lowest height the player may reach, usually just above the seafloor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seabed: Option<f32>,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            speed: 4.0,
            climb_speed: 2.0,
            turn_rate: 90.0,
            look_sensitivity: 0.1,
            seabed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_commands() {
        assert!(Command::Forward.is_movement());
        assert!(Command::Descend.is_movement());
        assert!(!Command::ToggleView.is_movement());
        assert!(!Command::Quit.is_movement());
    }

    #[test]
    fn test_quit_detection() {
        assert!(FrameInput::with(&[Command::Forward, Command::Quit]).quit_requested());
        assert!(!FrameInput::default().quit_requested());
    }
}
