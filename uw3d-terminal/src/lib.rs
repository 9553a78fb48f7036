/// Terminal front-end: drives a scene and rasterizes it as ASCII
use crossterm::{
    cursor,
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use log::{debug, info};
use nalgebra::Vector2;
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use uw3d_core::{CameraMode, Command, FrameInput, Model, ProjectionMode, SceneState};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Approximate pixel size of one terminal cell
const CELL_WIDTH_PX: f32 = 8.0;
const CELL_HEIGHT_PX: f32 = 16.0;

const CONTROLS_HELP: &str = "WASD=Move Q/E=Up/Down Arrows/Drag=Look Tab=View P=Proj Esc=Quit";

/// Mouse movement an arrow key stands in for, in pixels
const ARROW_LOOK_PX: f32 = 40.0;

/// Key binding for navigation and view commands
pub fn command_for(key: &KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Esc => Some(Command::Quit),
        KeyCode::Tab => Some(Command::ToggleView),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'w' => Some(Command::Forward),
            's' => Some(Command::Back),
            'a' => Some(Command::TurnLeft),
            'd' => Some(Command::TurnRight),
            'q' => Some(Command::Ascend),
            'e' => Some(Command::Descend),
            'p' => Some(Command::ToggleProjection),
            _ => None,
        },
        _ => None,
    }
}

/// Accumulates terminal events into one frame of input
#[derive(Debug, Default)]
pub struct InputCollector {
    input: FrameInput,
    last_mouse: Option<(u16, u16)>,
}

impl InputCollector {
    pub fn handle(&mut self, event: &Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let look = match key.code {
            KeyCode::Left => Vector2::new(-ARROW_LOOK_PX, 0.0),
            KeyCode::Right => Vector2::new(ARROW_LOOK_PX, 0.0),
            KeyCode::Up => Vector2::new(0.0, ARROW_LOOK_PX),
            KeyCode::Down => Vector2::new(0.0, -ARROW_LOOK_PX),
            _ => {
                if let Some(command) = command_for(key) {
                    self.input.commands.push(command);
                }
                return;
            }
        };
        self.input.mouse_delta += look;
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent) {
        match mouse.kind {
            MouseEventKind::Drag(_) => {
                if let Some((column, row)) = self.last_mouse {
                    let dx = (mouse.column as f32 - column as f32) * CELL_WIDTH_PX;
                    // Rows grow downwards
                    let dy = (row as f32 - mouse.row as f32) * CELL_HEIGHT_PX;
                    self.input.mouse_delta += Vector2::new(dx, dy);
                }
                self.last_mouse = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Down(_) => self.last_mouse = Some((mouse.column, mouse.row)),
            MouseEventKind::Up(_) => self.last_mouse = None,
            _ => {}
        }
    }

    /// Input gathered since the last call
    pub fn take(&mut self) -> FrameInput {
        std::mem::take(&mut self.input)
    }
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    scene: SceneState,
    renderer: AsciiRenderer,
    input: InputCollector,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(mut scene: SceneState) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let mut renderer = AsciiRenderer::new(width as usize, height as usize);
        scene.upload_all(&mut renderer);
        set_cell_viewport(&mut scene, width, height);

        Ok(Self {
            scene,
            renderer,
            input: InputCollector::default(),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            event::EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            event::DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target
        let mut previous = Instant::now();

        while self.running {
            let frame_start = Instant::now();
            let dt = (frame_start - previous).as_secs_f32();
            previous = frame_start;

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }
            let input = self.input.take();
            if input.quit_requested() {
                info!("quit requested");
                self.running = false;
                break;
            }

            // Update and render
            self.renderer.clear();
            self.scene.frame(&input, &mut self.renderer, dt);
            self.present()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        if let Event::Resize(width, height) = event {
            let current = (self.renderer.width(), self.renderer.height());
            if current == (width as usize, height as usize) {
                return;
            }
            debug!("terminal resized to {width}x{height}");
            self.renderer.resize(width as usize, height as usize);
            set_cell_viewport(&mut self.scene, width, height);
            return;
        }
        self.input.handle(&event);
    }

    fn present(&mut self) -> io::Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        let depth = self
            .scene
            .player()
            .map(Model::depth)
            .map_or_else(|| "-".to_string(), |d| format!("{d:.1}"));
        let view = match self.scene.camera.view {
            CameraMode::FirstPerson => "1st",
            CameraMode::ThirdPerson => "3rd",
        };
        let projection = match self.scene.camera.mode {
            ProjectionMode::Perspective => "persp",
            ProjectionMode::Orthographic => "ortho",
        };
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "UW3D | FPS: {:.1} | Depth: {} | {} {} | {}",
                self.fps, depth, view, projection, CONTROLS_HELP
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// Terminal cells are about twice as tall as wide
fn set_cell_viewport(scene: &mut SceneState, width: u16, height: u16) {
    scene
        .camera
        .set_viewport(width as u32, (height as u32).saturating_mul(2));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crossterm::event::{KeyEventState, MouseButton};

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_key_bindings() {
        let bound = |c| command_for(&KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        assert_eq!(bound('w'), Some(Command::Forward));
        assert_eq!(bound('S'), Some(Command::Back));
        assert_eq!(bound('a'), Some(Command::TurnLeft));
        assert_eq!(bound('d'), Some(Command::TurnRight));
        assert_eq!(bound('q'), Some(Command::Ascend));
        assert_eq!(bound('e'), Some(Command::Descend));
        assert_eq!(bound('p'), Some(Command::ToggleProjection));
        assert_eq!(bound('x'), None);
        assert_eq!(
            command_for(&KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)),
            Some(Command::ToggleView)
        );
        assert_eq!(
            command_for(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            Some(Command::Quit)
        );
        assert_eq!(
            command_for(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
    }

    #[test]
    fn test_release_is_ignored() {
        let release = KeyEvent {
            code: KeyCode::Char('w'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(command_for(&release), None);
    }

    #[test]
    fn test_collector_gathers_a_frame() {
        let mut collector = InputCollector::default();
        collector.handle(&key(KeyCode::Char('w')));
        collector.handle(&key(KeyCode::Char('w')));
        collector.handle(&key(KeyCode::Tab));
        collector.handle(&key(KeyCode::Right));

        let input = collector.take();
        assert_eq!(
            input.commands,
            vec![Command::Forward, Command::Forward, Command::ToggleView]
        );
        assert_relative_eq!(input.mouse_delta, Vector2::new(ARROW_LOOK_PX, 0.0));

        // Taking resets the frame
        assert_eq!(collector.take(), FrameInput::default());
    }

    #[test]
    fn test_drag_becomes_mouse_delta() {
        let mut collector = InputCollector::default();
        collector.handle(&mouse(MouseEventKind::Down(MouseButton::Left), 10, 10));
        collector.handle(&mouse(MouseEventKind::Drag(MouseButton::Left), 12, 9));
        let input = collector.take();
        assert_relative_eq!(
            input.mouse_delta,
            Vector2::new(2.0 * CELL_WIDTH_PX, CELL_HEIGHT_PX)
        );

        // Releasing forgets the anchor, so the next drag starts fresh
        collector.handle(&mouse(MouseEventKind::Up(MouseButton::Left), 12, 9));
        collector.handle(&mouse(MouseEventKind::Drag(MouseButton::Left), 20, 20));
        assert_eq!(collector.take().mouse_delta, Vector2::zeros());
    }

    #[test]
    fn test_cell_viewport_aspect() {
        let mut scene = SceneState::new(
            uw3d_core::Camera::default(),
            Vec::new(),
            Default::default(),
        );
        set_cell_viewport(&mut scene, 80, 20);
        assert_relative_eq!(scene.camera.aspect, 2.0);
    }
}
