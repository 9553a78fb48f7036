/// UW3D Terminal - Underwater Scene
///
/// Pilots the submarine of a scene file through the terminal.
/// Usage: uw3d-terminal [scene.toml]
///
/// Controls:
///   - W/S: Forward / back along the heading
///   - A/D: Turn left / right
///   - Q/E: Ascend / descend
///   - Arrow Keys / mouse drag: Look around
///   - Tab: First / third person
///   - P: Perspective / orthographic
///   - ESC: Quit
use std::env;
use std::error::Error;
use uw3d_core::SceneState;
use uw3d_terminal::TerminalApp;

const DEFAULT_SCENE: &str = "assets/underwater.toml";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let path = env::args().nth(1).unwrap_or_else(|| DEFAULT_SCENE.to_string());
    println!("UW3D Terminal Renderer - Loading {path}...");

    // Viewport size is replaced by the terminal size once the app starts
    let scene = SceneState::load(&path, 80, 24)?;

    println!("Starting terminal renderer (press ESC to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(scene)?;
    app.run()?;

    println!("Thank you for diving with UW3D!");
    Ok(())
}
