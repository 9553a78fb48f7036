/// Example: Load and pilot a single OBJ file in the terminal
///
/// Usage: cargo run --example load_obj -- path/to/file.obj [--tangents]
use std::env;
use std::error::Error;
use uw3d_core::{
    Camera, ControlsConfig, LightDescriptor, Model, Pose, SceneState, VertexLayout, VertexPool,
};
use uw3d_terminal::TerminalApp;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = env::args().collect();
    let layout = if args.iter().any(|a| a == "--tangents") {
        VertexLayout::TangentSpace
    } else {
        VertexLayout::Regular
    };

    let model = match args.iter().skip(1).find(|a| !a.starts_with("--")) {
        Some(obj_path) => {
            println!("Loading OBJ file: {}", obj_path);
            Model::load(obj_path, Pose::default(), layout)?
        }
        None => {
            eprintln!("Usage: {} <obj-file> [--tangents]", args[0]);
            eprintln!("\nNo OBJ file provided, using default cube...");
            Model::from_pool("cube", &VertexPool::cube(2.0), Pose::default(), layout)?
        }
    };

    println!("Loaded {} vertices", model.buffers().vertex_count());

    let lights = vec![LightDescriptor::directional(nalgebra::Vector3::new(-0.3, -1.0, -0.5))];
    let mut scene = SceneState::new(Camera::default(), lights, ControlsConfig::default());
    let index = scene.add_model(model);
    scene.set_player(index);

    let mut app = TerminalApp::new(scene)?;
    app.run()?;
    Ok(())
}
