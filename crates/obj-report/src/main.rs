use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use glam::Vec3;
use log::{error, info};
use mesh_import::mesh::obj;
use mesh_import::{ImportError, MeshSource, NullBackend, RenderBackend, Shape};

struct Config {
    model_path: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Config {
    let _program = args.next();
    Config {
        model_path: args.next().map(PathBuf::from),
    }
}

#[rustfmt::skip]
const TRIANGLE_POSITIONS: [Vec3; 3] = [
    Vec3 { x: -0.5, y: -0.5, z: 0.0 },
    Vec3 { x:  0.5, y: -0.5, z: 0.0 },
    Vec3 { x:  0.0, y:  0.5, z: 0.0 },
];

const TRIANGLE_INDICES: [u32; 3] = [0, 1, 2];

fn load_source(config: &Config) -> Result<MeshSource, ImportError> {
    match &config.model_path {
        Some(path) => obj::load(path),
        None => MeshSource::new(
            TRIANGLE_POSITIONS.to_vec(),
            vec![Shape::new("triangle", TRIANGLE_INDICES.to_vec())],
        ),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let config = parse_args(std::env::args());

    let source = match load_source(&config) {
        Ok(source) => source,
        Err(e) => {
            error!("import failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let backend = Arc::new(NullBackend::new());
    let dyn_backend: Arc<dyn RenderBackend> = backend.clone();

    let vertex_buffer = match source.vertex_buffer(&dyn_backend) {
        Ok(buffer) => buffer,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "vertex buffer {:?}: {} vertices ({} bytes)",
        vertex_buffer.handle().raw(),
        source.vertex_count(),
        source.position_bytes().len()
    );

    let mut failures = 0;
    let results = source.build_drawables(&dyn_backend);
    for (shape, result) in source.shapes().iter().zip(results) {
        match result {
            Ok(drawable) => info!(
                "shape '{}': {} triangle(s), index buffer {:?}",
                shape.name(),
                drawable.triangle_count(),
                drawable.index_buffer().raw()
            ),
            Err(e) => {
                failures += 1;
                error!("{e}");
            }
        }
    }

    drop(vertex_buffer);
    info!("{} buffer(s) still live", backend.live_buffers());

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
