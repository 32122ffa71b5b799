pub mod backend;
pub mod error;
pub mod mesh;

pub use backend::{BackendError, BufferHandle, GpuBuffer, NullBackend, RenderBackend};
pub use error::ImportError;
pub use mesh::{Drawable, MeshSource, Shape};
