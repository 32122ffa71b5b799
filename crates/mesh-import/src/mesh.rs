use std::sync::Arc;

use glam::Vec3;

use crate::backend::{BufferHandle, GpuBuffer, RenderBackend};
use crate::error::ImportError;

/// Largest vertex count a 16-bit index buffer can address.
pub const MAX_INDEXED_VERTICES: usize = u16::MAX as usize;

/// Vertex positions and sub-meshes parsed from one model file.
///
/// All shapes index a single shared position sequence, so the whole file
/// uploads as one vertex buffer. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct MeshSource {
    positions: Vec<Vec3>,
    shapes: Vec<Shape>,
}

impl MeshSource {
    /// Assemble a source from in-memory geometry, with the same
    /// validation as [`obj::load`]: at least one shape, every index in
    /// bounds.
    pub fn new(positions: Vec<Vec3>, shapes: Vec<Shape>) -> Result<Self, ImportError> {
        if shapes.is_empty() {
            return Err(ImportError::Empty {
                path: "<memory>".into(),
            });
        }
        for shape in &shapes {
            if let Some(index) = shape.first_out_of_bounds(positions.len()) {
                return Err(ImportError::IndexOutOfBounds {
                    shape: shape.name.clone(),
                    index,
                    vertex_count: positions.len(),
                });
            }
        }
        Ok(MeshSource { positions, shapes })
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Position data as bytes, ready for vertex-buffer upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Upload the shared vertex positions through the backend.
    pub fn vertex_buffer(
        &self,
        backend: &Arc<dyn RenderBackend>,
    ) -> Result<GpuBuffer, ImportError> {
        let handle = backend
            .create_vertex_buffer(self.position_bytes())
            .map_err(|source| ImportError::BackendResourceCreation {
                resource: "vertex position buffer".to_string(),
                source,
            })?;
        Ok(GpuBuffer::new(handle, Arc::clone(backend)))
    }

    /// Build a drawable for every shape, in file order. Results are per
    /// shape; a shape that fails does not abort its siblings.
    pub fn build_drawables(
        &self,
        backend: &Arc<dyn RenderBackend>,
    ) -> Vec<Result<Drawable, ImportError>> {
        self.shapes
            .iter()
            .map(|shape| Drawable::build(backend, shape, self.vertex_count()))
            .collect()
    }
}

/// One named sub-mesh: flat vertex-position indices in file order, three
/// per triangle, plus per-face vertex counts when the file contained
/// polygonal faces.
#[derive(Debug, Clone)]
pub struct Shape {
    name: String,
    indices: Vec<u32>,
    face_arities: Vec<u32>,
}

impl Shape {
    pub fn new(name: impl Into<String>, indices: Vec<u32>) -> Self {
        Shape {
            name: name.into(),
            indices,
            face_arities: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// First face that is not a triangle, as (face index, arity).
    fn first_polygonal_face(&self) -> Option<(usize, usize)> {
        if !self.face_arities.is_empty() {
            return self
                .face_arities
                .iter()
                .enumerate()
                .find(|&(_, &arity)| arity != 3)
                .map(|(face, &arity)| (face, arity as usize));
        }
        // No arity table: a trailing partial face shows up as a remainder.
        match self.indices.len() % 3 {
            0 => None,
            rem => Some((self.indices.len() / 3, rem)),
        }
    }

    fn first_out_of_bounds(&self, vertex_count: usize) -> Option<u32> {
        self.indices
            .iter()
            .copied()
            .find(|&index| index as usize >= vertex_count)
    }
}

/// A GPU-resident index buffer plus its element count, ready to bind and
/// draw. Owns the buffer exclusively; the handle is released when the
/// drawable drops.
#[derive(Debug)]
pub struct Drawable {
    index_buffer: GpuBuffer,
    index_count: usize,
}

impl Drawable {
    /// Convert one shape's faces into a 16-bit index buffer.
    ///
    /// OBJ winds triangles counter-clockwise while the target backend
    /// treats clockwise as front-facing, so every `(a, b, c)` is emitted
    /// as `(a, c, b)`. Skipping the swap would cull every front face.
    pub fn build(
        backend: &Arc<dyn RenderBackend>,
        shape: &Shape,
        vertex_count: usize,
    ) -> Result<Drawable, ImportError> {
        if let Some((face, arity)) = shape.first_polygonal_face() {
            return Err(ImportError::NonTriangulatedFace {
                shape: shape.name.clone(),
                face,
                arity,
            });
        }
        if vertex_count > MAX_INDEXED_VERTICES {
            return Err(ImportError::TooManyVertices {
                shape: shape.name.clone(),
                vertex_count,
            });
        }
        // Shapes can be built by hand, not only by a validated parse, so
        // the bounds that make the u16 casts safe are re-checked here.
        if let Some(index) = shape.first_out_of_bounds(vertex_count) {
            return Err(ImportError::IndexOutOfBounds {
                shape: shape.name.clone(),
                index,
                vertex_count,
            });
        }

        let mut indices = Vec::with_capacity(shape.indices.len());
        for face in shape.indices.chunks_exact(3) {
            indices.push(face[0] as u16);
            indices.push(face[2] as u16);
            indices.push(face[1] as u16);
        }

        let handle = backend
            .create_index_buffer(bytemuck::cast_slice(&indices))
            .map_err(|source| ImportError::BackendResourceCreation {
                resource: format!("index buffer of shape '{}'", shape.name),
                source,
            })?;

        Ok(Drawable {
            index_buffer: GpuBuffer::new(handle, Arc::clone(backend)),
            index_count: indices.len(),
        })
    }

    pub fn index_buffer(&self) -> BufferHandle {
        self.index_buffer.handle()
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn triangle_count(&self) -> usize {
        self.index_count / 3
    }
}

pub mod obj {
    //! Wavefront OBJ import.

    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;

    use glam::Vec3;
    use log::{debug, info};

    use super::{MeshSource, Shape};
    use crate::error::ImportError;

    /// Parse an OBJ document into a [`MeshSource`].
    ///
    /// Material references are accepted and ignored. Polygonal faces are
    /// kept as-is; they are rejected later, at drawable-build time.
    /// Models without faces (points or lines only) are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<MeshSource, ImportError> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|source| ImportError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let options = tobj::LoadOptions {
            single_index: false,
            triangulate: false,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };
        let (models, _materials) =
            tobj::load_obj_buf(&mut reader, &options, |_| Ok(Default::default())).map_err(
                |source| ImportError::ParseFailure {
                    path: path.to_path_buf(),
                    source,
                },
            )?;

        let mut positions: Vec<Vec3> = Vec::new();
        let mut shapes = Vec::new();

        for model in &models {
            let mesh = &model.mesh;
            if mesh.indices.is_empty() {
                debug!(
                    "skipping faceless model '{}' in {}",
                    model.name,
                    path.display()
                );
                continue;
            }

            let name = if model.name.is_empty() {
                path.display().to_string()
            } else {
                model.name.clone()
            };

            // The parser hands out per-model position arrays; rebase each
            // model's indices onto one shared sequence so the file uploads
            // as a single vertex buffer.
            let base = positions.len() as u32;
            let model_vertex_count = mesh.positions.len() / 3;

            let mut indices = Vec::with_capacity(mesh.indices.len());
            for &index in &mesh.indices {
                if index as usize >= model_vertex_count {
                    return Err(ImportError::ParseFailure {
                        path: path.to_path_buf(),
                        source: tobj::LoadError::FaceVertexOutOfBounds,
                    });
                }
                indices.push(base + index);
            }

            for position in mesh.positions.chunks_exact(3) {
                positions.push(Vec3::new(position[0], position[1], position[2]));
            }

            shapes.push(Shape {
                name,
                indices,
                face_arities: mesh.face_arities.clone(),
            });
        }

        if shapes.is_empty() {
            return Err(ImportError::Empty {
                path: path.to_path_buf(),
            });
        }

        info!(
            "loaded {}: {} vertices, {} shape(s)",
            path.display(),
            positions.len(),
            shapes.len()
        );

        Ok(MeshSource { positions, shapes })
    }
}
