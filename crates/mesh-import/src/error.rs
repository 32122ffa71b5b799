use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;

/// Errors produced while importing a model file or building GPU geometry
/// from it.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The model file could not be opened for reading.
    #[error("cannot open model file {path}: {source}")]
    NotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document violates the OBJ grammar, or a face references a
    /// vertex that was never declared.
    #[error("cannot parse model file {path}: {source}")]
    ParseFailure {
        path: PathBuf,
        source: tobj::LoadError,
    },

    /// Parsing succeeded but the document contains no shapes with faces.
    #[error("model file {path} contains no shapes")]
    Empty { path: PathBuf },

    /// A face references a vertex outside the source's vertex sequence.
    #[error("shape '{shape}': index {index} is out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds {
        shape: String,
        index: u32,
        vertex_count: usize,
    },

    /// A face is not a triangle; the importer refuses to guess a
    /// triangulation.
    #[error("shape '{shape}': face {face} has {arity} vertices, expected 3")]
    NonTriangulatedFace {
        shape: String,
        face: usize,
        arity: usize,
    },

    /// The source has more vertices than a 16-bit index buffer can
    /// address.
    #[error("shape '{shape}': {vertex_count} vertices exceed the 16-bit index limit")]
    TooManyVertices { shape: String, vertex_count: usize },

    /// The rendering backend failed to create a buffer.
    #[error("backend failed to create {resource}: {source}")]
    BackendResourceCreation {
        resource: String,
        source: BackendError,
    },
}
