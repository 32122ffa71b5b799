use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Errors a rendering backend can report while creating buffers.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("out of device memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Opaque handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(u64);

impl BufferHandle {
    pub fn new(raw: u64) -> Self {
        BufferHandle(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// The slice of a rendering backend the importer needs: buffer creation
/// and release. A renderer implements this over its device; tests and
/// [`NullBackend`] stand in for one.
pub trait RenderBackend: Send + Sync {
    fn create_vertex_buffer(&self, data: &[u8]) -> BackendResult<BufferHandle>;

    fn create_index_buffer(&self, data: &[u8]) -> BackendResult<BufferHandle>;

    /// Invoked exactly once per handle, when the owning [`GpuBuffer`]
    /// drops.
    fn release_buffer(&self, buffer: BufferHandle);
}

/// Exclusive ownership of one GPU buffer.
///
/// The handle is released exactly once, when the guard drops; moving the
/// guard moves ownership with it. The guard is neither `Clone` nor
/// `Copy`, so a second release of the same handle cannot be expressed.
pub struct GpuBuffer {
    handle: BufferHandle,
    backend: Arc<dyn RenderBackend>,
}

impl GpuBuffer {
    pub(crate) fn new(handle: BufferHandle, backend: Arc<dyn RenderBackend>) -> Self {
        GpuBuffer { handle, backend }
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }
}

impl fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("handle", &self.handle)
            .finish()
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.backend.release_buffer(self.handle);
    }
}

/// Headless backend: hands out handles without touching a GPU and keeps
/// the live set, so an import can be dry-run and tests can account for
/// every release.
#[derive(Default)]
pub struct NullBackend {
    state: Mutex<NullState>,
}

#[derive(Default)]
struct NullState {
    next_handle: u64,
    live: HashSet<u64>,
    released: usize,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers created and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.state.lock().unwrap().live.len()
    }

    /// Total release calls seen so far.
    pub fn released_buffers(&self) -> usize {
        self.state.lock().unwrap().released
    }

    fn create(&self, data: &[u8], kind: &str) -> BackendResult<BufferHandle> {
        if data.is_empty() {
            return Err(BackendError::BufferCreationFailed(format!(
                "empty {kind} buffer"
            )));
        }
        let mut state = self.state.lock().unwrap();
        let raw = state.next_handle;
        state.next_handle += 1;
        state.live.insert(raw);
        Ok(BufferHandle(raw))
    }
}

impl RenderBackend for NullBackend {
    fn create_vertex_buffer(&self, data: &[u8]) -> BackendResult<BufferHandle> {
        self.create(data, "vertex")
    }

    fn create_index_buffer(&self, data: &[u8]) -> BackendResult<BufferHandle> {
        self.create(data, "index")
    }

    fn release_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.lock().unwrap();
        let known = state.live.remove(&buffer.0);
        debug_assert!(known, "released unknown or already released {buffer:?}");
        state.released += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_backend_rejects_empty_data() {
        let backend = NullBackend::new();
        assert!(backend.create_vertex_buffer(&[]).is_err());
        assert!(backend.create_index_buffer(&[]).is_err());
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let backend = Arc::new(NullBackend::new());
        let dyn_backend: Arc<dyn RenderBackend> = backend.clone();

        let handle = dyn_backend.create_index_buffer(&[0, 0, 1, 0]).unwrap();
        let buffer = GpuBuffer::new(handle, dyn_backend);
        assert_eq!(backend.live_buffers(), 1);

        drop(buffer);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.released_buffers(), 1);
    }

    #[test]
    fn test_moving_guard_does_not_release() {
        let backend = Arc::new(NullBackend::new());
        let dyn_backend: Arc<dyn RenderBackend> = backend.clone();

        let handle = dyn_backend.create_vertex_buffer(&[1, 2, 3, 4]).unwrap();
        let buffer = GpuBuffer::new(handle, dyn_backend);

        let mut holder = Vec::new();
        holder.push(buffer);
        assert_eq!(backend.released_buffers(), 0);
        assert_eq!(holder[0].handle(), handle);

        holder.clear();
        assert_eq!(backend.released_buffers(), 1);
        assert_eq!(backend.live_buffers(), 0);
    }
}
