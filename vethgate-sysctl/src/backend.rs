//! Parameter backend trait for pluggable implementations

use async_trait::async_trait;
use std::collections::HashSet;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use vethgate_core::{Error, Result};

/// Trait for tunable-write backends
///
/// This allows for different implementations:
/// - [`ProcfsBackend`] - Production writes against the real filesystem
/// - [`MockBackend`] - Testing without filesystem
///
/// # Thread Safety
/// All implementations must be `Send + Sync`.
#[async_trait]
pub trait ParameterBackend: Send + Sync {
    /// Write `value` as text to the tunable at `path`
    ///
    /// # Errors
    /// Returns error if the tunable cannot be opened or written
    async fn write_parameter(&self, path: &Path, value: &str) -> Result<()>;

    /// Replace the permission bits of `path` with `mode`
    ///
    /// # Errors
    /// Returns error if the mode cannot be changed
    async fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;
}

/// Backend writing straight to the filesystem
///
/// Writes are synchronous on the calling thread. They run once, before the
/// interface wait, and must not start tokio's blocking pool: the wrapper
/// stays a single-threaded process until it execs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsBackend;

impl ProcfsBackend {
    /// Create a new filesystem backend
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ParameterBackend for ProcfsBackend {
    async fn write_parameter(&self, path: &Path, value: &str) -> Result<()> {
        tracing::trace!(path = %path.display(), value, "Writing tunable");
        std::fs::write(path, value.as_bytes())?;
        Ok(())
    }

    async fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        tracing::trace!(path = %path.display(), mode = %format!("{mode:o}"), "Setting mode");
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
        Ok(())
    }
}

/// Mock backend for testing (doesn't touch filesystem)
///
/// # Example
/// ```
/// use std::path::Path;
/// use vethgate_sysctl::{MockBackend, ParameterBackend};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let backend = MockBackend::new();
///
/// backend.write_parameter(Path::new("/proc/sys/x"), "1").await.unwrap();
///
/// assert_eq!(backend.value_of(Path::new("/proc/sys/x")).await.as_deref(), Some("1"));
/// # });
/// ```
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    writes: Vec<(PathBuf, String)>,
    modes: Vec<(PathBuf, u32)>,
    failing: HashSet<PathBuf>,
    call_count: usize,
}

impl MockBackend {
    /// Create a new mock backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Make every operation on `path` fail with `ENOENT`
    pub async fn fail_on(&self, path: impl Into<PathBuf>) {
        self.state.lock().await.failing.insert(path.into());
    }

    /// Get the number of backend calls made (for testing)
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.call_count
    }

    /// All successful writes, in order
    pub async fn writes(&self) -> Vec<(PathBuf, String)> {
        self.state.lock().await.writes.clone()
    }

    /// All successful mode changes, in order
    pub async fn modes(&self) -> Vec<(PathBuf, u32)> {
        self.state.lock().await.modes.clone()
    }

    /// Last value written to `path`
    pub async fn value_of(&self, path: &Path) -> Option<String> {
        self.state
            .lock()
            .await
            .writes
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, v)| v.clone())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend").finish_non_exhaustive()
    }
}

fn not_found(path: &Path) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    ))
}

#[async_trait]
impl ParameterBackend for MockBackend {
    async fn write_parameter(&self, path: &Path, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.call_count += 1;

        if state.failing.contains(path) {
            return Err(not_found(path));
        }

        state.writes.push((path.to_path_buf(), value.to_string()));
        tracing::debug!(path = %path.display(), value, "Mock: Wrote tunable");

        Ok(())
    }

    async fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        let mut state = self.state.lock().await;
        state.call_count += 1;

        if state.failing.contains(path) {
            return Err(not_found(path));
        }

        state.modes.push((path.to_path_buf(), mode));
        tracing::debug!(path = %path.display(), mode, "Mock: Set mode");

        Ok(())
    }
}
