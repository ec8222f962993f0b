//! Startup tunable writer

use std::path::Path;
use tracing::{debug, info, warn};
use vethgate_core::LaunchConfig;

use crate::backend::ParameterBackend;

/// Outcome of [`SystemParameterWriter::apply`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Operations that took effect
    pub applied: usize,

    /// Operations that failed and were skipped
    pub failed: usize,
}

/// Applies one-shot tunables before the workload starts
///
/// All operations are idempotent and fail soft: errors from the backend
/// are logged and never propagated.
#[derive(Debug)]
pub struct SystemParameterWriter<B> {
    backend: B,
}

impl<B: ParameterBackend> SystemParameterWriter<B> {
    /// Create a writer on top of `backend`
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Get the backend
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Write `value` to the tunable at `path`
    ///
    /// Returns whether the write took effect.
    pub async fn set_parameter(&self, path: &Path, value: &str) -> bool {
        match self.backend.write_parameter(path, value).await {
            Ok(()) => {
                debug!(path = %path.display(), value, "Tunable set");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Open file failed, skipping tunable");
                false
            }
        }
    }

    /// Replace the permission bits of `path`
    ///
    /// Returns whether the change took effect.
    pub async fn relax_permissions(&self, path: &Path, mode: u32) -> bool {
        match self.backend.set_mode(path, mode).await {
            Ok(()) => {
                debug!(path = %path.display(), mode = %format!("{mode:o}"), "Permissions relaxed");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not change permissions");
                false
            }
        }
    }

    /// Apply every tunable and device-node permission from `config`
    pub async fn apply(&self, config: &LaunchConfig) -> ApplyReport {
        let mut report = ApplyReport::default();

        for param in config.parameters() {
            if self.set_parameter(&param.path, &param.value).await {
                report.applied += 1;
            } else {
                report.failed += 1;
            }
        }

        for node in &config.device_nodes {
            if self.relax_permissions(node, config.device_mode).await {
                report.applied += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            applied = report.applied,
            failed = report.failed,
            "System parameters applied"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockBackend;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_set_parameter_fails_soft() {
        let backend = MockBackend::new();
        backend.fail_on("/writable-proc/sys/net/core/somaxconn").await;
        let writer = SystemParameterWriter::new(backend);

        let applied = writer
            .set_parameter(Path::new("/writable-proc/sys/net/core/somaxconn"), "32768")
            .await;

        assert!(!applied);
        assert!(writer.backend().writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_apply_defaults() {
        let writer = SystemParameterWriter::new(MockBackend::new());
        let report = writer.apply(&LaunchConfig::new()).await;

        assert_eq!(report, ApplyReport { applied: 3, failed: 0 });

        // The backlog tunable is written exactly once
        assert_eq!(
            writer.backend().writes().await,
            vec![(
                PathBuf::from("/writable-proc/sys/net/core/somaxconn"),
                "32768".to_string()
            )]
        );
        assert_eq!(
            writer.backend().modes().await,
            vec![
                (PathBuf::from("/dev/stdout"), 0o777),
                (PathBuf::from("/dev/stderr"), 0o777),
            ]
        );
    }

    #[tokio::test]
    async fn test_apply_continues_after_failure() {
        let backend = MockBackend::new();
        backend.fail_on("/writable-proc/sys/net/core/somaxconn").await;
        backend.fail_on("/dev/stdout").await;
        let writer = SystemParameterWriter::new(backend);

        let report = writer.apply(&LaunchConfig::new()).await;

        assert_eq!(report, ApplyReport { applied: 1, failed: 2 });
        assert_eq!(
            writer.backend().modes().await,
            vec![(PathBuf::from("/dev/stderr"), 0o777)]
        );
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let writer = SystemParameterWriter::new(MockBackend::new());
        let config = LaunchConfig::new();

        writer.apply(&config).await;
        writer.apply(&config).await;

        let value = writer
            .backend()
            .value_of(Path::new("/writable-proc/sys/net/core/somaxconn"))
            .await;
        assert_eq!(value.as_deref(), Some("32768"));
    }
}
