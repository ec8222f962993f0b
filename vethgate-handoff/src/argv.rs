//! Argument vector construction

use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use vethgate_core::{Error, Result};

/// Concatenate `prefix` and `original`
///
/// Pure concatenation: nothing is validated, rewritten, reordered or
/// deduplicated.
#[must_use]
pub fn build_handoff_args<T: Clone>(prefix: &[T], original: &[T]) -> Vec<T> {
    let mut args = Vec::with_capacity(prefix.len() + original.len());
    args.extend_from_slice(prefix);
    args.extend_from_slice(original);
    args
}

/// Complete argument vector of the replacement process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffCommand {
    argv: Vec<OsString>,
}

impl HandoffCommand {
    /// Build the command from a tool prefix and the workload's argv
    ///
    /// # Errors
    /// Returns error if the resulting vector would be empty
    pub fn new<S: AsRef<OsStr>>(prefix: &[S], workload: &[OsString]) -> Result<Self> {
        let prefix: Vec<OsString> = prefix.iter().map(|s| s.as_ref().to_os_string()).collect();
        let argv = build_handoff_args(&prefix, workload);

        if argv.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Handoff command cannot be empty".to_string(),
            });
        }

        Ok(Self { argv })
    }

    /// Program looked up on `PATH` (argv\[0\])
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.argv[0]
    }

    /// Full argument vector, including argv\[0\]
    #[must_use]
    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }

    /// Convert to the NUL-terminated form `exec` expects
    ///
    /// # Errors
    /// Returns error if any argument contains an interior NUL byte
    pub fn to_cstrings(&self) -> Result<Vec<CString>> {
        self.argv
            .iter()
            .map(|arg| {
                CString::new(arg.as_bytes()).map_err(|e| Error::InvalidConfig {
                    message: format!("Invalid argument {arg:?}: {e}"),
                })
            })
            .collect()
    }
}
