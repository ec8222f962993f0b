//! Error types for Vethgate

use thiserror::Error;

/// Vethgate error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Kernel interface-flag query failed
    #[error("SIOCGIFFLAGS on {interface}: {source}")]
    InterfaceQuery {
        /// Interface that was being queried
        interface: String,
        /// Underlying errno
        #[source]
        source: nix::Error,
    },

    /// Replacing the process image failed
    #[error("Failed to execute {program}: {source}")]
    Handoff {
        /// Program that could not be executed
        program: String,
        /// Underlying errno
        #[source]
        source: nix::Error,
    },
}

impl Error {
    /// Exit status the wrapper terminates with when this error is fatal
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Handoff { .. } => 127,
            _ => 1,
        }
    }
}

/// Result type alias for Vethgate operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;

    #[test]
    fn test_exit_codes() {
        let query = Error::InterfaceQuery {
            interface: "vnbe0".to_string(),
            source: Errno::ENODEV,
        };
        assert_eq!(query.exit_code(), 1);

        let handoff = Error::Handoff {
            program: "sudo".to_string(),
            source: Errno::ENOENT,
        };
        assert_eq!(handoff.exit_code(), 127);
    }

    #[test]
    fn test_interface_query_message() {
        let err = Error::InterfaceQuery {
            interface: "vnbe0".to_string(),
            source: Errno::ENODEV,
        };
        let message = err.to_string();
        assert!(message.starts_with("SIOCGIFFLAGS on vnbe0"));
    }
}
