//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Network interface name with validation
///
/// Mirrors the kernel's own rules closely enough that a valid
/// `InterfaceName` always fits the `ifr_name` field of an `ifreq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct InterfaceName(String);

impl InterfaceName {
    /// Maximum length for interface names (`IFNAMSIZ` minus the NUL)
    pub const MAX_LENGTH: usize = 15;

    /// Create a new `InterfaceName` with validation
    ///
    /// # Errors
    /// Returns error if the name is empty, too long, or contains bytes the
    /// kernel rejects in device names
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Interface name cannot be empty".to_string(),
            });
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(Error::InvalidConfig {
                message: format!(
                    "Interface name {name:?} too long (max {} bytes)",
                    Self::MAX_LENGTH
                ),
            });
        }

        if name
            .chars()
            .any(|c| c == '\0' || c == '/' || c.is_whitespace())
        {
            return Err(Error::InvalidConfig {
                message: format!("Interface name {name:?} contains invalid characters"),
            });
        }

        Ok(())
    }

    /// Get the interface name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the raw bytes of the name (without a trailing NUL)
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InterfaceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for InterfaceName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<InterfaceName> for String {
    fn from(name: InterfaceName) -> Self {
        name.0
    }
}

/// Unprivileged account the workload is handed off to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct TargetUser(String);

impl TargetUser {
    /// Create a new `TargetUser`
    ///
    /// # Errors
    /// Returns error if the name is empty or contains a NUL byte
    pub fn new(user: impl Into<String>) -> Result<Self> {
        let user = user.into();

        if user.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Target user cannot be empty".to_string(),
            });
        }

        if user.contains('\0') {
            return Err(Error::InvalidConfig {
                message: "Target user cannot contain NUL".to_string(),
            });
        }

        Ok(Self(user))
    }

    /// Get the user name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TargetUser {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<TargetUser> for String {
    fn from(user: TargetUser) -> Self {
        user.0
    }
}
