//! Launch configuration
//!
//! Everything the wrapper needs is read from the environment once, at
//! startup, into a [`LaunchConfig`]. Components receive the config (or the
//! pieces of it they need) instead of reading variables themselves.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::TargetUser;

/// Variable holding the semicolon-delimited list of interfaces to await
pub const INTERFACES_ENV: &str = "NBE_VETHS";

/// Variable holding the unprivileged user to hand the workload to
pub const TARGET_USER_ENV: &str = "APPNAME";

/// Variable overriding the writable proc mount
pub const PROC_ROOT_ENV: &str = "VETHGATE_PROC_ROOT";

/// Variable holding the tracing filter directive
pub const LOG_ENV: &str = "VETHGATE_LOG";

/// Separator between names in [`INTERFACES_ENV`]
pub const INTERFACE_DELIMITER: char = ';';

/// Prefix of interface names provisioned by the orchestrator
pub const VETH_PREFIX: &str = "vnbe";

/// Default mount point of the writable proc tree
pub const DEFAULT_PROC_ROOT: &str = "/writable-proc";

/// Listen backlog applied to `net.core.somaxconn`
pub const DEFAULT_SOMAXCONN: &str = "32768";

/// A single tunable write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemParameter {
    /// Absolute path of the tunable
    pub path: PathBuf,

    /// Value written as text
    pub value: String,
}

/// Launch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Raw interface list, `None` when there is nothing to wait for
    pub interfaces: Option<String>,

    /// User the workload runs as, `None` disables the handoff
    pub target_user: Option<TargetUser>,

    /// Root of the writable proc mount
    pub proc_root: PathBuf,

    /// Value for `net.core.somaxconn`
    pub somaxconn: String,

    /// Interfaces not starting with this prefix are ignored
    pub veth_prefix: String,

    /// Sleep between two polls of the same interface
    pub poll_interval: Duration,

    /// Privilege-drop tool, resolved through `PATH`
    pub privilege_tool: String,

    /// Device nodes made world-writable before the handoff
    pub device_nodes: Vec<PathBuf>,

    /// Mode applied to `device_nodes`
    pub device_mode: u32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            interfaces: None,
            target_user: None,
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            somaxconn: DEFAULT_SOMAXCONN.to_string(),
            veth_prefix: VETH_PREFIX.to_string(),
            poll_interval: Duration::from_micros(500),
            privilege_tool: "sudo".to_string(),
            device_nodes: vec![PathBuf::from("/dev/stdout"), PathBuf::from("/dev/stderr")],
            device_mode: 0o777,
        }
    }
}

impl LaunchConfig {
    /// Create a configuration with defaults and no environment input
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    ///
    /// Empty values are treated the same as unset ones.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let defaults = Self::default();

        Self {
            interfaces: non_empty(INTERFACES_ENV),
            target_user: non_empty(TARGET_USER_ENV).and_then(|user| TargetUser::new(user).ok()),
            proc_root: non_empty(PROC_ROOT_ENV).map_or(defaults.proc_root.clone(), PathBuf::from),
            ..defaults
        }
    }

    /// Set the raw interface list
    #[must_use]
    pub fn with_interfaces(mut self, interfaces: impl Into<String>) -> Self {
        self.interfaces = Some(interfaces.into());
        self
    }

    /// Set the target user
    #[must_use]
    pub fn with_target_user(mut self, user: TargetUser) -> Self {
        self.target_user = Some(user);
        self
    }

    /// Set the writable proc root
    #[must_use]
    pub fn with_proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    /// Set the device nodes whose permissions are relaxed
    #[must_use]
    pub fn with_device_nodes(mut self, nodes: Vec<PathBuf>) -> Self {
        self.device_nodes = nodes;
        self
    }

    /// Tunables written at startup
    #[must_use]
    pub fn parameters(&self) -> Vec<SystemParameter> {
        vec![SystemParameter {
            path: self.proc_root.join("sys/net/core/somaxconn"),
            value: self.somaxconn.clone(),
        }]
    }

    /// Argument vector prefix for the privilege-drop tool
    #[must_use]
    pub fn privilege_prefix(&self, user: &TargetUser) -> Vec<String> {
        vec![
            self.privilege_tool.clone(),
            "-E".to_string(),
            "-u".to_string(),
            user.as_str().to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LaunchConfig::new();
        assert!(config.interfaces.is_none());
        assert!(config.target_user.is_none());
        assert_eq!(config.poll_interval, Duration::from_micros(500));
        assert_eq!(config.veth_prefix, "vnbe");
        assert_eq!(config.device_mode, 0o777);
    }

    #[test]
    fn test_from_lookup() {
        let config = LaunchConfig::from_lookup(lookup(&[
            ("NBE_VETHS", "vnbe0;vnbe1"),
            ("APPNAME", "alice"),
        ]));

        assert_eq!(config.interfaces.as_deref(), Some("vnbe0;vnbe1"));
        assert_eq!(config.target_user.as_ref().map(TargetUser::as_str), Some("alice"));
        assert_eq!(config.proc_root, PathBuf::from("/writable-proc"));
    }

    #[test]
    fn test_from_lookup_empty_values_are_absent() {
        let config = LaunchConfig::from_lookup(lookup(&[("NBE_VETHS", ""), ("APPNAME", "")]));
        assert!(config.interfaces.is_none());
        assert!(config.target_user.is_none());
    }

    #[test]
    fn test_proc_root_override() {
        let config = LaunchConfig::from_lookup(lookup(&[("VETHGATE_PROC_ROOT", "/tmp/proc")]));
        let params = config.parameters();

        assert_eq!(params.len(), 1);
        assert_eq!(params[0].path, PathBuf::from("/tmp/proc/sys/net/core/somaxconn"));
        assert_eq!(params[0].value, "32768");
    }

    #[test]
    fn test_privilege_prefix() {
        let config = LaunchConfig::new();
        let user = TargetUser::new("alice").unwrap();
        assert_eq!(config.privilege_prefix(&user), vec!["sudo", "-E", "-u", "alice"]);
    }

    #[test]
    fn test_config_serde() {
        let config = LaunchConfig::new()
            .with_interfaces("vnbe0")
            .with_target_user(TargetUser::new("bob").unwrap());
        let json = serde_json::to_string(&config).unwrap();
        let back: LaunchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
