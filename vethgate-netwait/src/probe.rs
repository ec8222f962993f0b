//! Interface state probes
//!
//! The production probe issues `SIOCGIFFLAGS`, which needs `unsafe` for
//! the raw ioctl and for reading the flags out of the `ifreq` union.

#![allow(unsafe_code)]

use async_trait::async_trait;
use nix::errno::Errno;
use nix::net::if_::InterfaceFlags;
use nix::sys::socket::{socket, AddressFamily, SockFlag, SockType};
use std::collections::HashMap;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use tokio::sync::Mutex;
use vethgate_core::{Error, InterfaceName, Result};

nix::ioctl_read_bad!(siocgifflags, libc::SIOCGIFFLAGS, libc::ifreq);

/// Capability: "is the named network interface up?"
///
/// Every call is a fresh query. An `Err` means the query itself failed
/// (no such device, permission denied), which is distinct from `Ok(false)`.
#[async_trait]
pub trait InterfaceProbe: Send + Sync {
    /// Query whether `name` currently reports `IFF_UP`
    ///
    /// # Errors
    /// Returns [`Error::InterfaceQuery`] if the kernel query fails
    async fn is_up(&self, name: &InterfaceName) -> Result<bool>;
}

/// Probe backed by `SIOCGIFFLAGS`
///
/// A datagram socket is opened per query purely as an ioctl handle and is
/// closed again before returning; nothing is sent on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct IoctlProbe;

impl IoctlProbe {
    /// Create a new ioctl probe
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Read the interface flags of `name`
    ///
    /// # Errors
    /// Returns [`Error::InterfaceQuery`] if the socket cannot be opened or
    /// the ioctl fails
    pub fn flags(name: &InterfaceName) -> Result<InterfaceFlags> {
        let query_error = |source: Errno| Error::InterfaceQuery {
            interface: name.to_string(),
            source,
        };

        let sock = socket(
            AddressFamily::Inet,
            SockType::Datagram,
            SockFlag::SOCK_CLOEXEC,
            None,
        )
        .map_err(query_error)?;

        // SAFETY: ifreq is plain old data; all-zero is a valid value and
        // leaves ifr_name NUL-terminated after the copy below.
        let mut req: libc::ifreq = unsafe { std::mem::zeroed() };

        // InterfaceName guarantees at most IFNAMSIZ - 1 bytes and no NUL
        #[allow(clippy::cast_possible_wrap)]
        for (dst, src) in req.ifr_name.iter_mut().zip(name.as_bytes()) {
            *dst = *src as libc::c_char;
        }

        // SAFETY: the fd is a live socket for the duration of the call and
        // req is a valid, exclusively borrowed ifreq.
        unsafe { siocgifflags(sock.as_raw_fd(), &mut req) }.map_err(query_error)?;

        // SAFETY: SIOCGIFFLAGS fills the ifru_flags member of the union.
        let raw = unsafe { req.ifr_ifru.ifru_flags };

        Ok(InterfaceFlags::from_bits_truncate(libc::c_int::from(raw)))
    }
}

#[async_trait]
impl InterfaceProbe for IoctlProbe {
    async fn is_up(&self, name: &InterfaceName) -> Result<bool> {
        let flags = Self::flags(name)?;
        tracing::trace!(interface = %name, ?flags, "Queried interface flags");
        Ok(flags.contains(InterfaceFlags::IFF_UP))
    }
}

/// Mock probe for testing (doesn't touch the kernel)
///
/// Interfaces are registered with the number of polls they stay down for.
/// Unregistered interfaces fail like a missing device does.
#[derive(Clone)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    remaining_down: HashMap<String, usize>,
    failing: HashMap<String, Errno>,
    queries: Vec<String>,
}

impl MockProbe {
    /// Create a new mock probe with no interfaces
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Register `name`, reporting down for the first `polls` queries
    pub async fn up_after(&self, name: &str, polls: usize) {
        self.state
            .lock()
            .await
            .remaining_down
            .insert(name.to_string(), polls);
    }

    /// Make every query of `name` fail with `errno`
    pub async fn fail(&self, name: &str, errno: Errno) {
        self.state
            .lock()
            .await
            .failing
            .insert(name.to_string(), errno);
    }

    /// Every query issued so far, in order
    pub async fn queries(&self) -> Vec<String> {
        self.state.lock().await.queries.clone()
    }

    /// Number of queries issued for `name`
    pub async fn query_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .await
            .queries
            .iter()
            .filter(|q| q.as_str() == name)
            .count()
    }
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProbe").finish_non_exhaustive()
    }
}

#[async_trait]
impl InterfaceProbe for MockProbe {
    async fn is_up(&self, name: &InterfaceName) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.queries.push(name.to_string());

        if let Some(errno) = state.failing.get(name.as_str()) {
            return Err(Error::InterfaceQuery {
                interface: name.to_string(),
                source: *errno,
            });
        }

        match state.remaining_down.get_mut(name.as_str()) {
            Some(0) => Ok(true),
            Some(remaining) => {
                *remaining -= 1;
                Ok(false)
            }
            None => Err(Error::InterfaceQuery {
                interface: name.to_string(),
                source: Errno::ENODEV,
            }),
        }
    }
}
