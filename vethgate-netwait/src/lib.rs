//! Startup gate on virtual network interfaces
//!
//! This crate blocks until every orchestrator-provisioned interface named
//! in a delimited list reports `IFF_UP`:
//! - [`InterfaceProbe`] - "is this interface up?" capability
//! - [`IoctlProbe`] - `SIOCGIFFLAGS` on a throwaway datagram socket
//! - [`ReadinessPoller`] - sequential, unbounded poll loop

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod poller;
pub mod probe;

pub use poller::ReadinessPoller;
pub use probe::{InterfaceProbe, IoctlProbe, MockProbe};
