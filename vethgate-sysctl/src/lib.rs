//! One-shot kernel tunable writes with pluggable backends
//!
//! This crate applies the startup tunables and device-node permission
//! changes the workload relies on. Every write is fail-soft: a failure is
//! logged and startup carries on.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod backend;
pub mod writer;

pub use backend::{MockBackend, ParameterBackend, ProcfsBackend};
pub use writer::{ApplyReport, SystemParameterWriter};

// Re-export commonly used types
pub use vethgate_core::SystemParameter;
