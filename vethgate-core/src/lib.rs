//! Vethgate Core - Foundation types, configuration, and errors
//!
//! This crate provides the abstractions shared by every stage of the
//! entrypoint wrapper.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{LaunchConfig, SystemParameter};
pub use error::{Error, Result};
pub use types::{InterfaceName, TargetUser};
