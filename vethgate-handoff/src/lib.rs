//! Privilege-dropping process handoff
//!
//! This crate builds the argument vector for the privilege-drop tool and
//! replaces the wrapper's process image with it:
//! - [`build_handoff_args`] - prefix + original argv, verbatim
//! - [`Executor`] - process replacement seam
//! - [`drop_privileges_and_exec`] - the terminal handoff step

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod argv;
pub mod exec;

pub use argv::{HandoffCommand, build_handoff_args};
pub use exec::{ExecvpExecutor, Executor, HandoffOutcome, MockExecutor, drop_privileges_and_exec};
