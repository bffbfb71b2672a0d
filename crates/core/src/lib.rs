//! Core utilities for spm-to-xcframework
//!
//! This crate provides the shared plumbing the builder and the CLI stand on:
//!
//! - **Error handling**: coded errors with context and recovery suggestions
//! - **Process execution**: structured command lines rendered for a POSIX
//!   shell, plus the runner that executes them with merged output
//! - **Configuration**: TOML-based defaults for builds
//!
//! # Example
//!
//! ```rust,no_run
//! use spm_xcf_core::process::{CommandLine, CommandRunner, Invocation, ShellRunner};
//!
//! let line = CommandLine::single(Invocation::new("xcodebuild").arg("-version"));
//! let mut runner = ShellRunner::default();
//! let output = runner.run(&line).expect("xcodebuild failed");
//! println!("{output}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod process;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::process::{CommandLine, CommandRunner, Invocation, ShellRunner};
}
