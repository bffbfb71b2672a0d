//! Build XCFrameworks from Swift packages
//!
//! The crate has two halves:
//!
//! - [`commands::CommandBuilder`] renders the command line of every step,
//!   purely from [`commands::BuilderOptions`]
//! - [`pipeline::Pipeline`] runs those lines in order through a
//!   [`spm_xcf_core::process::CommandRunner`] and parses the module list
//!   out of the build products
//!
//! # Example
//!
//! ```rust,no_run
//! use spm_xcf_builder::{BuilderOptions, CommandBuilder, Pipeline, Platform};
//! use spm_xcf_core::process::ShellRunner;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let builder = CommandBuilder::new(
//!     BuilderOptions::new("MyLib").platforms([Platform::Ios, Platform::Simulator]),
//!     &cwd,
//! );
//! let report = Pipeline::new(&builder, ShellRunner::default()).run().unwrap();
//! println!("{:?}", report.xcframeworks);
//! ```

pub mod commands;
pub mod dry_run;
pub mod pipeline;
pub mod platform;

pub use commands::{BuilderOptions, CommandBuilder};
pub use dry_run::DryRunRunner;
pub use pipeline::{parse_framework_names, Pipeline, PipelineReport};
pub use platform::{parse_platform_list, Platform, PlatformDescriptor};
