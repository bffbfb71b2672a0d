//! Terminal output for spm-to-xcframework
//!
//! Provides the user-facing side of a build:
//! - Status and step messages
//! - Spinners while a long xcodebuild invocation runs

#![warn(missing_docs)]

pub mod output;
pub mod progress;
