//! A runner that prints command lines instead of running them

use spm_xcf_cli::output::Status;
use spm_xcf_core::process::{CommandLine, CommandRunner};
use spm_xcf_core::Result;

/// Prints every command line and reports success with empty output
///
/// Module discovery therefore finds nothing, so a dry run shows the clean,
/// build, folder and cleanup steps but no per-module assembly.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    printed: Vec<String>,
    echo: bool,
}

impl DryRunRunner {
    /// A dry runner that echoes each line to stdout
    #[must_use]
    pub fn new() -> Self {
        Self {
            printed: Vec::new(),
            echo: true,
        }
    }

    /// A dry runner that only collects the lines
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    /// Every line seen so far, in order
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.printed
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, line: &CommandLine) -> Result<String> {
        let rendered = line.render();
        if self.echo {
            Status::command(&rendered);
        }
        self.printed.push(rendered);
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{BuilderOptions, CommandBuilder};
    use crate::pipeline::Pipeline;
    use std::path::Path;

    #[test]
    fn test_dry_run_collects_without_executing() {
        let b = CommandBuilder::new(BuilderOptions::new("MyLib").output("/out"), Path::new("/work"));
        let mut pipeline = Pipeline::new(&b, DryRunRunner::silent()).quiet(true);

        let report = pipeline.run().unwrap();

        assert!(report.frameworks.is_empty());
        let lines = pipeline.runner().lines();
        assert_eq!(lines.first().unwrap(), "cd /work && xcodebuild clean -scheme MyLib");
        assert_eq!(lines.last().unwrap(), "rm -rf /out/.build /out/ios");
        assert_eq!(lines.len(), 5);
    }
}
