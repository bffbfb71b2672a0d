//! The build pipeline
//!
//! Runs the commands of a [`CommandBuilder`] in a fixed order through a
//! [`CommandRunner`]:
//!
//! 1. clean
//! 2. build each platform, in request order
//! 3. create the per-platform folders
//! 4. discover module names from the reference platform's products
//! 5. assemble every module's framework for every platform
//! 6. per module: copy resources, then create the XCFramework
//! 7. clean up scratch folders
//! 8. optionally reveal the output folder
//!
//! The first failing command aborts the run. Nothing is rolled back and
//! cleanup only happens on success, so a failed run leaves its partial
//! output on disk for inspection.

use crate::commands::{CommandBuilder, OBJECT_SUFFIX};
use crate::platform::Platform;
use serde::Serialize;
use spm_xcf_cli::output::Status;
use spm_xcf_cli::progress;
use spm_xcf_core::process::{CommandLine, CommandRunner};
use spm_xcf_core::{Result, ResultExt};
use spm_xcf_telemetry::{metrics, Timer};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Extract module names from the output of
/// [`CommandBuilder::framework_names_command`]
///
/// Each non-blank line is a path; its last segment minus [`OBJECT_SUFFIX`]
/// is the module name. Input order is kept.
#[must_use]
pub fn parse_framework_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter_map(|line| line.rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .strip_suffix(OBJECT_SUFFIX)
                .unwrap_or(segment)
                .to_string()
        })
        .collect()
}

/// How long one step took
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub step: String,
    pub duration_ms: u128,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub package: String,
    pub output_dir: PathBuf,
    pub platforms: Vec<Platform>,
    /// Module names discovered in the build products
    pub frameworks: Vec<String>,
    /// One `.xcframework` per discovered module
    pub xcframeworks: Vec<PathBuf>,
    pub steps: Vec<StepTiming>,
    pub total_ms: u128,
}

impl PipelineReport {
    /// Total wall-clock time of the run
    #[must_use]
    pub fn total(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.total_ms).unwrap_or(u64::MAX))
    }
}

/// Drives one build from clean to packaged XCFrameworks
pub struct Pipeline<'a, R> {
    builder: &'a CommandBuilder,
    runner: R,
    show_output: bool,
    quiet: bool,
    steps: Vec<StepTiming>,
}

impl<'a, R: CommandRunner> Pipeline<'a, R> {
    pub fn new(builder: &'a CommandBuilder, runner: R) -> Self {
        Self {
            builder,
            runner,
            show_output: false,
            quiet: false,
            steps: Vec::new(),
        }
    }

    /// Open the output folder after a successful run
    #[must_use]
    pub fn show_output(mut self, show_output: bool) -> Self {
        self.show_output = show_output;
        self
    }

    /// Suppress progress lines on stdout
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// The runner, e.g. to inspect what a test double recorded
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Give the runner back
    pub fn into_runner(self) -> R {
        self.runner
    }

    /// Run every step; stops at the first failure
    pub fn run(&mut self) -> Result<PipelineReport> {
        let started = Instant::now();
        let builder = self.builder;
        let scheme = builder.scheme();
        self.steps.clear();

        self.timed("clean", |p| {
            p.announce(&format!("Cleaning package '{scheme}'"));
            p.execute(&builder.clean_command())
                .context(format!("Cleaning package '{scheme}'"))
        })?;

        self.announce(&format!("Start building package '{scheme}'"));
        for (platform, line) in builder.build_commands() {
            self.timed(&format!("build:{platform}"), |p| p.build(platform, &line))?;
        }

        self.timed("create-folders", |p| {
            for line in builder.create_folders_commands() {
                p.execute(&line).context("Creating output folders")?;
            }
            Ok(())
        })?;

        let reference = builder.reference_platform();
        let names = self.timed("discover", |p| {
            let output = p
                .execute(&builder.framework_names_command(reference))
                .context(format!("Listing modules built for {reference}"))?;
            Ok(parse_framework_names(&output))
        })?;
        info!(platform = %reference, modules = ?names, "Discovered modules");

        self.timed("assemble", |p| {
            for &platform in builder.platforms() {
                for name in &names {
                    debug!(module = %name, platform = %platform, "Assembling framework");
                    p.execute(&builder.create_framework_command(name, platform))
                        .context(format!("Assembling {name}.framework for {platform}"))?;
                }
            }
            Ok(())
        })?;

        self.announce("Creating XCFrameworks");
        let xcframeworks = self.timed("package", |p| {
            let mut created = Vec::with_capacity(names.len());
            for name in &names {
                p.execute(&builder.copy_resources_command(name, reference))
                    .context(format!("Copying resources of {name}"))?;
                p.execute(&builder.xcframework_command(name))
                    .context(format!("Creating {name}.xcframework"))?;
                created.push(builder.xcframework_path(name));
            }
            Ok(created)
        })?;

        self.timed("cleanup", |p| {
            p.execute(&builder.cleanup_command())
                .context("Removing intermediate folders")
        })?;
        if !self.quiet {
            Status::success(&format!("Finished building package '{scheme}'"));
        }

        if self.show_output {
            self.timed("open", |p| {
                p.execute(&builder.open_folder_command())
                    .context("Opening the output folder")
            })?;
        }

        Ok(PipelineReport {
            package: scheme.to_string(),
            output_dir: builder.output_dir().to_path_buf(),
            platforms: builder.platforms().to_vec(),
            frameworks: names,
            xcframeworks,
            steps: self.steps.clone(),
            total_ms: started.elapsed().as_millis(),
        })
    }

    fn build(&mut self, platform: Platform, line: &CommandLine) -> Result<()> {
        let builder = self.builder;
        let scheme = builder.scheme();
        let message = format!("Building '{scheme}' for {platform}");
        let spinner = if self.quiet {
            progress::hidden()
        } else {
            progress::spinner(&message)
        };
        match self.execute(line).context(message) {
            Ok(_) => {
                progress::finish_success(&spinner, &format!("Built '{scheme}' for {platform}"));
                Ok(())
            }
            Err(e) => {
                progress::finish_error(&spinner, &format!("Build for {platform} failed"));
                Err(e)
            }
        }
    }

    fn execute(&mut self, line: &CommandLine) -> Result<String> {
        metrics().increment("commands.executed");
        let result = self.runner.run(line);
        if result.is_err() {
            metrics().increment("commands.failed");
        }
        result
    }

    fn timed<T>(&mut self, step: &str, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        info!(step, "Starting step");
        let timer = Timer::start(step);
        let result = f(self);
        let duration = timer.stop();
        self.steps.push(StepTiming {
            step: step.to_string(),
            duration_ms: duration.as_millis(),
        });
        result
    }

    fn announce(&self, message: &str) {
        if !self.quiet {
            Status::info(message);
        }
    }
}
