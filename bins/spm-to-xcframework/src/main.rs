//! spm-to-xcframework
//!
//! Builds a Swift package for every requested platform with xcodebuild and
//! packages each of its modules as an XCFramework.

use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use spm_xcf_builder::platform::from_names;
use spm_xcf_builder::{
    parse_platform_list, BuilderOptions, CommandBuilder, DryRunRunner, Pipeline, PipelineReport,
};
use spm_xcf_cli::output::{format_count, format_duration, Status};
use spm_xcf_core::config::Config;
use spm_xcf_core::error::{exit_codes, Error, ErrorCode};
use spm_xcf_core::process::{command_exists, run_command, CommandRunner, ShellRunner};
use spm_xcf_telemetry::{metrics, TelemetryConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "spm-to-xcframework")]
#[command(about = "Build an XCFramework from a Swift package")]
#[command(version)]
struct Cli {
    /// Swift package (and scheme) name
    package_name: String,

    /// Output directory [default: ./<PACKAGE_NAME>-XCFrameworks]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Package root directory [default: current directory]
    #[arg(long)]
    path: Option<PathBuf>,

    /// Build with library evolution and emit module interfaces
    #[arg(long)]
    enable_library_evolution: bool,

    /// Open the output folder when done
    #[arg(long)]
    show_output: bool,

    /// Platforms to build, space separated: ios, simulator, watchos,
    /// watchsimulator (unknown names are ignored)
    #[arg(long, value_name = "LIST")]
    platforms: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    if let Err(e) = spm_xcf_telemetry::init_with_config(TelemetryConfig::from_verbosity(cli.verbose))
    {
        eprintln!("{} {}", "Warning:".yellow(), e);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_failure(&e, &cli.format),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let json = cli.format == "json";
    let cwd = std::env::current_dir()
        .map_err(|e| Error::io(format!("Failed to resolve the current directory: {e}")))?;
    let source_dir = cli.path.as_ref().map_or_else(|| cwd.clone(), |p| cwd.join(p));
    let config = Config::load(cli.config.as_deref(), &source_dir)?;
    let schema = &config.schema;

    let platforms = match &cli.platforms {
        Some(list) => parse_platform_list(list),
        None => from_names(schema.defaults.platforms.iter().map(String::as_str)),
    };

    let options = BuilderOptions {
        package_name: cli.package_name.clone(),
        output: cli.output.clone(),
        path: cli.path.clone(),
        enable_library_evolution: cli.enable_library_evolution
            || schema.defaults.enable_library_evolution,
        bitcode: schema.build.bitcode,
        configuration: schema.build.configuration.clone(),
        platforms,
    };
    let builder = CommandBuilder::new(options, &cwd);
    let show_output = cli.show_output || schema.defaults.show_output;

    tracing::info!(
        package = %builder.scheme(),
        source = %builder.source_dir().display(),
        output = %builder.output_dir().display(),
        platforms = ?builder.platforms(),
        config = ?config.path,
        "Resolved build"
    );

    if cli.dry_run {
        let runner = if json {
            DryRunRunner::silent()
        } else {
            Status::header(&format!("Commands for '{}'", builder.scheme()));
            DryRunRunner::new()
        };
        let (report, runner) = execute(&builder, runner, show_output, true)?;
        if json {
            let out = serde_json::json!({
                "dry_run": true,
                "report": report,
                "commands": runner.lines(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        return Ok(());
    }

    preflight();
    let runner = ShellRunner::new(&schema.build.shell);
    let (report, _) = execute(&builder, runner, show_output, json)?;

    if json {
        let out = serde_json::json!({
            "report": report,
            "telemetry": metrics().export_json(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&report, &builder);
    }

    Ok(())
}

fn execute<R: CommandRunner>(
    builder: &CommandBuilder,
    runner: R,
    show_output: bool,
    quiet: bool,
) -> spm_xcf_core::Result<(PipelineReport, R)> {
    let mut pipeline = Pipeline::new(builder, runner)
        .show_output(show_output)
        .quiet(quiet);
    let report = pipeline.run()?;
    Ok((report, pipeline.into_runner()))
}

/// Log the toolchain in use; a missing xcodebuild surfaces as the clean
/// step's failure
fn preflight() {
    if !command_exists("xcodebuild") {
        tracing::warn!("{}", Error::command_not_found("xcodebuild"));
        return;
    }
    if let Ok(result) = run_command("xcodebuild", &["-version"]) {
        let version = result.stdout.lines().next().unwrap_or("unknown").to_string();
        tracing::info!(xcode = %version, "Using toolchain");
    }
}

fn print_summary(report: &PipelineReport, builder: &CommandBuilder) {
    if report.xcframeworks.is_empty() {
        Status::warning(&format!(
            "No modules found in {}; nothing was packaged",
            builder
                .products_dir(builder.reference_platform())
                .display()
        ));
        return;
    }

    Status::success(&format!(
        "Created {} in {}",
        format_count(report.xcframeworks.len(), "XCFramework", "XCFrameworks"),
        format_duration(report.total())
    ));
    for path in &report.xcframeworks {
        println!("  {} {}", "→".green(), display_relative(path).dimmed());
    }
}

fn display_relative(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

fn report_failure(err: &anyhow::Error, format: &str) -> ExitCode {
    let core = err.downcast_ref::<Error>();

    if format == "json" {
        let report = core.map_or_else(
            || serde_json::json!({ "message": err.to_string() }),
            |e| serde_json::json!(e.to_report()),
        );
        println!("{}", serde_json::json!({ "error": report }));
    }

    match core.map(|e| e.code.category()) {
        Some("Process") => Status::error(&format!("Build failed with: {err}")),
        _ => Status::error(&format!("Error: {err}")),
    }

    let code = match core.map(|e| e.code) {
        Some(ErrorCode::ConfigError | ErrorCode::ConfigNotFound | ErrorCode::ConfigParseError) => {
            exit_codes::CONFIG_ERROR
        }
        _ => exit_codes::FAILURE,
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
