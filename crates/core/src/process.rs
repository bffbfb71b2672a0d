//! Process execution utilities
//!
//! Commands are built as structured [`Invocation`]s (program plus argument
//! vector) and grouped into a [`CommandLine`]. A command line renders to a
//! single POSIX shell line in which every argument is quoted, so package
//! names and paths can never change the meaning of the command.
//!
//! Execution goes through the [`CommandRunner`] trait. [`ShellRunner`] is the
//! real implementation; tests substitute their own.

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Shell used when none is configured
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Result of a command execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// Exit code of the command
    pub exit_code: i32,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandResult {
    /// Create from `std::process::Output`
    #[must_use]
    pub fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Get combined output (stdout + stderr)
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Quote a single word for a POSIX shell
///
/// Words made only of characters the shell never interprets are returned
/// as-is; everything else is wrapped in single quotes.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    let is_plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-+=@%:,./".contains(c));

    if is_plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// One program invocation: a program, its arguments, an optional stdout
/// redirect target and an optional file that must exist for it to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    stdout_to: Option<PathBuf>,
    requires_file: Option<PathBuf>,
}

impl Invocation {
    /// Start an invocation of `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout_to: None,
            requires_file: None,
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument
    #[must_use]
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        self.arg(path.as_ref().display().to_string())
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Write the invocation's stdout to `path` instead of the captured stream
    #[must_use]
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_to = Some(path.into());
        self
    }

    /// Run only if `path` is an existing regular file; a missing file skips
    /// the invocation without failing the line
    #[must_use]
    pub fn only_if_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.requires_file = Some(path.into());
        self
    }

    /// The file this invocation is conditional on, if any
    #[must_use]
    pub fn required_file(&self) -> Option<&Path> {
        self.requires_file.as_deref()
    }

    /// The program being invoked
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument vector, unquoted
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.requires_file {
            write!(f, "if [ -f {} ]; then ", shell_quote(&file.display().to_string()))?;
        }
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        if let Some(target) = &self.stdout_to {
            write!(f, " > {}", shell_quote(&target.display().to_string()))?;
        }
        if self.requires_file.is_some() {
            f.write_str("; fi")?;
        }
        Ok(())
    }
}

/// A sequence of invocations run one after another, stopping at the first
/// failure, optionally from a working directory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandLine {
    working_dir: Option<PathBuf>,
    invocations: Vec<Invocation>,
}

impl CommandLine {
    /// An empty command line
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A command line with exactly one invocation
    #[must_use]
    pub fn single(invocation: Invocation) -> Self {
        Self::new().then(invocation)
    }

    /// Run the whole line from `dir`
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Append an invocation that runs only if everything before it succeeded
    #[must_use]
    pub fn then(mut self, invocation: Invocation) -> Self {
        self.invocations.push(invocation);
        self
    }

    /// Working directory, if any
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// The invocations in execution order
    #[must_use]
    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    /// Render as a single shell line
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if let Some(dir) = &self.working_dir {
            write!(f, "cd {}", shell_quote(&dir.display().to_string()))?;
            first = false;
        }
        for invocation in &self.invocations {
            if !first {
                f.write_str(" && ")?;
            }
            write!(f, "{invocation}")?;
            first = false;
        }
        Ok(())
    }
}

/// Executes command lines and returns their captured output
pub trait CommandRunner {
    /// Run `line` to completion
    ///
    /// Returns the combined stdout/stderr text on success, or
    /// [`Error::command_failed`] carrying that text and the exit code when the
    /// command exits non-zero.
    fn run(&mut self, line: &CommandLine) -> Result<String>;
}

/// Runs command lines through a POSIX shell with stderr merged into stdout
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl ShellRunner {
    /// Use `shell` (invoked as `<shell> -c <line>`)
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// The shell this runner invokes
    #[must_use]
    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, line: &CommandLine) -> Result<String> {
        let rendered = line.render();
        tracing::debug!(shell = %self.shell.display(), command = %rendered, "Running command");

        // Redirect the shell's stderr onto stdout so both streams interleave
        // in one capture, in the order the tools wrote them.
        let script = format!("exec 2>&1\n{rendered}");
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                Error::process(format!("Failed to execute {}: {e}", self.shell.display()))
                    .with_context(rendered.clone())
                    .with_source(e)
            })?;

        let result = CommandResult::from_output(output);
        let text = result.combined_output();
        if !result.success {
            tracing::debug!(exit_code = result.exit_code, "Command failed");
            return Err(Error::command_failed(result.exit_code, text).with_context(rendered));
        }

        Ok(text)
    }
}

/// Run a command and capture output
pub fn run_command(program: &str, args: &[&str]) -> Result<CommandResult> {
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::process(format!("Failed to execute {program}: {e}")))?;

    Ok(CommandResult::from_output(output))
}

/// Check if a command exists in PATH
#[must_use]
pub fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote_plain_words() {
        assert_eq!(shell_quote("xcodebuild"), "xcodebuild");
        assert_eq!(shell_quote("generic/platform=iOS"), "generic/platform=iOS");
        assert_eq!(shell_quote("/tmp/out/.build"), "/tmp/out/.build");
    }

    #[test]
    fn test_shell_quote_special_words() {
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("x86_64 arm64"), "'x86_64 arm64'");
        assert_eq!(shell_quote("*.o"), "'*.o'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("a;rm -rf /"), "'a;rm -rf /'");
    }

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("find")
            .path_arg("/tmp/Release-iphoneos")
            .args(["-maxdepth", "1", "-name", "*.o"]);
        assert_eq!(inv.to_string(), "find /tmp/Release-iphoneos -maxdepth 1 -name '*.o'");
        assert_eq!(inv.program(), "find");
        assert_eq!(inv.arguments().len(), 5);
    }

    #[test]
    fn test_invocation_redirect() {
        let inv = Invocation::new("printf")
            .arg("%s\n")
            .arg("x")
            .stdout_to("/tmp/My Lib/module.modulemap");
        assert_eq!(
            inv.to_string(),
            "printf '%s\n' x > '/tmp/My Lib/module.modulemap'"
        );
    }

    #[test]
    fn test_invocation_conditional_on_file() {
        let inv = Invocation::new("printf")
            .arg("x")
            .stdout_to("/tmp/out")
            .only_if_file("/tmp/My Lib/h.h");
        assert_eq!(
            inv.to_string(),
            "if [ -f '/tmp/My Lib/h.h' ]; then printf x > /tmp/out; fi"
        );
        assert_eq!(inv.required_file(), Some(Path::new("/tmp/My Lib/h.h")));
    }

    #[test]
    fn test_conditional_invocation_skips_without_failing() {
        let dir = tempfile::TempDir::new().unwrap();
        let present = dir.path().join("present");
        std::fs::write(&present, "").unwrap();
        let written = dir.path().join("written");
        let skipped = dir.path().join("skipped");

        let line = CommandLine::new()
            .then(
                Invocation::new("echo")
                    .arg("yes")
                    .stdout_to(&written)
                    .only_if_file(&present),
            )
            .then(
                Invocation::new("echo")
                    .arg("no")
                    .stdout_to(&skipped)
                    .only_if_file(dir.path().join("missing")),
            )
            .then(Invocation::new("echo").arg("after"));

        let output = ShellRunner::default().run(&line).unwrap();
        assert_eq!(output, "after\n");
        assert!(written.exists());
        assert!(!skipped.exists());
    }

    #[test]
    fn test_command_line_chains_with_and() {
        let line = CommandLine::single(Invocation::new("mkdir").args(["-p", "a"]))
            .then(Invocation::new("touch").arg("a/b"))
            .in_dir("/src");
        assert_eq!(line.render(), "cd /src && mkdir -p a && touch a/b");
        assert_eq!(line.working_dir(), Some(Path::new("/src")));
        assert_eq!(line.invocations().len(), 2);
    }

    #[test]
    fn test_shell_runner_captures_output() {
        let mut runner = ShellRunner::default();
        let line = CommandLine::single(Invocation::new("echo").arg("hello"));
        let output = runner.run(&line).unwrap();
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn test_shell_runner_merges_stderr() {
        let mut runner = ShellRunner::default();
        let line = CommandLine::single(
            Invocation::new("sh").args(["-c", "echo out; echo err 1>&2"]),
        );
        let output = runner.run(&line).unwrap();
        assert!(output.contains("out"));
        assert!(output.contains("err"));
    }

    #[test]
    fn test_shell_runner_reports_exit_code_and_output() {
        let mut runner = ShellRunner::default();
        let line = CommandLine::single(
            Invocation::new("sh").args(["-c", "echo broken 1>&2; exit 3"]),
        );
        let err = runner.run(&line).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::CommandFailed);
        assert_eq!(err.exit_code, Some(3));
        assert!(err.output.unwrap().contains("broken"));
    }

    #[test]
    fn test_shell_runner_does_not_expand_arguments() {
        let mut runner = ShellRunner::default();
        let line = CommandLine::single(Invocation::new("echo").arg("$HOME; echo injected"));
        let output = runner.run(&line).unwrap();
        assert_eq!(output, "$HOME; echo injected\n");
    }

    #[test]
    fn test_shell_runner_missing_shell() {
        let mut runner = ShellRunner::new("/nonexistent/shell");
        let line = CommandLine::single(Invocation::new("true"));
        let err = runner.run(&line).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::ProcessError);
    }

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("nonexistent_command_12345"));
    }

    #[test]
    fn test_run_command_echo() {
        let result = run_command("echo", &["hello"]).unwrap();
        assert!(result.success);
        assert!(result.stdout.contains("hello"));
    }

    #[test]
    fn test_command_result_combined_output() {
        let result = CommandResult {
            success: true,
            exit_code: 0,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert!(result.combined_output().contains("out"));
        assert!(result.combined_output().contains("err"));
    }
}
