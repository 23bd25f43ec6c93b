//! Running the npm executable.
//!
//! Extraction talks to npm through [`NpmExecutor`] so the reduction logic can
//! be driven by canned output in tests. [`NpmCli`] is the real implementation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use semver::Version;
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};

/// The npm subcommands this crate runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpmCommand {
    Ls,
    Config,
    Version,
}

impl NpmCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            NpmCommand::Ls => "ls",
            NpmCommand::Config => "config",
            NpmCommand::Version => "--version",
        }
    }
}

impl fmt::Display for NpmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an npm invocation produced.
///
/// A failed invocation still carries whatever it wrote to stdout; npm often
/// exits non-zero from `ls` while printing a usable tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Set when the process could not be started or exited non-zero.
    pub failure: Option<String>,
}

impl CommandOutput {
    /// Returns stdout, or the failure as an [`ExtractError::NpmFailed`].
    pub fn into_stdout(self) -> Result<Vec<u8>> {
        match self.failure {
            Some(failure) => Err(ExtractError::NpmFailed(failure)),
            None => Ok(self.stdout),
        }
    }
}

/// Runs npm subcommands.
pub trait NpmExecutor {
    /// Runs `npm <command> <args...>` in `working_dir` (or the current
    /// directory when `None`).
    fn run(&self, command: NpmCommand, working_dir: Option<&Path>, args: &[String])
        -> CommandOutput;
}

/// The npm executable on this machine.
#[derive(Debug, Clone)]
pub struct NpmCli {
    executable: PathBuf,
}

impl NpmCli {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Finds `npm` on the `PATH`.
    pub fn locate() -> Result<Self> {
        let executable = which::which("npm").map_err(|e| {
            ExtractError::NpmFailed(format!(
                "could not find the 'npm' executable in the system PATH: {e}"
            ))
        })?;
        debug!("Using npm executable: {}", executable.display());
        Ok(Self::new(executable))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl NpmExecutor for NpmCli {
    fn run(
        &self,
        command: NpmCommand,
        working_dir: Option<&Path>,
        args: &[String],
    ) -> CommandOutput {
        let args = command_args(command, args);
        debug!("Running npm {} command.", command);

        let mut process = Command::new(&self.executable);
        process.args(&args);
        if let Some(dir) = working_dir {
            process.current_dir(dir);
        }

        let command_line = format!("{} {}", self.executable.display(), args.join(" "));
        match process.output() {
            Ok(output) => {
                let failure = (!output.status.success()).then(|| {
                    format!(
                        "error while running the command: '{}'\nError output is:\n{}\nCommand error: {}",
                        command_line,
                        String::from_utf8_lossy(&output.stderr),
                        output.status
                    )
                });
                if failure.is_none() {
                    debug!(
                        "npm {} standard output is:\n{}",
                        command,
                        String::from_utf8_lossy(&output.stdout)
                    );
                }
                CommandOutput {
                    stdout: output.stdout,
                    stderr: output.stderr,
                    failure,
                }
            }
            Err(e) => CommandOutput {
                failure: Some(format!(
                    "error while running the command: '{}': {}",
                    command_line, e
                )),
                ..Default::default()
            },
        }
    }
}

/// Builds the argument list: the subcommand, then the non-blank caller args.
pub fn command_args(command: NpmCommand, args: &[String]) -> Vec<String> {
    std::iter::once(command.as_str().to_string())
        .chain(
            args.iter()
                .filter(|arg| !arg.trim().is_empty())
                .cloned(),
        )
        .collect()
}

/// Appends the flags `npm ls` needs to print the full tree as JSON.
///
/// They go last so caller-supplied args cannot override them.
pub fn ls_args(args: &[String]) -> Vec<String> {
    let mut args = args.to_vec();
    args.extend(["--json", "--all", "--long"].map(String::from));
    args
}

/// Asks npm for its own version.
pub fn npm_version(npm: &dyn NpmExecutor) -> Result<Version> {
    let stdout = npm.run(NpmCommand::Version, None, &[]).into_stdout()?;
    let output = String::from_utf8_lossy(&stdout).trim().to_string();
    let version = Version::parse(&output).map_err(|source| ExtractError::InvalidNpmVersion {
        output: output.clone(),
        source,
    })?;
    debug!("Using npm version: {}", version);
    Ok(version)
}

/// Returns npm's `_cacache` directory for the project.
///
/// Runs `npm config get cache <args> --json=false` and fails if the reported
/// directory has no `_cacache` inside it.
pub fn config_cache_dir(npm: &dyn NpmExecutor, project_dir: &Path, args: &[String]) -> Result<PathBuf> {
    let mut config_args = vec!["get".to_string(), "cache".to_string()];
    config_args.extend_from_slice(args);
    config_args.push("--json=false".to_string());

    let output = npm.run(NpmCommand::Config, Some(project_dir), &config_args);
    if !output.stderr.is_empty() {
        warn!(
            "npm config get cache printed to stderr:\n{}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    let stdout = output.into_stdout()?;

    let cache_path = PathBuf::from(String::from_utf8_lossy(&stdout).trim()).join("_cacache");
    if !cache_path.is_dir() {
        return Err(ExtractError::CacheDirMissing { path: cache_path });
    }
    Ok(cache_path)
}
