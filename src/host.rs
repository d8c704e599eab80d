//! Access to the external performance tools.
//!
//! Every check talks to the machine through the [`Host`] trait: run one
//! of the known [`Tool`]s and get its stdout back as text, ask how many
//! logical CPUs there are, and whether we run as root. [`LocalHost`] is
//! the real implementation; tests use a canned double instead.

use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use sysinfo::System;
use thiserror::Error;
use tracing::debug;

/// The external utilities perfcheck-rs knows how to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    Uptime,
    Dmesg,
    Vmstat,
    Mpstat,
    Pidstat,
    Iostat,
    Free,
    Sar,
    /// Process ranking lister
    Ps,
    /// Socket statistics summarizer
    Ss,
}

impl Tool {
    /// All tools in probe order.
    pub const ALL: [Tool; 10] = [
        Tool::Uptime,
        Tool::Dmesg,
        Tool::Vmstat,
        Tool::Mpstat,
        Tool::Pidstat,
        Tool::Iostat,
        Tool::Free,
        Tool::Sar,
        Tool::Ps,
        Tool::Ss,
    ];

    /// Executable name looked up in `PATH`.
    pub fn program(self) -> &'static str {
        match self {
            Tool::Uptime => "uptime",
            Tool::Dmesg => "dmesg",
            Tool::Vmstat => "vmstat",
            Tool::Mpstat => "mpstat",
            Tool::Pidstat => "pidstat",
            Tool::Iostat => "iostat",
            Tool::Free => "free",
            Tool::Sar => "sar",
            Tool::Ps => "ps",
            Tool::Ss => "ss",
        }
    }

    /// Distribution package that usually ships the tool.
    pub fn package(self) -> &'static str {
        match self {
            Tool::Uptime | Tool::Vmstat | Tool::Free | Tool::Ps => "procps",
            Tool::Mpstat | Tool::Pidstat | Tool::Iostat | Tool::Sar => "sysstat",
            Tool::Dmesg => "util-linux",
            Tool::Ss => "iproute2",
        }
    }

    /// Core tools are required at startup; the rest only disable the
    /// check (or part of a check) that needs them.
    pub fn is_core(self) -> bool {
        matches!(
            self,
            Tool::Uptime | Tool::Vmstat | Tool::Mpstat | Tool::Iostat | Tool::Free | Tool::Sar
        )
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Failure to obtain output from an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} not found (install {})", .tool.package())]
    NotFound { tool: Tool },
    #[error("{tool}: permission denied ({detail})")]
    PermissionDenied { tool: Tool, detail: String },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: Tool,
        status: String,
        stderr: String,
    },
    #[error("failed to run {tool}: {source}")]
    Io {
        tool: Tool,
        #[source]
        source: std::io::Error,
    },
}

/// The machine the report is generated for.
pub trait Host {
    /// Run `tool` with `args` and return its stdout.
    fn run(&self, tool: Tool, args: &[&str]) -> Result<String, ToolError>;

    /// Whether `tool` can be found in `PATH`.
    fn is_available(&self, tool: Tool) -> bool;

    /// Number of logical CPUs, if it can be determined.
    fn cpu_count(&self) -> Option<usize>;

    /// Whether we run with an effective uid of 0.
    fn is_privileged(&self) -> bool;
}

/// The local machine, reached through `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalHost;

impl Host for LocalHost {
    fn run(&self, tool: Tool, args: &[&str]) -> Result<String, ToolError> {
        debug!(tool = %tool, ?args, "running");
        let started = Instant::now();

        // Pin the C locale so numbers use '.', times are 24h and headers
        // keep their English column names.
        let output = Command::new(tool.program())
            .args(args)
            .env("LC_ALL", "C")
            .output()
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => ToolError::NotFound { tool },
                ErrorKind::PermissionDenied => ToolError::PermissionDenied {
                    tool,
                    detail: source.to_string(),
                },
                _ => ToolError::Io { tool, source },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(tool, output.status.to_string(), stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            tool = %tool,
            bytes = stdout.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished"
        );
        Ok(stdout)
    }

    fn is_available(&self, tool: Tool) -> bool {
        let found = env::var_os("PATH")
            .and_then(|path| find_in_path(tool.program(), &path))
            .is_some();
        debug!(tool = %tool, found, "probed");
        found
    }

    fn cpu_count(&self) -> Option<usize> {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        match sys.cpus().len() {
            0 => None,
            n => Some(n),
        }
    }

    fn is_privileged(&self) -> bool {
        unsafe { libc::geteuid() == 0 }
    }
}

/// First executable file named `program` in the `PATH`-style list `path`.
fn find_in_path(program: &str, path: &OsStr) -> Option<PathBuf> {
    env::split_paths(path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

/// Map a non-zero exit to a permission error when stderr says so.
fn classify_failure(tool: Tool, status: String, stderr: String) -> ToolError {
    let lower = stderr.to_lowercase();
    if lower.contains("operation not permitted") || lower.contains("permission denied") {
        ToolError::PermissionDenied {
            tool,
            detail: stderr,
        }
    } else {
        ToolError::Failed {
            tool,
            status,
            stderr,
        }
    }
}
