//! # perfcheck-rs
//!
//! A one-shot performance triage report for Linux servers.
//!
//! ## Overview
//!
//! `perfcheck-rs` runs the classic command-line performance tools once, in
//! a fixed order, and classifies what they report. Each check invokes one
//! tool, parses its output and prints colored verdicts as soon as it
//! finishes, so an operator gets a quick first look at whether a slow
//! machine is short of:
//!
//! - CPU (load above the core count, run queue, low idle, one hot core)
//! - Disk (high average wait, saturated devices, blocked tasks)
//! - Memory (low available memory, swap in use or swapping)
//! - Network (heavy interface traffic, TCP retransmits)
//!
//! ## Usage
//!
//! ```bash
//! # Full report
//! sudo perfcheck-rs
//!
//! # Longer samples, no colors, keep the findings
//! perfcheck-rs -i 5 --no-color -c findings.csv
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: CLI argument parsing
//! - [`host`]: running the external tools
//! - [`availability`]: which tools are installed
//! - [`parsers`]: tool output to [`samples`]
//! - [`analysis`] and [`thresholds`]: classification
//! - [`checks`]: the nine checks
//! - [`report`]: rendering and CSV export

mod analysis;
mod availability;
mod checks;
mod config;
mod host;
mod parsers;
mod report;
mod samples;
mod thresholds;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use availability::ToolAvailability;
use checks::{run_check, CheckContext};
use config::Config;
use host::{Host, LocalHost};
use report::{Painter, Report};
use thresholds::Thresholds;

fn main() -> ExitCode {
    // Platform check - warn on non-Linux systems
    #[cfg(not(target_os = "linux"))]
    {
        eprintln!("WARNING: perfcheck-rs is designed for Linux systems only.");
        eprintln!("The sysstat and procps tools it drives may be missing or");
        eprintln!("print a different format; most checks will be skipped.");
        eprintln!();
    }

    let config = Config::parse();
    init_tracing(config.verbose);

    let host = LocalHost;
    let availability = ToolAvailability::probe(&host);

    let missing = availability.missing_core();
    if !missing.is_empty() {
        eprintln!("Required tools are missing:");
        for tool in missing {
            eprintln!("  {} (install {})", tool, tool.package());
        }
        return ExitCode::from(1);
    }

    let painter = Painter {
        color: !config.no_color && is_terminal(),
    };
    for warning in availability.get_warnings() {
        eprintln!("Warning: {}", warning);
    }

    let thresholds = Thresholds::default();
    let cpu_count = host.cpu_count();
    let ctx = CheckContext {
        host: &host,
        availability: &availability,
        thresholds: &thresholds,
        sampling: config.sampling(),
        cpu_count,
    };

    let mut report = Report::new(cpu_count, availability.privileged);
    if let Err(e) = run_report(&config, &ctx, &mut report, painter) {
        // A closed pipe ends the output early; findings are still exported.
        error!(error = %e, "failed to write report");
    }

    if let Some(path) = &config.csv_file {
        match report::append_findings(path, &report) {
            Ok(rows) => info!(path = %path, rows, "exported findings"),
            Err(e) => {
                error!(error = %e, "csv export failed");
                eprintln!("Warning: could not write {}: {}", path, e);
            }
        }
    }

    ExitCode::SUCCESS
}

/// Run the selected checks in order, printing each section as it completes.
fn run_report(
    config: &Config,
    ctx: &CheckContext<'_>,
    report: &mut Report,
    painter: Painter,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    report::render_banner(&mut out, report, painter)?;
    out.flush()?;

    for kind in config.selected_checks() {
        info!(check = kind.name(), "running check");
        let section = run_check(kind, ctx);
        info!(check = kind.name(), worst = ?section.worst(), "check finished");
        report::render_section(&mut out, &section, painter)?;
        out.flush()?;
        report.sections.push(section);
    }

    report::render_summary(&mut out, report, painter)?;
    out.flush()
}

/// Log to stderr; `RUST_LOG` overrides the level picked by `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Check if stdout is connected to a terminal.
fn is_terminal() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) != 0 }
}
