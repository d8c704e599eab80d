//! Command-line configuration for perfcheck-rs.
//!
//! This module defines all CLI arguments using `clap` for parsing.
//! Running without arguments performs the full, fixed sequence of checks
//! with 1-second sampling.

use clap::builder::TypedValueParser;
use clap::Parser;

use crate::checks::CheckKind;

/// One-shot Linux performance triage.
///
/// perfcheck-rs runs the classic command-line performance tools once,
/// in a fixed order, and flags the metrics that point at a bottleneck:
///
/// - load trend and kernel errors
/// - run queue, blocked tasks, swapping and idle CPU
/// - per-core imbalance and the busiest processes
/// - disk latency and utilization
/// - memory and swap pressure
/// - network throughput and TCP retransmits
///
/// # Examples
///
/// ```bash
/// # Full report (run as root to see the kernel log)
/// sudo perfcheck-rs
///
/// # Only memory and disk, 2-second samples
/// perfcheck-rs --only memory --only disk -i 2
///
/// # Keep a record of every finding
/// perfcheck-rs -c findings.csv
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Run the standard performance tools once and flag likely bottlenecks")]
pub struct Config {
    /// Sampling interval in seconds for vmstat, mpstat, pidstat, iostat and sar.
    ///
    /// Every sampling tool blocks for at least one interval, so the total
    /// run time grows linearly with this value.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Number of vmstat samples to display.
    ///
    /// The first vmstat row reports averages since boot; the analysis
    /// always uses the last row.
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(2..))]
    pub samples: u32,

    /// Number of processes listed by the per-process CPU check.
    #[arg(
        short,
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..).map(|n| n as usize)
    )]
    pub top: usize,

    /// Run only these checks (may be repeated).
    #[arg(long, value_enum)]
    pub only: Vec<CheckKind>,

    /// Skip these checks (may be repeated).
    #[arg(long, value_enum)]
    pub skip: Vec<CheckKind>,

    /// Append every finding to this CSV file.
    ///
    /// The file is created if it doesn't exist, and new rows are appended
    /// if it does (headers are only written once).
    #[arg(short = 'c', long)]
    pub csv_file: Option<String>,

    /// Disable colored output.
    ///
    /// Colors are also disabled automatically when stdout is not a
    /// terminal.
    #[arg(long)]
    pub no_color: bool,

    /// Log tool invocations and parse failures to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Sampling parameters shared by every check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sampling {
    /// Interval in seconds
    pub interval: u64,
    /// vmstat sample count
    pub samples: u32,
    /// Processes listed by the per-process check
    pub top: usize,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            interval: 1,
            samples: 3,
            top: 10,
        }
    }
}

impl Config {
    /// Sampling parameters for the checks.
    pub fn sampling(&self) -> Sampling {
        Sampling {
            interval: self.interval,
            samples: self.samples,
            top: self.top,
        }
    }

    /// Checks to run, in the fixed report order.
    pub fn selected_checks(&self) -> Vec<CheckKind> {
        CheckKind::ALL
            .into_iter()
            .filter(|kind| self.only.is_empty() || self.only.contains(kind))
            .filter(|kind| !self.skip.contains(kind))
            .collect()
    }
}
