//! Classification of samples into verdicts.
//!
//! Nothing in here touches the machine: each function maps a sample from
//! [`crate::samples`] (plus the CPU count and [`Thresholds`] where needed)
//! to a small verdict type that the checks turn into report lines.

use std::cmp::Ordering;
use std::fmt;

use crate::samples::{CpuCoreSample, LoadSample, MemorySample, ProcessCpuSample, VmstatSample};
use crate::thresholds::{Severity, Thresholds};

/// Direction the load averages are moving in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadTrend {
    /// 1-minute average above the 5-minute one
    Increasing,
    /// 5-minute average above the 15-minute one
    IncreasingEstablished,
    /// 1-minute average below the 5-minute one
    Decreasing,
    Stable,
}

impl LoadTrend {
    pub fn describe(self) -> &'static str {
        match self {
            LoadTrend::Increasing => "increasing",
            LoadTrend::IncreasingEstablished => "increasing (established)",
            LoadTrend::Decreasing => "decreasing",
            LoadTrend::Stable => "stable",
        }
    }
}

/// Classify the load trend. The first matching rule wins.
pub fn load_trend(load: &LoadSample) -> LoadTrend {
    if load.one > load.five {
        LoadTrend::Increasing
    } else if load.five > load.fifteen {
        LoadTrend::IncreasingEstablished
    } else if load.one < load.five {
        LoadTrend::Decreasing
    } else {
        LoadTrend::Stable
    }
}

/// A load exactly equal to the CPU count is still within capacity.
pub fn is_overloaded(load: &LoadSample, cpus: usize) -> bool {
    load.one > cpus as f64
}

/// What one vmstat row says about the system.
#[derive(Clone, Debug, PartialEq)]
pub struct VmstatVerdict {
    /// Run queue longer than the CPU count (`None` without a CPU count)
    pub cpu_queueing: Option<bool>,
    /// Processes blocked in uninterruptible sleep
    pub io_blocked: bool,
    /// Any swap-in or swap-out activity
    pub swapping: bool,
    /// Idle CPU classification
    pub idle: Severity,
}

pub fn classify_vmstat(
    sample: &VmstatSample,
    cpus: Option<usize>,
    thresholds: &Thresholds,
) -> VmstatVerdict {
    VmstatVerdict {
        cpu_queueing: cpus.map(|n| sample.run_queue > n as u64),
        io_blocked: sample.blocked > 0,
        swapping: sample.swap_in > 0 || sample.swap_out > 0,
        idle: thresholds.idle_severity(sample.idle),
    }
}

/// The busiest and idlest cores of one mpstat sample.
#[derive(Clone, Debug, PartialEq)]
pub struct CoreSpread {
    pub busiest: CpuCoreSample,
    pub idlest: CpuCoreSample,
}

impl CoreSpread {
    /// Busy percentage points between the busiest and idlest core.
    pub fn spread(&self) -> f64 {
        self.busiest.busy - self.idlest.busy
    }
}

/// Find the busiest and idlest cores; on ties the first core seen wins.
pub fn core_spread(cores: &[CpuCoreSample]) -> Option<CoreSpread> {
    let first = cores.first()?;
    let mut busiest = first;
    let mut idlest = first;
    for core in &cores[1..] {
        if core.busy > busiest.busy {
            busiest = core;
        }
        if core.busy < idlest.busy {
            idlest = core;
        }
    }
    Some(CoreSpread {
        busiest: busiest.clone(),
        idlest: idlest.clone(),
    })
}

/// How evenly work is spread across cores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuBalance {
    /// A hot core next to idle ones: poor thread scaling
    Severe,
    Moderate,
    Balanced,
}

impl CpuBalance {
    pub fn severity(self) -> Severity {
        match self {
            CpuBalance::Severe => Severity::Critical,
            CpuBalance::Moderate => Severity::Warning,
            CpuBalance::Balanced => Severity::Normal,
        }
    }
}

pub fn cpu_balance(spread: &CoreSpread, thresholds: &Thresholds) -> CpuBalance {
    let gap = spread.spread();
    if spread.busiest.busy > thresholds.core_busy_severe_pct && gap > thresholds.core_spread_severe
    {
        CpuBalance::Severe
    } else if gap > thresholds.core_spread_moderate {
        CpuBalance::Moderate
    } else {
        CpuBalance::Balanced
    }
}

/// A percentage with one decimal, truncated rather than rounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percent {
    tenths: u64,
}

impl Percent {
    /// `part * 100 / total`, truncated to one decimal. `None` when `total` is 0.
    pub fn of(part: u64, total: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let tenths = (part as u128 * 1000 / total as u128) as u64;
        Some(Self { tenths })
    }

    pub fn as_f64(self) -> f64 {
        self.tenths as f64 / 10.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}%", self.tenths / 10, self.tenths % 10)
    }
}

/// Memory shares derived from one `free` sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemoryUsage {
    pub used: Percent,
    pub cache: Percent,
    pub available: Percent,
}

/// `None` when the total is zero.
pub fn memory_usage(mem: &MemorySample) -> Option<MemoryUsage> {
    Some(MemoryUsage {
        used: Percent::of(mem.used, mem.total)?,
        cache: Percent::of(mem.cache, mem.total)?,
        available: Percent::of(mem.available, mem.total)?,
    })
}

/// The three distinct swap situations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SwapStatus {
    NotConfigured,
    /// Swap exists but nothing is in it
    Unused,
    InUse { used: Percent, severity: Severity },
}

pub fn swap_status(mem: &MemorySample, thresholds: &Thresholds) -> SwapStatus {
    match Percent::of(mem.swap_used, mem.swap_total) {
        None => SwapStatus::NotConfigured,
        Some(_) if mem.swap_used == 0 => SwapStatus::Unused,
        Some(used) => SwapStatus::InUse {
            used,
            severity: thresholds.swap_used_severity(used.as_f64()),
        },
    }
}

/// Loopback interfaces are excluded by name prefix.
pub fn is_loopback(interface: &str) -> bool {
    interface.starts_with("lo")
}

/// The `n` processes with the highest total CPU, busiest first.
pub fn top_processes(mut procs: Vec<ProcessCpuSample>, n: usize) -> Vec<ProcessCpuSample> {
    procs.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    procs.truncate(n);
    procs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(one: f64, five: f64, fifteen: f64) -> LoadSample {
        LoadSample { one, five, fifteen }
    }

    fn core(core: u32, busy: f64) -> CpuCoreSample {
        CpuCoreSample { core, busy }
    }

    #[test]
    fn load_trend_follows_rule_priority() {
        assert_eq!(load_trend(&load(2.5, 1.8, 1.2)), LoadTrend::Increasing);
        // 1m > 5m wins even when 5m < 15m
        assert_eq!(load_trend(&load(2.0, 1.0, 3.0)), LoadTrend::Increasing);
        assert_eq!(
            load_trend(&load(1.0, 1.5, 1.2)),
            LoadTrend::IncreasingEstablished
        );
        assert_eq!(load_trend(&load(0.5, 1.0, 1.0)), LoadTrend::Decreasing);
        assert_eq!(load_trend(&load(1.0, 1.0, 1.0)), LoadTrend::Stable);
        // 5m == 15m and 1m == 5m falls through to stable
        assert_eq!(load_trend(&load(0.0, 0.0, 2.0)), LoadTrend::Stable);
    }

    #[test]
    fn every_load_triple_gets_exactly_one_trend() {
        let values = [0.0, 0.5, 1.0, 1.5, 4.0];
        for &a in &values {
            for &b in &values {
                for &c in &values {
                    let trend = load_trend(&load(a, b, c));
                    let expected = if a > b {
                        LoadTrend::Increasing
                    } else if b > c {
                        LoadTrend::IncreasingEstablished
                    } else if a < b {
                        LoadTrend::Decreasing
                    } else {
                        LoadTrend::Stable
                    };
                    assert_eq!(trend, expected, "{a} {b} {c}");
                }
            }
        }
    }

    #[test]
    fn overload_flips_just_past_the_cpu_count() {
        assert!(!is_overloaded(&load(2.5, 1.8, 1.2), 4));
        assert!(!is_overloaded(&load(4.0, 1.0, 1.0), 4));
        assert!(is_overloaded(&load(4.01, 1.0, 1.0), 4));
    }

    #[test]
    fn vmstat_flags_each_condition_independently() {
        let t = Thresholds::default();
        let sample = VmstatSample {
            run_queue: 5,
            blocked: 1,
            swap_in: 0,
            swap_out: 4,
            idle: 8.0,
            ..Default::default()
        };
        let verdict = classify_vmstat(&sample, Some(4), &t);
        assert_eq!(verdict.cpu_queueing, Some(true));
        assert!(verdict.io_blocked);
        assert!(verdict.swapping);
        assert_eq!(verdict.idle, Severity::Critical);

        let quiet = VmstatSample {
            run_queue: 4,
            idle: 95.0,
            ..Default::default()
        };
        let verdict = classify_vmstat(&quiet, None, &t);
        assert_eq!(verdict.cpu_queueing, None);
        assert!(!verdict.io_blocked);
        assert!(!verdict.swapping);
        assert_eq!(verdict.idle, Severity::Normal);
        assert_eq!(
            classify_vmstat(&quiet, Some(4), &t).cpu_queueing,
            Some(false)
        );
    }

    #[test]
    fn hot_core_with_wide_spread_is_severe() {
        let spread = core_spread(&[core(0, 85.0), core(1, 20.0), core(2, 40.0)]).unwrap();
        assert_eq!(spread.busiest.core, 0);
        assert_eq!(spread.idlest.core, 1);
        assert_eq!(
            cpu_balance(&spread, &Thresholds::default()),
            CpuBalance::Severe
        );
    }

    #[test]
    fn balance_boundaries_are_strict() {
        let t = Thresholds::default();
        // max exactly 80 is not "above 80"
        let spread = core_spread(&[core(0, 80.0), core(1, 10.0)]).unwrap();
        assert_eq!(cpu_balance(&spread, &t), CpuBalance::Moderate);
        // spread exactly 30 is balanced
        let spread = core_spread(&[core(0, 50.0), core(1, 20.0)]).unwrap();
        assert_eq!(cpu_balance(&spread, &t), CpuBalance::Balanced);
        // spread exactly 50 with a hot core is only moderate
        let spread = core_spread(&[core(0, 90.0), core(1, 40.0)]).unwrap();
        assert_eq!(cpu_balance(&spread, &t), CpuBalance::Moderate);
    }

    #[test]
    fn first_core_wins_ties() {
        let spread = core_spread(&[core(3, 50.0), core(1, 50.0), core(2, 50.0)]).unwrap();
        assert_eq!(spread.busiest.core, 3);
        assert_eq!(spread.idlest.core, 3);
        assert!(core_spread(&[]).is_none());
    }

    #[test]
    fn percentages_truncate_to_one_decimal() {
        assert_eq!(Percent::of(2, 3).unwrap().to_string(), "66.6%");
        assert_eq!(Percent::of(1, 8).unwrap().to_string(), "12.5%");
        assert_eq!(Percent::of(5300, 16000).unwrap().as_f64(), 33.1);
        assert_eq!(Percent::of(0, 10).unwrap().to_string(), "0.0%");
        assert!(Percent::of(1, 0).is_none());
    }

    #[test]
    fn available_share_matches_truncated_formula() {
        for (available, total) in [(8u64, 100u64), (1, 3), (999, 1000), (12345, 65536)] {
            let expected = (available * 1000 / total) as f64 / 10.0;
            let mem = MemorySample {
                total,
                available,
                ..Default::default()
            };
            assert_eq!(memory_usage(&mem).unwrap().available.as_f64(), expected);
        }
    }

    #[test]
    fn zero_total_memory_has_no_usage() {
        assert!(memory_usage(&MemorySample::default()).is_none());
    }

    #[test]
    fn swap_has_three_distinct_outcomes() {
        let t = Thresholds::default();
        let mut mem = MemorySample::default();
        assert_eq!(swap_status(&mem, &t), SwapStatus::NotConfigured);

        mem.swap_total = 2048;
        assert_eq!(swap_status(&mem, &t), SwapStatus::Unused);

        mem.swap_used = 1536;
        match swap_status(&mem, &t) {
            SwapStatus::InUse { used, severity } => {
                assert_eq!(used.to_string(), "75.0%");
                assert_eq!(severity, Severity::Critical);
            }
            other => panic!("unexpected {other:?}"),
        }

        mem.swap_used = 100;
        assert!(matches!(
            swap_status(&mem, &t),
            SwapStatus::InUse {
                severity: Severity::Normal,
                ..
            }
        ));
    }

    #[test]
    fn loopback_is_matched_by_prefix() {
        assert!(is_loopback("lo"));
        assert!(is_loopback("lo0"));
        assert!(!is_loopback("eth0"));
    }

    #[test]
    fn top_processes_are_sorted_and_capped() {
        let p = |pid: u32, total: f64| ProcessCpuSample {
            pid,
            command: format!("p{pid}"),
            user: total,
            system: 0.0,
            total,
        };
        let top = top_processes(vec![p(1, 3.0), p(2, 90.0), p(3, 11.0)], 2);
        let pids: Vec<u32> = top.iter().map(|p| p.pid).collect();
        assert_eq!(pids, [2, 3]);
    }
}
