//! Threshold definitions for perfcheck-rs.
//!
//! This module defines severity levels and the static threshold values
//! each check compares its extracted metrics against. Every boundary is
//! strict: a value sitting exactly on a threshold stays in the lower
//! bucket.

use serde::Serialize;

/// Severity level for a finding.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Normal operating range
    #[default]
    Normal,
    /// Approaching problematic levels
    Warning,
    /// Critical - immediate attention needed
    Critical,
    /// Not enough data to classify
    Unknown,
}

impl Severity {
    /// Short uppercase tag shown in front of a verdict.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Normal => "OK",
            Severity::Warning => "WARN",
            Severity::Critical => "CRIT",
            Severity::Unknown => "????",
        }
    }

    /// Sort rank used by the summary (critical first).
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
            Severity::Unknown => 2,
            Severity::Normal => 3,
        }
    }
}

/// Threshold configuration for all classified metrics.
#[derive(Clone, Debug)]
pub struct Thresholds {
    /// vmstat idle CPU below this is critical (%)
    pub idle_critical_pct: f64,
    /// vmstat idle CPU below this is elevated (%)
    pub idle_warning_pct: f64,
    /// Busiest core above this, combined with a wide spread, is severe (%)
    pub core_busy_severe_pct: f64,
    /// Busy spread between cores above this is severe when a core is hot (points)
    pub core_spread_severe: f64,
    /// Busy spread between cores above this is moderate (points)
    pub core_spread_moderate: f64,
    /// Disk average wait warning threshold (ms)
    pub disk_await_warning_ms: f64,
    /// Disk average wait critical threshold (ms)
    pub disk_await_critical_ms: f64,
    /// Disk utilization warning threshold (%)
    pub disk_util_warning_pct: f64,
    /// Disk utilization critical threshold (%)
    pub disk_util_critical_pct: f64,
    /// Available memory below this is elevated (%)
    pub mem_available_warning_pct: f64,
    /// Available memory below this is critical (%)
    pub mem_available_critical_pct: f64,
    /// Swap used above this is moderate pressure (%)
    pub swap_used_warning_pct: f64,
    /// Swap used above this is high pressure (%)
    pub swap_used_critical_pct: f64,
    /// Interface throughput in either direction above this is significant (KB/s)
    pub net_throughput_warning_kbps: f64,
    /// Interface throughput in either direction above this is very high (KB/s)
    pub net_throughput_critical_kbps: f64,
    /// TCP retransmits per second warning threshold
    pub retrans_warning_per_sec: f64,
    /// TCP retransmits per second critical threshold
    pub retrans_critical_per_sec: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            idle_critical_pct: 10.0,
            idle_warning_pct: 30.0,
            core_busy_severe_pct: 80.0,
            core_spread_severe: 50.0,
            core_spread_moderate: 30.0,
            disk_await_warning_ms: 10.0,
            disk_await_critical_ms: 20.0,
            disk_util_warning_pct: 70.0,
            disk_util_critical_pct: 90.0,
            mem_available_warning_pct: 20.0,
            mem_available_critical_pct: 10.0,
            swap_used_warning_pct: 10.0,
            swap_used_critical_pct: 50.0,
            net_throughput_warning_kbps: 10_000.0,
            net_throughput_critical_kbps: 50_000.0,
            retrans_warning_per_sec: 2.0,
            retrans_critical_per_sec: 10.0,
        }
    }
}

/// Classify a value where higher is worse.
fn above(value: f64, warning: f64, critical: f64) -> Severity {
    if value > critical {
        Severity::Critical
    } else if value > warning {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

/// Classify a value where lower is worse.
fn below(value: f64, warning: f64, critical: f64) -> Severity {
    if value < critical {
        Severity::Critical
    } else if value < warning {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

impl Thresholds {
    /// Evaluate idle CPU severity (inverted - low is bad).
    pub fn idle_severity(&self, idle_pct: f64) -> Severity {
        below(idle_pct, self.idle_warning_pct, self.idle_critical_pct)
    }

    /// Evaluate disk average wait severity.
    pub fn disk_await_severity(&self, await_ms: f64) -> Severity {
        above(
            await_ms,
            self.disk_await_warning_ms,
            self.disk_await_critical_ms,
        )
    }

    /// Evaluate disk utilization severity.
    pub fn disk_util_severity(&self, util_pct: f64) -> Severity {
        above(
            util_pct,
            self.disk_util_warning_pct,
            self.disk_util_critical_pct,
        )
    }

    /// Evaluate available memory severity (inverted - low is bad).
    pub fn mem_available_severity(&self, available_pct: f64) -> Severity {
        below(
            available_pct,
            self.mem_available_warning_pct,
            self.mem_available_critical_pct,
        )
    }

    /// Evaluate swap usage severity.
    pub fn swap_used_severity(&self, used_pct: f64) -> Severity {
        above(
            used_pct,
            self.swap_used_warning_pct,
            self.swap_used_critical_pct,
        )
    }

    /// Evaluate interface throughput severity from the busier direction.
    pub fn net_throughput_severity(&self, rx_kbps: f64, tx_kbps: f64) -> Severity {
        above(
            rx_kbps.max(tx_kbps),
            self.net_throughput_warning_kbps,
            self.net_throughput_critical_kbps,
        )
    }

    /// Evaluate TCP retransmission rate severity.
    pub fn retrans_severity(&self, per_sec: f64) -> Severity {
        above(
            per_sec,
            self.retrans_warning_per_sec,
            self.retrans_critical_per_sec,
        )
    }
}
