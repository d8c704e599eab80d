//! The nine checks of the report.
//!
//! Every check follows the same shape: run one tool through the
//! [`Host`], parse its output into a sample, classify the sample and
//! append text and findings to its [`Section`]. Checks never look at each
//! other's results. A failing tool or unparseable output degrades the one
//! check into a warning or an "insufficient data" finding; it never stops
//! the run.

use clap::ValueEnum;
use thiserror::Error;
use tracing::warn;

use crate::analysis::{
    classify_vmstat, core_spread, cpu_balance, is_loopback, is_overloaded, load_trend,
    memory_usage, swap_status, top_processes, CpuBalance, SwapStatus,
};
use crate::availability::ToolAvailability;
use crate::config::Sampling;
use crate::host::{Host, Tool, ToolError};
use crate::parsers::{
    self, parse_free, parse_iostat, parse_mpstat, parse_pidstat_processes, parse_pidstat_threads,
    parse_sar_dev, parse_sar_tcp, parse_ss_summary, parse_top_process, parse_uptime,
    parse_vmstat, scan_kernel_log, ParseError,
};
use crate::report::Section;
use crate::thresholds::{Severity, Thresholds};

/// The checks, in report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum CheckKind {
    /// Load average trend and overload
    Load,
    /// Kernel log error scan
    Kernel,
    /// System-wide vmstat statistics
    Vmstat,
    /// Per-CPU balance
    Cpu,
    /// Per-process CPU usage
    Process,
    /// Disk latency and utilization
    Disk,
    /// Memory and swap usage
    Memory,
    /// Network interface throughput
    Network,
    /// TCP connection and retransmit rates
    Tcp,
}

impl CheckKind {
    pub const ALL: [CheckKind; 9] = [
        CheckKind::Load,
        CheckKind::Kernel,
        CheckKind::Vmstat,
        CheckKind::Cpu,
        CheckKind::Process,
        CheckKind::Disk,
        CheckKind::Memory,
        CheckKind::Network,
        CheckKind::Tcp,
    ];

    /// Heading printed above the section.
    pub fn title(self) -> &'static str {
        match self {
            CheckKind::Load => "Load average (uptime)",
            CheckKind::Kernel => "Kernel errors (dmesg)",
            CheckKind::Vmstat => "System statistics (vmstat)",
            CheckKind::Cpu => "CPU balance (mpstat)",
            CheckKind::Process => "Process CPU (pidstat)",
            CheckKind::Disk => "Disk I/O (iostat)",
            CheckKind::Memory => "Memory (free)",
            CheckKind::Network => "Network devices (sar -n DEV)",
            CheckKind::Tcp => "TCP (sar -n TCP,ETCP)",
        }
    }

    /// Stable identifier, as accepted by `--only`/`--skip` and written to CSV.
    pub fn name(self) -> &'static str {
        match self {
            CheckKind::Load => "load",
            CheckKind::Kernel => "kernel",
            CheckKind::Vmstat => "vmstat",
            CheckKind::Cpu => "cpu",
            CheckKind::Process => "process",
            CheckKind::Disk => "disk",
            CheckKind::Memory => "memory",
            CheckKind::Network => "network",
            CheckKind::Tcp => "tcp",
        }
    }
}

/// Why a check could not finish.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Everything a check needs.
pub struct CheckContext<'a> {
    pub host: &'a dyn Host,
    pub availability: &'a ToolAvailability,
    pub thresholds: &'a Thresholds,
    pub sampling: Sampling,
    /// Logical CPUs, probed once at startup
    pub cpu_count: Option<usize>,
}

impl CheckContext<'_> {
    fn interval(&self) -> String {
        self.sampling.interval.to_string()
    }

    /// Record a skip and return false when a secondary tool is missing.
    fn require(&self, tool: Tool, section: &mut Section) -> bool {
        if self.availability.has(tool) {
            return true;
        }
        section.finding(
            Severity::Warning,
            tool.program(),
            format!("not found (install {}); skipped", tool.package()),
        );
        false
    }
}

/// Run one check and return its section.
pub fn run_check(kind: CheckKind, ctx: &CheckContext<'_>) -> Section {
    let mut section = Section::new(kind);
    let result = match kind {
        CheckKind::Load => check_load(ctx, &mut section),
        CheckKind::Kernel => check_kernel(ctx, &mut section),
        CheckKind::Vmstat => check_vmstat(ctx, &mut section),
        CheckKind::Cpu => check_cpu(ctx, &mut section),
        CheckKind::Process => check_process(ctx, &mut section),
        CheckKind::Disk => check_disk(ctx, &mut section),
        CheckKind::Memory => check_memory(ctx, &mut section),
        CheckKind::Network => check_network(ctx, &mut section),
        CheckKind::Tcp => check_tcp(ctx, &mut section),
    };

    if let Err(err) = result {
        warn!(check = kind.name(), error = %err, "check degraded");
        let (subject, severity, message) = match &err {
            CheckError::Tool(ToolError::NotFound { tool }) => {
                (*tool, Severity::Warning, format!("{err}; skipped"))
            }
            CheckError::Tool(
                ToolError::PermissionDenied { tool, .. }
                | ToolError::Failed { tool, .. }
                | ToolError::Io { tool, .. },
            ) => (*tool, Severity::Warning, err.to_string()),
            CheckError::Parse(
                ParseError::MissingSection { tool, .. }
                | ParseError::MissingColumn { tool, .. }
                | ParseError::InvalidNumber { tool, .. },
            ) => (
                *tool,
                Severity::Unknown,
                format!("insufficient data ({err})"),
            ),
        };
        section.finding(severity, subject.program(), message);
    }
    section
}

fn check_load(ctx: &CheckContext<'_>, section: &mut Section) -> Result<(), CheckError> {
    let load = parse_uptime(&ctx.host.run(Tool::Uptime, &[])?)?;
    section.text(format!(
        "load average: {:.2} {:.2} {:.2} (1m 5m 15m)",
        load.one, load.five, load.fifteen
    ));

    section.finding(
        Severity::Normal,
        "trend",
        format!("load is {}", load_trend(&load).describe()),
    );

    match ctx.cpu_count {
        Some(cpus) if is_overloaded(&load, cpus) => section.finding(
            Severity::Critical,
            "capacity",
            format!(
                "1m load {:.2} exceeds {} CPUs: tasks are queueing for CPU",
                load.one, cpus
            ),
        ),
        Some(cpus) => section.finding(
            Severity::Normal,
            "capacity",
            format!("1m load {:.2} is within capacity ({} CPUs)", load.one, cpus),
        ),
        None => section.finding(
            Severity::Unknown,
            "capacity",
            "CPU count unavailable; overload not classified",
        ),
    }
    Ok(())
}

fn check_kernel(ctx: &CheckContext<'_>, section: &mut Section) -> Result<(), CheckError> {
    if !ctx.require(Tool::Dmesg, section) {
        return Ok(());
    }

    let text = match ctx.host.run(Tool::Dmesg, &[]) {
        Ok(text) => text,
        Err(ToolError::PermissionDenied { detail, .. }) => {
            section.finding(
                Severity::Warning,
                "kernel log",
                format!("permission denied ({detail}); re-run as root to scan for errors"),
            );
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let scan = scan_kernel_log(&text);
    let keywords = parsers::KERNEL_ERROR_KEYWORDS.join("/");
    if scan.total == 0 {
        section.finding(
            Severity::Normal,
            "kernel log",
            format!(
                "no recent kernel errors in the last {} lines",
                parsers::KERNEL_LOG_LOOKBACK
            ),
        );
        return Ok(());
    }

    let mut message = format!("{} recent line(s) mention {}", scan.total, keywords);
    if scan.recent.len() < scan.total {
        message.push_str(&format!(" (showing the last {})", scan.recent.len()));
    }
    section.finding(Severity::Warning, "kernel log", message);
    for m in scan.recent {
        section.text(format!("{:<7} {}", m.keyword, m.line));
    }
    Ok(())
}

fn check_vmstat(ctx: &CheckContext<'_>, section: &mut Section) -> Result<(), CheckError> {
    let interval = ctx.interval();
    let count = ctx.sampling.samples.to_string();
    let text = ctx.host.run(Tool::Vmstat, &[&interval, &count])?;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        section.text(line.trim_end());
    }

    // The table shown above and the verdicts below come from the same run;
    // the first row is the since-boot average, so the last one is judged.
    let samples = parse_vmstat(&text)?;
    let last = samples.last().ok_or(ParseError::MissingSection {
        tool: Tool::Vmstat,
        what: "sample rows",
    })?;
    let verdict = classify_vmstat(last, ctx.cpu_count, ctx.thresholds);

    match (verdict.cpu_queueing, ctx.cpu_count) {
        (Some(true), Some(cpus)) => section.finding(
            Severity::Warning,
            "run queue",
            format!(
                "r={} exceeds {} CPUs: CPU bottleneck",
                last.run_queue, cpus
            ),
        ),
        (Some(_), Some(cpus)) => section.finding(
            Severity::Normal,
            "run queue",
            format!("r={} within {} CPUs", last.run_queue, cpus),
        ),
        _ => section.finding(
            Severity::Unknown,
            "run queue",
            format!("r={}, CPU count unavailable", last.run_queue),
        ),
    }

    if verdict.io_blocked {
        section.finding(
            Severity::Warning,
            "blocked",
            format!(
                "b={} processes blocked on I/O ({:.0}% iowait): I/O bottleneck",
                last.blocked, last.iowait
            ),
        );
    } else {
        section.finding(Severity::Normal, "blocked", "no processes blocked on I/O");
    }

    if verdict.swapping {
        section.finding(
            Severity::Warning,
            "swap",
            format!(
                "si={} so={}: swapping, memory pressure",
                last.swap_in, last.swap_out
            ),
        );
    } else {
        section.finding(Severity::Normal, "swap", "no swap activity");
    }

    let idle_message = match verdict.idle {
        Severity::Critical => format!(
            "{:.0}% idle (us {:.0}%, sy {:.0}%): CPU-bound",
            last.idle, last.user, last.system
        ),
        Severity::Warning => format!(
            "{:.0}% idle (us {:.0}%, sy {:.0}%): CPU usage elevated",
            last.idle, last.user, last.system
        ),
        _ => format!("{:.0}% idle: CPU has headroom", last.idle),
    };
    section.finding(verdict.idle, "idle", idle_message);
    Ok(())
}

fn check_cpu(ctx: &CheckContext<'_>, section: &mut Section) -> Result<(), CheckError> {
    let interval = ctx.interval();
    let text = ctx.host.run(Tool::Mpstat, &["-P", "ALL", &interval, "1"])?;
    let cores = parse_mpstat(&text)?;
    for core in &cores {
        section.text(format!("CPU{:<4} {:5.1}% busy", core.core, core.busy));
    }

    let spread = core_spread(&cores).ok_or(ParseError::MissingSection {
        tool: Tool::Mpstat,
        what: "per-core rows",
    })?;
    let balance = cpu_balance(&spread, ctx.thresholds);
    let detail = format!(
        "busiest CPU{} {:.1}%, idlest CPU{} {:.1}% ({:.1} points apart)",
        spread.busiest.core,
        spread.busiest.busy,
        spread.idlest.core,
        spread.idlest.busy,
        spread.spread()
    );
    let message = match balance {
        CpuBalance::Severe => format!("{detail}: severe imbalance, poor thread scaling"),
        CpuBalance::Moderate => format!("{detail}: moderate imbalance"),
        CpuBalance::Balanced => format!("{detail}: balanced"),
    };
    section.finding(balance.severity(), "balance", message);
    Ok(())
}

fn check_process(ctx: &CheckContext<'_>, section: &mut Section) -> Result<(), CheckError> {
    if !ctx.require(Tool::Pidstat, section) {
        return Ok(());
    }

    let interval = ctx.interval();
    let text = ctx.host.run(Tool::Pidstat, &[&interval, "1"])?;
    let procs = top_processes(parse_pidstat_processes(&text)?, ctx.sampling.top);
    if procs.is_empty() {
        section.text("no process used CPU during the sample");
    } else {
        section.text(format!(
            "{:>8} {:>7} {:>7} {:>7}  Command",
            "PID", "%usr", "%sys", "%CPU"
        ));
        for p in &procs {
            section.text(format!(
                "{:>8} {:>7.2} {:>7.2} {:>7.2}  {}",
                p.pid, p.user, p.system, p.total, p.command
            ));
        }
    }

    if !ctx.require(Tool::Ps, section) {
        return Ok(());
    }
    let ranking = ctx
        .host
        .run(Tool::Ps, &["-eo", "pid=,pcpu=,comm=", "--sort=-pcpu"])?;
    let top = parse_top_process(&ranking)?;
    section.finding(
        Severity::Normal,
        "busiest process",
        format!("{} (pid {}, {:.1}% CPU)", top.command, top.pid, top.cpu),
    );

    let pid = top.pid.to_string();
    let text = ctx
        .host
        .run(Tool::Pidstat, &["-t", "-p", &pid, &interval, "1"])?;
    let mut threads = parse_pidstat_threads(&text)?;
    threads.sort_by(|a, b| b.total.total_cmp(&a.total));
    section.text(format!(
        "threads of pid {}: {:>8} {:>7} {:>7} {:>7}  Command",
        top.pid, "TID", "%usr", "%sys", "%CPU"
    ));
    for t in &threads {
        section.text(format!(
            "{:>8} {:>7.2} {:>7.2} {:>7.2}  {}",
            t.tid, t.user, t.system, t.total, t.command
        ));
    }
    Ok(())
}

fn check_disk(ctx: &CheckContext<'_>, section: &mut Section) -> Result<(), CheckError> {
    let interval = ctx.interval();
    // Two reports: the first covers the time since boot, the second the interval.
    let text = ctx.host.run(Tool::Iostat, &["-dx", &interval, "2"])?;
    let disks = parse_iostat(&text)?;
    if disks.is_empty() {
        section.finding(
            Severity::Unknown,
            "iostat",
            "no block devices reported extended statistics",
        );
        return Ok(());
    }

    section.text(format!("{:<14} {:>10} {:>8}", "Device", "await(ms)", "%util"));
    for d in &disks {
        section.text(format!("{:<14} {:>10.2} {:>8.2}", d.device, d.await_ms, d.util));
    }

    let t = ctx.thresholds;
    for d in &disks {
        let severity = t.disk_await_severity(d.await_ms);
        let message = match severity {
            Severity::Critical => format!(
                "average wait {:.1} ms > {} ms: severe I/O latency",
                d.await_ms, t.disk_await_critical_ms
            ),
            Severity::Warning => format!(
                "average wait {:.1} ms > {} ms: elevated I/O latency",
                d.await_ms, t.disk_await_warning_ms
            ),
            _ => format!("average wait {:.1} ms", d.await_ms),
        };
        section.finding(severity, d.device.as_str(), message);

        let severity = t.disk_util_severity(d.util);
        let message = match severity {
            Severity::Critical => format!(
                "utilization {:.1}% > {}%: device saturated",
                d.util, t.disk_util_critical_pct
            ),
            Severity::Warning => format!(
                "utilization {:.1}% > {}%: device busy",
                d.util, t.disk_util_warning_pct
            ),
            _ => format!("utilization {:.1}%", d.util),
        };
        section.finding(severity, d.device.as_str(), message);
    }
    Ok(())
}

fn check_memory(ctx: &CheckContext<'_>, section: &mut Section) -> Result<(), CheckError> {
    let mem = parse_free(&ctx.host.run(Tool::Free, &["-m"])?)?;
    section.text(format!(
        "total {} MB, used {} MB, free {} MB, shared {} MB, cache {} MB, available {} MB",
        mem.total, mem.used, mem.free, mem.shared, mem.cache, mem.available
    ));

    let Some(usage) = memory_usage(&mem) else {
        section.finding(
            Severity::Unknown,
            "memory",
            "total memory reported as 0 MB; percentages not derived",
        );
        return Ok(());
    };
    section.text(format!(
        "used {}, cache {}, available {}",
        usage.used, usage.cache, usage.available
    ));

    let severity = ctx
        .thresholds
        .mem_available_severity(usage.available.as_f64());
    let message = match severity {
        Severity::Critical => format!("only {} available: critically low memory", usage.available),
        Severity::Warning => format!("{} available: memory is getting low", usage.available),
        _ => format!("{} available: sufficient memory", usage.available),
    };
    section.finding(severity, "available", message);

    match swap_status(&mem, ctx.thresholds) {
        SwapStatus::NotConfigured => {
            section.finding(Severity::Normal, "swap", "no swap configured")
        }
        SwapStatus::Unused => section.finding(
            Severity::Normal,
            "swap",
            format!("{} MB configured, no swap in use", mem.swap_total),
        ),
        SwapStatus::InUse { used, severity } => {
            let level = match severity {
                Severity::Critical => "high swap pressure",
                Severity::Warning => "moderate swap pressure",
                _ => "minimal swap use",
            };
            section.finding(
                severity,
                "swap",
                format!(
                    "{} used ({} of {} MB): {}",
                    used, mem.swap_used, mem.swap_total, level
                ),
            );
        }
    }
    Ok(())
}

fn check_network(ctx: &CheckContext<'_>, section: &mut Section) -> Result<(), CheckError> {
    let interval = ctx.interval();
    let text = ctx.host.run(Tool::Sar, &["-n", "DEV", &interval, "1"])?;
    let interfaces: Vec<_> = parse_sar_dev(&text)?
        .into_iter()
        .filter(|i| !is_loopback(&i.name))
        .collect();
    if interfaces.is_empty() {
        section.finding(
            Severity::Unknown,
            "sar",
            "no non-loopback interfaces reported",
        );
        return Ok(());
    }

    section.text(format!(
        "{:<12} {:>10} {:>10} {:>10} {:>10}",
        "IFACE", "rxpck/s", "txpck/s", "rxkB/s", "txkB/s"
    ));
    for i in &interfaces {
        section.text(format!(
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
            i.name, i.rx_packets, i.tx_packets, i.rx_kb, i.tx_kb
        ));
    }

    for i in &interfaces {
        let severity = ctx.thresholds.net_throughput_severity(i.rx_kb, i.tx_kb);
        let level = match severity {
            Severity::Critical => "very high traffic",
            Severity::Warning => "significant traffic",
            _ => "normal traffic",
        };
        section.finding(
            severity,
            i.name.as_str(),
            format!(
                "rx {:.1} KB/s, tx {:.1} KB/s: {}",
                i.rx_kb, i.tx_kb, level
            ),
        );
    }
    Ok(())
}

fn check_tcp(ctx: &CheckContext<'_>, section: &mut Section) -> Result<(), CheckError> {
    let interval = ctx.interval();
    let text = ctx.host.run(Tool::Sar, &["-n", "TCP,ETCP", &interval, "1"])?;
    let tcp = parse_sar_tcp(&text)?;
    section.text(format!(
        "active opens {:.2}/s, passive opens {:.2}/s, retransmits {:.2}/s",
        tcp.active, tcp.passive, tcp.retrans
    ));

    let severity = ctx.thresholds.retrans_severity(tcp.retrans);
    let level = match severity {
        Severity::Critical => "heavy retransmission, likely packet loss",
        Severity::Warning => "elevated retransmission",
        _ => "normal",
    };
    section.finding(
        severity,
        "retransmits",
        format!("{:.2}/s: {}", tcp.retrans, level),
    );

    // The live connection snapshot is informative only; losing it keeps
    // the verdict above.
    if ctx.require(Tool::Ss, section) {
        let snapshot = ctx
            .host
            .run(Tool::Ss, &["-s"])
            .map_err(CheckError::from)
            .and_then(|text| parse_ss_summary(&text).map_err(CheckError::from));
        match snapshot {
            Ok(s) => {
                let show = |v: Option<u64>| v.map_or_else(|| "?".to_string(), |n| n.to_string());
                section.text(format!(
                    "sockets {}, tcp {} (estab {}, closed {}, orphaned {}, timewait {})",
                    show(s.total),
                    show(s.tcp),
                    show(s.estab),
                    show(s.closed),
                    show(s.orphaned),
                    show(s.timewait)
                ));
            }
            Err(err) => {
                warn!(error = %err, "socket summary unavailable");
                section.finding(Severity::Warning, "ss", err.to_string());
            }
        }
    }
    Ok(())
}
