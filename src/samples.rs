//! Sample data structures for perfcheck-rs.
//!
//! Each check turns the text of one tool invocation into one of these
//! structs. They live only for the duration of a single check; nothing is
//! carried from one check to the next.

/// Load averages from `uptime`.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadSample {
    /// 1-minute load average
    pub one: f64,
    /// 5-minute load average
    pub five: f64,
    /// 15-minute load average
    pub fifteen: f64,
}

/// One row of `vmstat` output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VmstatSample {
    /// Processes waiting for run time
    pub run_queue: u64,
    /// Processes in uninterruptible sleep
    pub blocked: u64,
    /// Memory swapped in from disk (per second)
    pub swap_in: u64,
    /// Memory swapped out to disk (per second)
    pub swap_out: u64,
    /// Time spent running user code (%)
    pub user: f64,
    /// Time spent running kernel code (%)
    pub system: f64,
    /// Time spent idle (%)
    pub idle: f64,
    /// Time spent waiting for I/O (%)
    pub iowait: f64,
}

/// Utilization of one logical core from `mpstat -P ALL`.
#[derive(Clone, Debug, PartialEq)]
pub struct CpuCoreSample {
    /// Core index as reported by mpstat
    pub core: u32,
    /// Busy percentage (100 - %idle)
    pub busy: f64,
}

/// A process row from `pidstat`.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessCpuSample {
    pub pid: u32,
    pub command: String,
    /// CPU spent in user mode (%)
    pub user: f64,
    /// CPU spent in kernel mode (%)
    pub system: f64,
    /// Total CPU (%)
    pub total: f64,
}

/// A thread row from `pidstat -t -p <pid>`.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreadCpuSample {
    pub tid: u32,
    pub command: String,
    pub user: f64,
    pub system: f64,
    pub total: f64,
}

/// The top entry of the process ranking lister.
#[derive(Clone, Debug, PartialEq)]
pub struct TopProcess {
    pub pid: u32,
    pub cpu: f64,
    pub command: String,
}

/// Extended statistics for one block device from `iostat -dx`.
#[derive(Clone, Debug, PartialEq)]
pub struct DiskSample {
    pub device: String,
    /// Average time for I/O requests to be served (ms)
    pub await_ms: f64,
    /// Percentage of time the device had I/O in flight
    pub util: f64,
}

/// Memory and swap figures from `free -m`, all in MB.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemorySample {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub shared: u64,
    /// Buffers plus page cache
    pub cache: u64,
    pub available: u64,
    pub swap_total: u64,
    pub swap_used: u64,
}

/// Per-interface rates from `sar -n DEV`.
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceSample {
    pub name: String,
    pub rx_packets: f64,
    pub tx_packets: f64,
    /// Received KB/s
    pub rx_kb: f64,
    /// Transmitted KB/s
    pub tx_kb: f64,
}

/// TCP counters from `sar -n TCP,ETCP`, all per second.
#[derive(Clone, Debug, PartialEq)]
pub struct TcpSample {
    /// Active opens (connect)
    pub active: f64,
    /// Passive opens (accept)
    pub passive: f64,
    /// Segments retransmitted
    pub retrans: f64,
}

/// Connection counts from `ss -s`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SocketSummary {
    /// All sockets
    pub total: Option<u64>,
    /// TCP sockets
    pub tcp: Option<u64>,
    pub estab: Option<u64>,
    pub closed: Option<u64>,
    pub orphaned: Option<u64>,
    pub timewait: Option<u64>,
}

/// A kernel log line that mentions one of the error keywords.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelLogMatch {
    /// The keyword that matched first
    pub keyword: &'static str,
    pub line: String,
}

/// Result of scanning the kernel log tail.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KernelLogScan {
    /// Every matching line in the scanned window
    pub total: usize,
    /// The most recent matches, oldest first
    pub recent: Vec<KernelLogMatch>,
}
