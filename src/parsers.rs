//! Parsers for the text output of the external tools.
//!
//! Every function here is pure: it takes the captured stdout of one
//! invocation and returns a sample from [`crate::samples`]. Columns are
//! located by their header names in the tools' standard C-locale output,
//! so a missing column or a non-numeric field is reported as a
//! [`ParseError`] instead of being read as zero.
//!
//! # Formats
//!
//! - `uptime` - `... load average: 0.52, 0.58, 0.59`
//! - `vmstat` - two header lines, then one row per sample
//! - `free -m` - header row, then `Mem:` and `Swap:` rows
//! - `iostat -dx` - one `Device` table per report
//! - `mpstat`, `pidstat`, `sar` - blank-line separated tables, closed by
//!   `Average:` tables which are the ones used here
//! - `ps -eo pid=,pcpu=,comm=` - one process per line, no header
//! - `ss -s` - `Total:` and `TCP:` summary lines
//! - `dmesg` - free-form kernel log lines

use std::str::FromStr;

use thiserror::Error;

use crate::host::Tool;
use crate::samples::{
    CpuCoreSample, DiskSample, InterfaceSample, KernelLogMatch, KernelLogScan, LoadSample,
    MemorySample, ProcessCpuSample, SocketSummary, TcpSample, ThreadCpuSample, TopProcess,
    VmstatSample,
};

/// Number of trailing kernel log lines that are scanned.
pub const KERNEL_LOG_LOOKBACK: usize = 100;

/// Maximum number of kernel log matches reported.
pub const KERNEL_LOG_MATCH_LIMIT: usize = 10;

/// Case-insensitive substrings that mark a kernel log line as an error.
pub const KERNEL_ERROR_KEYWORDS: [&str; 4] = ["error", "fail", "oom", "killed"];

/// Failure to extract the expected fields from tool output.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("{tool}: no {what} in output")]
    MissingSection { tool: Tool, what: &'static str },
    #[error("{tool}: column {column} not found")]
    MissingColumn { tool: Tool, column: &'static str },
    #[error("{tool}: {field} is not a number: {value:?}")]
    InvalidNumber {
        tool: Tool,
        field: String,
        value: String,
    },
}

/// A header row and the data rows below it, split on whitespace.
struct Table<'a> {
    tool: Tool,
    header: Vec<&'a str>,
    rows: Vec<Vec<&'a str>>,
}

impl Table<'_> {
    fn column(&self, name: &'static str) -> Result<usize, ParseError> {
        self.optional_column(name).ok_or(ParseError::MissingColumn {
            tool: self.tool,
            column: name,
        })
    }

    fn optional_column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| *h == name)
    }
}

fn fields(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Parse field `idx` of `row`; a missing field is an invalid (empty) number.
fn number<T: FromStr>(row: &[&str], idx: usize, tool: Tool, field: &str) -> Result<T, ParseError> {
    let value = row.get(idx).copied().unwrap_or("");
    value.parse().map_err(|_| ParseError::InvalidNumber {
        tool,
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Split output into groups of consecutive non-blank lines.
fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Find the last `Average:` table whose header contains `key`.
///
/// The leading `Average:` token is stripped from header and rows so
/// column indices line up.
fn average_table<'a>(text: &'a str, tool: Tool, key: &'static str) -> Result<Table<'a>, ParseError> {
    blocks(text)
        .into_iter()
        .rev()
        .find_map(|block| {
            let mut lines = block.into_iter().filter(|l| l.starts_with("Average:"));
            let header: Vec<&str> = lines.next()?.split_whitespace().skip(1).collect();
            if !header.contains(&key) {
                return None;
            }
            let rows = lines
                .map(|l| l.split_whitespace().skip(1).collect())
                .collect();
            Some(Table { tool, header, rows })
        })
        .ok_or(ParseError::MissingSection {
            tool,
            what: "Average table",
        })
}

/// Parse the load averages out of `uptime` output.
pub fn parse_uptime(text: &str) -> Result<LoadSample, ParseError> {
    let tool = Tool::Uptime;
    let missing = ParseError::MissingSection {
        tool,
        what: "load averages",
    };

    let start = text.rfind("load average").ok_or(missing.clone())?;
    let (_, values) = text[start..].split_once(':').ok_or(missing.clone())?;
    let values: Vec<&str> = values
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if values.len() < 3 {
        return Err(missing);
    }

    Ok(LoadSample {
        one: number(&values, 0, tool, "1m load")?,
        five: number(&values, 1, tool, "5m load")?,
        fifteen: number(&values, 2, tool, "15m load")?,
    })
}

/// Parse every sample row of `vmstat <interval> <count>` output.
///
/// The first row reports averages since boot; callers that want the
/// current state should look at the last one.
pub fn parse_vmstat(text: &str) -> Result<Vec<VmstatSample>, ParseError> {
    let tool = Tool::Vmstat;
    let mut lines = text.lines().map(fields);
    let header = lines
        .by_ref()
        .find(|t| t.first() == Some(&"r") && t.contains(&"id"))
        .ok_or(ParseError::MissingSection {
            tool,
            what: "column header",
        })?;
    let rows = lines
        .filter(|row| {
            row.first()
                .is_some_and(|f| f.chars().all(|c| c.is_ascii_digit()))
        })
        .collect();
    let table = Table { tool, header, rows };

    let r = table.column("r")?;
    let b = table.column("b")?;
    let si = table.column("si")?;
    let so = table.column("so")?;
    let us = table.column("us")?;
    let sy = table.column("sy")?;
    let id = table.column("id")?;
    let wa = table.column("wa")?;

    let samples = table
        .rows
        .iter()
        .map(|row| {
            Ok(VmstatSample {
                run_queue: number(row, r, tool, "r")?,
                blocked: number(row, b, tool, "b")?,
                swap_in: number(row, si, tool, "si")?,
                swap_out: number(row, so, tool, "so")?,
                user: number(row, us, tool, "us")?,
                system: number(row, sy, tool, "sy")?,
                idle: number(row, id, tool, "id")?,
                iowait: number(row, wa, tool, "wa")?,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    if samples.is_empty() {
        return Err(ParseError::MissingSection {
            tool,
            what: "sample rows",
        });
    }
    Ok(samples)
}

/// Parse per-core busy percentages from `mpstat -P ALL` output.
///
/// The aggregate `all` row is skipped.
pub fn parse_mpstat(text: &str) -> Result<Vec<CpuCoreSample>, ParseError> {
    let tool = Tool::Mpstat;
    let table = average_table(text, tool, "%idle")?;
    let cpu = table.column("CPU")?;
    let idle = table.column("%idle")?;

    let mut cores = Vec::new();
    for row in &table.rows {
        let Some(core) = row.get(cpu).and_then(|c| c.parse::<u32>().ok()) else {
            continue;
        };
        let idle_pct: f64 = number(row, idle, tool, "%idle")?;
        cores.push(CpuCoreSample {
            core,
            busy: 100.0 - idle_pct,
        });
    }

    if cores.is_empty() {
        return Err(ParseError::MissingSection {
            tool,
            what: "per-core rows",
        });
    }
    Ok(cores)
}

/// Parse the per-process rows of `pidstat` output.
///
/// An idle system legitimately yields no rows.
pub fn parse_pidstat_processes(text: &str) -> Result<Vec<ProcessCpuSample>, ParseError> {
    let tool = Tool::Pidstat;
    let table = average_table(text, tool, "PID")?;
    let pid = table.column("PID")?;
    let usr = table.column("%usr")?;
    let sys = table.column("%system")?;
    let cpu = table.column("%CPU")?;
    let cmd = table.column("Command")?;

    table
        .rows
        .iter()
        .map(|row| {
            Ok(ProcessCpuSample {
                pid: number(row, pid, tool, "PID")?,
                command: row.get(cmd..).map(|c| c.join(" ")).unwrap_or_default(),
                user: number(row, usr, tool, "%usr")?,
                system: number(row, sys, tool, "%system")?,
                total: number(row, cpu, tool, "%CPU")?,
            })
        })
        .collect()
}

/// Parse the thread rows of `pidstat -t -p <pid>` output.
///
/// The process summary row (TID `-`) is skipped.
pub fn parse_pidstat_threads(text: &str) -> Result<Vec<ThreadCpuSample>, ParseError> {
    let tool = Tool::Pidstat;
    let table = average_table(text, tool, "TID")?;
    let tid = table.column("TID")?;
    let usr = table.column("%usr")?;
    let sys = table.column("%system")?;
    let cpu = table.column("%CPU")?;
    let cmd = table.column("Command")?;

    table
        .rows
        .iter()
        .filter(|row| row.get(tid).is_some_and(|t| *t != "-"))
        .map(|row| {
            let command = row.get(cmd..).map(|c| c.join(" ")).unwrap_or_default();
            Ok(ThreadCpuSample {
                tid: number(row, tid, tool, "TID")?,
                command: command.trim_start_matches("|__").to_string(),
                user: number(row, usr, tool, "%usr")?,
                system: number(row, sys, tool, "%system")?,
                total: number(row, cpu, tool, "%CPU")?,
            })
        })
        .collect()
}

/// Parse the top row of `ps -eo pid=,pcpu=,comm= --sort=-pcpu`.
///
/// The row of the `ps` process that produced the listing is skipped; it has
/// exited by the time the row is read.
pub fn parse_top_process(text: &str) -> Result<TopProcess, ParseError> {
    let tool = Tool::Ps;
    let row = text
        .lines()
        .map(fields)
        .find(|row| !row.is_empty() && row.get(2..) != Some(&["ps"][..]))
        .ok_or(ParseError::MissingSection {
            tool,
            what: "process rows",
        })?;

    Ok(TopProcess {
        pid: number(&row, 0, tool, "pid")?,
        cpu: number(&row, 1, tool, "pcpu")?,
        command: row.get(2..).map(|c| c.join(" ")).unwrap_or_default(),
    })
}

/// Parse the last device report of `iostat -dx <interval> <count>`.
///
/// Newer sysstat splits the wait time into `r_await` and `w_await`; the
/// combined figure is their average weighted by the read and write rates.
pub fn parse_iostat(text: &str) -> Result<Vec<DiskSample>, ParseError> {
    let tool = Tool::Iostat;
    let block = blocks(text)
        .into_iter()
        .rev()
        .find(|b| b.first().is_some_and(|l| l.starts_with("Device")))
        .ok_or(ParseError::MissingSection {
            tool,
            what: "Device report",
        })?;

    let mut lines = block.into_iter().map(fields);
    let header = lines.next().unwrap_or_default();
    let table = Table {
        tool,
        header,
        rows: lines.collect(),
    };

    let util = table.column("%util")?;
    let combined_await = table.optional_column("await");

    table
        .rows
        .iter()
        .map(|row| {
            let await_ms = match combined_await {
                Some(idx) => number(row, idx, tool, "await")?,
                None => {
                    let reads: f64 = number(row, table.column("r/s")?, tool, "r/s")?;
                    let writes: f64 = number(row, table.column("w/s")?, tool, "w/s")?;
                    let r_await: f64 = number(row, table.column("r_await")?, tool, "r_await")?;
                    let w_await: f64 = number(row, table.column("w_await")?, tool, "w_await")?;
                    let ops = reads + writes;
                    if ops > 0.0 {
                        (r_await * reads + w_await * writes) / ops
                    } else {
                        (r_await + w_await) / 2.0
                    }
                }
            };
            Ok(DiskSample {
                device: row.first().copied().unwrap_or_default().to_string(),
                await_ms,
                util: number(row, util, tool, "%util")?,
            })
        })
        .collect()
}

/// Parse `free -m` output.
///
/// Handles both the current layout (`buff/cache`, `available`) and the
/// older one (`buffers`, `cached`, no `available`), where available memory
/// is approximated as free plus cache.
pub fn parse_free(text: &str) -> Result<MemorySample, ParseError> {
    let tool = Tool::Free;
    let header = text
        .lines()
        .map(fields)
        .find(|t| t.first() == Some(&"total"))
        .ok_or(ParseError::MissingSection {
            tool,
            what: "column header",
        })?;
    let row_for = |label: &str| -> Option<Vec<&str>> {
        text.lines()
            .map(fields)
            .find(|t| t.first() == Some(&label))
            .map(|t| t[1..].to_vec())
    };
    let mem = row_for("Mem:").ok_or(ParseError::MissingSection {
        tool,
        what: "Mem: row",
    })?;
    let table = Table {
        tool,
        header,
        rows: Vec::new(),
    };

    let total = number(&mem, table.column("total")?, tool, "total")?;
    let used = number(&mem, table.column("used")?, tool, "used")?;
    let free: u64 = number(&mem, table.column("free")?, tool, "free")?;
    let shared = number(&mem, table.column("shared")?, tool, "shared")?;

    let cache: u64 = match table.optional_column("buff/cache") {
        Some(idx) => number(&mem, idx, tool, "buff/cache")?,
        None => {
            let buffers: u64 = number(&mem, table.column("buffers")?, tool, "buffers")?;
            let cached: u64 = number(&mem, table.column("cached")?, tool, "cached")?;
            buffers + cached
        }
    };
    let available = match table.optional_column("available") {
        Some(idx) => number(&mem, idx, tool, "available")?,
        None => free + cache,
    };

    let (swap_total, swap_used) = match row_for("Swap:") {
        Some(swap) => (
            number(&swap, table.column("total")?, tool, "swap total")?,
            number(&swap, table.column("used")?, tool, "swap used")?,
        ),
        None => (0, 0),
    };

    Ok(MemorySample {
        total,
        used,
        free,
        shared,
        cache,
        available,
        swap_total,
        swap_used,
    })
}

/// Parse per-interface rates from `sar -n DEV` output.
pub fn parse_sar_dev(text: &str) -> Result<Vec<InterfaceSample>, ParseError> {
    let tool = Tool::Sar;
    let table = average_table(text, tool, "IFACE")?;
    let iface = table.column("IFACE")?;
    let rxpck = table.column("rxpck/s")?;
    let txpck = table.column("txpck/s")?;
    let rxkb = table.column("rxkB/s")?;
    let txkb = table.column("txkB/s")?;

    table
        .rows
        .iter()
        .map(|row| {
            Ok(InterfaceSample {
                name: row.get(iface).copied().unwrap_or_default().to_string(),
                rx_packets: number(row, rxpck, tool, "rxpck/s")?,
                tx_packets: number(row, txpck, tool, "txpck/s")?,
                rx_kb: number(row, rxkb, tool, "rxkB/s")?,
                tx_kb: number(row, txkb, tool, "txkB/s")?,
            })
        })
        .collect()
}

/// Parse connection and retransmission rates from `sar -n TCP,ETCP`.
pub fn parse_sar_tcp(text: &str) -> Result<TcpSample, ParseError> {
    let tool = Tool::Sar;
    let tcp = average_table(text, tool, "active/s")?;
    let etcp = average_table(text, tool, "retrans/s")?;
    let missing = ParseError::MissingSection {
        tool,
        what: "TCP average row",
    };
    let tcp_row = tcp.rows.first().ok_or(missing.clone())?;
    let etcp_row = etcp.rows.first().ok_or(missing)?;

    Ok(TcpSample {
        active: number(tcp_row, tcp.column("active/s")?, tool, "active/s")?,
        passive: number(tcp_row, tcp.column("passive/s")?, tool, "passive/s")?,
        retrans: number(etcp_row, etcp.column("retrans/s")?, tool, "retrans/s")?,
    })
}

/// Parse the `Total:` and `TCP:` lines of `ss -s`.
pub fn parse_ss_summary(text: &str) -> Result<SocketSummary, ParseError> {
    let mut summary = SocketSummary::default();
    let mut seen = false;

    for line in text.lines() {
        let parts = fields(line);
        match parts.first() {
            Some(&"Total:") => {
                seen = true;
                summary.total = parts.get(1).and_then(|v| v.parse().ok());
            }
            Some(&"TCP:") => {
                seen = true;
                summary.tcp = parts.get(1).and_then(|v| v.parse().ok());
                let states = line
                    .split_once('(')
                    .and_then(|(_, rest)| rest.split_once(')'))
                    .map(|(inner, _)| inner)
                    .unwrap_or_default();
                for state in states.split(',') {
                    let mut kv = state.split_whitespace();
                    let (Some(name), Some(value)) = (kv.next(), kv.next()) else {
                        continue;
                    };
                    let value = value.parse().ok();
                    match name {
                        "estab" => summary.estab = value,
                        "closed" => summary.closed = value,
                        "orphaned" => summary.orphaned = value,
                        "timewait" => summary.timewait = value,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    if !seen {
        return Err(ParseError::MissingSection {
            tool: Tool::Ss,
            what: "summary lines",
        });
    }
    Ok(summary)
}

/// Scan the tail of the kernel log for error keywords.
///
/// Looks at the last [`KERNEL_LOG_LOOKBACK`] lines, counts every match and
/// keeps the last [`KERNEL_LOG_MATCH_LIMIT`] of them, oldest first.
pub fn scan_kernel_log(text: &str) -> KernelLogScan {
    let lines: Vec<&str> = text.lines().collect();
    let recent = &lines[lines.len().saturating_sub(KERNEL_LOG_LOOKBACK)..];

    let mut matches: Vec<KernelLogMatch> = recent
        .iter()
        .filter_map(|line| {
            let lower = line.to_lowercase();
            KERNEL_ERROR_KEYWORDS
                .into_iter()
                .find(|k| lower.contains(k))
                .map(|keyword| KernelLogMatch {
                    keyword,
                    line: line.trim_end().to_string(),
                })
        })
        .collect();

    let total = matches.len();
    matches.drain(..total.saturating_sub(KERNEL_LOG_MATCH_LIMIT));
    KernelLogScan {
        total,
        recent: matches,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn uptime_yields_the_three_load_averages() {
        let load = parse_uptime(UPTIME).unwrap();
        assert_eq!(
            load,
            LoadSample {
                one: 2.50,
                five: 1.80,
                fifteen: 1.20
            }
        );
    }

    #[test]
    fn uptime_without_load_section_is_an_error() {
        let err = parse_uptime("garbage\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingSection { tool: Tool::Uptime, .. }));
    }

    #[test]
    fn uptime_with_empty_values_is_not_read_as_zero() {
        assert!(parse_uptime("load average: , , \n").is_err());
        assert!(matches!(
            parse_uptime("load average: 1.0, x, 2.0\n"),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn vmstat_rows_follow_the_header() {
        let rows = parse_vmstat(VMSTAT).unwrap();
        assert_eq!(rows.len(), 3);
        let last = rows.last().unwrap();
        assert_eq!(last.run_queue, 5);
        assert_eq!(last.blocked, 1);
        assert_eq!(last.swap_in, 3);
        assert_eq!(last.swap_out, 0);
        assert_eq!(last.idle, 8.0);
        assert_eq!(last.iowait, 4.0);
    }

    #[test]
    fn vmstat_with_header_only_has_no_samples() {
        let header_only = VMSTAT.lines().take(2).collect::<Vec<_>>().join("\n");
        assert_eq!(
            parse_vmstat(&header_only),
            Err(ParseError::MissingSection {
                tool: Tool::Vmstat,
                what: "sample rows"
            })
        );
    }

    #[test]
    fn mpstat_skips_the_aggregate_row() {
        let cores = parse_mpstat(MPSTAT).unwrap();
        assert_eq!(cores.len(), 4);
        assert_eq!(cores[0].core, 0);
        assert!((cores[0].busy - 85.0).abs() < 1e-9);
        assert!((cores[1].busy - 20.0).abs() < 1e-9);
    }

    #[test]
    fn pidstat_commands_may_contain_spaces() {
        let procs = parse_pidstat_processes(PIDSTAT).unwrap();
        assert_eq!(procs.len(), 3);
        assert_eq!(procs[0].pid, 4242);
        assert_eq!(procs[0].total, 92.0);
        assert_eq!(procs[2].command, "Web Content");
    }

    #[test]
    fn pidstat_threads_drop_the_process_row_and_tree_prefix() {
        let threads = parse_pidstat_threads(PIDSTAT_THREADS).unwrap();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].tid, 4242);
        assert_eq!(threads[0].command, "cc1plus");
        assert_eq!(threads[1].total, 30.0);
    }

    #[test]
    fn ps_first_row_is_the_top_process() {
        let top = parse_top_process(PS_TOP).unwrap();
        assert_eq!(top.pid, 4242);
        assert_eq!(top.cpu, 91.7);
        assert_eq!(top.command, "cc1plus");
        assert!(parse_top_process("\n").is_err());
    }

    #[test]
    fn ps_does_not_rank_itself() {
        let listing = " 9001 100.0 ps\n 4242 91.7 cc1plus\n";
        let top = parse_top_process(listing).unwrap();
        assert_eq!(top.pid, 4242);
        assert_eq!(top.command, "cc1plus");
        // a longer command that merely starts with "ps" is kept
        let top = parse_top_process(" 77 50.0 psql\n").unwrap();
        assert_eq!(top.command, "psql");
        assert!(parse_top_process(" 9001 100.0 ps\n").is_err());
    }

    #[test]
    fn iostat_uses_the_last_report() {
        let disks = parse_iostat(IOSTAT).unwrap();
        assert_eq!(disks.len(), 2);
        let sda = &disks[1];
        assert_eq!(sda.device, "sda");
        assert!((sda.await_ms - 25.0).abs() < 1e-9);
        assert_eq!(sda.util, 95.0);
    }

    #[test]
    fn legacy_iostat_has_a_combined_await_column() {
        let disks = parse_iostat(IOSTAT_LEGACY).unwrap();
        assert_eq!(disks[0].device, "vda");
        assert_eq!(disks[0].await_ms, 11.5);
        assert_eq!(disks[0].util, 0.72);
    }

    #[test]
    fn free_reads_memory_and_swap() {
        let mem = parse_free(FREE).unwrap();
        assert_eq!(
            mem,
            MemorySample {
                total: 16000,
                used: 9800,
                free: 1200,
                shared: 300,
                cache: 5000,
                available: 5300,
                swap_total: 2048,
                swap_used: 512,
            }
        );
    }

    #[test]
    fn legacy_free_sums_buffers_and_cached() {
        let mem = parse_free(FREE_LEGACY).unwrap();
        assert_eq!(mem.cache, 900);
        assert_eq!(mem.available, 232 + 900);
        assert_eq!(mem.swap_total, 0);
    }

    #[test]
    fn sar_dev_lists_every_interface() {
        let ifaces = parse_sar_dev(SAR_DEV).unwrap();
        let names: Vec<&str> = ifaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["lo", "eth0", "wlan0"]);
        assert_eq!(ifaces[1].rx_kb, 60000.0);
        assert_eq!(ifaces[1].tx_packets, 39000.0);
    }

    #[test]
    fn sar_tcp_combines_both_tables() {
        let tcp = parse_sar_tcp(SAR_TCP).unwrap();
        assert_eq!(
            tcp,
            TcpSample {
                active: 3.0,
                passive: 7.0,
                retrans: 1.5
            }
        );
    }

    #[test]
    fn sar_tcp_without_etcp_table_is_an_error() {
        let only_tcp = "Average:     active/s passive/s    iseg/s    oseg/s\nAverage:         3.00      7.00    310.00    290.00\n";
        assert!(parse_sar_tcp(only_tcp).is_err());
    }

    #[test]
    fn ss_summary_reads_tcp_states() {
        let summary = parse_ss_summary(SS_SUMMARY).unwrap();
        assert_eq!(summary.total, Some(412));
        assert_eq!(summary.tcp, Some(38));
        assert_eq!(summary.estab, Some(21));
        assert_eq!(summary.closed, Some(9));
        assert_eq!(summary.orphaned, Some(0));
        assert_eq!(summary.timewait, Some(7));
    }

    #[test]
    fn kernel_log_matches_keywords_case_insensitively() {
        let scan = scan_kernel_log(DMESG);
        assert_eq!(scan.total, 4);
        let keywords: Vec<&str> = scan.recent.iter().map(|m| m.keyword).collect();
        assert_eq!(keywords, ["error", "killed", "oom", "error"]);
        assert!(scan.recent[0].line.contains("ACPI Error"));
    }

    #[test]
    fn kernel_log_scan_is_bounded() {
        let mut log = String::new();
        for i in 0..30 {
            log.push_str(&format!("[{i}] device failure {i}\n"));
        }
        for i in 0..100 {
            log.push_str(&format!("[{i}] quiet line\n"));
        }
        assert_eq!(scan_kernel_log(&log), KernelLogScan::default());

        let mut log = String::new();
        for i in 0..25 {
            log.push_str(&format!("task {i} killed\n"));
        }
        let scan = scan_kernel_log(&log);
        assert_eq!(scan.total, 25);
        assert_eq!(scan.recent.len(), KERNEL_LOG_MATCH_LIMIT);
        assert_eq!(scan.recent[0].line, "task 15 killed");
        assert_eq!(scan.recent[9].line, "task 24 killed");
    }
}
