//! Report model, console rendering and CSV export.
//!
//! A [`Report`] is a list of [`Section`]s, one per check in run order.
//! Each section mixes plain display text (the tool tables the verdicts are
//! based on) with [`Finding`]s. Sections are printed as soon as their
//! check completes; the summary at the end repeats every finding that
//! needs attention, critical first.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Local};
use crossterm::style::{Color, Stylize};
use serde::Serialize;
use thiserror::Error;

use crate::checks::CheckKind;
use crate::thresholds::Severity;

/// One classified observation.
#[derive(Clone, Debug, PartialEq)]
pub struct Finding {
    pub severity: Severity,
    /// What the verdict is about (a device, an interface, "swap", ...)
    pub subject: String,
    pub message: String,
}

/// A line of section output.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    /// Display-only text
    Text(String),
    Finding(Finding),
}

/// Output of a single check.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub check: CheckKind,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn new(check: CheckKind) -> Self {
        Self {
            check,
            entries: Vec::new(),
        }
    }

    /// Append display-only text.
    pub fn text(&mut self, line: impl Into<String>) {
        self.entries.push(Entry::Text(line.into()));
    }

    /// Append a finding.
    pub fn finding(
        &mut self,
        severity: Severity,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.entries.push(Entry::Finding(Finding {
            severity,
            subject: subject.into(),
            message: message.into(),
        }));
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Finding(f) => Some(f),
            Entry::Text(_) => None,
        })
    }

    /// Worst severity among the findings, `Normal` when there are none.
    pub fn worst(&self) -> Severity {
        self.findings()
            .map(|f| f.severity)
            .min_by_key(|s| s.rank())
            .unwrap_or_default()
    }
}

/// The whole run.
#[derive(Clone, Debug)]
pub struct Report {
    pub started_at: DateTime<Local>,
    pub cpu_count: Option<usize>,
    pub privileged: bool,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn new(cpu_count: Option<usize>, privileged: bool) -> Self {
        Self {
            started_at: Local::now(),
            cpu_count,
            privileged,
            sections: Vec::new(),
        }
    }

    /// Findings that need attention, critical first, in run order otherwise.
    pub fn attention(&self) -> Vec<(CheckKind, &Finding)> {
        let mut items: Vec<(CheckKind, &Finding)> = self
            .sections
            .iter()
            .flat_map(|s| s.findings().map(move |f| (s.check, f)))
            .filter(|(_, f)| f.severity != Severity::Normal)
            .collect();
        items.sort_by_key(|(_, f)| f.severity.rank());
        items
    }
}

/// Applies colors when enabled.
#[derive(Clone, Copy, Debug)]
pub struct Painter {
    pub color: bool,
}

impl Painter {
    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.with(Color::Cyan).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn severity(&self, severity: Severity) -> String {
        let tag = format!("[{:<4}]", severity.label());
        let color = match severity {
            Severity::Normal => Color::Green,
            Severity::Warning => Color::Yellow,
            Severity::Critical => Color::Red,
            Severity::Unknown => Color::Magenta,
        };
        self.paint(&tag, color)
    }
}

/// Print the banner that opens the report.
pub fn render_banner(out: &mut impl Write, report: &Report, painter: Painter) -> io::Result<()> {
    writeln!(out, "{}", painter.heading("perfcheck-rs - Linux Performance Triage"))?;
    writeln!(out, "=======================================")?;
    writeln!(
        out,
        "Started: {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    match report.cpu_count {
        Some(n) => writeln!(out, "CPUs:    {}", n)?,
        None => writeln!(out, "CPUs:    unknown")?,
    }
    writeln!(
        out,
        "Root:    {}",
        if report.privileged { "yes" } else { "no" }
    )?;
    Ok(())
}

/// Print one check's section.
pub fn render_section(out: &mut impl Write, section: &Section, painter: Painter) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        painter.heading(&format!("=== {} ===", section.check.title()))
    )?;
    for entry in &section.entries {
        match entry {
            Entry::Text(line) => writeln!(out, "  {}", line)?,
            Entry::Finding(f) => writeln!(
                out,
                "  {} {}: {}",
                painter.severity(f.severity),
                f.subject,
                f.message
            )?,
        }
    }
    Ok(())
}

/// Print the closing summary of everything that needs attention.
pub fn render_summary(out: &mut impl Write, report: &Report, painter: Painter) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", painter.heading("=== Summary ==="))?;
    let attention = report.attention();
    if attention.is_empty() {
        writeln!(
            out,
            "  {} No likely bottlenecks detected",
            painter.severity(Severity::Normal)
        )?;
    }
    for (check, f) in attention {
        writeln!(
            out,
            "  {} {} / {}: {}",
            painter.severity(f.severity),
            check.title(),
            f.subject,
            f.message
        )?;
    }
    Ok(())
}

/// One CSV row per finding.
#[derive(Serialize, Debug)]
struct FindingRecord<'a> {
    timestamp: String,
    check: &'static str,
    subject: &'a str,
    severity: Severity,
    message: &'a str,
}

/// Failure to export findings.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write findings: {0}")]
    Csv(#[from] csv::Error),
}

/// Append every finding of `report` to the CSV file at `path`.
///
/// The header row is only written when the file is new. Returns the
/// number of rows written.
pub fn append_findings(path: &str, report: &Report) -> Result<usize, ExportError> {
    let exists = Path::new(path).exists();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|source| ExportError::Io {
            path: path.to_string(),
            source,
        })?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(!exists)
        .from_writer(file);
    let written = write_findings(&mut writer, report)?;
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_string(),
        source,
    })?;
    Ok(written)
}

fn write_findings<W: Write>(writer: &mut csv::Writer<W>, report: &Report) -> Result<usize, csv::Error> {
    let timestamp = report.started_at.to_rfc3339();
    let mut written = 0;
    for section in &report.sections {
        for f in section.findings() {
            writer.serialize(FindingRecord {
                timestamp: timestamp.clone(),
                check: section.check.name(),
                subject: &f.subject,
                severity: f.severity,
                message: &f.message,
            })?;
            written += 1;
        }
    }
    Ok(written)
}
