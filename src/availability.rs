//! Tool availability tracking for perfcheck-rs.
//!
//! This module probes which of the external tools are installed, so the
//! driver can refuse to start without the core set and the checks can
//! skip work that depends on a missing secondary tool.

use tracing::info;

use crate::host::{Host, Tool};

/// Tracks which tools are available.
#[derive(Default, Clone, Debug)]
pub struct ToolAvailability {
    /// `uptime` (procps)
    pub uptime: bool,
    /// `dmesg` (util-linux)
    pub dmesg: bool,
    /// `vmstat` (procps)
    pub vmstat: bool,
    /// `mpstat` (sysstat)
    pub mpstat: bool,
    /// `pidstat` (sysstat)
    pub pidstat: bool,
    /// `iostat` (sysstat)
    pub iostat: bool,
    /// `free` (procps)
    pub free: bool,
    /// `sar` (sysstat)
    pub sar: bool,
    /// `ps` (procps)
    pub ps: bool,
    /// `ss` (iproute2)
    pub ss: bool,
    /// Running with an effective uid of 0
    pub privileged: bool,
}

impl ToolAvailability {
    /// Probe every tool and return availability status.
    pub fn probe(host: &dyn Host) -> Self {
        let mut availability = Self {
            privileged: host.is_privileged(),
            ..Self::default()
        };
        for tool in Tool::ALL {
            availability.set(tool, host.is_available(tool));
        }
        info!(
            privileged = availability.privileged,
            missing = ?availability.missing(),
            "probed tools"
        );
        availability
    }

    /// Whether `tool` was found.
    pub fn has(&self, tool: Tool) -> bool {
        match tool {
            Tool::Uptime => self.uptime,
            Tool::Dmesg => self.dmesg,
            Tool::Vmstat => self.vmstat,
            Tool::Mpstat => self.mpstat,
            Tool::Pidstat => self.pidstat,
            Tool::Iostat => self.iostat,
            Tool::Free => self.free,
            Tool::Sar => self.sar,
            Tool::Ps => self.ps,
            Tool::Ss => self.ss,
        }
    }

    fn set(&mut self, tool: Tool, found: bool) {
        let slot = match tool {
            Tool::Uptime => &mut self.uptime,
            Tool::Dmesg => &mut self.dmesg,
            Tool::Vmstat => &mut self.vmstat,
            Tool::Mpstat => &mut self.mpstat,
            Tool::Pidstat => &mut self.pidstat,
            Tool::Iostat => &mut self.iostat,
            Tool::Free => &mut self.free,
            Tool::Sar => &mut self.sar,
            Tool::Ps => &mut self.ps,
            Tool::Ss => &mut self.ss,
        };
        *slot = found;
    }

    /// Every tool that was not found.
    pub fn missing(&self) -> Vec<Tool> {
        Tool::ALL.into_iter().filter(|t| !self.has(*t)).collect()
    }

    /// Missing tools the report cannot run without.
    pub fn missing_core(&self) -> Vec<Tool> {
        self.missing().into_iter().filter(|t| t.is_core()).collect()
    }

    /// Generate warnings for missing secondary tools and limited privileges.
    pub fn get_warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .missing()
            .into_iter()
            .filter(|t| !t.is_core())
            .map(|t| {
                format!(
                    "{} not found (install {}); dependent checks will be skipped",
                    t,
                    t.package()
                )
            })
            .collect();

        if !self.privileged {
            warnings.push(
                "Not running as root: kernel log and other users' processes may be hidden".into(),
            );
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::FakeHost;

    #[test]
    fn probe_records_missing_tools() {
        let host = FakeHost::new(4).missing(Tool::Sar).missing(Tool::Ss);
        let availability = ToolAvailability::probe(&host);
        assert!(availability.has(Tool::Vmstat));
        assert!(!availability.has(Tool::Sar));
        assert_eq!(availability.missing(), vec![Tool::Sar, Tool::Ss]);
        assert_eq!(availability.missing_core(), vec![Tool::Sar]);
    }

    #[test]
    fn secondary_tools_only_produce_warnings() {
        let host = FakeHost::new(4).missing(Tool::Pidstat).privileged();
        let availability = ToolAvailability::probe(&host);
        assert!(availability.missing_core().is_empty());
        let warnings = availability.get_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("pidstat not found (install sysstat)"));
    }

    #[test]
    fn unprivileged_runs_are_flagged() {
        let availability = ToolAvailability::probe(&FakeHost::new(2));
        assert!(!availability.privileged);
        assert!(availability
            .get_warnings()
            .iter()
            .any(|w| w.contains("Not running as root")));
    }
}
