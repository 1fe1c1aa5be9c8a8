//! # Process resource metrics.
//!
//! Snapshot of the current process read through `sysinfo`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};

const MIB: u64 = 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetrics {
    pub pid: u32,
    /// Resident set size (MB).
    #[serde(rename = "rssMB")]
    pub rss_mb: u64,
    #[serde(rename = "virtualMB")]
    pub virtual_mb: u64,
    /// Percent of one CPU since the previous refresh; `0.0` on a first sample.
    pub cpu_usage: f32,
    pub uptime_secs: u64,
    /// Unix epoch milliseconds.
    pub timestamp_ms: u64,
}

impl ProcessMetrics {
    /// Samples the current process. `None` if the platform does not expose it.
    pub fn sample() -> Option<Self> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let process = sys.process(pid)?;

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Some(Self {
            pid: pid.as_u32(),
            rss_mb: process.memory() / MIB,
            virtual_mb: process.virtual_memory() / MIB,
            cpu_usage: process.cpu_usage(),
            uptime_secs: process.run_time(),
            timestamp_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_sample_current_process() {
        let m = ProcessMetrics::sample().expect("current process is visible");
        assert_eq!(m.pid, std::process::id());
        assert!(m.rss_mb <= m.virtual_mb);
        assert!(m.timestamp_ms > 0);
    }
}
