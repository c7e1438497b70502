//! Process records, CPU-time samples and the provider contract
//!
//! A `ProcessProvider` hides the platform mechanics of listing, measuring
//! and killing processes. Records and samples are plain values created
//! fresh on every call; none of them holds an OS resource.

use std::fmt;
use std::time::Duration;

use super::error::ProviderResult;

/// Point-in-time snapshot of one process's identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    /// Process ID (recycled by the OS over time)
    pub pid: u32,
    /// Parent process ID, possibly of a process that no longer exists
    pub parent_pid: u32,
    /// Executable base name (e.g., "notepad.exe"), never a path
    pub name: String,
}

impl ProcessRecord {
    pub fn new(pid: u32, parent_pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            parent_pid,
            name: name.into(),
        }
    }
}

impl fmt::Display for ProcessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (pid {}, ppid {})", self.name, self.pid, self.parent_pid)
    }
}

/// Cumulative CPU time of a process since its creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimeSample {
    /// Time spent in user mode
    pub user_time: Duration,
    /// Time spent in kernel mode
    pub system_time: Duration,
}

impl CpuTimeSample {
    pub fn new(user_time: Duration, system_time: Duration) -> Self {
        Self {
            user_time,
            system_time,
        }
    }

    /// User plus kernel time, saturating instead of overflowing.
    pub fn total(&self) -> Duration {
        self.user_time.saturating_add(self.system_time)
    }
}

/// Platform abstraction for enumerating, measuring and terminating processes.
///
/// Implementations acquire and release every OS handle inside the call that
/// needs it. Nothing is cached between calls.
pub trait ProcessProvider {
    /// Lists every live process. The result is a snapshot and may race
    /// with processes starting or exiting.
    fn enumerate_all(&self) -> ProviderResult<Vec<ProcessRecord>>;

    /// Reads the cumulative user and kernel time of `record`.
    fn query_cpu_time(&self, record: &ProcessRecord) -> ProviderResult<CpuTimeSample>;

    /// Kills `record` immediately. Does not wait for the exit to complete.
    fn terminate(&self, record: &ProcessRecord) -> ProviderResult<()>;

    /// Looks up a single process by PID.
    ///
    /// Returns `Ok(None)` when no such process exists; errors only when the
    /// enumeration itself fails.
    fn find_by_id(&self, pid: u32) -> ProviderResult<Option<ProcessRecord>> {
        Ok(self.enumerate_all()?.into_iter().find(|p| p.pid == pid))
    }

    /// Returns the processes whose executable name equals `name` exactly
    /// (case-sensitive), in enumeration order.
    fn filter_by_executable_name(&self, name: &str) -> ProviderResult<Vec<ProcessRecord>> {
        Ok(self
            .enumerate_all()?
            .into_iter()
            .filter(|p| p.name == name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::fake::FakeProvider;

    fn table() -> Vec<ProcessRecord> {
        vec![
            ProcessRecord::new(4, 0, "System"),
            ProcessRecord::new(100, 4, "leaker.exe"),
            ProcessRecord::new(200, 4, "Leaker.exe"),
            ProcessRecord::new(300, 100, "leaker.exe"),
        ]
    }

    #[test]
    fn test_total_adds_user_and_system() {
        let sample = CpuTimeSample::new(Duration::from_millis(300), Duration::from_millis(100));
        assert_eq!(sample.total(), Duration::from_millis(400));
    }

    #[test]
    fn test_total_saturates() {
        let sample = CpuTimeSample::new(Duration::MAX, Duration::from_secs(1));
        assert_eq!(sample.total(), Duration::MAX);
    }

    #[test]
    fn test_filter_is_exact_and_keeps_order() {
        let provider = FakeProvider::with_table(table());
        let matches = provider.filter_by_executable_name("leaker.exe").unwrap();
        let pids: Vec<u32> = matches.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![100, 300]);
    }

    #[test]
    fn test_filter_is_subset_of_enumeration() {
        let provider = FakeProvider::with_table(table());
        let all = provider.enumerate_all().unwrap();
        let expected: Vec<_> = all.into_iter().filter(|p| p.name == "System").collect();
        assert_eq!(provider.filter_by_executable_name("System").unwrap(), expected);
    }

    #[test]
    fn test_filter_without_match_is_empty() {
        let provider = FakeProvider::with_table(table());
        assert!(provider.filter_by_executable_name("notepad.exe").unwrap().is_empty());
    }

    #[test]
    fn test_find_by_id() {
        let provider = FakeProvider::with_table(table());
        let found = provider.find_by_id(200).unwrap().expect("pid 200 exists");
        assert_eq!(found.pid, 200);
        assert_eq!(found.name, "Leaker.exe");
        assert!(provider.find_by_id(999).unwrap().is_none());
    }

    #[test]
    fn test_enumeration_failure_propagates() {
        let provider = FakeProvider::with_table(table());
        provider.fail_enumeration();
        assert!(provider.find_by_id(4).is_err());
        assert!(provider.filter_by_executable_name("System").is_err());
    }

    #[test]
    fn test_display() {
        let record = ProcessRecord::new(100, 4, "leaker.exe");
        assert_eq!(record.to_string(), "leaker.exe (pid 100, ppid 4)");
    }
}
