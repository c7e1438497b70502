//! Process provider backed by procfs
//!
//! Enumeration reads `/proc/<pid>/stat`, CPU time comes from its
//! `utime`/`stime` clock-tick counters and termination sends SIGKILL.
//! There are no long-lived handles on Linux; each call opens and closes
//! the proc files it reads.

use std::path::Path;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use procfs::process::{all_processes, Process};
use procfs::ProcError;
use tracing::{debug, info};

use super::cpu::clock_ticks_to_duration;
use super::error::{ProviderError, ProviderResult};
use super::processes::{CpuTimeSample, ProcessProvider, ProcessRecord};

/// Process provider for Linux.
#[derive(Debug, Clone, Copy)]
pub struct LinuxProvider {
    /// Kernel clock ticks per second, fixed for the life of the process
    ticks_per_second: u64,
}

impl LinuxProvider {
    pub fn new() -> Self {
        Self {
            ticks_per_second: procfs::ticks_per_second(),
        }
    }

    fn open(pid: u32) -> ProviderResult<Process> {
        let raw = i32::try_from(pid).map_err(|_| ProviderError::ProcessNotFound { pid })?;
        Process::new(raw).map_err(|e| classify(pid, e))
    }
}

impl Default for LinuxProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(pid: u32, err: ProcError) -> ProviderError {
    match err {
        ProcError::NotFound(_) => ProviderError::ProcessNotFound { pid },
        ProcError::PermissionDenied(path) => ProviderError::AccessDenied {
            pid,
            message: match path {
                Some(path) => format!("cannot read {}", path.display()),
                None => "permission denied".to_string(),
            },
        },
        other => ProviderError::Query {
            pid,
            message: other.to_string(),
        },
    }
}

/// Suffix the kernel appends to `/proc/<pid>/exe` once the binary is unlinked
const DELETED_SUFFIX: &str = " (deleted)";

/// Base name of an `exe` link target. A binary replaced or removed while
/// running keeps its original name.
fn exe_base_name(exe: &Path) -> Option<String> {
    let name = exe.file_name()?.to_string_lossy();
    let name = name.strip_suffix(DELETED_SUFFIX).unwrap_or(&name);
    Some(name.to_string())
}

/// Base name of the running binary, or the kernel's `comm` when the
/// executable link is unreadable (kernel threads, other users' processes).
fn executable_name(process: &Process, comm: String) -> String {
    process
        .exe()
        .ok()
        .as_deref()
        .and_then(exe_base_name)
        .unwrap_or(comm)
}

impl ProcessProvider for LinuxProvider {
    fn enumerate_all(&self) -> ProviderResult<Vec<ProcessRecord>> {
        let mut processes = Vec::new();

        for process in all_processes().map_err(ProviderError::enumeration)? {
            // Entries can disappear between readdir and open.
            let Ok(process) = process else { continue };
            let stat = match process.stat() {
                Ok(stat) => stat,
                Err(e) => {
                    debug!(pid = process.pid, error = %e, "Skipping unreadable process");
                    continue;
                }
            };

            let name = executable_name(&process, stat.comm);
            processes.push(ProcessRecord::new(stat.pid as u32, stat.ppid as u32, name));
        }

        Ok(processes)
    }

    fn find_by_id(&self, pid: u32) -> ProviderResult<Option<ProcessRecord>> {
        let process = match Self::open(pid) {
            Ok(process) => process,
            Err(ProviderError::ProcessNotFound { .. }) => return Ok(None),
            Err(e) => return Err(ProviderError::enumeration(e)),
        };
        // /proc/<tid> opens for threads too, but only group leaders are processes.
        match process.status() {
            Ok(status) if status.tgid as u32 != pid => return Ok(None),
            Ok(_) => {}
            Err(ProcError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(ProviderError::enumeration(e)),
        }
        match process.stat() {
            Ok(stat) => {
                let name = executable_name(&process, stat.comm);
                Ok(Some(ProcessRecord::new(pid, stat.ppid as u32, name)))
            }
            Err(ProcError::NotFound(_)) => Ok(None),
            Err(e) => Err(ProviderError::enumeration(e)),
        }
    }

    fn query_cpu_time(&self, record: &ProcessRecord) -> ProviderResult<CpuTimeSample> {
        let pid = record.pid;
        let stat = Self::open(pid)?.stat().map_err(|e| classify(pid, e))?;

        Ok(CpuTimeSample::new(
            clock_ticks_to_duration(stat.utime, self.ticks_per_second),
            clock_ticks_to_duration(stat.stime, self.ticks_per_second),
        ))
    }

    fn terminate(&self, record: &ProcessRecord) -> ProviderResult<()> {
        let pid = record.pid;
        let raw = match i32::try_from(pid) {
            Ok(0) => {
                return Err(ProviderError::AccessDenied {
                    pid,
                    message: "pid 0 addresses the caller's process group".to_string(),
                })
            }
            Ok(raw) => raw,
            Err(_) => return Err(ProviderError::ProcessNotFound { pid }),
        };

        kill(Pid::from_raw(raw), Signal::SIGKILL).map_err(|errno| match errno {
            Errno::ESRCH => ProviderError::ProcessNotFound { pid },
            Errno::EPERM => ProviderError::AccessDenied {
                pid,
                message: errno.desc().to_string(),
            },
            other => ProviderError::Termination {
                pid,
                message: other.desc().to_string(),
            },
        })?;

        info!(pid, name = %record.name, "SIGKILL sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::Command;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_enumerate_finds_own_process() {
        let processes = LinuxProvider::new()
            .enumerate_all()
            .expect("Should enumerate processes");
        let current_pid = std::process::id();
        let me = processes
            .iter()
            .find(|p| p.pid == current_pid)
            .expect("Should find our own process");
        // Kernel threads keep slashes in `comm`, so only check ourselves
        assert!(!me.name.is_empty());
        assert!(!me.name.contains('/'));
    }

    #[test]
    fn test_exe_base_name() {
        assert_eq!(
            exe_base_name(Path::new("/usr/bin/leaker")).as_deref(),
            Some("leaker")
        );
        assert_eq!(
            exe_base_name(Path::new("/tmp/leaker (deleted)")).as_deref(),
            Some("leaker")
        );
        assert_eq!(
            exe_base_name(Path::new("/opt/my app/leaker")).as_deref(),
            Some("leaker")
        );
        assert_eq!(exe_base_name(Path::new("/")), None);
    }

    #[test]
    fn test_find_by_id_ignores_threads() {
        let (tx, rx) = mpsc::channel::<()>();
        let worker = thread::spawn(move || {
            let _ = rx.recv();
        });

        let pid = std::process::id();
        let tid = Process::myself()
            .unwrap()
            .tasks()
            .unwrap()
            .flatten()
            .map(|task| task.tid as u32)
            .find(|&tid| tid != pid)
            .expect("Should have a second thread");

        let provider = LinuxProvider::new();
        let found = provider.find_by_id(tid).unwrap();
        let listed = provider.enumerate_all().unwrap().iter().any(|p| p.pid == tid);

        tx.send(()).unwrap();
        worker.join().unwrap();

        assert!(found.is_none());
        assert!(!listed);
    }

    #[test]
    fn test_find_by_id() {
        let provider = LinuxProvider::new();
        let me = provider
            .find_by_id(std::process::id())
            .unwrap()
            .expect("Should find our own process");
        assert_eq!(me.pid, std::process::id());
        assert_eq!(me.parent_pid, std::os::unix::process::parent_id());
        assert!(provider.find_by_id(u32::MAX).unwrap().is_none());
    }

    #[test]
    fn test_own_cpu_time_is_non_decreasing() {
        let provider = LinuxProvider::new();
        let me = provider.find_by_id(std::process::id()).unwrap().unwrap();

        let first = provider.query_cpu_time(&me).expect("Should read own CPU time");
        let mut x = 0u64;
        for i in 0..5_000_000u64 {
            x = x.wrapping_mul(31).wrapping_add(i);
        }
        assert_ne!(x, 1);
        let second = provider.query_cpu_time(&me).expect("Should read own CPU time");

        assert!(second.user_time >= first.user_time);
        assert!(second.system_time >= first.system_time);
    }

    #[test]
    fn test_query_missing_process() {
        let mut child = Command::new("true").spawn().expect("Should spawn child");
        let pid = child.id();
        child.wait().expect("Should reap child");

        let record = ProcessRecord::new(pid, 1, "true");
        let err = LinuxProvider::new().query_cpu_time(&record).unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
    }

    #[test]
    fn test_query_out_of_range_pid() {
        let record = ProcessRecord::new(u32::MAX, 1, "ghost");
        let err = LinuxProvider::new().query_cpu_time(&record).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_refuses_pid_zero() {
        let record = ProcessRecord::new(0, 0, "swapper");
        let err = LinuxProvider::new().terminate(&record).unwrap_err();
        assert!(matches!(err, ProviderError::AccessDenied { pid: 0, .. }));
    }

    #[test]
    fn test_terminate_child() {
        let mut child = Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("Should spawn child");

        let provider = LinuxProvider::new();
        let record = provider
            .find_by_id(child.id())
            .unwrap()
            .expect("Child should be enumerable");

        provider.terminate(&record).expect("Should terminate child");

        let status = child.wait().expect("Should reap child");
        assert_eq!(status.signal(), Some(Signal::SIGKILL as i32));

        // Reaped, so the pid is gone
        assert!(provider.terminate(&record).unwrap_err().is_not_found());
    }
}
