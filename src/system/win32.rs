//! Process provider backed by the ToolHelp32 and process-handle APIs
//!
//! Enumeration walks a CreateToolhelp32Snapshot with Process32FirstW/NextW.
//! CPU time comes from GetProcessTimes and termination from TerminateProcess.
//! Every handle is wrapped in an RAII type from `crate::ffi` and closed
//! before the call returns.

use std::mem;

use tracing::info;
use windows::Win32::Foundation::{ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER, FILETIME};
use windows::Win32::System::Diagnostics::ToolHelp::{
    Process32FirstW, Process32NextW, PROCESSENTRY32W,
};
use windows::Win32::System::Threading::{
    GetProcessTimes, TerminateProcess, PROCESS_ACCESS_RIGHTS, PROCESS_QUERY_INFORMATION,
    PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_TERMINATE, PROCESS_VM_READ,
};

use super::cpu::filetime_to_duration;
use super::error::{ProviderError, ProviderResult};
use super::processes::{CpuTimeSample, ProcessProvider, ProcessRecord};
use crate::ffi::{ProcessHandle, SnapshotHandle};

/// Access levels tried for timing queries, from broader to more limited.
/// PROCESS_QUERY_LIMITED_INFORMATION is enough for GetProcessTimes and is
/// granted for many protected processes that refuse the others.
const QUERY_ACCESS_LEVELS: [PROCESS_ACCESS_RIGHTS; 3] = [
    PROCESS_ACCESS_RIGHTS(PROCESS_QUERY_INFORMATION.0 | PROCESS_VM_READ.0),
    PROCESS_QUERY_INFORMATION,
    PROCESS_QUERY_LIMITED_INFORMATION,
];

/// Exit code handed to TerminateProcess
const KILLED_EXIT_CODE: u32 = 1;

/// PIDs of the System Idle Process and the System process
const SYSTEM_PIDS: [u32; 2] = [0, 4];

/// Process provider for Windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsProvider;

impl WindowsProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Creates a ProcessRecord from a PROCESSENTRY32W struct
fn record_from_entry(entry: &PROCESSENTRY32W) -> ProcessRecord {
    ProcessRecord::new(
        entry.th32ProcessID,
        entry.th32ParentProcessID,
        wide_to_string(&entry.szExeFile),
    )
}

/// Converts a null-terminated wide string (u16 slice) to a Rust String
fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

/// Sorts an OpenProcess/TerminateProcess failure into the provider taxonomy.
///
/// OpenProcess reports ERROR_INVALID_PARAMETER for a PID that does not exist.
fn classify(
    pid: u32,
    err: windows::core::Error,
    otherwise: fn(u32, String) -> ProviderError,
) -> ProviderError {
    let code = err.code();
    if code == ERROR_ACCESS_DENIED.to_hresult() {
        ProviderError::AccessDenied {
            pid,
            message: err.message(),
        }
    } else if code == ERROR_INVALID_PARAMETER.to_hresult() {
        ProviderError::ProcessNotFound { pid }
    } else {
        otherwise(pid, err.message())
    }
}

fn query_error(pid: u32, message: String) -> ProviderError {
    ProviderError::Query { pid, message }
}

fn termination_error(pid: u32, message: String) -> ProviderError {
    ProviderError::Termination { pid, message }
}

fn refuse_system_process(pid: u32) -> ProviderResult<()> {
    if SYSTEM_PIDS.contains(&pid) {
        return Err(ProviderError::AccessDenied {
            pid,
            message: "system processes cannot be opened".to_string(),
        });
    }
    Ok(())
}

impl ProcessProvider for WindowsProvider {
    fn enumerate_all(&self) -> ProviderResult<Vec<ProcessRecord>> {
        let snapshot =
            SnapshotHandle::create_process_snapshot().map_err(ProviderError::enumeration)?;
        let mut processes = Vec::with_capacity(256);

        // dwSize must be set before the first call
        let mut entry = PROCESSENTRY32W {
            dwSize: mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        // SAFETY: We have a valid snapshot handle and properly initialized entry.
        unsafe { Process32FirstW(snapshot.as_raw(), &mut entry) }
            .map_err(ProviderError::enumeration)?;

        loop {
            processes.push(record_from_entry(&entry));

            // SAFETY: Same as above - valid handle and initialized struct.
            // The walk ends with ERROR_NO_MORE_FILES.
            if unsafe { Process32NextW(snapshot.as_raw(), &mut entry) }.is_err() {
                break;
            }
        }

        Ok(processes)
    }

    fn query_cpu_time(&self, record: &ProcessRecord) -> ProviderResult<CpuTimeSample> {
        let pid = record.pid;
        refuse_system_process(pid)?;

        let handle = ProcessHandle::open_with_fallback(pid, &QUERY_ACCESS_LEVELS)
            .map_err(|e| classify(pid, e, query_error))?;

        let mut creation_time = FILETIME::default();
        let mut exit_time = FILETIME::default();
        let mut kernel_time = FILETIME::default();
        let mut user_time = FILETIME::default();

        // SAFETY: GetProcessTimes is safe with a valid handle and pointers.
        unsafe {
            GetProcessTimes(
                handle.as_raw(),
                &mut creation_time,
                &mut exit_time,
                &mut kernel_time,
                &mut user_time,
            )
        }
        .map_err(|e| query_error(pid, e.message()))?;

        Ok(CpuTimeSample::new(
            filetime_to_duration(user_time.dwHighDateTime, user_time.dwLowDateTime),
            filetime_to_duration(kernel_time.dwHighDateTime, kernel_time.dwLowDateTime),
        ))
    }

    fn terminate(&self, record: &ProcessRecord) -> ProviderResult<()> {
        let pid = record.pid;
        refuse_system_process(pid)?;

        let handle = ProcessHandle::open(pid, PROCESS_TERMINATE)
            .map_err(|e| classify(pid, e, termination_error))?;

        // SAFETY: TerminateProcess is safe with a handle opened for PROCESS_TERMINATE.
        unsafe { TerminateProcess(handle.as_raw(), KILLED_EXIT_CODE) }
            .map_err(|e| classify(pid, e, termination_error))?;

        info!(pid, name = %record.name, "TerminateProcess issued");
        Ok(())
    }
}
