//! Safe RAII wrappers for Windows HANDLEs
//!
//! These wrappers ensure that handles are closed on every exit path of the
//! call that opened them, including early returns on error.

use tracing::debug;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{OpenProcess, PROCESS_ACCESS_RIGHTS};

/// A safe wrapper around a Windows process HANDLE.
/// Automatically closes the handle when dropped.
pub struct ProcessHandle(HANDLE);

impl ProcessHandle {
    /// Opens a process by PID with the specified access rights.
    ///
    /// # Returns
    /// * `Ok(ProcessHandle)` - A wrapped handle to the process
    /// * `Err` - If the process cannot be opened (access denied, process exited, etc.)
    pub fn open(pid: u32, access: PROCESS_ACCESS_RIGHTS) -> windows::core::Result<Self> {
        // SAFETY: OpenProcess is safe to call with valid parameters.
        // We handle the error case where the handle is invalid.
        let handle = unsafe { OpenProcess(access, false, pid)? };
        Ok(Self(handle))
    }

    /// Opens a process with the first access level the OS grants.
    ///
    /// `levels` is ordered from most to least privileged. The error of the
    /// last attempt is returned when every level is refused.
    pub fn open_with_fallback(
        pid: u32,
        levels: &[PROCESS_ACCESS_RIGHTS],
    ) -> windows::core::Result<Self> {
        let mut last_err = None;

        for &access in levels {
            match Self::open(pid, access) {
                Ok(handle) => return Ok(handle),
                Err(e) => {
                    debug!(pid, access = access.0, error = %e, "OpenProcess refused, trying next level");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(windows::core::Error::from_win32))
    }

    /// Returns the raw HANDLE for use with Win32 APIs.
    ///
    /// The caller must not use the value after the ProcessHandle is dropped.
    pub fn as_raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: We own this handle and it's valid (we got it from OpenProcess).
        // CloseHandle is safe to call on a valid handle exactly once.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// A safe wrapper around a ToolHelp32 snapshot HANDLE.
/// Automatically closes the handle when dropped.
pub struct SnapshotHandle(HANDLE);

impl SnapshotHandle {
    /// Creates a snapshot of all processes in the system.
    pub fn create_process_snapshot() -> windows::core::Result<Self> {
        // SAFETY: CreateToolhelp32Snapshot is safe to call.
        // The second parameter (0) is ignored for process snapshots.
        let handle = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)? };
        Ok(Self(handle))
    }

    /// Returns the raw HANDLE for use with Win32 APIs.
    pub fn as_raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for SnapshotHandle {
    fn drop(&mut self) {
        // SAFETY: We own this handle and it's valid.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}
