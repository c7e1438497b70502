//! System module - process enumeration, CPU-time queries and termination
//!
//! `ProcessProvider` is the platform-agnostic contract; `NativeProvider`
//! names the implementation for the platform being compiled.

pub mod cpu;
pub mod error;
pub mod processes;

#[cfg(test)]
pub(crate) mod fake;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(windows)]
mod win32;

pub use error::ProviderError;
pub use processes::{CpuTimeSample, ProcessProvider, ProcessRecord};

#[cfg(target_os = "linux")]
pub use linux::LinuxProvider as NativeProvider;

#[cfg(windows)]
pub use win32::WindowsProvider as NativeProvider;

#[cfg(not(any(windows, target_os = "linux")))]
compile_error!("no process provider is implemented for this platform");
