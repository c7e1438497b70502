//! Kill decisions

use std::time::Duration;

use crate::system::{CpuTimeSample, ProviderError};

/// True when the sample's user + system time is strictly above `threshold`.
#[must_use]
pub fn should_terminate(sample: &CpuTimeSample, threshold: Duration) -> bool {
    sample.total() > threshold
}

/// How the loop treats a process that exited between enumeration and use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VanishedPolicy {
    /// Any provider error ends the watchdog
    #[default]
    Fatal,
    /// `ProcessNotFound` is logged and the process skipped
    Skip,
}

impl VanishedPolicy {
    pub fn from_skip_flag(skip: bool) -> Self {
        if skip {
            VanishedPolicy::Skip
        } else {
            VanishedPolicy::Fatal
        }
    }

    /// Returns true when `err` may be swallowed under this policy.
    pub fn tolerates(self, err: &ProviderError) -> bool {
        self == VanishedPolicy::Skip && err.is_not_found()
    }
}
