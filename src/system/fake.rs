//! Scripted provider for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::processes::{CpuTimeSample, ProcessProvider, ProcessRecord};

#[derive(Debug, Clone, Copy)]
enum Failure {
    NotFound,
    AccessDenied,
}

impl Failure {
    fn into_error(self, pid: u32) -> ProviderError {
        match self {
            Failure::NotFound => ProviderError::ProcessNotFound { pid },
            Failure::AccessDenied => ProviderError::AccessDenied {
                pid,
                message: "scripted denial".to_string(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct FakeProviderState {
    table: Vec<ProcessRecord>,
    samples: HashMap<u32, CpuTimeSample>,
    query_failures: HashMap<u32, Failure>,
    terminate_failures: HashMap<u32, Failure>,
    enumeration_fails: bool,
    queried: Vec<u32>,
    terminated: Vec<u32>,
}

/// Fake process table whose answers are scripted by the test.
///
/// Clones share the same state, so a test can keep one clone to inspect
/// recorded queries and terminations after handing another to a `Watchdog`.
#[derive(Clone, Debug, Default)]
pub(crate) struct FakeProvider {
    state: Arc<Mutex<FakeProviderState>>,
}

impl FakeProvider {
    pub(crate) fn with_table(table: Vec<ProcessRecord>) -> Self {
        let provider = Self::default();
        provider.state().table = table;
        provider
    }

    fn state(&self) -> MutexGuard<'_, FakeProviderState> {
        self.state
            .lock()
            .expect("FakeProvider state lock should not be poisoned")
    }

    /// Sets the sample returned for `pid`, in milliseconds of user and system time.
    pub(crate) fn set_sample(&self, pid: u32, user_ms: u64, system_ms: u64) {
        self.state().samples.insert(
            pid,
            CpuTimeSample::new(
                Duration::from_millis(user_ms),
                Duration::from_millis(system_ms),
            ),
        );
    }

    pub(crate) fn vanish_before_query(&self, pid: u32) {
        self.state().query_failures.insert(pid, Failure::NotFound);
    }

    pub(crate) fn deny_query(&self, pid: u32) {
        self.state().query_failures.insert(pid, Failure::AccessDenied);
    }

    pub(crate) fn vanish_before_terminate(&self, pid: u32) {
        self.state().terminate_failures.insert(pid, Failure::NotFound);
    }

    pub(crate) fn deny_terminate(&self, pid: u32) {
        self.state()
            .terminate_failures
            .insert(pid, Failure::AccessDenied);
    }

    pub(crate) fn fail_enumeration(&self) {
        self.state().enumeration_fails = true;
    }

    /// PIDs passed to `query_cpu_time`, in call order.
    pub(crate) fn queried(&self) -> Vec<u32> {
        self.state().queried.clone()
    }

    /// PIDs successfully terminated, in call order.
    pub(crate) fn terminated(&self) -> Vec<u32> {
        self.state().terminated.clone()
    }
}

impl ProcessProvider for FakeProvider {
    fn enumerate_all(&self) -> ProviderResult<Vec<ProcessRecord>> {
        let state = self.state();
        if state.enumeration_fails {
            return Err(ProviderError::enumeration("scripted snapshot failure"));
        }
        Ok(state.table.clone())
    }

    fn query_cpu_time(&self, record: &ProcessRecord) -> ProviderResult<CpuTimeSample> {
        let mut state = self.state();
        state.queried.push(record.pid);
        if let Some(failure) = state.query_failures.get(&record.pid) {
            return Err(failure.into_error(record.pid));
        }
        Ok(state.samples.get(&record.pid).copied().unwrap_or_default())
    }

    fn terminate(&self, record: &ProcessRecord) -> ProviderResult<()> {
        let mut state = self.state();
        if let Some(failure) = state.terminate_failures.get(&record.pid) {
            return Err(failure.into_error(record.pid));
        }
        state.table.retain(|p| p.pid != record.pid);
        state.terminated.push(record.pid);
        Ok(())
    }
}
