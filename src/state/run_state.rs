use crate::ScoutError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether a crawl run is in progress
///
/// Owned by the caller and shared by cloning. At most one run can be active
/// per `RunState`; a second [`RunState::try_begin`] is rejected until the
/// first run's guard is dropped.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    active: Arc<AtomicBool>,
}

/// Marks a run active for as long as it lives
#[derive(Debug)]
#[must_use = "the run ends when the guard is dropped"]
pub struct RunGuard {
    active: Arc<AtomicBool>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the run slot
    pub fn try_begin(&self) -> Result<RunGuard, ScoutError> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ScoutError::AlreadyRunning)?;

        Ok(RunGuard {
            active: Arc::clone(&self.active),
        })
    }

    /// Whether a run is in progress
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_and_end() {
        let state = RunState::new();
        assert!(!state.is_active());

        let guard = state.try_begin().unwrap();
        assert!(state.is_active());

        drop(guard);
        assert!(!state.is_active());
    }

    #[test]
    fn test_second_run_rejected() {
        let state = RunState::new();
        let _guard = state.try_begin().unwrap();

        assert!(matches!(state.try_begin(), Err(ScoutError::AlreadyRunning)));
        assert!(matches!(
            state.clone().try_begin(),
            Err(ScoutError::AlreadyRunning)
        ));
    }

    #[test]
    fn test_rerun_after_guard_dropped() {
        let state = RunState::new();
        drop(state.try_begin().unwrap());
        assert!(state.try_begin().is_ok());
    }
}
