use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::EngineError;

/// Per-position mutual-exclusion flag.
///
/// Every mutating entry point sets the flag for its full duration, external
/// calls included. A second call arriving while the flag is set fails
/// immediately with [`EngineError::Reentrancy`] — it never queues. The flag
/// is released by RAII drop, so abort paths clear it too.
#[derive(Debug, Default)]
pub(crate) struct ReentrancyFlag {
    entered: AtomicBool,
}

impl ReentrancyFlag {
    pub(crate) fn enter(&self) -> Result<FlagGuard<'_>, EngineError> {
        if self
            .entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(EngineError::Reentrancy);
        }
        Ok(FlagGuard { flag: &self.entered })
    }
}

pub(crate) struct FlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
