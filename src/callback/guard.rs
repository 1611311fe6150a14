/// Scoped permission returned by `Callback::guard_dispatch`.
///
/// Restore actions run when the guard drops, so reentrancy bookkeeping is
/// unwound whether the invocation succeeded, failed, or returned early.
#[must_use = "dropping the guard immediately restores the callback state"]
#[derive(Default)]
pub struct DispatchGuard {
    restores: Vec<Box<dyn FnOnce() + Send>>,
}

impl DispatchGuard {
    /// Permit dispatch without any bookkeeping to undo
    pub fn permit() -> Self {
        Self::default()
    }

    pub fn restoring<F>(restore: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            restores: vec![Box::new(restore)],
        }
    }

    /// Nest `inner` inside this guard; `inner` is restored first
    pub fn combine(mut self, mut inner: DispatchGuard) -> Self {
        self.restores.append(&mut inner.restores);
        self
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        while let Some(restore) = self.restores.pop() {
            restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_restores_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (outer_log, inner_log) = (log.clone(), log.clone());
        {
            let outer = DispatchGuard::restoring(move || outer_log.lock().push("outer"));
            let inner = DispatchGuard::restoring(move || inner_log.lock().push("inner"));
            let _guard = outer.combine(inner);
        }
        assert_eq!(*log.lock(), vec!["inner", "outer"]);
    }

    #[test]
    fn test_restore_runs_on_unwind() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let captured = log.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = DispatchGuard::restoring(move || captured.lock().push("restored"));
            panic!("handler exploded");
        }));
        assert!(result.is_err());
        assert_eq!(*log.lock(), vec!["restored"]);
    }
}
