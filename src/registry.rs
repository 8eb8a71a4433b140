//! Process-wide table of in-flight generation jobs, one per requester.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::GenerationError;

pub type RequesterId = u32;

/// A running job. Shared between the requester-facing side (which may
/// cancel it) and the job's background and foreground work (which poll it).
#[derive(Debug)]
pub struct GenerationTask {
    requester: RequesterId,
    cancelled: AtomicBool,
}

impl GenerationTask {
    pub fn requester(&self) -> RequesterId {
        self.requester
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

pub type TaskHandle = Arc<GenerationTask>;

#[derive(Default)]
pub struct GenerationTaskRegistry {
    tasks: Mutex<FxHashMap<RequesterId, TaskHandle>>,
}

impl GenerationTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a new job unless the requester already has one. A rejected
    /// admission leaves the existing task untouched.
    pub fn admit(&self, requester: RequesterId) -> Result<TaskHandle, GenerationError> {
        let mut tasks = self.tasks.lock();
        if tasks.contains_key(&requester) {
            return Err(GenerationError::AlreadyRunning);
        }
        let task = Arc::new(GenerationTask {
            requester,
            cancelled: AtomicBool::new(false),
        });
        tasks.insert(requester, Arc::clone(&task));
        Ok(task)
    }

    /// Flags the requester's job for cancellation. Does not wait for the job
    /// to notice; the entry stays until the job completes.
    pub fn cancel(&self, requester: RequesterId) -> Result<(), GenerationError> {
        match self.tasks.lock().get(&requester) {
            Some(task) => {
                task.cancel();
                Ok(())
            }
            None => Err(GenerationError::NotFound),
        }
    }

    /// Removes the requester's entry. Safe to call more than once.
    pub fn complete(&self, requester: RequesterId) {
        self.tasks.lock().remove(&requester);
    }

    pub fn is_cancelled(&self, requester: RequesterId) -> bool {
        self.tasks
            .lock()
            .get(&requester)
            .is_some_and(|task| task.is_cancelled())
    }

    pub fn is_active(&self, requester: RequesterId) -> bool {
        self.tasks.lock().contains_key(&requester)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Cancels and forgets every job, for teardown.
    pub fn cancel_all(&self) {
        let mut tasks = self.tasks.lock();
        for task in tasks.values() {
            task.cancel();
        }
        tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_second_admission_is_rejected() {
        let registry = GenerationTaskRegistry::new();
        let first = registry.admit(7).unwrap();

        assert_eq!(
            registry.admit(7).unwrap_err(),
            GenerationError::AlreadyRunning
        );
        assert!(!first.is_cancelled());
        assert_eq!(registry.active_count(), 1);

        // Other requesters are independent.
        assert!(registry.admit(8).is_ok());
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_cancel_flags_without_removing() {
        let registry = GenerationTaskRegistry::new();
        let task = registry.admit(1).unwrap();

        assert_eq!(registry.cancel(2), Err(GenerationError::NotFound));
        registry.cancel(1).unwrap();

        assert!(task.is_cancelled());
        assert!(registry.is_cancelled(1));
        assert!(registry.is_active(1));
        assert_eq!(registry.admit(1).unwrap_err(), GenerationError::AlreadyRunning);

        registry.complete(1);
        registry.complete(1);
        assert!(!registry.is_active(1));
        assert!(!registry.is_cancelled(1));
        assert!(!registry.admit(1).unwrap().is_cancelled());
    }

    #[test]
    fn test_concurrent_admission_admits_exactly_one() {
        let registry = Arc::new(GenerationTaskRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.admit(42).is_ok())
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
    }

    #[test]
    fn test_cancel_all_flags_outstanding_handles() {
        let registry = GenerationTaskRegistry::new();
        let a = registry.admit(1).unwrap();
        let b = registry.admit(2).unwrap();
        registry.cancel_all();
        assert!(a.is_cancelled() && b.is_cancelled());
        assert_eq!(registry.active_count(), 0);
    }
}
