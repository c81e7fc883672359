//! Example pooling for native feature-vector reuse.
//!
//! Uses parking_lot::Mutex for fast synchronous locking. In unsynchronized
//! mode the lock is only tried, never waited on: contention means the caller
//! broke the one-thread-at-a-time contract and is reported as an error.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;

use super::example::Example;
use crate::engine::RawExample;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    #[error("Example returned after its owning pool was disposed")]
    OwnerDisposed,

    #[error("Example has no native buffer and cannot be pooled")]
    Orphaned,

    #[error("Concurrent access to an unsynchronized example pool")]
    ConcurrentAccess,
}

/// Concurrency contract of a pool, fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PoolMode {
    /// Lease and return may race from any number of threads.
    Synchronized,
    /// Callers confine pool use to one thread at a time.
    #[default]
    Unsynchronized,
}

impl PoolMode {
    pub fn from_thread_safe(thread_safe: bool) -> Self {
        if thread_safe {
            Self::Synchronized
        } else {
            Self::Unsynchronized
        }
    }
}

#[derive(Default)]
struct Slots {
    examples: Vec<Example>,
    /// Set by `drain`; a closed pool accepts no returns.
    closed: bool,
}

pub(crate) struct PoolCore {
    slots: Mutex<Slots>,
    mode: PoolMode,
}

impl PoolCore {
    fn guard(&self) -> Result<MutexGuard<'_, Slots>, PoolError> {
        match self.mode {
            PoolMode::Synchronized => Ok(self.slots.lock()),
            PoolMode::Unsynchronized => self.slots.try_lock().ok_or(PoolError::ConcurrentAccess),
        }
    }

    fn give_back(&self, example: Example) -> Result<(), PoolError> {
        if example.raw().is_none() {
            return Err(PoolError::Orphaned);
        }
        let mut slots = self.guard()?;
        if slots.closed {
            return Err(PoolError::OwnerDisposed);
        }
        slots.examples.push(example);
        Ok(())
    }
}

/// Collection of available examples owned by one learner.
pub struct ExamplePool {
    core: Arc<PoolCore>,
}

impl ExamplePool {
    pub fn new(mode: PoolMode) -> Self {
        Self {
            core: Arc::new(PoolCore { slots: Mutex::new(Slots::default()), mode }),
        }
    }

    pub fn mode(&self) -> PoolMode {
        self.core.mode
    }

    /// Take an available example, most recently returned first.
    pub fn take(&self) -> Result<Option<PooledExample>, PoolError> {
        let example = self.core.guard()?.examples.pop();
        Ok(example.map(PooledExample::new))
    }

    /// Wrap a freshly allocated native buffer as an example owned by this pool.
    pub fn adopt(&self, raw: RawExample) -> PooledExample {
        PooledExample::new(Example::new(Arc::downgrade(&self.core), raw))
    }

    /// Current number of available examples in pool.
    pub fn available(&self) -> usize {
        self.core.slots.lock().examples.len()
    }

    /// Close the pool and remove every available example, regardless of
    /// pool mode. Later returns fail with `OwnerDisposed`.
    pub fn drain(&self) -> Vec<Example> {
        let mut slots = self.core.slots.lock();
        slots.closed = true;
        std::mem::take(&mut slots.examples)
    }
}

impl std::fmt::Debug for ExamplePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExamplePool")
            .field("mode", &self.core.mode)
            .field("available", &self.available())
            .finish()
    }
}

/// An example leased from a pool. Returned to its pool on drop.
pub struct PooledExample {
    example: Option<Example>,
}

impl PooledExample {
    fn new(example: Example) -> Self {
        Self { example: Some(example) }
    }

    /// Return the example to its pool, reporting why that was impossible.
    pub fn release(mut self) -> Result<(), PoolError> {
        match self.example.take() {
            Some(example) => return_to_owner(example),
            None => Ok(()),
        }
    }
}

fn return_to_owner(example: Example) -> Result<(), PoolError> {
    let owner = example.owner().ok_or(PoolError::Orphaned)?;
    let core = owner.upgrade().ok_or(PoolError::OwnerDisposed)?;
    core.give_back(example)
}

impl Deref for PooledExample {
    type Target = Example;

    fn deref(&self) -> &Example {
        // Only `release` and `drop` take the example, both by value.
        match &self.example {
            Some(example) => example,
            None => unreachable!("pooled example accessed after release"),
        }
    }
}

impl Drop for PooledExample {
    fn drop(&mut self) {
        let Some(example) = self.example.take() else {
            return;
        };
        let raw = example.raw();
        match return_to_owner(example) {
            Ok(()) => {}
            Err(PoolError::Orphaned) => {
                tracing::debug!(?raw, "orphaned example dropped");
            }
            Err(e) => {
                tracing::warn!(?raw, error = %e, "example not returned to pool; native buffer abandoned");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adopt_then_drop_returns_to_pool() {
        let pool = ExamplePool::new(PoolMode::Synchronized);
        {
            let _example = pool.adopt(RawExample::new(1));
        }
        assert_eq!(pool.available(), 1);

        let leased = pool.take().unwrap().unwrap();
        assert_eq!(leased.raw(), Some(RawExample::new(1)));
        assert_eq!(pool.available(), 0);
        leased.release().unwrap();
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_take_from_empty_pool() {
        let pool = ExamplePool::new(PoolMode::Unsynchronized);
        assert!(pool.take().unwrap().is_none());
    }

    #[test]
    fn test_orphaned_example_is_not_pooled() {
        let pool = ExamplePool::new(PoolMode::Synchronized);
        let leased = pool.adopt(RawExample::new(4));
        leased.unlink();

        assert_eq!(leased.release(), Err(PoolError::Orphaned));
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_release_after_pool_dropped() {
        let pool = ExamplePool::new(PoolMode::Synchronized);
        let leased = pool.adopt(RawExample::new(9));
        drop(pool);

        assert_eq!(leased.release(), Err(PoolError::OwnerDisposed));
    }

    #[test]
    fn test_unsynchronized_pool_reports_contention() {
        let pool = ExamplePool::new(PoolMode::Unsynchronized);
        let _held = pool.core.slots.lock();
        assert!(matches!(pool.take(), Err(PoolError::ConcurrentAccess)));
    }

    #[test]
    fn test_drain_empties_pool() {
        let pool = ExamplePool::new(PoolMode::Unsynchronized);
        for raw in 0..3 {
            pool.adopt(RawExample::new(raw)).release().unwrap();
        }
        let drained = pool.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_return_racing_drain_is_rejected() {
        let pool = ExamplePool::new(PoolMode::Synchronized);
        let leased = pool.adopt(RawExample::new(5));

        // A returning thread may already hold the core when teardown drains.
        let core = leased.owner().and_then(|owner| owner.upgrade()).unwrap();
        assert!(pool.drain().is_empty());
        drop(pool);

        let example: Example = (*leased).clone();
        assert_eq!(core.give_back(example), Err(PoolError::OwnerDisposed));
        assert_eq!(core.slots.lock().examples.len(), 0);
        assert_eq!(leased.release(), Err(PoolError::OwnerDisposed));
    }

    #[test]
    fn test_drained_pool_rejects_returns() {
        let pool = ExamplePool::new(PoolMode::Unsynchronized);
        let leased = pool.adopt(RawExample::new(6));
        pool.drain();

        assert_eq!(leased.release(), Err(PoolError::OwnerDisposed));
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_synchronized_pool_across_threads() {
        let pool = Arc::new(ExamplePool::new(PoolMode::Synchronized));
        for raw in 0..8 {
            pool.adopt(RawExample::new(raw)).release().unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if let Some(example) = pool.take().unwrap() {
                            example.release().unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pool.available(), 8);
    }
}
