//! Per-float write locks.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per platform number.
///
/// Files touching the same float are applied one after another; files
/// touching disjoint floats do not wait on each other here.
#[derive(Debug, Default)]
pub struct FloatLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held locks, released on drop.
#[derive(Debug)]
pub struct FloatGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl FloatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, platform_number: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(platform_number.to_string()).or_default())
    }

    /// Lock every listed float. Locks are taken in sorted order so two
    /// files sharing floats cannot deadlock.
    pub async fn lock_all<'a, I>(&self, platform_numbers: I) -> FloatGuards
    where
        I: IntoIterator<Item = &'a str>,
    {
        let sorted: BTreeSet<&str> = platform_numbers.into_iter().collect();
        let mut guards = Vec::with_capacity(sorted.len());
        for platform_number in sorted {
            guards.push(self.handle(platform_number).lock_owned().await);
        }
        FloatGuards { _guards: guards }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_float_waits() {
        let locks = Arc::new(FloatLocks::new());
        let held = locks.lock_all(["5904471"]).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guards = locks.lock_all(["6901234", "5904471"]).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire after release")
            .unwrap();
    }

    #[tokio::test]
    async fn test_disjoint_floats_do_not_wait() {
        let locks = FloatLocks::new();
        let _a = locks.lock_all(["5904471"]).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock_all(["6901234"])).await;
        assert!(b.is_ok());
    }
}
