//! Single-writer, many-reader holder for the current snapshot.
//!
//! Readers clone the held value under a short read lock. The writer swaps
//! the value under the write lock and runs the change callback only after
//! the lock is released, so slow subscribers never stall readers.

use tokio::sync::RwLock;

/// Invoked with every newly stored value.
pub type UpdateCallback<T> = Box<dyn Fn(&T) + Send + Sync>;

pub struct Cache<T> {
    value: RwLock<T>,
    on_update: Option<UpdateCallback<T>>,
}

impl<T: Clone + Send + Sync> Cache<T> {
    /// A pure store with no callback.
    pub fn new(initial: T) -> Self {
        Self {
            value: RwLock::new(initial),
            on_update: None,
        }
    }

    pub fn with_callback(initial: T, on_update: UpdateCallback<T>) -> Self {
        Self {
            value: RwLock::new(initial),
            on_update: Some(on_update),
        }
    }

    /// Current value.
    pub async fn get(&self) -> T {
        self.value.read().await.clone()
    }

    /// Current value, or `None` if a writer holds the lock right now.
    #[cfg(test)]
    fn try_get(&self) -> Option<T> {
        self.value.try_read().ok().map(|guard| guard.clone())
    }

    /// Replace the value, then notify the callback outside the lock.
    pub async fn set(&self, value: T) {
        {
            let mut guard = self.value.write().await;
            *guard = value.clone();
        }

        if let Some(cb) = &self.on_update {
            cb(&value);
        }
    }
}

impl<T: Clone + Default + Send + Sync> Default for Cache<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, OnceLock, Weak};

    #[tokio::test]
    async fn test_get_returns_initial_then_latest() {
        let cache = Cache::new(1u32);
        assert_eq!(cache.get().await, 1);
        cache.set(7).await;
        assert_eq!(cache.get().await, 7);
    }

    #[tokio::test]
    async fn test_callback_sees_new_value() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cache = Cache::with_callback(
            0u32,
            Box::new(move |v: &u32| sink.lock().unwrap().push(*v)),
        );

        cache.set(3).await;
        cache.set(5).await;

        assert_eq!(*seen.lock().unwrap(), vec![3, 5]);
    }

    #[tokio::test]
    async fn test_callback_runs_without_lock_held() {
        let slot: Arc<OnceLock<Weak<Cache<u32>>>> = Arc::new(OnceLock::new());
        let readable = Arc::new(AtomicUsize::new(0));

        let cb_slot = slot.clone();
        let cb_readable = readable.clone();
        let cache = Arc::new(Cache::with_callback(
            0u32,
            Box::new(move |v: &u32| {
                let cache = cb_slot.get().and_then(Weak::upgrade).unwrap();
                // A reader must get through while the callback is running.
                if cache.try_get() == Some(*v) {
                    cb_readable.fetch_add(1, Ordering::SeqCst);
                }
            }),
        ));
        slot.set(Arc::downgrade(&cache)).unwrap();

        cache.set(9).await;
        assert_eq!(readable.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_readers() {
        let cache = Arc::new(Cache::new(String::from("a")));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let c = cache.clone();
            handles.push(tokio::spawn(async move { c.get().await }));
        }
        cache.set("b".into()).await;
        for h in handles {
            let v = h.await.unwrap();
            assert!(v == "a" || v == "b");
        }
        assert_eq!(cache.get().await, "b");
    }
}
