//! Time-boxed sensor cache with lazily constructed source.
//!
//! A [`TimedCache`] owns a factory for a [`SensorSource`] and a time-to-live.
//! The source is built on first access, exactly once even when several
//! threads race on that first access (the control loop and an operator
//! console may both poll the same sensor). Reads within the TTL return a
//! copy of the last value without touching the source.
//!
//! # Failure policy
//!
//! A failed read is never cached and never masked by an older value: the
//! caller gets the [`SensorError`] and the cache entry is left untouched,
//! so the next call tries the source again.
//!
//! [`Stamped`] carries the freshness rule on its own, for callers that key
//! their cache on something other than a single source.

use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::SensorError;
use crate::source::SensorSource;

/// A boxed sensor source behind its access lock.
type GuardedSource<T> = Mutex<Box<dyn SensorSource<T>>>;

/// One-shot factory that builds the guarded source on first access.
type SourceFactory<T> = Box<dyn FnOnce() -> GuardedSource<T> + Send>;

/// A value and the instant it was recorded.
#[derive(Debug, Clone)]
pub struct Stamped<T> {
    value: T,
    recorded_at: Instant,
}

impl<T> Stamped<T> {
    /// Stamp `value` with the current time.
    pub fn now(value: T) -> Self {
        Self {
            value,
            recorded_at: Instant::now(),
        }
    }

    /// The value, if it was recorded less than `ttl` ago.
    ///
    /// A zero `ttl` never yields a value.
    pub fn fresh_within(&self, ttl: Duration) -> Option<&T> {
        (!ttl.is_zero() && self.recorded_at.elapsed() < ttl).then_some(&self.value)
    }
}

/// A lazily initialised, TTL-bounded cache in front of a sensor source.
///
/// `T` is returned by value (cloned) on every read, so callers never alias
/// the cached state.
pub struct TimedCache<T> {
    /// Sensor name used in log fields and errors.
    name: String,
    /// How long a value stays fresh. Zero disables caching.
    ttl: Duration,
    /// The sensor source, constructed on first access.
    source: LazyLock<GuardedSource<T>, SourceFactory<T>>,
    /// Last successful read.
    entry: Mutex<Option<Stamped<T>>>,
}

impl<T: Clone + Send + 'static> TimedCache<T> {
    /// Create a cache that will build its source with `factory` on first use.
    pub fn new<S, F>(name: impl Into<String>, ttl: Duration, factory: F) -> Self
    where
        S: SensorSource<T> + 'static,
        F: FnOnce() -> S + Send + 'static,
    {
        let name = name.into();
        let sensor = name.clone();
        let factory: SourceFactory<T> = Box::new(move || {
            debug!(sensor = %sensor, "constructing sensor source");
            let source: Box<dyn SensorSource<T>> = Box::new(factory());
            Mutex::new(source)
        });

        Self {
            name,
            ttl,
            source: LazyLock::new(factory),
            entry: Mutex::new(None),
        }
    }

    /// Return a fresh value, reading the source only if the cached one expired.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::SourceUnavailable`] if the source fails. The
    /// previous cached value is not substituted.
    pub fn get(&self) -> Result<T, SensorError> {
        if let Some(value) = self.fresh_value() {
            return Ok(value);
        }

        let read = {
            let mut source = self
                .source
                .lock()
                .map_err(|e| SensorError::unavailable(&self.name, e.to_string()))?;
            source.read()
        };

        match read {
            Ok(value) => {
                self.store(value.clone());
                Ok(value)
            }
            Err(e) => {
                warn!(sensor = %self.name, error = %e, "sensor read failed");
                Err(e)
            }
        }
    }

    /// Drop the cached value so the next [`get`](Self::get) reads the source.
    pub fn invalidate(&self) {
        *self.lock_entry() = None;
    }

    /// The sensor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured time-to-live.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value if `ttl > 0` and it was refreshed less than `ttl` ago.
    fn fresh_value(&self) -> Option<T> {
        self.lock_entry()
            .as_ref()
            .and_then(|cached| cached.fresh_within(self.ttl))
            .cloned()
    }

    /// Record a successful read with the current timestamp.
    fn store(&self, value: T) {
        *self.lock_entry() = Some(Stamped::now(value));
    }

    /// Lock the entry, recovering it if a reader panicked while holding it.
    ///
    /// The entry is replaced wholesale under the lock, so a poisoned guard
    /// still holds either the old or the new value.
    fn lock_entry(&self) -> MutexGuard<'_, Option<Stamped<T>>> {
        self.entry.lock().unwrap_or_else(|poisoned| {
            warn!(sensor = %self.name, "cache entry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl<T> core::fmt::Debug for TimedCache<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimedCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;
    use crate::source::{FailingSource, FnSource};

    /// A source that counts reads and returns the count.
    fn counting_source(reads: &Arc<AtomicUsize>) -> impl SensorSource<usize> + 'static + use<> {
        let reads = Arc::clone(reads);
        FnSource::new(move || Ok::<usize, SensorError>(reads.fetch_add(1, Ordering::SeqCst) + 1))
    }

    #[test]
    fn source_is_built_lazily() {
        let built = Arc::new(AtomicUsize::new(0));
        let reads = Arc::new(AtomicUsize::new(0));
        let built_in_factory = Arc::clone(&built);
        let reads_in_factory = Arc::clone(&reads);

        let cache = TimedCache::new("range", Duration::from_secs(10), move || {
            built_in_factory.fetch_add(1, Ordering::SeqCst);
            counting_source(&reads_in_factory)
        });

        assert_eq!(built.load(Ordering::SeqCst), 0);
        assert_eq!(cache.get().unwrap(), 1);
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reads_within_ttl_hit_cache() {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = counting_source(&reads);
        let cache = TimedCache::new("soil", Duration::from_secs(60), move || source);

        assert_eq!(cache.get().unwrap(), 1);
        assert_eq!(cache.get().unwrap(), 1);
        assert_eq!(cache.get().unwrap(), 1);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_ttl_always_reads() {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = counting_source(&reads);
        let cache = TimedCache::new("range", Duration::ZERO, move || source);

        assert_eq!(cache.get().unwrap(), 1);
        assert_eq!(cache.get().unwrap(), 2);
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn expired_value_is_refreshed() {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = counting_source(&reads);
        let cache = TimedCache::new("range", Duration::from_millis(20), move || source);

        assert_eq!(cache.get().unwrap(), 1);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get().unwrap(), 2);
    }

    #[test]
    fn invalidate_forces_refresh() {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = counting_source(&reads);
        let cache = TimedCache::new("range", Duration::from_secs(60), move || source);

        assert_eq!(cache.get().unwrap(), 1);
        cache.invalidate();
        assert_eq!(cache.get().unwrap(), 2);
    }

    #[test]
    fn failure_is_reported_not_cached() {
        let cache: TimedCache<f64> =
            TimedCache::new("range", Duration::from_secs(60), || FailingSource::new("range"));
        assert!(matches!(
            cache.get(),
            Err(SensorError::SourceUnavailable { .. })
        ));
        assert!(cache.get().is_err());
    }

    #[test]
    fn failure_does_not_fall_back_to_stale_value() {
        let mut calls = 0_u32;
        let source = FnSource::new(move || {
            calls = calls.saturating_add(1);
            if calls == 1 {
                Ok(4.2_f64)
            } else {
                Err(SensorError::unavailable("range", "glare"))
            }
        });
        let cache = TimedCache::new("range", Duration::ZERO, move || source);

        assert_eq!(cache.get().unwrap(), 4.2);
        assert_eq!(
            cache.get(),
            Err(SensorError::unavailable("range", "glare"))
        );
    }

    #[test]
    fn concurrent_first_access_builds_source_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let reads = Arc::new(AtomicUsize::new(0));
        let built_in_factory = Arc::clone(&built);
        let reads_in_factory = Arc::clone(&reads);

        let cache = Arc::new(TimedCache::new(
            "range",
            Duration::from_secs(60),
            move || {
                built_in_factory.fetch_add(1, Ordering::SeqCst);
                counting_source(&reads_in_factory)
            },
        ));

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get().unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap() >= 1);
        }
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn poisoned_entry_keeps_caching() {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = counting_source(&reads);
        let cache = Arc::new(TimedCache::new("soil", Duration::from_secs(60), move || source));

        let holder = Arc::clone(&cache);
        let crashed = thread::spawn(move || {
            let _entry = holder.entry.lock().unwrap();
            panic!("reader crashed while holding the entry");
        })
        .join();
        assert!(crashed.is_err());
        assert!(cache.entry.is_poisoned());

        assert_eq!(cache.get().unwrap(), 1);
        assert_eq!(cache.get().unwrap(), 1);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stamped_value_expires_after_ttl() {
        let stamped = Stamped::now(7_u8);
        assert_eq!(stamped.fresh_within(Duration::from_secs(60)), Some(&7));
        assert_eq!(stamped.fresh_within(Duration::ZERO), None);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(stamped.fresh_within(Duration::from_millis(5)), None);
    }
}
