//! Populate-once cache cell with a lock-free read path.
//!
//! Readers load the current value through [`arc_swap`] without locking. When
//! the slot is empty, expired, or rejected by the caller's validity check,
//! the reader takes the cell's async lock, re-checks, and only then runs the
//! initialiser. Concurrent readers of an empty cell therefore trigger exactly
//! one initialisation; the others wait on the lock and reuse the result.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry<T> {
    value: Arc<T>,
    stored_at: Instant,
}

pub struct LazyCell<T> {
    slot: ArcSwapOption<Entry<T>>,
    init_lock: Mutex<()>,
    // Bumped by `invalidate` so an initialiser that raced with it does not
    // store a value computed before the invalidation.
    generation: AtomicU64,
    ttl: Option<Duration>,
}

impl<T> Default for LazyCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for LazyCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyCell")
            .field("populated", &self.slot.load().is_some())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<T> LazyCell<T> {
    /// A cell whose value never expires on its own.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
            init_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            ttl: None,
        }
    }

    /// A cell whose value is treated as absent once it is older than `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new()
        }
    }

    /// Current value, if present and not expired. Never initialises.
    #[must_use]
    pub fn peek(&self) -> Option<Arc<T>> {
        self.fresh(&|_: &T| true)
    }

    /// Drops the cached value; the next read re-initialises.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.slot.store(None);
    }

    /// Returns the cached value or runs `init` once to produce it.
    ///
    /// # Errors
    /// Returns the initialiser's error; the cell stays empty in that case.
    pub async fn get_or_try_init<F, Fut, E>(&self, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_try_init_valid(|_| true, init).await
    }

    /// Like [`get_or_try_init`](Self::get_or_try_init), but a cached value is
    /// only reused while `is_valid` accepts it.
    ///
    /// # Errors
    /// Returns the initialiser's error; the previous value is left in place.
    pub async fn get_or_try_init_valid<P, F, Fut, E>(
        &self,
        is_valid: P,
        init: F,
    ) -> Result<Arc<T>, E>
    where
        P: Fn(&T) -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh(&is_valid) {
            return Ok(value);
        }

        let _guard = self.init_lock.lock().await;

        if let Some(value) = self.fresh(&is_valid) {
            return Ok(value);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let value = Arc::new(init().await?);

        if self.generation.load(Ordering::Acquire) == generation {
            self.slot.store(Some(Arc::new(Entry {
                value: Arc::clone(&value),
                stored_at: Instant::now(),
            })));
        }

        Ok(value)
    }

    fn fresh(&self, is_valid: &impl Fn(&T) -> bool) -> Option<Arc<T>> {
        let guard = self.slot.load();
        let entry = (*guard).as_ref()?;

        if let Some(ttl) = self.ttl
            && entry.stored_at.elapsed() >= ttl
        {
            return None;
        }

        if !is_valid(&entry.value) {
            return None;
        }

        Some(Arc::clone(&entry.value))
    }
}
