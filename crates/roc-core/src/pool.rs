//! Generic bounded object pool.
//!
//! The pool only knows about its free store. Which instances are checked
//! out, and how many, is the owner's business: the spawn controller keeps
//! its own active sets and hands instances back through [`ObjectPool::release`].

use tracing::trace;

type Factory<T> = Box<dyn FnMut() -> T + Send>;
type Hook<T> = Box<dyn FnMut(&mut T) + Send>;
type DestroyHook<T> = Box<dyn FnMut(T) + Send>;

/// Retained instance limit used when the builder is not given one.
pub const DEFAULT_MAX_SIZE: usize = 10_000;

/// Free-store reservation used when the builder is not given one.
pub const DEFAULT_INITIAL_CAPACITY: usize = 10;

/// Builder for [`ObjectPool`].
pub struct PoolBuilder<T> {
    factory: Factory<T>,
    on_get: Option<Hook<T>>,
    on_release: Option<Hook<T>>,
    on_destroy: Option<DestroyHook<T>>,
    initial_capacity: usize,
    max_size: usize,
}

impl<T> PoolBuilder<T> {
    /// Hook run on every instance handed out by [`ObjectPool::get`].
    #[must_use]
    pub fn on_get(mut self, hook: impl FnMut(&mut T) + Send + 'static) -> Self {
        self.on_get = Some(Box::new(hook));
        self
    }

    /// Hook run on every instance passed to [`ObjectPool::release`].
    #[must_use]
    pub fn on_release(mut self, hook: impl FnMut(&mut T) + Send + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Hook run on every instance the pool discards.
    #[must_use]
    pub fn on_destroy(mut self, hook: impl FnMut(T) + Send + 'static) -> Self {
        self.on_destroy = Some(Box::new(hook));
        self
    }

    /// Reserve room for `capacity` free instances up front.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Retain at most `max_size` free instances.
    #[must_use]
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Finish the pool. No instances are created until the first `get`.
    pub fn build(self) -> ObjectPool<T> {
        ObjectPool {
            factory: self.factory,
            on_get: self.on_get,
            on_release: self.on_release,
            on_destroy: self.on_destroy,
            max_size: self.max_size,
            free: Vec::with_capacity(self.initial_capacity.min(self.max_size)),
        }
    }
}

/// A bounded cache of reusable instances.
pub struct ObjectPool<T> {
    factory: Factory<T>,
    on_get: Option<Hook<T>>,
    on_release: Option<Hook<T>>,
    on_destroy: Option<DestroyHook<T>>,
    max_size: usize,
    free: Vec<T>,
}

impl<T> core::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("free", &self.free.len())
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

impl<T> ObjectPool<T> {
    /// Start building a pool whose instances come from `factory`.
    pub fn builder(factory: impl FnMut() -> T + Send + 'static) -> PoolBuilder<T> {
        PoolBuilder {
            factory: Box::new(factory),
            on_get: None,
            on_release: None,
            on_destroy: None,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_size: DEFAULT_MAX_SIZE,
        }
    }

    /// Take a free instance, or construct one when the store is empty.
    pub fn get(&mut self) -> T {
        let mut item = match self.free.pop() {
            Some(item) => item,
            None => {
                trace!("pool empty, constructing new instance");
                (self.factory)()
            }
        };
        if let Some(hook) = self.on_get.as_mut() {
            hook(&mut item);
        }
        item
    }

    /// Return an instance. It is kept for reuse while the free store is
    /// below capacity, otherwise destroyed.
    pub fn release(&mut self, mut item: T) {
        if let Some(hook) = self.on_release.as_mut() {
            hook(&mut item);
        }
        if self.free.len() < self.max_size {
            self.free.push(item);
        } else {
            trace!(max_size = self.max_size, "pool full, destroying released instance");
            self.destroy(item);
        }
    }

    /// Destroy every retained instance and empty the store.
    pub fn clear(&mut self) {
        for item in std::mem::take(&mut self.free) {
            self.destroy(item);
        }
    }

    /// Change the retained-instance limit. Shrinking below the current free
    /// count destroys the surplus.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        while self.free.len() > max_size {
            if let Some(item) = self.free.pop() {
                self.destroy(item);
            }
        }
    }

    /// Number of instances waiting in the free store.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Maximum number of retained instances.
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    fn destroy(&mut self, item: T) {
        if let Some(hook) = self.on_destroy.as_mut() {
            hook(item);
        }
    }
}

impl<T> Drop for ObjectPool<T> {
    fn drop(&mut self) {
        self.clear();
    }
}
