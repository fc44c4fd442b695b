// src/core/pool.rs

use crate::models::{Invocation, StagedCommand};
use crate::system::engine::{Engine, EngineError, HostFactory};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Failures of the pool itself, as opposed to failures inside a host.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Bounds outside `1 <= min <= max`.
    #[error("Invalid runspace bounds: min={min}, max={max} (need 1 <= min <= max).")]
    InvalidBounds {
        /// Requested minimum.
        min: usize,
        /// Requested maximum.
        max: usize,
    },
    /// `open` ran twice.
    #[error("The runspace pool has already been opened.")]
    AlreadyOpen,
    /// A lease was requested before `open`.
    #[error("The runspace pool has not been opened.")]
    NotOpen,
    /// Every host up to the maximum is leased.
    #[error("All {0} runspaces are in use.")]
    Exhausted(usize),
    /// The pool was disposed.
    #[error("The runspace pool has been disposed.")]
    Disposed,
    /// The factory could not start a host.
    #[error("Could not start a runspace: {0}")]
    Spawn(#[from] EngineError),
}

/// Capacity range of a pool. Always `1 <= min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBounds {
    min: usize,
    max: usize,
}

impl PoolBounds {
    /// Validates `1 <= min <= max`.
    pub fn new(min: usize, max: usize) -> Result<Self, PoolError> {
        if min == 0 || min > max {
            return Err(PoolError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// Hosts spawned on open.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Most hosts alive at once.
    pub fn max(&self) -> usize {
        self.max
    }
}

#[derive(Default)]
struct PoolState {
    idle: Vec<Box<dyn Engine>>,
    /// Hosts alive right now, idle or leased (including ones being spawned).
    live: usize,
    opened: bool,
    disposed: bool,
}

/// A bounded set of reusable PowerShell hosts.
pub struct RunspacePool {
    factory: Arc<dyn HostFactory>,
    bounds: PoolBounds,
    state: Mutex<PoolState>,
}

impl fmt::Debug for RunspacePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunspacePool")
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

impl RunspacePool {
    /// An unopened pool. Nothing is spawned until [`open`](Self::open).
    pub fn new(factory: Arc<dyn HostFactory>, bounds: PoolBounds) -> Self {
        Self {
            factory,
            bounds,
            state: Mutex::new(PoolState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns the minimum number of hosts. A pool opens exactly once.
    pub fn open(&self) -> Result<(), PoolError> {
        let mut state = self.lock();
        if state.disposed {
            return Err(PoolError::Disposed);
        }
        if state.opened {
            return Err(PoolError::AlreadyOpen);
        }

        for _ in 0..self.bounds.min {
            let engine = self.factory.spawn()?;
            state.idle.push(engine);
            state.live += 1;
        }
        state.opened = true;
        log::debug!(
            "Runspace pool opened with {} host(s) (max {}).",
            self.bounds.min,
            self.bounds.max
        );
        Ok(())
    }

    /// Leases a host, spawning a new one if none is idle and capacity remains.
    pub fn acquire(self: &Arc<Self>) -> Result<Runspace, PoolError> {
        let mut state = self.lock();
        if state.disposed {
            return Err(PoolError::Disposed);
        }
        if !state.opened {
            return Err(PoolError::NotOpen);
        }
        if let Some(engine) = state.idle.pop() {
            return Ok(Runspace::new(engine, Arc::clone(self)));
        }
        if state.live >= self.bounds.max {
            return Err(PoolError::Exhausted(self.bounds.max));
        }

        // Reserve the slot, then spawn without holding the lock.
        state.live += 1;
        drop(state);

        match self.factory.spawn() {
            Ok(engine) => {
                log::debug!("Runspace pool grew to {} host(s).", self.live());
                Ok(Runspace::new(engine, Arc::clone(self)))
            }
            Err(e) => {
                self.lock().live -= 1;
                Err(PoolError::Spawn(e))
            }
        }
    }

    fn release(&self, mut engine: Box<dyn Engine>, broken: bool) {
        let mut state = self.lock();
        if state.disposed || broken {
            state.live -= 1;
            drop(state);
            if let Err(e) = engine.close() {
                log::warn!("Failed to close PowerShell host: {}", e);
            }
            return;
        }
        state.idle.push(engine);
    }

    /// Closes every idle host. Leased hosts are closed when they come back.
    /// Disposing twice is a no-op.
    pub fn dispose(&self) {
        let mut state = self.lock();
        if state.disposed {
            log::debug!("Runspace pool already disposed.");
            return;
        }
        state.disposed = true;
        let idle = std::mem::take(&mut state.idle);
        state.live -= idle.len();
        drop(state);

        for mut engine in idle {
            if let Err(e) = engine.close() {
                log::warn!("Failed to close PowerShell host: {}", e);
            }
        }
        log::debug!("Runspace pool disposed.");
    }

    /// True once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Hosts alive right now, idle or leased.
    pub fn live(&self) -> usize {
        self.lock().live
    }

    /// Hosts waiting for a lease.
    pub fn idle(&self) -> usize {
        self.lock().idle.len()
    }
}

/// A host leased from a [`RunspacePool`]. Goes back to the pool on drop,
/// unless the host broke, in which case it is closed.
pub struct Runspace {
    engine: Option<Box<dyn Engine>>,
    pool: Arc<RunspacePool>,
    broken: bool,
}

impl Runspace {
    fn new(engine: Box<dyn Engine>, pool: Arc<RunspacePool>) -> Self {
        Self {
            engine: Some(engine),
            pool,
            broken: false,
        }
    }

    /// Runs a pipeline on the leased host. A fatal error marks the host broken.
    pub fn invoke(&mut self, pipeline: &[StagedCommand]) -> Result<Invocation, EngineError> {
        let engine = self.engine.as_mut().ok_or(EngineError::HostExited)?;
        let result = engine.invoke(pipeline);
        if let Err(e) = &result
            && e.is_fatal()
        {
            log::warn!("PowerShell host failed and will be discarded: {}", e);
            self.broken = true;
        }
        result
    }

    /// True after a fatal host error. The host is closed, not reused, when the lease ends.
    pub fn is_broken(&self) -> bool {
        self.broken
    }
}

impl fmt::Debug for Runspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runspace")
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

impl Drop for Runspace {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.pool.release(engine, self.broken);
        }
    }
}

/// Owns a pool that is created and opened on first access.
pub struct PoolHolder {
    factory: Arc<dyn HostFactory>,
    bounds: PoolBounds,
    pool: OnceCell<Arc<RunspacePool>>,
    disposed: AtomicBool,
}

impl fmt::Debug for PoolHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHolder")
            .field("bounds", &self.bounds)
            .field("pool", &self.pool.get())
            .field("disposed", &self.disposed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl PoolHolder {
    /// A holder that opens its pool on first access.
    pub fn new(factory: Arc<dyn HostFactory>, bounds: PoolBounds) -> Self {
        Self {
            factory,
            bounds,
            pool: OnceCell::new(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Returns the pool, opening it on the first call.
    pub fn pool(&self) -> Result<Arc<RunspacePool>, PoolError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(PoolError::Disposed);
        }
        self.pool
            .get_or_try_init(|| {
                let pool = RunspacePool::new(Arc::clone(&self.factory), self.bounds);
                pool.open()?;
                Ok(Arc::new(pool))
            })
            .cloned()
    }

    /// True once the pool has been created and opened.
    pub fn is_initialized(&self) -> bool {
        self.pool.get().is_some()
    }

    /// Disposes the pool if it was ever opened. Later calls to `pool()` fail.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(pool) = self.pool.get() {
            pool.dispose();
        }
    }
}
