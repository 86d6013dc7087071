//! Statement pool.
//!
//! Released statements hand their chunk list, fragment buffer, argument list
//! and scan targets back here, cleared but with their allocations intact, so
//! the next statement of a similar shape builds without allocating.

use crate::args::Arg;
use crate::chunk::ChunkSeq;
use crate::config::PoolConfig;
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::scan::Dest;
use crate::stmt::Stmt;
use std::sync::{Mutex, OnceLock, PoisonError};

static GLOBAL: OnceLock<StmtPool> = OnceLock::new();

/// Reusable storage behind one statement.
#[derive(Default)]
pub(crate) struct StmtParts {
    pub(crate) seq: ChunkSeq,
    pub(crate) args: Vec<Arg>,
    pub(crate) dest: Vec<Dest>,
}

impl StmtParts {
    fn with_capacity() -> Self {
        Self {
            seq: ChunkSeq::with_capacity(8, 256),
            args: Vec::with_capacity(8),
            dest: Vec::with_capacity(8),
        }
    }

    /// Drop every argument and scan target; keep the allocations.
    pub(crate) fn reset(&mut self) {
        self.seq.clear();
        self.args.clear();
        self.dest.clear();
    }

    fn retained_capacity(&self) -> usize {
        self.seq.buffer_capacity()
            + self.args.capacity() * size_of::<Arg>()
            + self.dest.capacity() * size_of::<Dest>()
    }
}

/// Free lists of statement parts and render buffers.
pub struct StmtPool {
    config: PoolConfig,
    parts: Mutex<Vec<StmtParts>>,
    buffers: Mutex<Vec<String>>,
}

impl std::fmt::Debug for StmtPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StmtPool")
            .field("config", &self.config)
            .field("idle_stmts", &self.idle_stmts())
            .field("idle_buffers", &self.idle_buffers())
            .finish()
    }
}

impl StmtPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            parts: Mutex::new(Vec::new()),
            buffers: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide pool, created with default limits on first use.
    pub fn global() -> &'static StmtPool {
        GLOBAL.get_or_init(|| StmtPool::new(PoolConfig::default()))
    }

    /// Configure the process-wide pool. Fails once it is in use.
    pub(crate) fn install_global(config: PoolConfig) -> WeaveResult<()> {
        GLOBAL.set(StmtPool::new(config)).map_err(|_| {
            WeaveError::config("statement pool is already initialized; call init before building statements")
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Start an empty statement backed by this pool.
    pub fn stmt(&'static self, dialect: &'static Dialect) -> Stmt {
        Stmt::acquire(dialect, self)
    }

    pub(crate) fn take_parts(&self) -> StmtParts {
        self.parts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(StmtParts::with_capacity)
    }

    pub(crate) fn release(&self, mut parts: StmtParts) {
        parts.reset();
        let retained = parts.retained_capacity();
        if retained > self.config.max_retained_capacity {
            tracing::trace!(retained, "oversized statement discarded");
            return;
        }
        let mut idle = self.parts.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.config.max_idle_stmts {
            idle.push(parts);
        } else {
            tracing::trace!(idle = idle.len(), "surplus statement discarded");
        }
    }

    pub(crate) fn take_buffer(&self) -> String {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default()
    }

    pub(crate) fn recycle_buffer(&self, mut buf: String) {
        if buf.capacity() == 0 {
            return;
        }
        if buf.capacity() > self.config.max_retained_capacity {
            tracing::trace!(capacity = buf.capacity(), "oversized render buffer discarded");
            return;
        }
        buf.clear();
        let mut idle = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.config.max_idle_buffers {
            idle.push(buf);
        }
    }

    /// Number of statement parts waiting for reuse.
    pub fn idle_stmts(&self) -> usize {
        self.parts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of render buffers waiting for reuse.
    pub fn idle_buffers(&self) -> usize {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[cfg(test)]
    pub(crate) fn with_idle<R>(&self, f: impl FnOnce(&[StmtParts]) -> R) -> R {
        f(&self.parts.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
