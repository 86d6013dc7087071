//! Process-wide configuration.

use crate::dialect::{self, Dialect, NO_DIALECT, POSTGRES};
use crate::error::WeaveResult;
use crate::pool::StmtPool;

/// Retention limits of the statement pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Idle statement parts kept for reuse.
    pub max_idle_stmts: usize,
    /// Idle render buffers kept for reuse.
    pub max_idle_buffers: usize,
    /// Statements or buffers whose allocations grew beyond this many bytes are
    /// freed on release instead of being pooled.
    pub max_retained_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_stmts: 256,
            max_idle_buffers: 256,
            max_retained_capacity: 64 * 1024,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_idle_stmts(mut self, n: usize) -> Self {
        self.max_idle_stmts = n;
        self
    }

    pub fn max_idle_buffers(mut self, n: usize) -> Self {
        self.max_idle_buffers = n;
        self
    }

    pub fn max_retained_capacity(mut self, bytes: usize) -> Self {
        self.max_retained_capacity = bytes;
        self
    }
}

/// Settings applied once at startup with [`init`].
///
/// ```ignore
/// sqlweave::init(
///     sqlweave::Config::new()
///         .default_dialect(&sqlweave::POSTGRES)
///         .render_cache_limit(10_000),
/// )?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub default_dialect: &'static Dialect,
    pub pool: PoolConfig,
    /// Entry cap for the render caches of [`POSTGRES`] and the default
    /// dialect. `None` is unbounded.
    pub render_cache_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_dialect: &NO_DIALECT,
            pool: PoolConfig::default(),
            render_cache_limit: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_dialect(mut self, dialect: &'static Dialect) -> Self {
        self.default_dialect = dialect;
        self
    }

    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn render_cache_limit(mut self, limit: usize) -> Self {
        self.render_cache_limit = Some(limit);
        self
    }
}

/// Install `config`.
///
/// The pool can only be configured before its first use; a later call still
/// applies the dialect settings but reports [`WeaveError::Config`](crate::WeaveError::Config).
pub fn init(config: Config) -> WeaveResult<()> {
    dialect::set_default_dialect(config.default_dialect);
    POSTGRES.cache().set_limit(config.render_cache_limit);
    config
        .default_dialect
        .cache()
        .set_limit(config.render_cache_limit);
    tracing::debug!(
        dialect = config.default_dialect.name(),
        cache_limit = ?config.render_cache_limit,
        "sqlweave configured"
    );
    StmtPool::install_global(config.pool)
}
