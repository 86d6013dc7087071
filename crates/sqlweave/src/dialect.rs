//! Dialects: how a chunk sequence becomes final SQL text.
//!
//! Fragments are always written with `?` placeholders. A passthrough dialect
//! emits them untouched; a positional dialect renumbers them (`$1, $2, ...`
//! for PostgreSQL) in render order, which is also argument order.

use crate::args::IntoArgs;
use crate::cache::RenderCache;
use crate::chunk::ChunkSeq;
use crate::pool::StmtPool;
use crate::stmt::Stmt;
use std::cell::RefCell;
use std::sync::{Arc, PoisonError, RwLock};

/// Placeholder strategy of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholders {
    /// Emit fragment text verbatim.
    Passthrough,
    /// Replace every unescaped `?` with the prefix followed by a 1-based
    /// counter shared by the whole statement; `\?` becomes a literal `?`.
    Positional(&'static str),
}

/// A rendering strategy plus the render cache shared by every statement
/// built against it.
///
/// Dialects live for the whole process. Declare custom ones as statics:
///
/// ```ignore
/// static MSSQL: Dialect = Dialect::positional("mssql", "@p");
/// let q = MSSQL.from("users", ()).select("id", ()).where_("name = ?", "bob");
/// assert_eq!(q.sql(), "SELECT id FROM users WHERE name = @p1");
/// ```
#[derive(Debug)]
pub struct Dialect {
    name: &'static str,
    placeholders: Placeholders,
    cache: RenderCache,
}

/// Leaves fragments untouched. This is the initial default dialect.
pub static NO_DIALECT: Dialect = Dialect::passthrough("none");

/// Renumbers `?` placeholders as `$1, $2, ...`.
pub static POSTGRES: Dialect = Dialect::positional("postgres", "$");

static DEFAULT_DIALECT: RwLock<&'static Dialect> = RwLock::new(&NO_DIALECT);

thread_local! {
    static SHAPE_KEY: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

/// Select the dialect used by [`new`](crate::new), [`select`](crate::select),
/// [`from`](crate::from) and the other free constructors.
pub fn set_default_dialect(dialect: &'static Dialect) {
    *DEFAULT_DIALECT.write().unwrap_or_else(PoisonError::into_inner) = dialect;
}

/// The dialect free constructors currently build against.
pub fn default_dialect() -> &'static Dialect {
    *DEFAULT_DIALECT.read().unwrap_or_else(PoisonError::into_inner)
}

impl Dialect {
    /// A dialect that emits fragments verbatim.
    pub const fn passthrough(name: &'static str) -> Self {
        Self {
            name,
            placeholders: Placeholders::Passthrough,
            cache: RenderCache::new(),
        }
    }

    /// A dialect that numbers placeholders with `prefix` (`"$"`, `"@p"`, `":"`).
    pub const fn positional(name: &'static str, prefix: &'static str) -> Self {
        Self {
            name,
            placeholders: Placeholders::Positional(prefix),
            cache: RenderCache::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn placeholders(&self) -> Placeholders {
        self.placeholders
    }

    pub fn is_passthrough(&self) -> bool {
        self.placeholders == Placeholders::Passthrough
    }

    /// The render cache shared by statements of this dialect.
    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Forget every cached rendering.
    ///
    /// Useful to bound memory when an application produces a large number of
    /// distinct statement shapes.
    pub fn clear_cache(&self) {
        let evicted = self.cache.clear();
        tracing::debug!(dialect = self.name, evicted, "render cache cleared");
    }

    /// Render `seq` into `out`.
    pub(crate) fn render(&self, seq: &ChunkSeq, out: &mut String) {
        let Placeholders::Positional(prefix) = self.placeholders else {
            seq.write_raw(out);
            return;
        };

        SHAPE_KEY.with_borrow_mut(|key| {
            key.clear();
            write_shape_key(seq, key);
            if let Some(sql) = self.cache.get(key) {
                out.push_str(&sql);
                return;
            }

            let start = out.len();
            write_numbered(seq, prefix, out);
            let stored = self.cache.insert(key, Arc::from(&out[start..]));
            tracing::trace!(dialect = self.name, stored, "render cache miss");
        });
    }

    // ==================== Statement constructors ====================

    /// Start a statement with an arbitrary verb, e.g. `TRUNCATE`.
    ///
    /// The verb opens the SELECT-position clause; follow-up [`Stmt::expr`]
    /// calls are appended to it.
    pub fn new_stmt(&'static self, verb: &str, args: impl IntoArgs) -> Stmt {
        StmtPool::global().stmt(self).verb(verb, args)
    }

    /// Start a SELECT statement from its FROM clause.
    pub fn from(&'static self, expr: &str, args: impl IntoArgs) -> Stmt {
        StmtPool::global().stmt(self).from(expr, args)
    }

    /// Start a SELECT statement.
    pub fn select(&'static self, expr: &str, args: impl IntoArgs) -> Stmt {
        StmtPool::global().stmt(self).select(expr, args)
    }

    /// Start an UPDATE statement.
    pub fn update(&'static self, table: &str) -> Stmt {
        StmtPool::global().stmt(self).update(table)
    }

    /// Start an INSERT statement.
    pub fn insert_into(&'static self, table: &str) -> Stmt {
        StmtPool::global().stmt(self).insert_into(table)
    }

    /// Start a DELETE statement.
    pub fn delete_from(&'static self, table: &str) -> Stmt {
        StmtPool::global().stmt(self).delete_from(table)
    }

    /// Start a statement with a `WITH name AS (query)` clause.
    pub fn with(&'static self, name: &str, query: Stmt) -> Stmt {
        StmtPool::global().stmt(self).with(name, query)
    }
}

/// Frame every chunk as `header, length, bytes` so that the key is an exact,
/// unambiguous image of what the renderer reads.
fn write_shape_key(seq: &ChunkSeq, key: &mut Vec<u8>) {
    for (space, text, chunk) in seq.pieces() {
        key.push((u8::from(space) << 1) | u8::from(chunk.arg_len > 0));
        key.extend_from_slice(&(text.len() as u64).to_le_bytes());
        key.extend_from_slice(text.as_bytes());
    }
}

fn write_numbered(seq: &ChunkSeq, prefix: &str, out: &mut String) {
    let mut arg_no = 1;
    for (space, text, chunk) in seq.pieces() {
        if space {
            out.push(' ');
        }
        if chunk.arg_len > 0 {
            arg_no = write_positional(prefix, arg_no, text, out);
        } else {
            out.push_str(text);
        }
    }
}

/// Copy `s` into `out`, numbering `?` placeholders from `arg_no` on.
///
/// Returns the next free placeholder number. Only ASCII bytes are matched, so
/// every slice boundary falls on a character boundary.
pub(crate) fn write_positional(prefix: &str, mut arg_no: usize, s: &str, out: &mut String) -> usize {
    let bytes = s.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'?') => {
                out.push_str(&s[start..i]);
                out.push('?');
                i += 2;
                start = i;
            }
            b'?' => {
                out.push_str(&s[start..i]);
                out.push_str(prefix);
                push_usize(out, arg_no);
                arg_no += 1;
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    out.push_str(&s[start..]);
    arg_no
}

/// Write a usize as decimal digits into `out` without going through fmt.
#[inline]
fn push_usize(out: &mut String, mut n: usize) {
    if n < 10 {
        out.push((b'0' + n as u8) as char);
        return;
    }
    let mut buf = [0u8; 20];
    let mut pos = buf.len();
    while n > 0 {
        pos -= 1;
        buf[pos] = b'0' + (n % 10) as u8;
        n /= 10;
    }
    for &digit in &buf[pos..] {
        out.push(digit as char);
    }
}
