//! # sqlweave
//!
//! Compose SQL statements from fragments, in any order.
//!
//! ## Features
//!
//! - **Order independent**: clauses render in canonical SQL order whatever order they were added in
//! - **Arguments in step**: every `?` is bound in the same call that writes it, and the argument list always follows placeholder order
//! - **Dialects**: `?` placeholders are renumbered (`$1, $2, ...`) at render time, with a per-dialect render cache
//! - **Subqueries**: embed statements as subqueries, CTEs or set operations; placeholders are numbered globally
//! - **Pooled**: statement storage is recycled, so building a statement of a familiar shape does not allocate
//! - **Scan targets**: bind result columns to typed [`Slot`]s, or whole structs with `#[derive(Bind)]`
//!
//! ## Example
//!
//! ```ignore
//! use sqlweave::{POSTGRES, Slot};
//!
//! let region = Slot::<String>::new();
//! let total = Slot::<i64>::new();
//!
//! POSTGRES
//!     .from("orders", ())
//!     .with(
//!         "top_regions",
//!         POSTGRES.from("regional_sales", ()).select("region", ()).where_("total > ?", 1000_i64),
//!     )
//!     .select("region", ()).to(&region)
//!     .select("SUM(amount)", ()).to(&total)
//!     .where_("region IN (SELECT region FROM top_regions)", ())
//!     .group_by("region")
//!     .query_and_close(&client, |_| println!("{:?} {:?}", region.get(), total.get()))
//!     .await?;
//! ```
//!
//! ## Dialects
//!
//! Free constructors ([`select`], [`from`], ...) build against the process-wide
//! default dialect, [`NO_DIALECT`] unless changed with [`set_default_dialect`]
//! or [`init`]. Constructors on a [`Dialect`] build against that dialect.

pub mod args;
pub mod bind;
pub mod cache;
pub mod client;
pub mod config;
pub mod dialect;
pub mod error;
pub mod pool;
pub mod pos;
pub mod scan;
pub mod stmt;

mod chunk;
mod exec;

pub use args::{Arg, Args, IntoArgs};
pub use bind::{Bind, Field, FieldMap, field_map};
pub use cache::RenderCache;
pub use client::GenericClient;
pub use config::{Config, PoolConfig, init};
pub use dialect::{Dialect, NO_DIALECT, POSTGRES, Placeholders, default_dialect, set_default_dialect};
pub use error::{WeaveError, WeaveResult};
pub use pool::StmtPool;
pub use pos::Pos;
pub use scan::{Dest, ScanTarget, Slot, scan_row};
pub use stmt::{SetOp, Stmt};

#[cfg(feature = "derive")]
pub use sqlweave_derive::Bind;

/// Start a statement with an arbitrary verb, against the default dialect.
///
/// ```ignore
/// let q = sqlweave::new("TRUNCATE", ()).expr("sessions", ()).expr("tokens", ());
/// ```
pub fn new(verb: &str, args: impl IntoArgs) -> Stmt {
    default_dialect().new_stmt(verb, args)
}

/// Start a SELECT statement from its FROM clause, against the default dialect.
pub fn from(expr: &str, args: impl IntoArgs) -> Stmt {
    default_dialect().from(expr, args)
}

/// Start a SELECT statement against the default dialect.
pub fn select(expr: &str, args: impl IntoArgs) -> Stmt {
    default_dialect().select(expr, args)
}

/// Start an UPDATE statement against the default dialect.
pub fn update(table: &str) -> Stmt {
    default_dialect().update(table)
}

/// Start an INSERT statement against the default dialect.
pub fn insert_into(table: &str) -> Stmt {
    default_dialect().insert_into(table)
}

/// Start a DELETE statement against the default dialect.
pub fn delete_from(table: &str) -> Stmt {
    default_dialect().delete_from(table)
}

/// Start a statement with a WITH clause, against the default dialect.
pub fn with(name: &str, query: Stmt) -> Stmt {
    default_dialect().with(name, query)
}
