//! The statement builder.
//!
//! A [`Stmt`] collects SQL fragments in any call order and renders them in
//! canonical clause order:
//!
//! ```ignore
//! use sqlweave::POSTGRES;
//!
//! let q = POSTGRES
//!     .select("id, name", ())
//!     .where_("age > ?", 18)
//!     .from("users", ())
//!     .order_by("name");
//! assert_eq!(q.sql(), "SELECT id, name FROM users WHERE age > $1 ORDER BY name");
//! ```
//!
//! Every `?` in a fragment is paired with one argument of the same call, and
//! the argument list always follows placeholder order in the rendered text,
//! whatever order the clauses were added in.

use crate::args::{Arg, IntoArgs, insert_at};
use crate::bind::{self, Bind};
use crate::dialect::Dialect;
use crate::pool::{StmtParts, StmtPool};
use crate::pos::Pos;
use crate::scan::{Dest, Slot};
use std::fmt;
use std::sync::OnceLock;
use tokio_postgres::types::{FromSql, ToSql};


/// Connector of a set operation between two queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

impl SetOp {
    /// Keyword followed by the space that separates it from the query.
    fn prefix(self) -> &'static str {
        match self {
            SetOp::Union => "UNION ",
            SetOp::UnionAll => "UNION ALL ",
            SetOp::Intersect => "INTERSECT ",
            SetOp::IntersectAll => "INTERSECT ALL ",
            SetOp::Except => "EXCEPT ",
            SetOp::ExceptAll => "EXCEPT ALL ",
        }
    }

    pub fn keyword(self) -> &'static str {
        self.prefix().trim_end()
    }
}

/// A SQL statement under construction.
///
/// Builder methods consume and return the statement so calls chain; when a
/// clause is conditional, reassign:
///
/// ```ignore
/// let mut q = sqlweave::from("users", ()).select("id", ());
/// if let Some(name) = filter {
///     q = q.where_("name = ?", name);
/// }
/// ```
///
/// Dropping a statement returns its storage to the pool it came from.
pub struct Stmt {
    dialect: &'static Dialect,
    pool: &'static StmtPool,
    /// Position that [`Stmt::expr`] appends to.
    pos: Pos,
    parts: StmtParts,
    sql: OnceLock<String>,
}

impl Stmt {
    pub(crate) fn acquire(dialect: &'static Dialect, pool: &'static StmtPool) -> Self {
        Self {
            dialect,
            pool,
            pos: Pos::START,
            parts: pool.take_parts(),
            sql: OnceLock::new(),
        }
    }

    pub fn dialect(&self) -> &'static Dialect {
        self.dialect
    }

    /// Whether nothing was added yet.
    pub fn is_empty(&self) -> bool {
        self.parts.seq.is_empty()
    }

    // ==================== Core mutation ====================

    /// Append `parts` at `pos` and splice `args` in at the matching offset.
    fn add<I>(&mut self, pos: Pos, parts: &[&str], args: I, sep: &str)
    where
        I: IntoIterator<Item = Arg>,
        I::IntoIter: ExactSizeIterator,
    {
        let args = args.into_iter();
        let tail = self.parts.seq.add(pos, parts, args.len(), sep);
        if args.len() > 0 {
            let at = self.parts.args.len() - tail;
            insert_at(&mut self.parts.args, args, at);
        }
        self.invalidate();
    }

    /// Open the clause at `pos` unless present, and make it current.
    fn open_clause(&mut self, pos: Pos, keyword: &str, args: Vec<Arg>) {
        self.pos = pos;
        if let Some(tail) = self.parts.seq.open_clause(pos, keyword, args.len()) {
            if !args.is_empty() {
                let at = self.parts.args.len() - tail;
                insert_at(&mut self.parts.args, args, at);
            }
            self.invalidate();
        }
    }

    /// Render `child` without numbering and splice it in at `pos` between
    /// `prefix` and `suffix`, moving its arguments along.
    ///
    /// The spliced text shares one chunk with the child's arguments, so under
    /// a positional dialect a literal `?` from an argument-less child chunk is
    /// escaped on the way in.
    fn embed(&mut self, pos: Pos, prefix: &str, suffix: &str, mut child: Stmt, sep: &str) {
        let mut text = self.pool.take_buffer();
        if child.parts.args.is_empty() || self.dialect.is_passthrough() {
            child.parts.seq.write_raw(&mut text);
        } else {
            child.parts.seq.write_escaped(&mut text);
        }
        self.add(pos, &[prefix, &text, suffix], child.parts.args.drain(..), sep);
        self.pool.recycle_buffer(text);
    }

    // ==================== Clauses ====================

    /// Open the SELECT-position clause with an arbitrary verb.
    pub(crate) fn verb(mut self, verb: &str, args: impl IntoArgs) -> Self {
        self.open_clause(Pos::SELECT, verb, args.into_args());
        self
    }

    /// Add columns to the SELECT clause.
    ///
    /// ```ignore
    /// let q = sqlweave::from("t", ()).select("id", ()).select("(a + ?) AS b", 10);
    /// ```
    pub fn select(mut self, expr: &str, args: impl IntoArgs) -> Self {
        self.open_clause(Pos::SELECT, "SELECT", Vec::new());
        self.add(Pos::SELECT, &[expr], args.into_args(), ", ");
        self
    }

    /// Add a table expression to the FROM clause.
    ///
    /// An empty `expr` only opens the clause, so a subquery can follow:
    /// `from("", ()).sub_query("(", ") t", inner)`.
    pub fn from(mut self, expr: &str, args: impl IntoArgs) -> Self {
        self.open_clause(Pos::FROM, "FROM", Vec::new());
        self.add(Pos::FROM, &[expr], args.into_args(), ", ");
        self
    }

    /// Add a condition; conditions are joined with `AND`.
    pub fn where_(mut self, expr: &str, args: impl IntoArgs) -> Self {
        self.open_clause(Pos::WHERE, "WHERE", Vec::new());
        self.add(Pos::WHERE, &[expr], args.into_args(), " AND ");
        self
    }

    pub fn group_by(mut self, expr: &str) -> Self {
        self.open_clause(Pos::GROUP_BY, "GROUP BY", Vec::new());
        self.add(Pos::GROUP_BY, &[expr], Vec::new(), ", ");
        self
    }

    /// Add a HAVING condition; conditions are joined with `AND`.
    pub fn having(mut self, expr: &str, args: impl IntoArgs) -> Self {
        self.open_clause(Pos::HAVING, "HAVING", Vec::new());
        self.add(Pos::HAVING, &[expr], args.into_args(), " AND ");
        self
    }

    pub fn order_by(mut self, expr: &str) -> Self {
        self.open_clause(Pos::ORDER_BY, "ORDER BY", Vec::new());
        self.add(Pos::ORDER_BY, &[expr], Vec::new(), ", ");
        self
    }

    /// Set `LIMIT ?`. Only the first call has an effect.
    pub fn limit<T: ToSql + Send + Sync + 'static>(mut self, limit: T) -> Self {
        self.open_clause(Pos::LIMIT, "LIMIT ?", vec![Arg::new(limit)]);
        self
    }

    /// Set `OFFSET ?`. Only the first call has an effect.
    pub fn offset<T: ToSql + Send + Sync + 'static>(mut self, offset: T) -> Self {
        self.open_clause(Pos::OFFSET, "OFFSET ?", vec![Arg::new(offset)]);
        self
    }

    /// Set LIMIT and OFFSET for a 1-based page number.
    ///
    /// Values below 1 are treated as 1; the first page has no OFFSET.
    pub fn paginate(self, page: i64, page_size: i64) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let q = if page > 1 {
            self.offset((page - 1).saturating_mul(page_size))
        } else {
            self
        };
        q.limit(page_size)
    }

    pub fn returning(mut self, expr: &str) -> Self {
        self.open_clause(Pos::RETURNING, "RETURNING", Vec::new());
        self.add(Pos::RETURNING, &[expr], Vec::new(), ", ");
        self
    }

    /// Start an UPDATE of `table`.
    pub fn update(mut self, table: &str) -> Self {
        self.open_clause(Pos::UPDATE, "UPDATE", Vec::new());
        self.add(Pos::UPDATE, &[table], Vec::new(), ", ");
        self
    }

    /// Start an INSERT into `table`; follow with [`Stmt::set`] calls.
    pub fn insert_into(mut self, table: &str) -> Self {
        self.open_clause(Pos::INSERT, "INSERT INTO", Vec::new());
        self.add(Pos::INSERT, &[table], Vec::new(), ", ");
        self.open_clause(Pos::INSERT_FIELDS.before(), "(", Vec::new());
        self.open_clause(Pos::VALUES.before(), ") VALUES (", Vec::new());
        self.open_clause(Pos::VALUES.after(), ")", Vec::new());
        self.pos = Pos::INSERT_FIELDS;
        self
    }

    /// Start a DELETE from `table`.
    pub fn delete_from(mut self, table: &str) -> Self {
        self.open_clause(Pos::DELETE, "DELETE FROM", Vec::new());
        self.add(Pos::DELETE, &[table], Vec::new(), ", ");
        self
    }

    /// Assign a bound value to `field`. See [`Stmt::set_expr`].
    pub fn set<T: ToSql + Send + Sync + 'static>(self, field: &str, value: T) -> Self {
        self.set_expr(field, "?", Arg::new(value))
    }

    /// Assign an expression to `field`.
    ///
    /// For an INSERT the field joins the column list and `expr` the VALUES
    /// list; for an UPDATE `field=expr` joins the SET clause. Statements that
    /// are neither are left unchanged.
    pub fn set_expr(mut self, field: &str, expr: &str, args: impl IntoArgs) -> Self {
        if self.parts.seq.contains(Pos::INSERT) {
            self.add(Pos::INSERT_FIELDS, &[field], Vec::new(), ", ");
            self.add(Pos::VALUES, &[expr], args.into_args(), ", ");
        } else if self.parts.seq.contains(Pos::UPDATE) {
            self.open_clause(Pos::SET, "SET", Vec::new());
            self.add(Pos::SET, &[field, "=", expr], args.into_args(), ", ");
        }
        self
    }

    /// Append an expression to the current clause.
    ///
    /// ```ignore
    /// let mut q = sqlweave::new("TRUNCATE", ());
    /// for table in ["a", "b"] {
    ///     q = q.expr(table, ());
    /// }
    /// assert_eq!(q.sql(), "TRUNCATE a, b");
    /// ```
    pub fn expr(mut self, expr: &str, args: impl IntoArgs) -> Self {
        let pos = self.pos;
        self.add(pos, &[expr], args.into_args(), ", ");
        self
    }

    /// Append `IN (?,?,...)` to the current clause, one placeholder per value.
    ///
    /// An empty list renders `IN (NULL)`, which matches nothing.
    pub fn in_(mut self, values: impl IntoArgs) -> Self {
        let args = values.into_args();
        let pos = self.pos;
        if args.is_empty() {
            self.add(pos, &["IN (NULL)"], Vec::new(), " ");
            return self;
        }
        let mut text = String::with_capacity(4 + args.len() * 2);
        text.push_str("IN (");
        for i in 0..args.len() {
            if i > 0 {
                text.push(',');
            }
            text.push('?');
        }
        text.push(')');
        self.add(pos, &[&text], args, " ");
        self
    }

    /// Open a custom clause after everything added so far.
    ///
    /// ```ignore
    /// let q = sqlweave::from("empsalary", ())
    ///     .select("sum(salary) OVER w", ())
    ///     .clause("WINDOW w AS (PARTITION BY depname ORDER BY salary DESC)", ());
    /// ```
    pub fn clause(mut self, expr: &str, args: impl IntoArgs) -> Self {
        let pos = match self.parts.seq.last_pos() {
            Some(last) => last.offset(Pos::CLAUSE_STEP),
            None => Pos::END,
        };
        self.open_clause(pos, expr, args.into_args());
        self
    }

    // ==================== Embedding ====================

    /// Append `prefix`, the text of `query` and `suffix` to the current clause.
    ///
    /// The subquery's arguments move into this statement and its
    /// placeholders are numbered together with ours.
    pub fn sub_query(mut self, prefix: &str, suffix: &str, query: Stmt) -> Self {
        let pos = self.pos;
        self.embed(pos, prefix, suffix, query, ", ");
        self
    }

    /// Add `name AS (query)` to the WITH clause.
    ///
    /// `name` may carry modifiers, e.g. `"RECURSIVE tree"`.
    pub fn with(mut self, name: &str, query: Stmt) -> Self {
        self.open_clause(Pos::WITH, "WITH", Vec::new());
        let mut prefix = String::with_capacity(name.len() + 5);
        prefix.push_str(name);
        prefix.push_str(" AS (");
        self.embed(Pos::WITH, &prefix, ")", query, ", ");
        self
    }

    /// Combine with `query` using `op`.
    ///
    /// Set operations render after HAVING and before ORDER BY, in call
    /// order. ORDER BY, LIMIT and OFFSET apply to the combined result
    /// whenever they are added.
    pub fn set_op(mut self, op: SetOp, query: Stmt) -> Self {
        self.embed(Pos::UNION, op.prefix(), "", query, " ");
        self
    }

    pub fn union(self, query: Stmt) -> Self {
        self.set_op(SetOp::Union, query)
    }

    pub fn union_all(self, query: Stmt) -> Self {
        self.set_op(SetOp::UnionAll, query)
    }

    // ==================== Scan targets ====================

    /// Scan the most recently selected column into `slot`.
    ///
    /// Call right after the [`Stmt::select`] or [`Stmt::returning`] that
    /// names the column, so targets stay in column order.
    pub fn to<T>(mut self, slot: &Slot<T>) -> Self
    where
        T: for<'a> FromSql<'a> + Send + 'static,
    {
        self.parts.dest.push(slot.target());
        self
    }

    /// Append an arbitrary scan target.
    pub fn to_target(mut self, dest: Dest) -> Self {
        self.parts.dest.push(dest);
        self
    }

    /// Select every column `T` maps and scan them into `slot`.
    pub fn bind<T: Bind>(mut self, slot: &Slot<T>) -> Self {
        let map = bind::field_map::<T>();
        for field in map.fields() {
            self = self.select(field.column(), ());
            self.parts.dest.push(field.target(slot));
        }
        self
    }

    // ==================== Output ====================

    /// The rendered statement text, computed once per mutation.
    pub fn sql(&self) -> &str {
        self.sql.get_or_init(|| {
            let mut out = self.pool.take_buffer();
            self.dialect.render(&self.parts.seq, &mut out);
            out
        })
    }

    /// Rendered text together with its arguments.
    pub fn build(&self) -> (&str, &[Arg]) {
        (self.sql(), &self.parts.args)
    }

    pub fn args(&self) -> &[Arg] {
        &self.parts.args
    }

    /// Parameters in the form tokio-postgres accepts.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.parts.args.iter().map(Arg::as_sql).collect()
    }

    pub fn dest(&self) -> &[Dest] {
        &self.parts.dest
    }

    /// Drop the rendered text so the next [`Stmt::sql`] renders again.
    pub fn invalidate(&mut self) {
        if let Some(sql) = self.sql.take() {
            self.pool.recycle_buffer(sql);
        }
    }

    /// Return the statement to its pool.
    ///
    /// Dropping does the same; `close` just reads better at the end of a chain.
    pub fn close(self) {}
}

impl Drop for Stmt {
    fn drop(&mut self) {
        self.invalidate();
        self.pool.release(std::mem::take(&mut self.parts));
    }
}

impl Clone for Stmt {
    fn clone(&self) -> Self {
        let mut parts = self.pool.take_parts();
        parts.seq.copy_from(&self.parts.seq);
        parts.args.extend(self.parts.args.iter().cloned());
        parts.dest.extend(self.parts.dest.iter().cloned());
        Self {
            dialect: self.dialect,
            pool: self.pool,
            pos: self.pos,
            parts,
            sql: OnceLock::new(),
        }
    }
}

impl fmt::Debug for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stmt")
            .field("dialect", &self.dialect.name())
            .field("sql", &self.sql())
            .field("args", &self.parts.args)
            .field("dest", &self.parts.dest.len())
            .finish()
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}
