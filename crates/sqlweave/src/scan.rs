//! Scan targets: where result columns land.
//!
//! A statement carries one [`Dest`] per selected column, in column order.
//! Execution helpers hand each row to the targets before calling the row
//! handler, so the handler reads already decoded values out of [`Slot`]s.

use crate::error::{WeaveError, WeaveResult};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Receives the value of one column of a result row.
pub trait ScanTarget: Send + Sync {
    fn scan(&self, row: &Row, idx: usize) -> WeaveResult<()>;
}

/// A scan target as stored on a statement.
pub type Dest = Arc<dyn ScanTarget>;

/// Shared storage behind a [`Slot`].
pub(crate) struct SlotCell<T> {
    value: Mutex<Option<T>>,
}

impl<T> SlotCell<T> {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> ScanTarget for SlotCell<T>
where
    T: for<'a> FromSql<'a> + Send,
{
    fn scan(&self, row: &Row, idx: usize) -> WeaveResult<()> {
        let value: T = row
            .try_get(idx)
            .map_err(|e| WeaveError::decode(column_name(row, idx), e.to_string()))?;
        *self.lock() = Some(value);
        Ok(())
    }
}

/// A typed, shareable cell a statement scans into.
///
/// Cloning a slot yields another handle to the same cell.
///
/// ```ignore
/// let id = Slot::<i64>::new();
/// let name = Slot::<String>::new();
/// sqlweave::select("id", ()).to(&id)
///     .select("name", ()).to(&name)
///     .from("users", ())
///     .query_and_close(&client, |_| println!("{:?} {:?}", id.get(), name.get()))
///     .await?;
/// ```
pub struct Slot<T> {
    cell: Arc<SlotCell<T>>,
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(SlotCell {
                value: Mutex::new(None),
            }),
        }
    }

    /// Store a value, replacing the current one.
    pub fn set(&self, value: T) {
        *self.cell.lock() = Some(value);
    }

    /// Move the current value out, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.cell.lock().take()
    }

    pub fn is_set(&self) -> bool {
        self.cell.lock().is_some()
    }

    pub fn clear(&self) {
        *self.cell.lock() = None;
    }

    /// Run `f` on the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.cell.lock().as_ref())
    }

    /// Whether `dest` writes into this slot.
    pub fn is_target(&self, dest: &Dest) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.cell), Arc::as_ptr(dest))
    }

    pub(crate) fn cell(&self) -> &Arc<SlotCell<T>> {
        &self.cell
    }
}

impl<T: Clone> Slot<T> {
    /// A copy of the current value.
    pub fn get(&self) -> Option<T> {
        self.cell.lock().clone()
    }
}

impl<T> Slot<T>
where
    T: for<'a> FromSql<'a> + Send + 'static,
{
    /// A scan target writing into this slot.
    pub fn target(&self) -> Dest {
        self.cell.clone()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&*self.cell.lock()).finish()
    }
}

/// Feed the columns of `row` to `dest`, one target per column.
pub fn scan_row(row: &Row, dest: &[Dest]) -> WeaveResult<()> {
    if row.len() < dest.len() {
        return Err(WeaveError::ScanMismatch {
            targets: dest.len(),
            columns: row.len(),
        });
    }
    for (idx, target) in dest.iter().enumerate() {
        target.scan(row, idx)?;
    }
    Ok(())
}

fn column_name(row: &Row, idx: usize) -> String {
    row.columns()
        .get(idx)
        .map_or_else(|| idx.to_string(), |c| c.name().to_string())
}
