//! Struct binding: map the fields of a type to result columns.
//!
//! A type describes its columns once through [`Bind::describe`], usually via
//! `#[derive(Bind)]`. [`Stmt::bind`](crate::Stmt::bind) then selects every
//! column and scans each into the matching field of a [`Slot`].
//!
//! Nested types are spliced in with [`FieldMap::flatten`]. Their columns
//! appear at the point of the `flatten` call. A column declared directly on
//! the outer type shadows a flattened column of the same name wherever it is
//! declared; among flattened duplicates the first one wins.

use crate::error::{WeaveError, WeaveResult};
use crate::scan::{Dest, ScanTarget, Slot, SlotCell};
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// A type whose fields can be scanned from result columns.
///
/// ```ignore
/// #[derive(Default)]
/// struct Offer {
///     id: i64,
///     price: f64,
/// }
///
/// impl Bind for Offer {
///     fn describe(map: &mut FieldMap<Self>) {
///         map.field("id", |o| &mut o.id).field("price", |o| &mut o.price);
///     }
/// }
/// ```
pub trait Bind: Default + Send + 'static {
    fn describe(map: &mut FieldMap<Self>);
}

type Setter<T> = Arc<dyn Fn(&mut T, &Row, usize) -> WeaveResult<()> + Send + Sync>;

/// One column of a [`FieldMap`].
pub struct Field<T> {
    column: Cow<'static, str>,
    promoted: bool,
    set: Setter<T>,
}

impl<T> Field<T> {
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Whether the column comes from a flattened type.
    pub fn is_promoted(&self) -> bool {
        self.promoted
    }
}

impl<T: Bind> Field<T> {
    /// A scan target writing this column into the value held by `slot`.
    ///
    /// An empty slot is filled with `T::default()` first.
    pub fn target(&self, slot: &Slot<T>) -> Dest {
        Arc::new(FieldTarget {
            cell: Arc::clone(slot.cell()),
            set: Arc::clone(&self.set),
        })
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            column: self.column.clone(),
            promoted: self.promoted,
            set: Arc::clone(&self.set),
        }
    }
}

/// Ordered column descriptor of `T`.
pub struct FieldMap<T> {
    fields: Vec<Field<T>>,
}

impl<T: 'static> FieldMap<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Map `column` to the field reached through `access`.
    pub fn field<V>(&mut self, column: impl Into<Cow<'static, str>>, access: fn(&mut T) -> &mut V) -> &mut Self
    where
        V: for<'a> FromSql<'a> + Send + 'static,
    {
        let column = column.into();
        let name = column.clone();
        self.fields.push(Field {
            column,
            promoted: false,
            set: Arc::new(move |value: &mut T, row: &Row, idx: usize| {
                *access(value) = row
                    .try_get(idx)
                    .map_err(|e| WeaveError::decode(&*name, e.to_string()))?;
                Ok(())
            }),
        });
        self
    }

    /// Splice in every column of the nested type reached through `access`.
    pub fn flatten<U: Bind>(&mut self, access: fn(&mut T) -> &mut U) -> &mut Self {
        let inner = field_map::<U>();
        for field in inner.fields() {
            let set = Arc::clone(&field.set);
            self.fields.push(Field {
                column: field.column.clone(),
                promoted: true,
                set: Arc::new(move |value: &mut T, row: &Row, idx: usize| set(access(value), row, idx)),
            });
        }
        self
    }

    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(Field::column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Drop shadowed columns.
    fn resolve(mut self) -> Self {
        let direct: HashSet<String> = self
            .fields
            .iter()
            .filter(|f| !f.promoted)
            .map(|f| f.column.to_string())
            .collect();
        let mut seen = HashSet::with_capacity(self.fields.len());
        self.fields.retain(|f| {
            if f.promoted && direct.contains(&*f.column) {
                return false;
            }
            seen.insert(f.column.to_string())
        });
        self
    }
}

impl<T: 'static> Default for FieldMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

type Registry = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// The resolved column map of `T`, built on first use.
pub fn field_map<T: Bind>() -> Arc<FieldMap<T>> {
    let registry = REGISTRY.get_or_init(Default::default);
    let key = TypeId::of::<T>();

    let cached = registry
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();
    if let Some(Ok(map)) = cached.map(|m| m.downcast::<FieldMap<T>>()) {
        return map;
    }

    // Built without holding the lock: describe may flatten other types.
    let mut map = FieldMap::new();
    T::describe(&mut map);
    let map = Arc::new(map.resolve());
    tracing::trace!(
        type_name = std::any::type_name::<T>(),
        columns = map.len(),
        "field map resolved"
    );

    let stored = registry
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert_with(|| Arc::clone(&map) as Arc<dyn Any + Send + Sync>)
        .clone();
    stored.downcast::<FieldMap<T>>().unwrap_or(map)
}

/// Writes one column into a field of the value held by a slot.
struct FieldTarget<T> {
    cell: Arc<SlotCell<T>>,
    set: Setter<T>,
}

impl<T: Bind> ScanTarget for FieldTarget<T> {
    fn scan(&self, row: &Row, idx: usize) -> WeaveResult<()> {
        let mut guard = self.cell.lock();
        let value = guard.get_or_insert_with(T::default);
        (self.set)(value, row, idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Default)]
    struct Audit {
        created_by: String,
        id: i64,
    }

    impl Bind for Audit {
        fn describe(map: &mut FieldMap<Self>) {
            map.field("created_by", |a| &mut a.created_by).field("id", |a| &mut a.id);
        }
    }

    #[derive(Default)]
    struct Meta {
        created_by: String,
        tag: String,
    }

    impl Bind for Meta {
        fn describe(map: &mut FieldMap<Self>) {
            map.field("created_by", |m| &mut m.created_by).field("tag", |m| &mut m.tag);
        }
    }

    #[derive(Default)]
    struct Offer {
        audit: Audit,
        id: i64,
        meta: Meta,
        price: f64,
    }

    impl Bind for Offer {
        fn describe(map: &mut FieldMap<Self>) {
            map.flatten(|o| &mut o.audit)
                .field("id", |o| &mut o.id)
                .flatten(|o| &mut o.meta)
                .field("price", |o| &mut o.price);
        }
    }

    #[test]
    fn direct_columns_shadow_promoted_ones() {
        let map = field_map::<Offer>();
        let columns: Vec<_> = map.columns().collect();
        assert_eq!(columns, vec!["created_by", "id", "tag", "price"]);
        assert!(map.fields()[0].is_promoted());
        assert!(!map.fields()[1].is_promoted());
    }

    #[test]
    fn resolution_is_cached() {
        let a = field_map::<Offer>();
        let b = field_map::<Offer>();
        assert!(Arc::ptr_eq(&a, &b));
    }

    /// A descriptor entry in a generated layout: `(column, promoted)`.
    fn layout() -> impl Strategy<Value = Vec<(u8, bool)>> {
        prop::collection::vec((0u8..6, any::<bool>()), 0..16)
    }

    fn build(entries: &[(u8, bool)]) -> FieldMap<()> {
        let noop: Setter<()> = Arc::new(|_: &mut (), _: &Row, _: usize| Ok(()));
        let mut map = FieldMap::new();
        for &(col, promoted) in entries {
            map.fields.push(Field {
                column: Cow::Owned(format!("c{col}")),
                promoted,
                set: Arc::clone(&noop),
            });
        }
        map
    }

    proptest! {
        #[test]
        fn flatten_rule(entries in layout()) {
            let resolved: Vec<(String, bool)> = build(&entries)
                .resolve()
                .fields()
                .iter()
                .map(|f| (f.column().to_string(), f.is_promoted()))
                .collect();

            let direct: HashSet<String> = entries
                .iter()
                .filter(|e| !e.1)
                .map(|e| format!("c{}", e.0))
                .collect();

            // Unique columns, and each is the first surviving declaration.
            let mut seen = HashSet::new();
            for (column, promoted) in &resolved {
                prop_assert!(seen.insert(column.clone()));
                prop_assert_eq!(*promoted, !direct.contains(column));
            }
            // Every declared column survives once.
            let declared: HashSet<String> = entries.iter().map(|e| format!("c{}", e.0)).collect();
            prop_assert_eq!(seen, declared);

            // Survivors keep declaration order.
            let expected: Vec<String> = {
                let mut kept = Vec::new();
                let mut seen = HashSet::new();
                for &(col, promoted) in &entries {
                    let name = format!("c{col}");
                    if promoted && direct.contains(&name) {
                        continue;
                    }
                    if seen.insert(name.clone()) {
                        kept.push(name);
                    }
                }
                kept
            };
            let got: Vec<String> = resolved.into_iter().map(|r| r.0).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
