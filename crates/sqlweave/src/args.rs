//! Bound query arguments.

use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// A bound argument, shared cheaply between clones of a statement.
#[derive(Clone)]
pub struct Arg(Arc<dyn ToSql + Send + Sync>);

impl Arg {
    /// Wrap any `ToSql` value.
    pub fn new<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Arg(Arc::new(value))
    }

    /// Borrow the value in the shape tokio-postgres expects.
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        &*self.0 as &(dyn ToSql + Sync)
    }
}

impl std::fmt::Debug for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.0, f)
    }
}

/// Insert `src` into `dest` so that its first element lands at `index`.
///
/// `index` is clamped to the list length.
pub(crate) fn insert_at<T>(dest: &mut Vec<T>, src: impl IntoIterator<Item = T>, index: usize) {
    let index = index.min(dest.len());
    if index == dest.len() {
        dest.extend(src);
    } else {
        dest.splice(index..index, src);
    }
}

/// A heterogeneous argument list, usually built with [`args!`](crate::args!).
#[derive(Clone, Debug, Default)]
pub struct Args(Vec<Arg>);

impl Args {
    /// Create an empty list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a value.
    pub fn push<T: ToSql + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.0.push(Arg::new(value));
        self
    }

    /// Append an already wrapped argument.
    pub fn push_arg(&mut self, arg: Arg) -> &mut Self {
        self.0.push(arg);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build an [`Args`] list from values of different types.
///
/// ```ignore
/// let q = sqlweave::from("events", ()).where_("kind = ? AND at > ?", sqlweave::args!["login", since]);
/// ```
#[macro_export]
macro_rules! args {
    () => { $crate::Args::new() };
    ($($value:expr),+ $(,)?) => {{
        let mut list = $crate::Args::new();
        $( list.push($value); )+
        list
    }};
}

/// Conversion into the arguments of one fragment.
///
/// Implemented for `()` (no arguments), tuples of up to twelve values, arrays,
/// vectors, `Option`, [`Args`], and the scalar types tokio-postgres binds out
/// of the box, including the `chrono`, `uuid` and `serde_json` types.
///
/// Any other `ToSql + Send + Sync + 'static` value binds as a one-element
/// tuple:
///
/// ```ignore
/// q.where_("id = ?", (account_id,))
/// ```
pub trait IntoArgs {
    fn into_args(self) -> Vec<Arg>;
}

impl IntoArgs for () {
    fn into_args(self) -> Vec<Arg> {
        Vec::new()
    }
}

impl IntoArgs for Args {
    fn into_args(self) -> Vec<Arg> {
        self.0
    }
}

impl IntoArgs for Arg {
    fn into_args(self) -> Vec<Arg> {
        vec![self]
    }
}

impl<T: ToSql + Send + Sync + 'static> IntoArgs for Vec<T> {
    fn into_args(self) -> Vec<Arg> {
        self.into_iter().map(Arg::new).collect()
    }
}

impl<T: ToSql + Send + Sync + 'static, const N: usize> IntoArgs for [T; N] {
    fn into_args(self) -> Vec<Arg> {
        self.into_iter().map(Arg::new).collect()
    }
}

impl<T: ToSql + Send + Sync + 'static> IntoArgs for Option<T> {
    fn into_args(self) -> Vec<Arg> {
        vec![Arg::new(self)]
    }
}

macro_rules! impl_into_args_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoArgs for $ty {
                fn into_args(self) -> Vec<Arg> {
                    vec![Arg::new(self)]
                }
            }
        )*
    };
}

impl_into_args_scalar!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    &'static str,
    std::time::SystemTime,
    std::net::IpAddr,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
    chrono::DateTime<chrono::Local>,
    serde_json::Value,
);

macro_rules! impl_into_args_tuple {
    ($($name:ident),+) => {
        impl<$($name),+> IntoArgs for ($($name,)+)
        where
            $($name: ToSql + Send + Sync + 'static),+
        {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<Arg> {
                let ($($name,)+) = self;
                vec![$(Arg::new($name)),+]
            }
        }
    };
}

impl_into_args_tuple!(A);
impl_into_args_tuple!(A, B);
impl_into_args_tuple!(A, B, C);
impl_into_args_tuple!(A, B, C, D);
impl_into_args_tuple!(A, B, C, D, E);
impl_into_args_tuple!(A, B, C, D, E, F);
impl_into_args_tuple!(A, B, C, D, E, F, G);
impl_into_args_tuple!(A, B, C, D, E, F, G, H);
impl_into_args_tuple!(A, B, C, D, E, F, G, H, I);
impl_into_args_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_into_args_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_into_args_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);
