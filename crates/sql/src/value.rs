use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// A single column value as it moves between the provider, the
/// transformation pipeline and the object builders.
///
/// Besides the scalar types a database can return, a value may hold a
/// materialized container or nested view. Those only ever appear after a
/// transformer has replaced raw columns.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// SQL `NULL`.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Any integer column.
    Int(i64),
    /// Floating point column.
    Double(f64),
    /// Text column.
    Text(String),
    /// Binary column.
    Bytes(Vec<u8>),
    /// Timestamp in UTC.
    Timestamp(DateTime<Utc>),
    /// A populated plural attribute.
    Collection(Collection),
    /// A built (nested) view.
    View(ViewValue),
}

/// The runtime kind of a non-null [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Bool`]
    Bool,
    /// [`Value::Int`]
    Int,
    /// [`Value::Double`]
    Double,
    /// [`Value::Text`]
    Text,
    /// [`Value::Bytes`]
    Bytes,
    /// [`Value::Timestamp`]
    Timestamp,
    /// [`Value::Collection`]
    Collection,
    /// [`Value::View`]
    View,
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The kind of the value, `None` for `NULL`.
    #[must_use]
    pub const fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Double(_) => Some(ValueKind::Double),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Bytes(_) => Some(ValueKind::Bytes),
            Self::Timestamp(_) => Some(ValueKind::Timestamp),
            Self::Collection(_) => Some(ValueKind::Collection),
            Self::View(_) => Some(ValueKind::View),
        }
    }

    /// Integer content, if this is an [`Value::Int`].
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Text content, if this is a [`Value::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Collection content, if this is a [`Value::Collection`].
    #[must_use]
    pub const fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(v) => Some(v),
            _ => None,
        }
    }

    /// View content, if this is a [`Value::View`].
    #[must_use]
    pub const fn as_view(&self) -> Option<&ViewValue> {
        match self {
            Self::View(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Collection(a), Self::Collection(b)) => a == b,
            (Self::View(a), Self::View(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Double(v) => v.to_bits().hash(state),
            Self::Text(v) => v.hash(state),
            Self::Bytes(v) => v.hash(state),
            Self::Timestamp(v) => v.hash(state),
            Self::Collection(v) => v.hash(state),
            Self::View(v) => v.hash(state),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Collection(v) => write!(f, "{v:?}"),
            Self::View(v) => write!(f, "{}#{:?}", v.view(), v.values()),
        }
    }
}

/// A materialized plural attribute.
///
/// Sets and maps keep first-insertion order so results are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Ordered elements.
    List(Vec<Value>),
    /// Distinct elements.
    Set(Vec<Value>),
    /// Distinct keys with their values.
    Map(Vec<(Value, Value)>),
}

impl Collection {
    /// Number of elements (or entries).
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::List(v) | Self::Set(v) => v.len(),
            Self::Map(v) => v.len(),
        }
    }

    /// Returns `true` when the collection holds nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements of a list or set; `None` for maps.
    #[must_use]
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) | Self::Set(v) => Some(v),
            Self::Map(_) => None,
        }
    }

    /// Looks up a map entry by key.
    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// A built view instance: the concrete view type plus its attribute values
/// in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewValue {
    view: &'static str,
    names: Arc<[&'static str]>,
    values: Vec<Value>,
}

impl ViewValue {
    /// Creates a view value. `names` and `values` are positionally paired.
    #[must_use]
    pub const fn new(view: &'static str, names: Arc<[&'static str]>, values: Vec<Value>) -> Self {
        Self { view, names, values }
    }

    /// The concrete view type name (a subtype name for polymorphic views).
    #[must_use]
    pub const fn view(&self) -> &'static str {
        self.view
    }

    /// Attribute names in declaration order.
    #[must_use]
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Attribute values in declaration order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names.iter().position(|n| *n == name).and_then(|i| self.values.get(i))
    }

    /// Consumes the view, returning its attribute values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Collection> for Value {
    fn from(v: Collection) -> Self {
        Self::Collection(v)
    }
}

impl From<ViewValue> for Value {
    fn from(v: ViewValue) -> Self {
        Self::View(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn doubles_hash_by_bits() {
        let mut set = HashSet::new();
        set.insert(Value::Double(1.5));
        set.insert(Value::Double(1.5));
        set.insert(Value::Int(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".to_string()));
    }

    #[test]
    fn view_lookup_by_name() {
        let names: Arc<[&'static str]> = Arc::from(vec!["id", "title"]);
        let view = ViewValue::new("PostView", names, vec![Value::Int(1), "hello".into()]);
        assert_eq!(view.get("title"), Some(&Value::Text("hello".to_string())));
        assert_eq!(view.get("missing"), None);
    }
}
