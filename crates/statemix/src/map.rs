#![forbid(unsafe_code)]

//! The state record: an immutable-by-convention string-keyed mapping.
//!
//! [`StateMap`] is backed by a persistent ordered map, so cloning is O(1)
//! and [`overlay`](StateMap::overlay) shares structure with its base. That
//! makes copy-on-write cheap: a record handed out by `get_state` is never
//! touched again, the next `set_state` builds a fresh map beside it.
//!
//! Keys iterate in lexicographic order.

use std::borrow::Cow;
use std::fmt;
use std::ops::Index;
use std::rc::Rc;

use im::OrdMap;

use crate::value::{UNDEFINED, Value};

/// Mapping from state keys to [`Value`]s.
#[derive(Clone, Default, PartialEq)]
pub struct StateMap {
    entries: OrdMap<Rc<str>, Value>,
}

impl StateMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Value stored under `key`, reading absent keys as [`Value::Undefined`].
    #[must_use]
    pub fn value(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(UNDEFINED)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace a value, returning the previous one.
    ///
    /// Only touches this map; clones that share structure are unaffected.
    pub fn insert(&mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Keys in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|key| &**key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (&**key, value))
    }

    /// Shallow merge: a copy of `self` with every entry of `partial` written
    /// over it.
    ///
    /// Nested maps and lists are replaced wholesale, never merged.
    #[must_use]
    pub fn overlay(&self, partial: &StateMap) -> StateMap {
        let mut entries = self.entries.clone();
        for (key, value) in partial.entries.iter() {
            entries.insert(Rc::clone(key), value.clone());
        }
        Self { entries }
    }

    /// Entries a partial-state value contributes, or `None` when the value is
    /// not an object and must be ignored.
    ///
    /// Maps contribute their entries. Lists contribute index keys (`"0"`,
    /// `"1"`, ...). Runtime instances contribute their own fields; other host
    /// objects are accepted but have no enumerable keys. Classes and
    /// primitives are rejected.
    #[must_use]
    pub fn from_partial(partial: &Value) -> Option<Cow<'_, StateMap>> {
        match partial {
            Value::Map(map) => Some(Cow::Borrowed(map.as_ref())),
            Value::List(items) => Some(Cow::Owned(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| (index.to_string(), item.clone()))
                    .collect(),
            )),
            Value::Object(object) if crate::class::is_class(object) => None,
            Value::Object(object) => Some(Cow::Owned(
                crate::class::own_fields(object).unwrap_or_default(),
            )),
            _ => None,
        }
    }
}

impl Index<&str> for StateMap {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.value(key)
    }
}

impl fmt::Debug for StateMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for StateMap
where
    K: Into<Rc<str>>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Build a [`StateMap`] from `key => value` pairs.
///
/// ```
/// use statemix::state_map;
///
/// let map = state_map! { "a" => 1, "b" => "two" };
/// assert_eq!(map.len(), 2);
/// assert_eq!(map["b"].as_str(), Some("two"));
/// ```
#[macro_export]
macro_rules! state_map {
    () => {
        $crate::StateMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::StateMap::new();
        $(
            map.insert($key, $value);
        )+
        map
    }};
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_keys_read_as_undefined() {
        let map = state_map! { "a" => 1 };
        assert_eq!(map["a"], Value::from(1));
        assert!(map["missing"].is_undefined());
        assert!(map.get("missing").is_none());
        assert!(!map.contains_key("missing"));
    }

    #[test]
    fn overlay_keeps_unrelated_keys() {
        let base = state_map! { "a" => 1, "b" => 2 };
        let merged = base.overlay(&state_map! { "b" => 3, "c" => 4 });
        assert_eq!(merged, state_map! { "a" => 1, "b" => 3, "c" => 4 });
    }

    #[test]
    fn overlay_leaves_base_untouched() {
        let base = state_map! { "a" => 1 };
        let _merged = base.overlay(&state_map! { "a" => 2, "z" => 0 });
        assert_eq!(base, state_map! { "a" => 1 });
    }

    #[test]
    fn overlay_replaces_nested_maps_wholesale() {
        let base = state_map! { "nested" => state_map! { "x" => 1, "y" => 2 } };
        let merged = base.overlay(&state_map! { "nested" => state_map! { "x" => 9 } });
        let nested = merged["nested"].as_map().expect("nested map");
        assert_eq!(**nested, state_map! { "x" => 9 });
        assert!(!nested.contains_key("y"));
    }

    #[test]
    fn overlay_can_store_undefined() {
        let base = state_map! { "a" => 1 };
        let merged = base.overlay(&state_map! { "a" => Value::Undefined });
        assert!(merged.contains_key("a"));
        assert!(merged["a"].is_undefined());
    }

    #[test]
    fn keys_iterate_in_order() {
        let map = state_map! { "b" => 1, "a" => 2, "c" => 3 };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        let pairs: Vec<_> = map.iter().map(|(k, v)| (k, v.as_f64())).collect();
        assert_eq!(pairs, vec![("a", Some(2.0)), ("b", Some(1.0)), ("c", Some(3.0))]);
    }

    #[test]
    fn from_partial_accepts_maps() {
        let partial = Value::from(state_map! { "a" => 1 });
        let entries = StateMap::from_partial(&partial).expect("map accepted");
        assert!(matches!(entries, Cow::Borrowed(_)));
        assert_eq!(*entries, state_map! { "a" => 1 });
    }

    #[test]
    fn from_partial_indexes_lists() {
        let partial = Value::from(vec!["x", "y"]);
        let entries = StateMap::from_partial(&partial).expect("list accepted");
        assert_eq!(*entries, state_map! { "0" => "x", "1" => "y" });
    }

    #[test]
    fn from_partial_accepts_host_objects_without_keys() {
        let partial = Value::object(Rc::new(7u32));
        let entries = StateMap::from_partial(&partial).expect("object accepted");
        assert!(entries.is_empty());
    }

    #[test]
    fn from_partial_copies_instance_fields() {
        let source = crate::Class::new("Source").construct();
        source.set_field("a", 1);
        source.set_field("b", "two");
        let value = source.into_value();
        let entries = StateMap::from_partial(&value).expect("instance accepted");
        assert_eq!(*entries, state_map! { "a" => 1, "b" => "two" });
    }

    #[test]
    fn from_partial_rejects_classes() {
        let class = crate::Class::new("Source").into_value();
        assert!(StateMap::from_partial(&class).is_none());
    }

    #[test]
    fn from_partial_rejects_primitives() {
        for value in [
            Value::Undefined,
            Value::Null,
            Value::from(true),
            Value::from(42),
            Value::from("x"),
        ] {
            assert!(StateMap::from_partial(&value).is_none(), "{value:?}");
        }
    }

    #[test]
    fn collect_from_pairs() {
        let map: StateMap = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(map.len(), 2);
        assert!(!map.is_empty());
        assert!(StateMap::new().is_empty());
    }

    #[test]
    fn insert_returns_previous() {
        let mut map = StateMap::new();
        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.insert("a", 2), Some(Value::from(1)));
    }

    #[test]
    fn debug_format() {
        let map = state_map! { "a" => 1 };
        assert_eq!(format!("{map:?}"), "{\"a\": Number(1)}");
    }
}
