#![forbid(unsafe_code)]

//! Serde bridge (feature `serde`).
//!
//! Snapshots serialize the way a JSON encoder sees them: `Undefined` and host
//! objects become `null`, integral numbers are written without a fraction,
//! and non-finite numbers become `null`. JSON documents convert into
//! [`Value`]s so they can be passed straight to `set_state`.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::map::StateMap;
use crate::value::Value;

/// Largest integer an `f64` holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Undefined | Self::Null | Self::Object(_) => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) if !n.is_finite() => serializer.serialize_unit(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => serializer.collect_seq(items.iter()),
            Self::Map(map) => StateMap::serialize(map, serializer),
        }
    }
}

impl Serialize for StateMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            out.serialize_entry(key, value)?;
        }
        out.end()
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::from(s),
            serde_json::Value::Array(items) => Self::from(items),
            serde_json::Value::Object(entries) => Self::from(entries.into_iter().collect::<StateMap>()),
        }
    }
}
