//! Conversion between [`Value`] graphs and `serde_json` documents.

use std::collections::HashSet;

use serde_json::{Map, Number};

use super::{Object, ObjectKind, TargetId, Value};
use crate::error::{Error, Result};

impl Value {
    /// Build a raw value graph from a JSON document. Objects become records
    /// and arrays become lists; nothing is wrapped.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => {
                Value::Object(Object::list(items.iter().map(Value::from_json)))
            }
            serde_json::Value::Object(map) => Value::Object(Object::record_from(
                map.iter().map(|(k, v)| (k.as_str(), Value::from_json(v))),
            )),
        }
    }

    /// Snapshot this value as JSON. Handles are read through their raw
    /// target, so the snapshot registers no dependencies.
    ///
    /// `undefined` record entries and symbol keys are skipped; `undefined`
    /// list slots and holes become `null`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut visiting = HashSet::new();
        to_json(self, &mut visiting)
    }
}

fn to_json(value: &Value, visiting: &mut HashSet<TargetId>) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Undefined | Value::Null | Value::Symbol(_) => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Value::Number(number(*n)?),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Object(object) => object_to_json(object, visiting)?,
        Value::Handle(handle) => object_to_json(&handle.to_raw(), visiting)?,
    })
}

/// Integral numbers serialize as integers so documents round-trip exactly.
/// Negative zero stays a float to keep its sign.
fn number(n: f64) -> Result<Number> {
    let negative_zero = n == 0.0 && n.is_sign_negative();
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 && !negative_zero {
        return Ok(Number::from(n as i64));
    }
    Number::from_f64(n).ok_or(Error::NonFiniteNumber(n))
}

fn object_to_json(object: &Object, visiting: &mut HashSet<TargetId>) -> Result<serde_json::Value> {
    if !visiting.insert(object.id()) {
        return Err(Error::CyclicValue);
    }

    let json = match object.kind() {
        ObjectKind::List => {
            let items = (0..object.list_len())
                .map(|i| to_json(&object.get(i), visiting))
                .collect::<Result<Vec<_>>>()?;
            serde_json::Value::Array(items)
        }
        ObjectKind::Record => {
            let mut map = Map::new();
            for key in object.own_keys() {
                if key.is_symbol() {
                    continue;
                }
                let value = object.get(&key);
                if value.is_undefined() {
                    continue;
                }
                map.insert(key.to_string(), to_json(&value, visiting)?);
            }
            serde_json::Value::Object(map)
        }
        kind => return Err(Error::Unserializable(kind.name())),
    };

    visiting.remove(&object.id());
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_raw_graph_from_json() {
        let value = Value::from_json(&json!({"user": {"name": "ada"}, "tags": ["a", "b"]}));
        let root = value.as_object().unwrap();
        assert_eq!(root.kind(), ObjectKind::Record);

        let user = root.get("user");
        assert_eq!(user.as_object().unwrap().get("name"), Value::from("ada"));
        assert_eq!(root.get("tags").as_object().unwrap().list_len(), 2);
    }

    #[test]
    fn snapshot_round_trips() {
        let doc = json!({"count": 3, "items": [1, null, true], "nested": {"x": "y"}});
        assert_eq!(Value::from_json(&doc).to_json().unwrap(), doc);
    }

    #[test]
    fn snapshot_rejects_cycles_and_nan() {
        let obj = Object::record();
        obj.set("me", &obj);
        assert!(matches!(Value::from(&obj).to_json(), Err(Error::CyclicValue)));

        assert!(matches!(
            Value::Number(f64::NAN).to_json(),
            Err(Error::NonFiniteNumber(_))
        ));
    }

    #[test]
    fn negative_zero_keeps_its_sign() {
        let json = Value::Number(-0.0).to_json().unwrap();
        let n = json.as_f64().unwrap();
        assert_eq!(n, 0.0);
        assert!(n.is_sign_negative());
        assert!(json.as_i64().is_none());

        let back = Value::from_json(&json).as_number().unwrap();
        assert!(back.is_sign_negative());
        assert_eq!(Value::Number(0.0).to_json().unwrap(), json!(0));
    }
}
