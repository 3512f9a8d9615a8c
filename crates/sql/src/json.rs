use base64ct::{Base64, Encoding};
use serde_json::{Map, Number};

use crate::value::{Collection, Value};

impl Value {
    /// Converts the value into JSON.
    ///
    /// Views become objects keyed by attribute name. Maps become objects when
    /// every key is text or an integer, otherwise arrays of `[key, value]`
    /// pairs. Bytes are base64 encoded and timestamps use RFC 3339.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(v) => serde_json::Value::Bool(*v),
            Self::Int(v) => serde_json::Value::Number((*v).into()),
            Self::Double(v) => {
                Number::from_f64(*v).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            Self::Text(v) => serde_json::Value::String(v.clone()),
            Self::Bytes(v) => serde_json::Value::String(Base64::encode_string(v)),
            Self::Timestamp(v) => serde_json::Value::String(v.to_rfc3339()),
            Self::Collection(Collection::List(items) | Collection::Set(items)) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Collection(Collection::Map(entries)) => map_to_json(entries),
            Self::View(view) => {
                let mut map = Map::new();
                for (name, value) in view.names().iter().zip(view.values()) {
                    map.insert((*name).to_string(), value.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

fn map_to_json(entries: &[(Value, Value)]) -> serde_json::Value {
    let keyable = entries.iter().all(|(key, _)| matches!(key, Value::Text(_) | Value::Int(_)));
    if keyable {
        let map = entries.iter().map(|(key, value)| (key.to_string(), value.to_json())).collect();
        return serde_json::Value::Object(map);
    }

    let pairs = entries
        .iter()
        .map(|(key, value)| serde_json::Value::Array(vec![key.to_json(), value.to_json()]))
        .collect();
    serde_json::Value::Array(pairs)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::value::ViewValue;

    #[test]
    fn view_to_object() {
        let names: Arc<[&'static str]> = Arc::from(vec!["id", "tags", "meta"]);
        let view = ViewValue::new(
            "PostView",
            names,
            vec![
                Value::Int(1),
                Value::Collection(Collection::Set(vec!["a".into(), "b".into()])),
                Value::Collection(Collection::Map(vec![("k".into(), Value::Bytes(vec![1, 2]))])),
            ],
        );

        assert_eq!(
            Value::View(view).to_json(),
            json!({"id": 1, "tags": ["a", "b"], "meta": {"k": "AQI="}})
        );
    }

    #[test]
    fn composite_keys_become_pairs() {
        let key = Value::Collection(Collection::List(vec![1.into()]));
        let map = Value::Collection(Collection::Map(vec![(key, Value::Null)]));
        assert_eq!(map.to_json(), json!([[[1], null]]));
    }
}
