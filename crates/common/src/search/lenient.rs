//! Tolerant field decoders for provider-shaped records.
//!
//! Provider fields drift in type (a null snippet, a numeric attribute, a
//! rank sent as a string). These decoders never reject a value; anything
//! that cannot be read as the wanted type decodes as absent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Scalar as text. Numbers and booleans are rendered, other kinds are absent.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(opt_text(deserializer)?.unwrap_or_default())
}

pub(crate) fn opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(scalar_text(&Value::deserialize(deserializer)?))
}

/// Non-negative integer, also accepted as a numeric string
pub(crate) fn opt_rank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let rank = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(rank.and_then(|rank| u32::try_from(rank).ok()))
}

pub(crate) fn opt_object<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Map<String, Value>>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(Some(map)),
        _ => Ok(None),
    }
}

/// Array of records; entries that do not decode are skipped.
pub(crate) fn opt_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        )),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "text")]
        title: String,
        #[serde(default, deserialize_with = "opt_text")]
        snippet: Option<String>,
        #[serde(default, deserialize_with = "opt_rank")]
        position: Option<u32>,
        #[serde(default, deserialize_with = "opt_object")]
        attributes: Option<Map<String, Value>>,
        #[serde(default, deserialize_with = "opt_list")]
        tags: Option<Vec<String>>,
    }

    #[test]
    fn test_mismatched_types_decode_as_absent() {
        let record: Record = serde_json::from_value(json!({
            "title": null,
            "snippet": ["not", "text"],
            "position": -3,
            "attributes": "Rating: 4.5",
            "tags": { "a": 1 }
        }))
        .unwrap();

        assert_eq!(record.title, "");
        assert_eq!(record.snippet, None);
        assert_eq!(record.position, None);
        assert_eq!(record.attributes, None);
        assert_eq!(record.tags, None);
    }

    #[test]
    fn test_scalars_are_coerced() {
        let record: Record = serde_json::from_value(json!({
            "title": 2024,
            "snippet": true,
            "position": "7",
            "attributes": { "Rating": 4.5 },
            "tags": ["ev", 3, "suv"]
        }))
        .unwrap();

        assert_eq!(record.title, "2024");
        assert_eq!(record.snippet.as_deref(), Some("true"));
        assert_eq!(record.position, Some(7));
        assert_eq!(record.attributes.unwrap()["Rating"], 4.5);
        assert_eq!(record.tags.unwrap(), vec!["ev", "suv"]);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let record: Record = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record.title, "");
        assert!(record.snippet.is_none() && record.position.is_none());
    }
}
