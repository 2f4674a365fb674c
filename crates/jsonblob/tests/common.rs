#![allow(missing_docs, dead_code)]

use jsonblob::{Map, Value};

pub const FIXTURE: &str = r#"
{
    "service": {
        "name": "catalog",
        "replicas": 3,
        "ratio": 0.75,
        "enabled": true,
        "owner": null
    },
    "regions": ["eu-west", "us-east", "ap-south"],
    "limits": [
        { "kind": "cpu", "max": 4 },
        { "kind": "memory", "max": 17179869184 }
    ],
    "labels": {
        "tier": "backend",
        "café": "latin1 key",
        "€": "wide key",
        "": "empty key"
    },
    "matrix": [[1, 2], [], [[-3]]],
    "notes": "smørrebrød 🥪"
}
"#;

/// Converts a `serde_json` value into the crate's owned value.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect::<Map>(),
        ),
    }
}

pub fn fixture() -> Value {
    from_json(&serde_json::from_str(FIXTURE).unwrap())
}
