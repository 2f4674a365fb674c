#![no_main]
use arbitrary::Arbitrary;
use jsonblob::{Document, DocumentOptions, PathComponent, Value};
use libfuzzer_sys::fuzz_target;
use serde_json::Map;

#[derive(Debug)]
struct ArbitraryValue(serde_json::Value);

impl<'a> Arbitrary<'a> for ArbitraryValue {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        let node_type = u.choose_index(21)?;
        let value = match node_type {
            0 => serde_json::Value::Null,
            1 => serde_json::Value::Bool(u.arbitrary()?),
            2 => {
                let n: f64 = u.arbitrary()?;
                serde_json::Value::Number(
                    serde_json::Number::from_f64(n).ok_or(arbitrary::Error::IncorrectFormat)?,
                )
            }
            3..=10 => serde_json::Value::String(u.arbitrary()?),
            11..=15 => {
                let elems: Vec<ArbitraryValue> = u.arbitrary()?;
                serde_json::Value::Array(elems.into_iter().map(|v| v.0).collect())
            }
            16..=20 => {
                let m: Vec<(String, ArbitraryValue)> = u.arbitrary()?;
                serde_json::Value::Object(Map::from_iter(m.into_iter().map(|(k, v)| (k, v.0))))
            }
            _ => Err(arbitrary::Error::IncorrectFormat)?,
        };
        Ok(ArbitraryValue(value))
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Insert { steps: Vec<u16>, key: String, value: ArbitraryValue },
    Replace { steps: Vec<u16>, value: ArbitraryValue },
    Remove { steps: Vec<u16> },
    Compact,
}

#[derive(Debug, Arbitrary)]
struct Input {
    root: ArbitraryValue,
    threshold: u8,
    ops: Vec<Op>,
}

fn to_blob(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(to_blob).collect()),
        serde_json::Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), to_blob(v))).collect())
        }
    }
}

/// Turns random steps into a path into `model`. With `fresh`, the last step
/// may name one-past-the-end or the supplied new key.
fn resolve(model: &serde_json::Value, steps: &[u16], fresh: Option<&str>) -> Option<Vec<PathComponent>> {
    let mut path = Vec::new();
    let mut current = model;
    for (i, &step) in steps.iter().enumerate() {
        let step = usize::from(step);
        let last = i + 1 == steps.len();
        match current {
            serde_json::Value::Array(items) => {
                let bound = items.len() + usize::from(last && fresh.is_some());
                if bound == 0 {
                    return None;
                }
                path.push(PathComponent::Index(step % bound));
                if last {
                    break;
                }
                current = items.get(step % bound)?;
            }
            serde_json::Value::Object(map) => {
                if let (true, Some(key), 0) = (last, fresh, step % 2) {
                    path.push(PathComponent::Key(key.to_owned()));
                    break;
                }
                let (key, child) = map.iter().nth(step % map.len().max(1))?;
                path.push(PathComponent::Key(key.clone()));
                if last {
                    break;
                }
                current = child;
            }
            _ => return None,
        }
    }
    (!path.is_empty()).then_some(path)
}

fn slot<'m>(model: &'m mut serde_json::Value, parents: &[PathComponent]) -> &'m mut serde_json::Value {
    parents.iter().fold(model, |current, component| match component {
        PathComponent::Index(i) => &mut current[*i],
        PathComponent::Key(k) => &mut current[k.as_str()],
    })
}

fuzz_target!(|input: Input| {
    let mut model = input.root.0;
    if !model.is_array() && !model.is_object() {
        return;
    }
    let Ok(doc) = Document::from_value(&to_blob(&model)) else {
        return;
    };
    let mut doc = doc.with_options(DocumentOptions {
        compaction_threshold: u32::from(input.threshold),
        ..Default::default()
    });

    for op in input.ops {
        let (path, result) = match &op {
            Op::Compact => {
                doc.compact().unwrap();
                assert_eq!(doc.compaction_counter(), 0);
                continue;
            }
            Op::Insert { steps, key, value } => {
                let Some(path) = resolve(&model, steps, Some(key.as_str())) else { continue };
                (path.clone(), doc.insert_at(&path, &to_blob(&value.0)))
            }
            Op::Replace { steps, value } => {
                let Some(path) = resolve(&model, steps, None) else { continue };
                (path.clone(), doc.replace_at(&path, &to_blob(&value.0)))
            }
            Op::Remove { steps } => {
                let Some(path) = resolve(&model, steps, None) else { continue };
                (path.clone(), doc.remove_at(&path))
            }
        };
        if result.is_err() {
            // only nesting limits can refuse an edit on a resolved path
            assert!(matches!(result, Err(jsonblob::MutationError::TooDeep)), "{op:?}: {result:?}");
            continue;
        }

        let (last, parents) = path.split_last().unwrap();
        let parent = slot(&mut model, parents);
        match (&op, last, parent) {
            (Op::Insert { value, .. }, PathComponent::Index(i), serde_json::Value::Array(items)) => {
                items.insert(*i, value.0.clone());
            }
            (Op::Insert { value, .. } | Op::Replace { value, .. }, PathComponent::Key(k), serde_json::Value::Object(map)) => {
                map.insert(k.clone(), value.0.clone());
            }
            (Op::Replace { value, .. }, PathComponent::Index(i), serde_json::Value::Array(items)) => {
                items[*i] = value.0.clone();
            }
            (Op::Remove { .. }, PathComponent::Index(i), serde_json::Value::Array(items)) => {
                items.remove(*i);
            }
            (Op::Remove { .. }, PathComponent::Key(k), serde_json::Value::Object(map)) => {
                map.remove(k);
            }
            _ => unreachable!("resolved paths match their containers"),
        }

        assert!(doc.is_valid());
        assert_eq!(doc.to_value(), to_blob(&model));
    }

    let bytes = doc.to_bytes();
    let reloaded = Document::from_bytes(&bytes).unwrap();
    assert_eq!(reloaded.to_value(), to_blob(&model));
});
