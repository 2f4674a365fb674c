use alloc::{string::ToString, vec, vec::Vec};

use rstest::rstest;

use crate::{
    Container, Document, DocumentOptions, LoadError, MAX_DEPTH, MAX_SIZE, Map, MutationError,
    Value, ValueType,
    base::Header,
    cell::Cell,
    layout::{BASE_SIZE, HEADER_SIZE, SLOT_SIZE, read_u32, to_u32, write_u32},
    path, validate,
};

fn nested_arrays(levels: usize) -> Value {
    let mut value = Value::Array(vec![]);
    for _ in 0..levels {
        value = Value::Array(vec![value]);
    }
    value
}

/// Wraps the root array of `bytes` in another array without going through
/// the edit API, so no depth limit applies.
fn wrap_root(bytes: &[u8]) -> Vec<u8> {
    let child = &bytes[HEADER_SIZE..];
    let table = BASE_SIZE + child.len();
    let size = table + SLOT_SIZE;
    let mut out = bytes[..HEADER_SIZE].to_vec();
    out.resize(HEADER_SIZE + size, 0);
    Header {
        size: to_u32(size),
        is_object: false,
        length: 1,
        table_offset: to_u32(table),
    }
    .write(&mut out[HEADER_SIZE..]);
    out[HEADER_SIZE + BASE_SIZE..HEADER_SIZE + table].copy_from_slice(child);
    let cell = Cell::new(ValueType::Array, false, false, to_u32(BASE_SIZE));
    write_u32(&mut out, HEADER_SIZE + table, cell.raw());
    out
}

#[test]
fn sorted_keys_survive_removal_and_reload() {
    let mut doc = Document::new_object();
    doc.insert_key("b", &Value::from(1)).unwrap();
    doc.insert_key("a", &Value::from(2)).unwrap();

    let object = doc.as_object().unwrap();
    assert_eq!(object.index_of("a"), (0, true));
    assert_eq!(object.index_of("b"), (1, true));

    doc.remove_key("a").unwrap();
    let object = doc.as_object().unwrap();
    assert_eq!(object.index_of("b"), (0, true));
    assert!(!object.index_of("a").1);

    let bytes = doc.to_bytes();
    assert!(validate(&bytes));
    let reloaded = Document::from_bytes(&bytes).unwrap();
    assert!(reloaded.is_valid());
    assert_eq!(reloaded.to_value().to_string(), r#"{"b":1}"#);
}

#[test]
fn compaction_preserves_every_value() {
    let mut doc = Document::new_object().with_options(DocumentOptions {
        auto_compact: false,
        ..Default::default()
    });
    for i in 0..20u8 {
        doc.insert_key(&i.to_string(), &Value::from("x".repeat(usize::from(i)))).unwrap();
    }
    for i in (0..20u8).step_by(3) {
        doc.insert_key(&i.to_string(), &Value::from(f64::from(i) + 0.5)).unwrap();
    }
    for i in (1..20).step_by(4) {
        doc.remove_key(&i.to_string()).unwrap();
    }
    let before = doc.to_value();
    let counter = doc.compaction_counter();
    assert!(counter > 0);

    let dirty = doc.size();
    doc.compact().unwrap();
    assert!(doc.size() < dirty);
    assert_eq!(doc.compaction_counter(), 0);
    assert!(doc.is_valid());
    assert_eq!(doc.to_value(), before);

    let once = doc.as_bytes().to_vec();
    doc.compact().unwrap();
    assert_eq!(doc.as_bytes(), &once[..]);
}

#[test]
fn views_navigate_nested_containers() {
    let mut inner = Map::new();
    inner.insert("k".to_string(), Value::from(vec![Value::from(1), Value::from("two")]));
    let doc = Document::from_value(&Value::Array(vec![Value::Null, Value::Object(inner)])).unwrap();

    let array = doc.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert!(array.at(0).is_null());
    let object = array.at(1).as_object().unwrap();
    let entry = object.entry_at(0);
    assert_eq!(entry.key_string(), "k");
    let nested = entry.value().as_array().unwrap();
    assert_eq!(nested.at(0).as_f64(), Some(1.0));
    assert_eq!(nested.at(1).as_string().as_deref(), Some("two"));
    assert!(nested.get(2).is_none());
    assert_eq!(doc.value_at(&path![1, "k", 1]), Value::from("two"));
}

#[rstest]
#[case::empty(&[][..], LoadError::TooShort { len: 0 })]
#[case::header_only(&b"qbjs\x01\0\0\0"[..], LoadError::TooShort { len: 8 })]
#[case::bad_tag(&b"jbqs\x01\0\0\0\x0c\0\0\0\0\0\0\0\x0c\0\0\0"[..], LoadError::BadTag(u32::from_le_bytes(*b"jbqs")))]
#[case::bad_version(&b"qbjs\x02\0\0\0\x0c\0\0\0\0\0\0\0\x0c\0\0\0"[..], LoadError::BadVersion(2))]
#[case::truncated(&b"qbjs\x01\0\0\0\x10\0\0\0\0\0\0\0\x0c\0\0\0"[..], LoadError::Truncated { declared: 16, available: 12 })]
#[case::table_past_end(&b"qbjs\x01\0\0\0\x0c\0\0\0\x02\0\0\0\x0c\0\0\0"[..], LoadError::Malformed)]
fn loading_reports_why(#[case] bytes: &[u8], #[case] expected: LoadError) {
    assert_eq!(Document::from_bytes(bytes).unwrap_err(), expected);
    assert_eq!(Document::view(bytes).unwrap_err(), expected);
    assert!(!validate(bytes));
}

#[test]
fn smallest_documents_load() {
    let empty_array = b"qbjs\x01\0\0\0\x0c\0\0\0\0\0\0\0\x0c\0\0\0";
    let doc = Document::from_bytes(empty_array).unwrap();
    assert!(!doc.is_object());
    assert!(doc.is_empty());

    let empty_object = b"qbjs\x01\0\0\0\x0c\0\0\0\x01\0\0\0\x0c\0\0\0";
    assert!(Document::from_bytes(empty_object).unwrap().is_object());

    assert!(Document::view(empty_array).unwrap().is_empty());
    assert_eq!(Document::view(empty_object).unwrap().value_type(), ValueType::Object);
}

#[test]
fn views_read_the_callers_buffer() {
    let mut inner = Map::new();
    inner.insert("name".to_string(), Value::from("caf\u{e9}"));
    let value = Value::Array(vec![Value::from(0.5), Value::Object(inner)]);
    let mut bytes = Document::from_value(&value).unwrap().into_bytes();
    bytes.extend_from_slice(&[0xAB; 3]);

    let root = Document::view(&bytes).unwrap();
    assert_eq!(root.to_value(), value);
    assert_eq!(
        root.get(&path![1, "name"]).and_then(|v| v.as_string()).as_deref(),
        Some("caf\u{e9}")
    );
    assert!(root.get(&path![1, "missing"]).is_none());
    assert!(root.get(&path!["name"]).is_none());

    let Container::Array(array) = root else {
        panic!("expected an array root, got {root:?}");
    };
    assert!(core::ptr::eq(array.bytes().as_ptr(), bytes[HEADER_SIZE..].as_ptr()));
    assert_eq!(array.size(), bytes.len() - HEADER_SIZE - 3, "trailing bytes are not part of the root");
}

#[test]
fn deepest_allowed_nesting_roundtrips() {
    let value = nested_arrays(MAX_DEPTH);
    let bytes = Document::from_value(&value).unwrap().into_bytes();
    assert!(validate(&bytes));
    assert_eq!(Document::from_bytes(&bytes).unwrap().to_value(), value);

    let shallower = Document::from_value(&nested_arrays(MAX_DEPTH - 1)).unwrap().into_bytes();
    let rewrapped = wrap_root(&shallower);
    assert!(validate(&rewrapped));
    assert_eq!(Document::view(&rewrapped).unwrap().to_value(), value);
}

#[test]
fn external_buffers_nested_too_deeply_are_rejected() {
    let bytes = Document::from_value(&nested_arrays(MAX_DEPTH)).unwrap().into_bytes();
    let deeper = wrap_root(&bytes);
    assert!(!validate(&deeper));
    assert_eq!(Document::from_bytes(&deeper).unwrap_err(), LoadError::Malformed);

    let much_deeper = (0..64).fold(deeper, |bytes, _| wrap_root(&bytes));
    assert!(!validate(&much_deeper));
}

#[test]
fn oversized_values_are_refused_without_damage() {
    let mut doc = Document::new_array();
    doc.push(&Value::from("keep")).unwrap();
    let before = doc.as_bytes().to_vec();

    // too long for the compact encoding, so two bytes per char
    let huge = "a".repeat(MAX_SIZE / 2);
    let err = doc.push(&Value::from(huge)).unwrap_err();
    assert!(matches!(err, MutationError::CapacityExceeded { .. }), "{err:?}");
    assert_eq!(doc.as_bytes(), &before[..]);
}

#[test]
fn compaction_refuses_to_unshare_oversized_payloads() {
    const SLOTS: usize = 200;
    // 800_004 bytes per copy, so SLOTS copies overflow the root container
    let big = "\u{20ac}".repeat(400_000);
    let mut items = vec![Value::from(big.as_str())];
    items.resize(SLOTS, Value::Null);
    let mut bytes = Document::from_value(&Value::Array(items)).unwrap().into_bytes();

    // point every slot at the first slot's string
    let table = HEADER_SIZE + read_u32(&bytes, HEADER_SIZE + 8) as usize;
    let shared = read_u32(&bytes, table);
    for i in 1..SLOTS {
        write_u32(&mut bytes, table + i * SLOT_SIZE, shared);
    }
    assert!(validate(&bytes));

    let mut doc = Document::from_bytes(&bytes).unwrap();
    doc.replace(0, &Value::Null).unwrap();
    let dirty = doc.as_bytes().to_vec();

    let err = doc.compact().unwrap_err();
    assert!(matches!(err, MutationError::CapacityExceeded { .. }), "{err:?}");
    assert_eq!(doc.as_bytes(), &dirty[..]);
    assert_eq!(doc.compaction_counter(), 1);
    for i in [1, SLOTS - 1] {
        assert_eq!(doc.get(&path![i]).and_then(|v| v.as_string()).as_ref(), Some(&big));
    }
    assert_eq!(doc.to_bytes(), dirty, "an uncompactable buffer is returned as is");
}
