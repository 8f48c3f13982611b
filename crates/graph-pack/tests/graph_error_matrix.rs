//! Failure matrix: every malformed stream must fail with a typed error and
//! never panic.

use graph_pack::{
    decode, decode_list, encode, encode_list, Corruption, DynamicObject, FieldValue, GraphError,
    GraphReader, GraphWriter, ObjectRef, ReaderOptions, Saveable, TypeRegistry,
    UnknownClassPolicy, WriterOptions,
};
use graph_pack::constants::DEFAULT_MAX_DEPTH;
use graph_pack_buffers::Writer;

fn node(class_id: &str) -> ObjectRef {
    ObjectRef::new(DynamicObject::new(class_id))
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register("N", || node("N"));
    registry
}

fn new_string(w: &mut Writer, s: &str) {
    w.i32(-(s.len() as i32) - 2);
    w.utf8(s);
}

fn new_field(w: &mut Writer, name: &str, tag: u8) {
    w.i32(-1);
    new_string(w, name);
    w.u8(tag);
}

/// `N -> N -> ...` nested through the `next` field, `len` objects long.
fn chain(len: usize) -> ObjectRef {
    let head = node("N");
    let mut tail = head.clone();
    for _ in 1..len {
        let next = node("N");
        tail.downcast_mut::<DynamicObject>()
            .unwrap()
            .insert("next", &next);
        tail = next;
    }
    head
}

#[test]
fn pointer_to_undefined_object_is_dangling() {
    let mut w = Writer::new();
    new_string(&mut w, "N");
    w.i32(0);
    new_field(&mut w, "next", 31);
    w.i32(7);
    w.i32(-2);
    let bytes = w.flush();
    assert_eq!(
        decode(&bytes, &registry()).unwrap_err(),
        GraphError::DanglingReference { id: 7 }
    );
}

#[test]
fn dangling_element_inside_object_array() {
    let mut w = Writer::new();
    new_string(&mut w, "N");
    w.i32(0);
    new_field(&mut w, "items", 33);
    w.i32(2);
    w.u8(31);
    w.i32(0);
    w.u8(31);
    w.i32(3);
    w.i32(-2);
    let bytes = w.flush();
    assert_eq!(
        decode(&bytes, &registry()).unwrap_err(),
        GraphError::DanglingReference { id: 3 }
    );
}

#[test]
fn root_pointer_to_undefined_object_is_dangling() {
    let bytes = [70, 17, 31, 0, 0, 0, 5, 37];
    assert_eq!(
        decode_list(&bytes, &registry()).unwrap_err(),
        GraphError::DanglingReference { id: 5 }
    );
}

#[test]
fn unregistered_class_is_rejected() {
    let bytes = encode(&node("Mystery")).unwrap();
    assert_eq!(
        decode(&bytes, &registry()).unwrap_err(),
        GraphError::UnknownClass("Mystery".into())
    );
}

#[test]
fn dynamic_policy_keeps_unknown_classes() {
    let mut mystery = DynamicObject::new("Mystery");
    mystery.insert("weight", 2.5f64);
    mystery.insert("child", node("N"));
    let bytes = encode(&ObjectRef::new(mystery)).unwrap();

    let options = ReaderOptions {
        unknown_classes: UnknownClassPolicy::Dynamic,
        ..ReaderOptions::default()
    };
    let registry = registry();
    let root = GraphReader::with_options(&bytes, &registry, options)
        .read_object()
        .unwrap();
    assert_eq!(root.class_id(), "Mystery");
    let decoded = root.downcast_ref::<DynamicObject>().unwrap();
    assert_eq!(decoded.get("weight"), Some(&FieldValue::Double(2.5)));
    assert_eq!(decoded.len(), 2);
    drop(decoded);
    assert_eq!(encode(&root).unwrap(), bytes);
}

#[test]
fn bad_list_terminator() {
    let mut bytes = encode_list(&[node("N")]).unwrap();
    let last = bytes.len() - 1;
    assert_eq!(bytes[last], 37);
    bytes[last] = 99;
    assert_eq!(
        decode_list(&bytes, &registry()).unwrap_err(),
        GraphError::InvalidListTerminator(99)
    );
}

#[test]
fn missing_list_marker() {
    let bytes = encode(&node("N")).unwrap();
    assert!(matches!(
        decode_list(&bytes, &registry()).unwrap_err(),
        GraphError::CorruptStream(Corruption::MissingListMarker(_))
    ));
}

#[test]
fn unexpected_root_element_tag() {
    let bytes = [70, 17, 32, 37];
    assert_eq!(
        decode_list(&bytes, &registry()).unwrap_err(),
        GraphError::CorruptStream(Corruption::UnexpectedObjectTag(32))
    );
}

#[test]
fn unknown_type_tag_reports_offset() {
    let mut w = Writer::new();
    new_string(&mut w, "N");
    w.i32(0);
    new_field(&mut w, "f", 0xEE);
    let bytes = w.flush();
    assert_eq!(
        decode(&bytes, &registry()).unwrap_err(),
        GraphError::UnknownTypeTag { tag: 0xEE, offset: 18 }
    );
}

#[test]
fn every_truncation_fails_cleanly() {
    let mut root = DynamicObject::new("N");
    root.insert("name", "truncate me");
    root.insert("values", vec![1i32, 2, 3]);
    root.insert("child", node("N"));
    let bytes = encode(&ObjectRef::new(root)).unwrap();
    let registry = registry();
    for len in 0..bytes.len() {
        let result = decode(&bytes[..len], &registry);
        assert!(result.is_err(), "prefix of {len} bytes decoded");
    }
    assert_eq!(decode(&bytes[..3], &registry).unwrap_err(), GraphError::UnexpectedEof);
}

#[test]
fn invalid_utf8_in_string_entry() {
    let mut w = Writer::new();
    w.i32(-4);
    w.buf(&[0xC3, 0x28]);
    let bytes = w.flush();
    assert_eq!(decode(&bytes, &registry()).unwrap_err(), GraphError::InvalidUtf8);
}

#[test]
fn structural_corruption_matrix() {
    let registry = registry();

    let null_class = (-1i32).to_be_bytes();
    assert_eq!(
        decode(&null_class, &registry).unwrap_err(),
        GraphError::CorruptStream(Corruption::NullClassId)
    );

    let bad_string = 3i32.to_be_bytes();
    assert_eq!(
        decode(&bad_string, &registry).unwrap_err(),
        GraphError::CorruptStream(Corruption::StringIndex { index: 3, len: 0 })
    );

    // N#0 { child: impl N#0 }
    let mut w = Writer::new();
    new_string(&mut w, "N");
    w.i32(0);
    new_field(&mut w, "child", 30);
    w.i32(0);
    w.i32(0);
    let duplicate = w.flush();
    assert_eq!(
        decode(&duplicate, &registry).unwrap_err(),
        GraphError::CorruptStream(Corruption::DuplicateObjectId(0))
    );

    let mut w = Writer::new();
    new_string(&mut w, "N");
    w.i32(0);
    w.i32(4);
    let bad_schema = w.flush();
    assert_eq!(
        decode(&bad_schema, &registry).unwrap_err(),
        GraphError::CorruptStream(Corruption::SchemaIndex {
            class_id: "N".into(),
            index: 4,
            len: 0,
        })
    );

    let mut w = Writer::new();
    new_string(&mut w, "N");
    w.i32(0);
    new_field(&mut w, "items", 33);
    w.i32(1);
    w.u8(10);
    let bad_element = w.flush();
    assert_eq!(
        decode(&bad_element, &registry).unwrap_err(),
        GraphError::CorruptStream(Corruption::UnexpectedObjectTag(10))
    );
}

#[test]
fn depth_limit_on_read() {
    let bytes = encode(&chain(20)).unwrap();
    let registry = registry();
    let options = ReaderOptions {
        max_depth: 10,
        ..ReaderOptions::default()
    };
    assert_eq!(
        GraphReader::with_options(&bytes, &registry, options)
            .read_object()
            .unwrap_err(),
        GraphError::DepthLimitExceeded(10)
    );
    assert!(decode(&bytes, &registry).is_ok());
}

#[test]
fn depth_limit_on_write() {
    let head = chain(20);
    let err = GraphWriter::with_options(WriterOptions { max_depth: 10 })
        .write_object(&head)
        .unwrap_err();
    assert_eq!(err, GraphError::DepthLimitExceeded(10));
    assert!(encode(&head).is_ok());
}

#[test]
fn default_depth_limit_fails_before_the_stack_does() {
    let registry = registry();
    let deepest = chain(DEFAULT_MAX_DEPTH);
    let bytes = encode(&deepest).unwrap();
    assert!(decode(&bytes, &registry).is_ok());

    let too_deep = chain(DEFAULT_MAX_DEPTH + 1);
    assert_eq!(
        encode(&too_deep).unwrap_err(),
        GraphError::DepthLimitExceeded(DEFAULT_MAX_DEPTH)
    );
    let bytes = GraphWriter::with_options(WriterOptions {
        max_depth: DEFAULT_MAX_DEPTH + 1,
    })
    .write_object(&too_deep)
    .unwrap();
    assert_eq!(
        decode(&bytes, &registry).unwrap_err(),
        GraphError::DepthLimitExceeded(DEFAULT_MAX_DEPTH)
    );
}

#[test]
fn borrowed_child_is_reported_with_its_field() {
    let child = node("N");
    let mut root = DynamicObject::new("N");
    root.insert("child", &child);
    let root = ObjectRef::new(root);
    let _guard = child.borrow_mut();
    assert_eq!(
        encode(&root).unwrap_err(),
        GraphError::ObjectBorrowed("child".into())
    );
}

#[test]
fn error_messages() {
    assert_eq!(
        GraphError::DanglingReference { id: 3 }.to_string(),
        "dangling reference to object 3"
    );
    assert_eq!(
        GraphError::from(Corruption::NegativeLength(-1)).to_string(),
        "corrupt stream: negative length -1"
    );
    assert_eq!(
        GraphError::UnknownTypeTag { tag: 99, offset: 4 }.to_string(),
        "unknown type tag 99 at offset 4"
    );
}

#[test]
fn approx_size_defaults_to_field_count() {
    let mut obj = DynamicObject::new("N");
    assert_eq!(obj.approx_size(), 1);
    obj.insert("a", 1i32);
    obj.insert("b", 2i32);
    assert_eq!(obj.approx_size(), 2);
}
