#![allow(missing_docs)]

use nestcode::{
    AttrValue, Backend, Container, Dict, File, NestcodeError, Payload, StorageOptions, Value,
};

#[test]
fn unsupported_values_are_rejected_before_any_write() {
    let mut file = File::in_memory();
    let value = Value::list([Value::Int(1), Value::tuple([Value::None])]);

    let err = file.write("p", &value, false).unwrap_err();
    match err {
        NestcodeError::UnsupportedType { path, type_name } => {
            assert_eq!(path, "p/1/0");
            assert_eq!(type_name, "NoneType");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!file.contains("p"));
    assert!(file.keys().unwrap().is_empty());
}

#[test]
fn decoded_handles_cannot_be_written_back() {
    let mut file = File::in_memory();
    file.set("arr", ndarray::ArrayD::<i64>::zeros(ndarray::IxDyn(&[2])))
        .unwrap();
    let lazy = file.get("arr").unwrap();
    assert!(matches!(
        file.write("copy", &lazy, false),
        Err(NestcodeError::UnsupportedType { .. })
    ));
}

#[test]
fn unknown_tags_fail_the_read() {
    let mut file = File::in_memory();
    file.set("x", 1i64).unwrap();
    file.set_attr("x", nestcode::ORIGINAL_TYPE_ATTR, "frozenset")
        .unwrap();
    match file.get("x") {
        Err(NestcodeError::UnknownTypeTag { path, tag }) => {
            assert_eq!(path, "x");
            assert_eq!(tag, "frozenset");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn composite_tags_on_datasets_are_format_errors() {
    let mut container = Container::in_memory();
    container
        .create_dataset("x", Payload::scalar(1i64), &StorageOptions::new())
        .unwrap();
    container
        .set_attr("x", nestcode::ORIGINAL_TYPE_ATTR, AttrValue::from("dict"))
        .unwrap();
    let file = File::with_backend(container);
    assert!(matches!(file.get("x"), Err(NestcodeError::Format(_))));
}

#[test]
fn unparsable_dict_keys_are_format_errors() {
    let mut file = File::in_memory();
    let mut dict = Dict::new();
    dict.insert(5i64, "five");
    file.set("d", dict).unwrap();
    file.set_attr("d/5", nestcode::KEY_ORIGIN_ATTR, "bool").unwrap();
    assert!(matches!(file.get("d"), Err(NestcodeError::Format(_))));
}

#[test]
fn missing_paths_are_not_found() {
    let file = File::in_memory();
    assert!(matches!(
        file.get(("a", "b")),
        Err(NestcodeError::NotFound { ref path }) if path == "a/b"
    ));
}

#[test]
fn read_depth_is_bounded() {
    let mut nested = Value::Int(0);
    for _ in 0..10 {
        nested = Value::list([nested]);
    }
    let mut file = File::in_memory();
    file.set("deep", nested).unwrap();
    let image = file.to_bytes().unwrap();

    let shallow = nestcode::Nestcode::builder()
        .max_depth(5)
        .from_bytes(image)
        .unwrap();
    assert!(matches!(
        shallow.get("deep"),
        Err(NestcodeError::DepthLimit { limit: 5, .. })
    ));
}

#[test]
fn writing_to_the_root_is_rejected() {
    let mut file = File::in_memory();
    assert!(matches!(
        file.set("", 1i64),
        Err(NestcodeError::InvalidArgument(_))
    ));
}

#[test]
fn errors_render_their_path() {
    let err = NestcodeError::PathCollision {
        path: "first/b".into(),
    };
    assert!(err.to_string().contains("first/b"));
    assert_eq!(err.path(), Some("first/b"));
}
