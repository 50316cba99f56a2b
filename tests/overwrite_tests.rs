#![allow(missing_docs)]

mod common;

use nestcode::{Dict, File, NestcodeError, Value};

#[test]
fn overwrite_replaces_the_whole_subtree() {
    let mut file = File::in_memory();
    file.write("p", &Value::list((0..5).map(Value::Int)), false)
        .unwrap();
    file.write("p", &Value::list([Value::Int(9)]), true).unwrap();

    assert_eq!(file.get("p").unwrap(), Value::list([Value::Int(9)]));
    assert!(!file.contains("p/1"));
    assert!(!file.contains("p/4"));
}

#[test]
fn overwrite_can_change_the_kind_of_node() {
    let mut file = File::in_memory();
    file.write("p", &common::sample_dict(), false).unwrap();
    file.write("p", &Value::Str("flat".into()), true).unwrap();
    assert_eq!(file.get("p").unwrap(), Value::from("flat"));
    assert!(!file.contains("p/a"));
}

#[test]
fn repeated_overwrites_are_idempotent() {
    fn layout(file: &File) -> Vec<String> {
        let mut keys = Vec::new();
        file.visit(|key, kind| keys.push(format!("{key}:{kind:?}")));
        keys
    }

    let mut first = File::in_memory();
    let mut second = File::in_memory();
    let sample = common::sample_dict();
    first.write("x", &sample, true).unwrap();
    for _ in 0..3 {
        second.write("x", &sample, true).unwrap();
    }
    assert_eq!(layout(&first), layout(&second));
    assert_eq!(second.read("x", false).unwrap().0, sample);
}

#[test]
fn writing_an_existing_path_without_overwrite_is_rejected() {
    let mut file = File::in_memory();
    file.write("p", &Value::Int(1), false).unwrap();

    let err = file.write("p", &Value::Int(2), false).unwrap_err();
    assert!(matches!(err, NestcodeError::PathCollision { ref path } if path == "p"));
    assert_eq!(file.get("p").unwrap(), Value::Int(1));

    let err = file.set("p", 3i64).unwrap_err();
    assert!(matches!(err, NestcodeError::PathCollision { .. }));
}

#[test]
fn invalid_values_do_not_clobber_existing_data() {
    let mut file = File::in_memory();
    file.write("p", &Value::Int(1), false).unwrap();

    let mut bad = Dict::new();
    bad.insert("fine", 1i64);
    bad.insert(Value::list([]), 2i64);
    let err = file.write("p", &Value::Dict(bad), true).unwrap_err();
    assert!(matches!(err, NestcodeError::InvalidKey { .. }));
    assert_eq!(file.get("p").unwrap(), Value::Int(1));
}
