#![allow(missing_docs)]

mod common;

use nestcode::{
    AttrValue, Backend, Container, File, Inspector, Mode, NdArray, NestcodeError, NodeKind, Payload,
    StorageOptions, Value,
};

#[test]
fn untagged_nodes_pass_through_unchanged() {
    let mut container = Container::in_memory();
    container
        .create_dataset(
            "raw/data",
            Payload::array(&NdArray::from(common::ramp(3, 2))),
            &StorageOptions::new(),
        )
        .unwrap();
    let file = File::with_backend(container);

    let (group, origin) = file.read("raw", true).unwrap();
    assert_eq!(origin, None);
    match group {
        Value::Group(g) => {
            assert_eq!(g.path(), "raw");
            assert_eq!(g.children(), ["data".to_string()]);
        }
        other => panic!("expected an opaque group, got {other:?}"),
    }

    let (data, origin) = file.read("raw/data", false).unwrap();
    assert_eq!(origin, None);
    let lazy = data.as_lazy().expect("untagged datasets stay raw handles");
    assert_eq!(lazy.load().unwrap(), NdArray::from(common::ramp(3, 2)));
}

#[test]
fn read_only_containers_reject_mutation() -> nestcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ro.nst");
    nestcode::Nestcode::save(&path, "x", &Value::Int(1))?;

    let mut file = File::open(&path, "r")?;
    assert!(matches!(
        file.set("y", 2i64),
        Err(NestcodeError::ReadOnly { .. })
    ));
    assert!(matches!(file.delete("x"), Err(NestcodeError::ReadOnly { .. })));
    assert_eq!(file.get("x")?, Value::Int(1));
    Ok(())
}

#[test]
fn modes_follow_create_and_truncate_rules() -> nestcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("modes.nst");

    assert!(matches!(
        File::open(&path, "r"),
        Err(NestcodeError::Io(_))
    ));

    let mut file = File::open(&path, "x")?;
    file.set("kept", 1i64)?;
    file.close()?;
    assert!(File::open(&path, "w-").is_err());

    let file = File::open(&path, "r+")?;
    assert!(file.contains("kept"));
    drop(file);

    let file = File::open(&path, Mode::Truncate)?;
    assert!(file.keys()?.is_empty());
    assert_eq!(file.mode(), Mode::Truncate);
    assert_eq!(file.path(), Some(path.as_path()));
    Ok(())
}

#[test]
fn save_and_load_replace_values_in_place() -> nestcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("facade.nst");

    nestcode::Nestcode::save(&path, "first", &common::sample_dict())?;
    nestcode::Nestcode::save(&path, "first", &Value::Float(1.0))?;
    nestcode::Nestcode::save(&path, 29i64, &Value::from(common::ramp(30, 30)))?;

    assert_eq!(nestcode::Nestcode::load(&path, "first")?, Value::Float(1.0));
    assert_eq!(
        nestcode::Nestcode::load(&path, 29i64)?,
        Value::from(common::ramp(30, 30))
    );
    Ok(())
}

#[test]
fn drop_flushes_pending_changes() -> nestcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("drop.nst");
    {
        let mut file = File::open(&path, "a")?;
        file.set("n", 5u8)?;
    }
    assert_eq!(nestcode::Nestcode::load(&path, "n")?, Value::UInt8(5));
    Ok(())
}

#[test]
fn pass_through_operations_reach_the_backend() {
    let mut file = File::in_memory();
    file.write("first", &common::sample_dict(), false).unwrap();
    file.set_attr("first", "note", "kept").unwrap();

    assert_eq!(
        file.attr("first", "note").unwrap(),
        Some(AttrValue::Str("kept".into()))
    );
    assert_eq!(
        file.attr("first", nestcode::ORIGINAL_TYPE_ATTR).unwrap(),
        Some(AttrValue::from("dict"))
    );
    assert_eq!(file.backend().node_kind("first/b/d").unwrap(), NodeKind::Dataset);

    let mut visited = Vec::new();
    file.visit(|key, _| visited.push(key.to_owned()));
    assert_eq!(visited.first().map(String::as_str), Some("first"));
    assert!(visited.contains(&"first/10/29".to_string()));

    file.delete("first/b").unwrap();
    assert!(!file.contains("first/b/d"));
    assert!(matches!(
        file.delete("first/b"),
        Err(NestcodeError::NotFound { .. })
    ));
}

#[test]
fn inspector_reports_tags_and_layout() -> nestcode::Result<()> {
    let mut file = nestcode::Nestcode::builder().compression(true).in_memory();
    file.write("first", &common::sample_dict(), false)?;
    let report = Inspector::inspect_bytes(file.to_bytes()?)?;

    assert_eq!(report.version, 1);
    assert_eq!(report.tree.kind, NodeKind::Group);
    let first = &report.tree.children[0];
    assert_eq!(first.name, "first");
    assert_eq!(first.original_type.as_deref(), Some("dict"));
    let int_key = first.children.iter().find(|c| c.name == "10").unwrap();
    assert_eq!(int_key.key_origin.as_deref(), Some("int"));
    assert_eq!(int_key.original_type.as_deref(), Some("list"));

    let rendered = report.to_string();
    assert!(rendered.contains("first [dict]"));
    assert!(rendered.contains("LZ4") || rendered.contains("None"));
    Ok(())
}

#[test]
fn copied_subtrees_decode_to_the_same_value() -> nestcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("copy.nst");

    let mut file = File::open(&path, "w")?;
    file.write("first", &common::sample_dict(), false)?;
    file.set_attr("first", "note", "kept")?;
    file.copy("first", ("backup", 1i64))?;
    assert!(matches!(
        file.copy("first", "backup/1"),
        Err(NestcodeError::PathCollision { .. })
    ));
    file.close()?;

    let file = File::open(&path, "r")?;
    let (copied, origin) = file.read("backup/1", false)?;
    assert_eq!(copied, common::sample_dict());
    assert_eq!(origin.as_deref(), Some("str"));
    assert_eq!(file.attr("backup/1", "note")?, Some(AttrValue::from("kept")));

    let items: Vec<(String, NodeKind)> = file.items()?.collect();
    assert_eq!(
        items,
        vec![
            ("first".to_string(), NodeKind::Group),
            ("backup".to_string(), NodeKind::Group),
        ]
    );
    let values = file.values()?.collect::<nestcode::Result<Vec<_>>>()?;
    assert_eq!(values.len(), 2);
    assert!(matches!(values[1], Value::Group(_)));
    Ok(())
}

#[test]
fn inspector_refuses_unbounded_nesting() -> nestcode::Result<()> {
    let mut container = Container::in_memory();
    let deep = vec!["g"; 1100].join("/");
    container.create_group(&deep)?;
    let image = container.to_bytes()?;

    assert!(matches!(
        Inspector::inspect_bytes(image.clone()),
        Err(NestcodeError::Format(_))
    ));
    assert!(matches!(
        File::from_bytes(image),
        Err(NestcodeError::Format(_))
    ));
    Ok(())
}
