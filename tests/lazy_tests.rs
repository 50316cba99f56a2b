#![allow(missing_docs)]

mod common;

use ndarray::{Axis, IxDyn};
use nestcode::{File, Mode, NdArray, NestcodeError, Value};

#[test]
fn lazy_reads_return_references_that_index_like_the_array() -> nestcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lazy.nst");
    let original = common::ramp(400, 100);

    let mut file = File::open(&path, "w")?;
    file.set("second", original.clone())?;
    file.close()?;

    let file = File::open(&path, "r")?;
    let value = file.get("second")?;
    let lazy = value.as_lazy().expect("arrays are read lazily by default");
    assert_eq!(lazy.shape(), &[400, 100]);
    assert_eq!(lazy.len(), 400);
    assert_eq!(lazy.path(), "second");

    let row = lazy.get(123)?;
    let expected = NdArray::from(original.index_axis(Axis(0), 123).to_owned());
    assert_eq!(row, expected);

    let rows = lazy.slice(10..13)?;
    assert_eq!(rows.shape(), &[3, 100]);

    assert_eq!(lazy.load()?, NdArray::from(original.clone()));

    let (eager, _) = file.read("second", false)?;
    assert_eq!(eager, Value::from(original));
    Ok(())
}

#[test]
fn lazy_rows_work_on_compressed_payloads() -> nestcode::Result<()> {
    let mut file = nestcode::Nestcode::builder().compression(true).in_memory();
    file.set("c", common::ramp(64, 8))?;
    let image = file.to_bytes()?;

    let reopened = File::from_bytes(image)?;
    let value = reopened.get("c")?;
    let lazy = value.as_lazy().unwrap();
    let expected = NdArray::from(common::ramp(64, 8).index_axis(Axis(0), 5).to_owned());
    assert_eq!(lazy.get(5)?, expected);
    Ok(())
}

#[test]
fn arrays_inside_composites_are_lazy_too() {
    let mut file = File::in_memory();
    file.write("first", &common::sample_dict(), false).unwrap();

    let b = file.get("first/b").unwrap();
    let d = b.get(&Value::from("d")).and_then(Value::as_lazy).unwrap();
    assert_eq!(d.shape(), &[300, 300]);
    assert_eq!(d.load().unwrap().shape(), &[300, 300]);
}

#[test]
fn references_fail_after_the_container_is_closed() -> nestcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("closed.nst");
    let mut file = File::open(&path, Mode::Truncate)?;
    file.set("a", common::ramp(3, 3))?;

    let value = file.get("a")?;
    file.close()?;

    let lazy = value.as_lazy().unwrap();
    assert!(!lazy.is_open());
    assert!(matches!(lazy.load(), Err(NestcodeError::ResourceClosed { ref path }) if path == "a"));
    assert!(matches!(lazy.get(0), Err(NestcodeError::ResourceClosed { .. })));
    Ok(())
}

#[test]
fn references_fail_after_their_dataset_is_overwritten() {
    let mut file = File::in_memory();
    file.set("a", common::ramp(2, 2)).unwrap();
    let before = file.get("a").unwrap();

    file.write("a", &Value::from(common::ramp(5, 1)), true).unwrap();
    assert!(matches!(
        before.as_lazy().unwrap().load(),
        Err(NestcodeError::ResourceClosed { .. })
    ));
    let after = file.get("a").unwrap();
    assert_eq!(after.as_lazy().unwrap().shape(), &[5, 1]);
}

#[test]
fn row_access_is_bounds_checked() {
    let mut file = File::in_memory();
    file.set("a", common::ramp(2, 2)).unwrap();
    let value = file.get("a").unwrap();
    let lazy = value.as_lazy().unwrap();
    assert!(matches!(lazy.get(2), Err(NestcodeError::InvalidArgument(_))));
    assert!(matches!(lazy.get(usize::MAX), Err(NestcodeError::InvalidArgument(_))));
    assert!(matches!(lazy.slice(1..3), Err(NestcodeError::InvalidArgument(_))));
    assert!(matches!(
        lazy.slice(1..usize::MAX),
        Err(NestcodeError::InvalidArgument(_))
    ));

    let mut scalar = File::in_memory();
    scalar
        .set("z", ndarray::ArrayD::from_elem(IxDyn(&[]), 1.0f64))
        .unwrap();
    let zero_d = scalar.get("z").unwrap();
    assert!(zero_d.as_lazy().unwrap().get(0).is_err());
}
