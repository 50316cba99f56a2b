#![allow(missing_docs)]

mod common;

use ndarray::{ArrayD, IxDyn};
use nestcode::{Dict, File, Mode, NdArray, Value};
use num_complex::{Complex32, Complex64};

fn round_trip(value: &Value) -> Value {
    let mut file = File::in_memory();
    file.write("v", value, false).expect("write");
    file.read("v", false).expect("read").0
}

#[test]
fn every_atomic_kind_round_trips_exactly() {
    let atoms = [
        Value::Bool(true),
        Value::Int(-42),
        Value::Float(22.2),
        Value::Str("héllo wörld".into()),
        Value::Str(String::new()),
        Value::Int8(i8::MIN),
        Value::Int16(-300),
        Value::Int32(1 << 20),
        Value::Int64(i64::MAX),
        Value::UInt8(255),
        Value::UInt16(65_535),
        Value::UInt32(u32::MAX),
        Value::UInt64(u64::MAX),
        Value::Float32(1.5),
        Value::Float64(f64::MIN_POSITIVE),
        Value::NpBool(false),
        Value::Complex64(Complex32::new(1.0, -2.5)),
        Value::Complex128(Complex64::new(-0.25, 8.0)),
    ];
    for atom in atoms {
        assert_eq!(round_trip(&atom), atom, "{}", atom.type_name());
    }
}

#[test]
fn arrays_keep_dtype_and_shape() {
    let arrays: Vec<NdArray> = vec![
        common::ramp(4, 5).into(),
        ArrayD::from_shape_vec(IxDyn(&[2, 3, 2]), (0..12).collect::<Vec<i32>>())
            .unwrap()
            .into(),
        ArrayD::from_elem(IxDyn(&[]), 7u16).into(),
        ArrayD::from_shape_vec(IxDyn(&[3]), vec![true, false, true])
            .unwrap()
            .into(),
        ArrayD::from_elem(IxDyn(&[2, 2]), Complex64::new(1.0, 1.0)).into(),
        ArrayD::<f32>::zeros(IxDyn(&[0, 4])).into(),
    ];
    for array in arrays {
        let value = Value::Array(array.clone());
        let back = round_trip(&value);
        let back = back.as_array().expect("eager read yields an array");
        assert_eq!(back.dtype(), array.dtype());
        assert_eq!(back.shape(), array.shape());
        assert_eq!(back, &array);
    }
}

#[test]
fn nested_sample_round_trips_with_key_types_and_order() {
    let sample = common::sample_dict();
    let back = round_trip(&sample);
    assert_eq!(back, sample);

    let dict = back.as_dict().unwrap();
    let keys: Vec<&Value> = dict.keys().collect();
    assert_eq!(
        keys,
        vec![&Value::from("a"), &Value::from("b"), &Value::Int(10)]
    );
    assert_eq!(back.get(&Value::Int(10)).unwrap().at(29), Some(&Value::Int(29)));
}

#[test]
fn tuples_stay_tuples_and_lists_stay_lists() {
    let value = Value::tuple([
        Value::list([Value::Int(1)]),
        Value::tuple([]),
        Value::list([]),
        Value::Dict(Dict::new()),
    ]);
    assert_eq!(round_trip(&value), value);
}

#[test]
fn long_sequences_are_rebuilt_in_numeric_order() {
    let value = Value::list((0..25).map(|i| Value::Str(format!("item{i}"))));
    assert_eq!(round_trip(&value), value);
}

#[test]
fn non_string_keys_come_back_with_their_type() {
    let mut dict = Dict::new();
    dict.insert(true, "bool key");
    dict.insert(1.5f64, "float key");
    dict.insert(7u8, "uint8 key");
    dict.insert(Value::Complex128(Complex64::new(1.0, 2.0)), "complex key");
    dict.insert(-3i64, "negative");
    let value = Value::Dict(dict);
    assert_eq!(round_trip(&value), value);
}

#[test]
fn key_origin_reports_the_addressing_segment() {
    let mut file = File::in_memory();
    file.set("by_name", 1i64).unwrap();
    file.set(29i64, Value::from(common::ramp(2, 2))).unwrap();
    file.set(("group", 3u32), 2.0f64).unwrap();

    assert_eq!(file.read("by_name", true).unwrap().1.as_deref(), Some("str"));
    assert_eq!(file.read(29i64, true).unwrap().1.as_deref(), Some("int"));
    assert_eq!(
        file.read(("group", 3u32), true).unwrap().1.as_deref(),
        Some("uint32")
    );
    assert!(file.contains("29"));
}

#[test]
fn file_round_trip_survives_reopen() -> nestcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sample.nst");

    let sample = common::sample_dict();
    {
        let mut file = File::open(&path, "a")?;
        file.write("first", &sample, true)?;
        file.write("second", &Value::from(ArrayD::<f64>::zeros(IxDyn(&[400, 100]))), true)?;
        file.close()?;
    }

    let file = File::open(&path, Mode::Read)?;
    assert_eq!(file.keys()?, vec!["first", "second"]);
    assert_eq!(file.read("first", false)?.0, sample);
    assert_eq!(file.get("first/b/c/0")?, Value::from("monkey"));
    Ok(())
}

#[test]
fn compressed_payloads_round_trip() -> nestcode::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("third.nst");

    let value = Value::list([
        Value::from(ArrayD::<f64>::zeros(IxDyn(&[400, 100]))),
        Value::from(ArrayD::<f64>::ones(IxDyn(&[50, 50, 50]))),
    ]);
    let mut file = nestcode::Nestcode::builder()
        .compression(true)
        .open(&path, Mode::Truncate)?;
    file.write("third", &value, true)?;
    file.close()?;

    assert_eq!(nestcode::Nestcode::load(&path, "third")?, value);
    Ok(())
}
