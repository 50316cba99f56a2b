#![allow(dead_code)]

use ndarray::{ArrayD, IxDyn};
use nestcode::{Dict, Value};

/// `n x m` array of `0.0, 1.0, 2.0, ...` in row-major order.
pub fn ramp(n: usize, m: usize) -> ArrayD<f64> {
    ArrayD::from_shape_vec(IxDyn(&[n, m]), (0..n * m).map(|v| v as f64).collect())
        .expect("shape matches element count")
}

/// The nested sample used across the suite: mixed scalars, a nested mapping with
/// an array, and an integer key holding a 30-element list.
pub fn sample_dict() -> Value {
    let mut inner = Dict::new();
    inner.insert("c", Value::list([Value::from("monkey"), Value::from("bar")]));
    inner.insert("d", ArrayD::<f64>::ones(IxDyn(&[300, 300])));

    let mut dict = Dict::new();
    dict.insert(
        "a",
        Value::list([
            Value::Int(1),
            Value::Int(5),
            Value::Float(22.2),
            Value::Int64(20),
        ]),
    );
    dict.insert("b", Value::Dict(inner));
    dict.insert(10i64, Value::list((0..30).map(Value::Int)));
    Value::Dict(dict)
}
