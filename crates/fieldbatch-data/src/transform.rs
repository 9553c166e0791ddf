// Transform — per-record preprocessing applied before batching

use crate::record::{Record, Value};

/// A transform applied to each record before it is combined into a batch.
pub trait Transform: Send + Sync {
    /// Apply the transform to a record, returning the modified record.
    fn apply(&self, record: Record) -> Record;
}

/// Apply `f` to every number held by a numeric value. Text is left alone.
fn map_numeric(value: &mut Value, f: impl Fn(f64) -> f64) {
    match value {
        Value::Array(a) => *a = a.map(f),
        Value::Scalar(v) => *v = f(*v),
        Value::List(vs) => vs.iter_mut().for_each(|v| *v = f(*v)),
        Value::Text(_) => {}
    }
}

// Built-in transforms

/// Multiply one field by a constant factor.
///
/// Commonly used to bring raw pixel or sensor values into [0, 1]:
/// `Scale::new("x", 1.0 / 255.0)`.
#[derive(Debug, Clone)]
pub struct Scale {
    field: String,
    factor: f64,
}

impl Scale {
    pub fn new(field: impl Into<String>, factor: f64) -> Self {
        Self {
            field: field.into(),
            factor,
        }
    }
}

impl Transform for Scale {
    fn apply(&self, mut record: Record) -> Record {
        if let Some(v) = record.get_mut(&self.field) {
            map_numeric(v, |x| x * self.factor);
        }
        record
    }
}

/// Standardize one field to zero mean and unit variance.
///
/// A `std` that is zero, negative, or not finite is replaced by 1.0, so a
/// constant feature is only centered instead of turning into inf or NaN.
#[derive(Debug, Clone)]
pub struct Standardize {
    field: String,
    mean: f64,
    std: f64,
}

impl Standardize {
    pub fn new(field: impl Into<String>, mean: f64, std: f64) -> Self {
        let std = if std.is_finite() && std > 0.0 { std } else { 1.0 };
        Self {
            field: field.into(),
            mean,
            std,
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// The divisor actually applied, after replacing a degenerate `std`.
    pub fn std(&self) -> f64 {
        self.std
    }
}

impl Transform for Standardize {
    fn apply(&self, mut record: Record) -> Record {
        if let Some(v) = record.get_mut(&self.field) {
            map_numeric(v, |x| (x - self.mean) / self.std);
        }
        record
    }
}

/// Chain multiple transforms.
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }
}

impl Transform for Compose {
    fn apply(&self, mut record: Record) -> Record {
        for t in &self.transforms {
            record = t.apply(record);
        }
        record
    }
}
