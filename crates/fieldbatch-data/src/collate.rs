// Collate — combine a group of records into one Batch
//
// Two steps:
//   1. Re-group the records by field: [{k: v1}, {k: v2}] → {k: [v1, v2]}.
//      Every record must carry exactly the field set of the first one.
//   2. Turn each field's value list into one array:
//        identifier field → 1-D F64 array of the `<prefix>_<integer>` suffixes
//        anything else    → stack along a new leading axis
//
// Stacking never pads or truncates. A group of one record still gets a
// leading axis of size 1. Scalars and flat lists are coerced to arrays
// first; the coercion is logged but is not an error.

use std::collections::BTreeMap;

use fieldbatch_core::{Array, DType, Error, Result};
use tracing::warn;

use crate::batch::Batch;
use crate::record::{Record, Value};

/// Re-group records into field name → per-record values, in record order.
pub fn group_by_field(records: Vec<Record>) -> Result<BTreeMap<String, Vec<Value>>> {
    let n = records.len();
    let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    for (position, record) in records.into_iter().enumerate() {
        for (field, value) in record {
            match grouped.get_mut(&field) {
                Some(values) => values.push(value),
                None if position == 0 => {
                    let mut values = Vec::with_capacity(n);
                    values.push(value);
                    grouped.insert(field, values);
                }
                None => return Err(Error::MissingField { field, position }),
            }
        }
        // Every known field must now hold position + 1 values
        if let Some((field, _)) = grouped.iter().find(|(_, v)| v.len() != position + 1) {
            return Err(Error::MissingField {
                field: field.clone(),
                position,
            });
        }
    }

    Ok(grouped)
}

/// Largest identifier magnitude an F64 holds exactly (2^53).
pub const MAX_EXACT_IDENTIFIER: i64 = 1 << 53;

/// Extract the integer after the last `_` of an identifier like `run_17`.
///
/// Returns `None` when there is no separator, the suffix is not an integer,
/// or its magnitude exceeds [`MAX_EXACT_IDENTIFIER`].
pub fn parse_identifier(id: &str) -> Option<i64> {
    let (_, suffix) = id.rsplit_once('_')?;
    let id: i64 = suffix.parse().ok()?;
    (id.unsigned_abs() <= MAX_EXACT_IDENTIFIER as u64).then_some(id)
}

/// Identifiers are always F64, whatever precision the numeric fields use.
fn encode_identifiers(field: &str, values: Vec<Value>) -> Result<Array> {
    let ids = values
        .into_iter()
        .enumerate()
        .map(|(position, value)| {
            value
                .as_text()
                .and_then(parse_identifier)
                .map(|id| id as f64)
                .ok_or_else(|| Error::IdentifierFormat {
                    field: field.to_string(),
                    value: value.to_string(),
                    position,
                })
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(Array::from_vec(ids, DType::F64))
}

fn stack_field(field: &str, values: Vec<Value>, dtype: DType) -> Result<Array> {
    let mut coerced = 0usize;
    let mut arrays: Vec<Array> = Vec::with_capacity(values.len());

    for (position, value) in values.into_iter().enumerate() {
        let array = match value {
            Value::Array(a) if a.dtype() == dtype => a,
            Value::Array(a) => a.to_dtype(dtype),
            Value::Scalar(v) => {
                coerced += 1;
                Array::scalar(v, dtype)
            }
            Value::List(v) => {
                coerced += 1;
                Array::from_vec(v, dtype)
            }
            Value::Text(_) => {
                return Err(Error::NonNumericField {
                    field: field.to_string(),
                    position,
                })
            }
        };
        if let Some(first) = arrays.first() {
            if first.shape() != array.shape() {
                return Err(Error::ShapeMismatch {
                    field: field.to_string(),
                    expected: first.shape().clone(),
                    got: array.shape().clone(),
                    position,
                });
            }
        }
        arrays.push(array);
    }

    if coerced > 0 {
        warn!(
            field,
            coerced, "field values are not arrays; converting them before stacking"
        );
    }

    Array::stack(&arrays)
}

/// Combine a group of records into a batch.
///
/// `id_field` names the identifier field; `dtype` is the precision of every
/// other output array. Fails on the first malformed field.
pub fn collate(records: Vec<Record>, id_field: &str, dtype: DType) -> Result<Batch> {
    let size = records.len();
    let grouped = group_by_field(records)?;

    let mut fields = BTreeMap::new();
    for (field, values) in grouped {
        let array = if field == id_field {
            encode_identifiers(&field, values)?
        } else {
            stack_field(&field, values, dtype)?
        };
        fields.insert(field, array);
    }

    Ok(Batch::new(fields, size))
}
