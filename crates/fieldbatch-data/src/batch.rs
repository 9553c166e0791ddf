// Batch — field name → stacked array, batch dimension first

use std::collections::BTreeMap;

use fieldbatch_core::Array;

/// One assembled batch.
///
/// Every numeric field is stacked to shape `[size, ...field_shape]`. The
/// identifier field (if present) is a 1-D F64 array of length `size` holding
/// the integer suffix of each record's identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    fields: BTreeMap<String, Array>,
    size: usize,
}

impl Batch {
    pub fn new(fields: BTreeMap<String, Array>, size: usize) -> Self {
        Self { fields, size }
    }

    /// Number of records combined into this batch.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, field: &str) -> Option<&Array> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_fields(self) -> BTreeMap<String, Array> {
        self.fields
    }

    /// The decoded identifiers of an identifier field, in batch order.
    pub fn identifiers(&self, field: &str) -> Option<Vec<i64>> {
        self.fields
            .get(field)
            .map(|a| a.as_slice().iter().map(|&v| v as i64).collect())
    }
}
