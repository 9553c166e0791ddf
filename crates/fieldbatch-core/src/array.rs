use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::shape::Shape;

// Array — dense row-major numeric buffer
//
// An Array is what a single record field holds and what a batch hands to
// the consumer. It is deliberately simple: a flat Vec<f64>, a Shape, and a
// DType tag. All values are stored already rounded to the tagged precision.
//
// The one structural operation batching needs is `stack`: N arrays of shape
// S become one array of shape [N, ...S], laid out record after record.
// `row` is the inverse view, reading one record back out of a batch.

/// A dense n-dimensional array of floating-point values.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    data: Vec<f64>,
    shape: Shape,
    dtype: DType,
}

impl Array {
    /// Create an array from a flat row-major buffer.
    ///
    /// Fails with `ElementCountMismatch` if `data` does not fill `shape`.
    pub fn new(data: Vec<f64>, shape: impl Into<Shape>, dtype: DType) -> Result<Self> {
        let shape = shape.into();
        let expected = shape.elem_count();
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        let data = data.into_iter().map(|v| dtype.cast(v)).collect();
        Ok(Array { data, shape, dtype })
    }

    /// A 0-dimensional array holding one value.
    pub fn scalar(value: f64, dtype: DType) -> Self {
        Array {
            data: vec![dtype.cast(value)],
            shape: Shape::from(()),
            dtype,
        }
    }

    /// A 1-D array from a vector of values.
    pub fn from_vec(data: Vec<f64>, dtype: DType) -> Self {
        let shape = Shape::from(data.len());
        let data = data.into_iter().map(|v| dtype.cast(v)).collect();
        Array { data, shape, dtype }
    }

    /// An array of zeros.
    pub fn zeros(shape: impl Into<Shape>, dtype: DType) -> Self {
        let shape = shape.into();
        Array {
            data: vec![0.0; shape.elem_count()],
            shape,
            dtype,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn elem_count(&self) -> usize {
        self.data.len()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The flat row-major buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy the values out as a flat row-major vector.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.clone()
    }

    /// Consume the array, returning its flat buffer.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Convert to another precision. Converting F64 → F32 rounds values.
    pub fn to_dtype(&self, dtype: DType) -> Self {
        if dtype == self.dtype {
            return self.clone();
        }
        Array {
            data: self.data.iter().map(|&v| dtype.cast(v)).collect(),
            shape: self.shape.clone(),
            dtype,
        }
    }

    /// Apply `f` elementwise, keeping shape and dtype.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Array {
            data: self.data.iter().map(|&v| self.dtype.cast(f(v))).collect(),
            shape: self.shape.clone(),
            dtype: self.dtype,
        }
    }

    /// Same data under a new shape with the same element count.
    pub fn reshape(&self, new_shape: impl Into<Shape>) -> Result<Self> {
        let shape = new_shape.into();
        if shape.elem_count() != self.data.len() {
            return Err(Error::ElementCountMismatch {
                expected: shape.elem_count(),
                got: self.data.len(),
                shape,
            });
        }
        Ok(Array {
            data: self.data.clone(),
            shape,
            dtype: self.dtype,
        })
    }

    /// Read the element at a full multi-index.
    pub fn get(&self, index: &[usize]) -> Result<f64> {
        let dims = self.dims();
        if index.len() != dims.len() || index.iter().zip(dims).any(|(&i, &d)| i >= d) {
            return Err(Error::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.clone(),
            });
        }
        let offset: usize = index
            .iter()
            .zip(self.shape.stride_contiguous())
            .map(|(&i, s)| i * s)
            .sum();
        Ok(self.data[offset])
    }

    /// The `i`-th slice along the leading axis: shape [N, ...S] → S.
    pub fn row(&self, i: usize) -> Result<Self> {
        let n = self.shape.dim(0)?;
        if i >= n {
            return Err(Error::IndexOutOfBounds {
                index: vec![i],
                shape: self.shape.clone(),
            });
        }
        let shape = self.shape.trailing();
        let len = shape.elem_count();
        Ok(Array {
            data: self.data[i * len..(i + 1) * len].to_vec(),
            shape,
            dtype: self.dtype,
        })
    }

    /// Stack arrays of identical shape along a new leading axis.
    ///
    /// `[S, S, ..., S]` (N of them) → `[N, ...S]`. A single array still gets
    /// the leading axis: `[S]` → `[1, ...S]`. The result takes the dtype of
    /// the first array; later arrays are cast to it.
    pub fn stack(arrays: &[Array]) -> Result<Self> {
        let first = arrays.first().ok_or(Error::EmptyStack)?;
        let mut data = Vec::with_capacity(first.elem_count() * arrays.len());
        for (i, a) in arrays.iter().enumerate() {
            if a.shape != first.shape {
                return Err(Error::StackMismatch {
                    index: i,
                    expected: first.shape.clone(),
                    got: a.shape.clone(),
                });
            }
            if a.dtype == first.dtype {
                data.extend_from_slice(&a.data);
            } else {
                data.extend(a.data.iter().map(|&v| first.dtype.cast(v)));
            }
        }
        Ok(Array {
            data,
            shape: first.shape.with_leading(arrays.len()),
            dtype: first.dtype,
        })
    }
}
