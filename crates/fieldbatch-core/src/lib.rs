//! # fieldbatch-core
//!
//! Core array primitives and the shared error type for fieldbatch.
//!
//! This crate provides:
//! - [`Array`] — dense n-dimensional float array with `stack` along a new leading axis
//! - [`Shape`] — n-dimensional shape representation
//! - [`DType`] — element precision (F32, F64)
//! - [`Error`] / [`Result`] — the error type used by every fieldbatch crate

pub mod array;
pub mod dtype;
pub mod error;
pub mod shape;

pub use array::Array;
pub use dtype::DType;
pub use error::{Error, Result};
pub use shape::Shape;
