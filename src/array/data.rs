//! Typed n-dimensional regions, the unit handed between the provider, the
//! slicer and the encoders.

use std::fmt::Display;

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, ShapeError, Slice};
use serde_json::Value;

use super::slicing::ResolvedDim;
use crate::catalog::DType;

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Float64(ArrayD<f64>),
    Float32(ArrayD<f32>),
    Int64(ArrayD<i64>),
    Int32(ArrayD<i32>),
    UInt8(ArrayD<u8>),
}

// Run `$body` against whichever typed array is inside.
macro_rules! with_array {
    ($data:expr, $a:ident => $body:expr) => {
        match $data {
            ArrayData::Float64($a) => $body,
            ArrayData::Float32($a) => $body,
            ArrayData::Int64($a) => $body,
            ArrayData::Int32($a) => $body,
            ArrayData::UInt8($a) => $body,
        }
    };
}

// Same, re-wrapping the resulting array in the original variant.
macro_rules! map_array {
    ($data:expr, $a:ident => $body:expr) => {
        match $data {
            ArrayData::Float64($a) => ArrayData::Float64($body),
            ArrayData::Float32($a) => ArrayData::Float32($body),
            ArrayData::Int64($a) => ArrayData::Int64($body),
            ArrayData::Int32($a) => ArrayData::Int32($body),
            ArrayData::UInt8($a) => ArrayData::UInt8($body),
        }
    };
}

fn decode_le<T, const N: usize>(bytes: &[u8], f: fn([u8; N]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|c| {
            let mut b = [0u8; N];
            b.copy_from_slice(c);
            f(b)
        })
        .collect()
}

impl ArrayData {
    /// Build from f64 values in C order, casting to `dtype`.
    pub fn from_f64(dtype: DType, shape: &[usize], values: Vec<f64>) -> Result<Self, ShapeError> {
        let dim = IxDyn(shape);
        Ok(match dtype {
            DType::Float64 => ArrayData::Float64(ArrayD::from_shape_vec(dim, values)?),
            DType::Float32 => ArrayData::Float32(ArrayD::from_shape_vec(dim, values.into_iter().map(|v| v as f32).collect())?),
            DType::Int64 => ArrayData::Int64(ArrayD::from_shape_vec(dim, values.into_iter().map(|v| v as i64).collect())?),
            DType::Int32 => ArrayData::Int32(ArrayD::from_shape_vec(dim, values.into_iter().map(|v| v as i32).collect())?),
            DType::UInt8 => ArrayData::UInt8(ArrayD::from_shape_vec(dim, values.into_iter().map(|v| v as u8).collect())?),
        })
    }

    pub fn zeros(dtype: DType, shape: &[usize]) -> Self {
        let dim = IxDyn(shape);
        match dtype {
            DType::Float64 => ArrayData::Float64(ArrayD::zeros(dim)),
            DType::Float32 => ArrayData::Float32(ArrayD::zeros(dim)),
            DType::Int64 => ArrayData::Int64(ArrayD::zeros(dim)),
            DType::Int32 => ArrayData::Int32(ArrayD::zeros(dim)),
            DType::UInt8 => ArrayData::UInt8(ArrayD::zeros(dim)),
        }
    }

    /// Parse raw little-endian C-order bytes. `None` when the byte count does
    /// not match the shape.
    pub fn from_le_bytes(dtype: DType, shape: &[usize], bytes: &[u8]) -> Option<Self> {
        let n: usize = shape.iter().product();
        if bytes.len() != n * dtype.itemsize() {
            return None;
        }
        let dim = IxDyn(shape);
        let out = match dtype {
            DType::Float64 => ArrayData::Float64(ArrayD::from_shape_vec(dim, decode_le(bytes, f64::from_le_bytes)).ok()?),
            DType::Float32 => ArrayData::Float32(ArrayD::from_shape_vec(dim, decode_le(bytes, f32::from_le_bytes)).ok()?),
            DType::Int64 => ArrayData::Int64(ArrayD::from_shape_vec(dim, decode_le(bytes, i64::from_le_bytes)).ok()?),
            DType::Int32 => ArrayData::Int32(ArrayD::from_shape_vec(dim, decode_le(bytes, i32::from_le_bytes)).ok()?),
            DType::UInt8 => ArrayData::UInt8(ArrayD::from_shape_vec(dim, bytes.to_vec()).ok()?),
        };
        Some(out)
    }

    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::Float64(_) => DType::Float64,
            ArrayData::Float32(_) => DType::Float32,
            ArrayData::Int64(_) => DType::Int64,
            ArrayData::Int32(_) => DType::Int32,
            ArrayData::UInt8(_) => DType::UInt8,
        }
    }

    pub fn shape(&self) -> &[usize] { with_array!(self, a => a.shape()) }

    pub fn ndim(&self) -> usize { self.shape().len() }

    pub fn len(&self) -> usize { with_array!(self, a => a.len()) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn to_f64_vec(&self) -> Vec<f64> { with_array!(self, a => a.iter().map(|v| *v as f64).collect()) }

    /// Apply already-validated per-dimension selections. Integer selections
    /// drop their dimension.
    pub fn sliced(&self, dims: &[ResolvedDim]) -> ArrayData { map_array!(self, a => slice_array(a, dims)) }

    /// Copy `block` into this array with its origin at `offsets`.
    pub fn assign_block(&mut self, offsets: &[usize], block: &ArrayData) -> Result<(), String> {
        match (self, block) {
            (ArrayData::Float64(dst), ArrayData::Float64(src)) => assign_into(dst, offsets, src),
            (ArrayData::Float32(dst), ArrayData::Float32(src)) => assign_into(dst, offsets, src),
            (ArrayData::Int64(dst), ArrayData::Int64(src)) => assign_into(dst, offsets, src),
            (ArrayData::Int32(dst), ArrayData::Int32(src)) => assign_into(dst, offsets, src),
            (ArrayData::UInt8(dst), ArrayData::UInt8(src)) => assign_into(dst, offsets, src),
            (dst, src) => Err(format!("dtype mismatch: {:?} <- {:?}", dst.dtype(), src.dtype())),
        }
    }

    /// Element bytes, little-endian, C order.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        with_array!(self, a => a.iter().flat_map(|v| v.to_le_bytes()).collect())
    }

    /// Nested JSON lists (a bare number for rank 0).
    pub fn to_json(&self) -> Value { with_array!(self, a => nested_json(a.view())) }

    /// Rows of comma-separated values; only rank 1 (one value per row) and
    /// rank 2 have a tabular form.
    pub fn to_csv(&self) -> Option<String> { with_array!(self, a => csv_rows(a)) }
}

fn slice_array<T: Clone>(a: &ArrayD<T>, dims: &[ResolvedDim]) -> ArrayD<T> {
    let mut view = a.view();
    let mut dropped = Vec::new();
    for (axis, d) in dims.iter().enumerate() {
        match *d {
            ResolvedDim::Range { start, stop, step } => {
                view.slice_axis_inplace(Axis(axis), Slice::new(start as isize, Some(stop as isize), step as isize));
            }
            ResolvedDim::Index(i) => {
                view.slice_axis_inplace(Axis(axis), Slice::new(i as isize, Some(i as isize + 1), 1));
                dropped.push(axis);
            }
        }
    }
    let mut out = view.to_owned();
    for axis in dropped.into_iter().rev() {
        out = out.index_axis_move(Axis(axis), 0);
    }
    out
}

fn assign_into<T: Clone>(dst: &mut ArrayD<T>, offsets: &[usize], src: &ArrayD<T>) -> Result<(), String> {
    let shape = dst.shape().to_vec();
    if offsets.len() != shape.len() || src.ndim() != shape.len() {
        return Err(format!("rank mismatch: target {}, block {}, offsets {}", shape.len(), src.ndim(), offsets.len()));
    }
    for (axis, (&off, &len)) in offsets.iter().zip(src.shape()).enumerate() {
        if off + len > shape[axis] {
            return Err(format!("block overruns axis {axis}: {off}+{len} > {}", shape[axis]));
        }
    }
    let mut view = dst.view_mut();
    for (axis, (&off, &len)) in offsets.iter().zip(src.shape()).enumerate() {
        view.slice_axis_inplace(Axis(axis), Slice::from(off..off + len));
    }
    view.assign(src);
    Ok(())
}

fn nested_json<T: Copy + Into<Value>>(view: ArrayViewD<'_, T>) -> Value {
    if view.ndim() == 0 {
        return view.iter().next().map(|v| (*v).into()).unwrap_or(Value::Null);
    }
    Value::Array(view.outer_iter().map(nested_json).collect())
}

fn csv_rows<T: Display>(a: &ArrayD<T>) -> Option<String> {
    let mut out = String::new();
    match a.ndim() {
        1 => {
            for v in a.iter() {
                out.push_str(&v.to_string());
                out.push('\n');
            }
        }
        2 => {
            for row in a.outer_iter() {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                out.push_str(&cells.join(","));
                out.push('\n');
            }
        }
        _ => return None,
    }
    Some(out)
}
