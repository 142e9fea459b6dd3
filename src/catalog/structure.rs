//! Data-structure descriptions for data sources: the "description" facet that
//! clients use to plan block requests (shape, chunk grid, dtype, labels).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    #[error("chunk size must be positive for non-empty dimension {dim}")]
    ZeroChunk { dim: usize },
    #[error("expected {expected} chunk specifications, got {got}")]
    ChunkRank { expected: usize, got: usize },
    #[error("chunks along dimension {dim} sum to {sum}, but the dimension has size {size}")]
    ChunkSum { dim: usize, sum: usize, size: usize },
    #[error("{got} dimension labels for an array of rank {expected}")]
    DimsRank { expected: usize, got: usize },
    #[error("literal data has {got} values, expected {expected}")]
    LiteralLength { expected: usize, got: usize },
}

/// Which routes apply to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureFamily {
    Catalog,
    Array,
    Variable,
    DataArray,
    Dataset,
}

impl StructureFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureFamily::Catalog => "catalog",
            StructureFamily::Array => "array",
            StructureFamily::Variable => "variable",
            StructureFamily::DataArray => "data_array",
            StructureFamily::Dataset => "dataset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float64,
    Float32,
    Int64,
    Int32,
    UInt8,
}

impl DType {
    pub fn itemsize(self) -> usize {
        match self {
            DType::Float64 | DType::Int64 => 8,
            DType::Float32 | DType::Int32 => 4,
            DType::UInt8 => 1,
        }
    }

    /// NumPy array-protocol type string (always little-endian).
    pub fn npy_descr(self) -> &'static str {
        match self {
            DType::Float64 => "<f8",
            DType::Float32 => "<f4",
            DType::Int64 => "<i8",
            DType::Int32 => "<i4",
            DType::UInt8 => "|u1",
        }
    }

    pub fn from_npy_descr(descr: &str) -> Option<Self> {
        match descr {
            "<f8" => Some(DType::Float64),
            "<f4" => Some(DType::Float32),
            "<i8" => Some(DType::Int64),
            "<i4" => Some(DType::Int32),
            "|u1" | "<u1" => Some(DType::UInt8),
            _ => None,
        }
    }
}

/// Shape and chunk grid of one n-dimensional array.
///
/// `chunks[d]` lists the extent of every block along dimension `d`, so the
/// grid may be irregular; the number of blocks along `d` is `chunks[d].len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayStructure {
    pub shape: Vec<usize>,
    pub chunks: Vec<Vec<usize>>,
    pub dtype: DType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dims: Option<Vec<String>>,
}

/// Split `size` into blocks of `chunk`, with a shorter trailing block when it
/// does not divide evenly.
pub fn regular_chunks(size: usize, chunk: usize) -> Vec<usize> {
    if size == 0 || chunk == 0 {
        return Vec::new();
    }
    let mut out = vec![chunk; size / chunk];
    if size % chunk != 0 {
        out.push(size % chunk);
    }
    out
}

impl ArrayStructure {
    pub fn regular(shape: Vec<usize>, chunk: &[usize], dtype: DType) -> Result<Self, StructureError> {
        if chunk.len() != shape.len() {
            return Err(StructureError::ChunkRank { expected: shape.len(), got: chunk.len() });
        }
        for (dim, (&size, &c)) in shape.iter().zip(chunk).enumerate() {
            if size > 0 && c == 0 {
                return Err(StructureError::ZeroChunk { dim });
            }
        }
        let chunks = shape.iter().zip(chunk).map(|(&s, &c)| regular_chunks(s, c)).collect();
        Ok(Self { shape, chunks, dtype, dims: None })
    }

    /// A single block spanning the whole array.
    pub fn single_chunk(shape: Vec<usize>, dtype: DType) -> Self {
        let chunks = shape.iter().map(|&s| if s == 0 { Vec::new() } else { vec![s] }).collect();
        Self { shape, chunks, dtype, dims: None }
    }

    pub fn irregular(shape: Vec<usize>, chunks: Vec<Vec<usize>>, dtype: DType) -> Result<Self, StructureError> {
        let s = Self { shape, chunks, dtype, dims: None };
        s.validate()?;
        Ok(s)
    }

    pub fn with_dims(mut self, dims: Vec<String>) -> Result<Self, StructureError> {
        if dims.len() != self.shape.len() {
            return Err(StructureError::DimsRank { expected: self.shape.len(), got: dims.len() });
        }
        self.dims = Some(dims);
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), StructureError> {
        if self.chunks.len() != self.shape.len() {
            return Err(StructureError::ChunkRank { expected: self.shape.len(), got: self.chunks.len() });
        }
        for (dim, (size, chunks)) in self.shape.iter().zip(&self.chunks).enumerate() {
            if chunks.iter().any(|&c| c == 0) {
                return Err(StructureError::ZeroChunk { dim });
            }
            let sum: usize = chunks.iter().sum();
            if sum != *size {
                return Err(StructureError::ChunkSum { dim, sum, size: *size });
            }
        }
        if let Some(dims) = &self.dims {
            if dims.len() != self.shape.len() {
                return Err(StructureError::DimsRank { expected: self.shape.len(), got: dims.len() });
            }
        }
        Ok(())
    }

    pub fn ndim(&self) -> usize { self.shape.len() }

    pub fn len(&self) -> usize { self.shape.iter().product() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn nbytes(&self) -> usize { self.len() * self.dtype.itemsize() }

    /// Number of blocks along each dimension.
    pub fn block_counts(&self) -> Vec<usize> { self.chunks.iter().map(Vec::len).collect() }
}

/// A labeled array: dimension names plus free-form attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableStructure {
    pub dims: Vec<String>,
    pub data: ArrayStructure,
    pub attrs: Map<String, Value>,
}

impl VariableStructure {
    pub fn to_json(&self) -> Value {
        json!({ "dims": self.dims, "data": self.data, "attrs": self.attrs })
    }
}
