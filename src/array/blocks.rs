//! Block (chunk) addressing against a declared chunk grid.

use crate::catalog::ArrayStructure;
use crate::error::{AppError, AppResult};

/// Position and extent of one block inside its array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRegion {
    pub index: Vec<usize>,
    pub offsets: Vec<usize>,
    pub shape: Vec<usize>,
}

impl BlockRegion {
    pub fn len(&self) -> usize { self.shape.iter().product() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Parse `block=` values such as `2,0`, `[2,0]`, `(2, 0)` or `(1,)`. An
/// empty value addresses the single block of a rank-0 array.
pub fn parse_block(raw: &str) -> AppResult<Vec<usize>> {
    let inner = raw.trim().trim_start_matches(['[', '(']).trim_end_matches([']', ')']).trim();
    // one trailing comma, as in a one-element tuple
    let inner = match inner.strip_suffix(',') {
        Some(head) if !head.trim().is_empty() => head.trim_end(),
        _ => inner,
    };
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| AppError::bad_request(format!("Could not parse {raw} as a block index")))
}

/// Validate `index` against the grid and locate the block.
///
/// Rank mismatch is reported separately from a coordinate past the end of
/// its dimension.
pub fn locate_block(structure: &ArrayStructure, index: &[usize]) -> AppResult<BlockRegion> {
    if index.len() != structure.ndim() {
        return Err(AppError::BlockDimensionMismatch { expected: structure.ndim(), got: index.len() });
    }
    let mut offsets = Vec::with_capacity(index.len());
    let mut shape = Vec::with_capacity(index.len());
    for (dim, (&i, chunks)) in index.iter().zip(&structure.chunks).enumerate() {
        if i >= chunks.len() {
            return Err(AppError::block_out_of_range(format!(
                "index {i} along dimension {dim}, which has {} block(s)",
                chunks.len()
            )));
        }
        offsets.push(chunks[..i].iter().sum());
        shape.push(chunks[i]);
    }
    Ok(BlockRegion { index: index.to_vec(), offsets, shape })
}

/// Every block of the grid, in C order of block index.
pub fn all_blocks(structure: &ArrayStructure) -> Vec<BlockRegion> {
    let counts = structure.block_counts();
    if counts.iter().any(|&c| c == 0) {
        return Vec::new();
    }
    let total: usize = counts.iter().product();
    let mut out = Vec::with_capacity(total);
    let mut index = vec![0usize; counts.len()];
    for _ in 0..total {
        // Indices come from the grid itself, so they are always in range.
        if let Ok(region) = locate_block(structure, &index) {
            out.push(region);
        }
        for d in (0..counts.len()).rev() {
            index[d] += 1;
            if index[d] < counts[d] {
                break;
            }
            index[d] = 0;
        }
    }
    out
}
