//! `slice=` parameter: conventional half-open `start:stop:step` selections,
//! one per dimension, applied to a materialized region.

use std::str::FromStr;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimSlice {
    Range { start: Option<isize>, stop: Option<isize>, step: Option<isize> },
    Index(isize),
}

impl DimSlice {
    pub const FULL: DimSlice = DimSlice::Range { start: None, stop: None, step: None };
}

/// A validated selection against a known extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedDim {
    Range { start: usize, stop: usize, step: usize },
    Index(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceSpec(pub Vec<DimSlice>);

fn parse_bound(raw: &str, whole: &str) -> AppResult<Option<isize>> {
    let t = raw.trim();
    if t.is_empty() {
        return Ok(None);
    }
    t.parse::<isize>()
        .map(Some)
        .map_err(|_| AppError::bad_request(format!("Could not parse {whole} as a slice")))
}

impl FromStr for SliceSpec {
    type Err = AppError;

    fn from_str(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
        if trimmed.trim().is_empty() {
            return Ok(SliceSpec::default());
        }
        let mut dims = Vec::new();
        for part in trimmed.split(',') {
            let pieces: Vec<&str> = part.split(':').collect();
            let dim = match pieces.as_slice() {
                [single] => match parse_bound(single, raw)? {
                    Some(i) => DimSlice::Index(i),
                    None => return Err(AppError::bad_request(format!("Could not parse {raw} as a slice"))),
                },
                [start, stop] => DimSlice::Range { start: parse_bound(start, raw)?, stop: parse_bound(stop, raw)?, step: None },
                [start, stop, step] => DimSlice::Range {
                    start: parse_bound(start, raw)?,
                    stop: parse_bound(stop, raw)?,
                    step: parse_bound(step, raw)?,
                },
                _ => return Err(AppError::bad_request(format!("Could not parse {raw} as a slice"))),
            };
            dims.push(dim);
        }
        Ok(SliceSpec(dims))
    }
}

// Negative positions count from the end; the result must land in [0, extent].
fn normalize(pos: isize, extent: usize, axis: usize) -> AppResult<usize> {
    let p = if pos < 0 { extent as isize + pos } else { pos };
    if p < 0 || p as usize > extent {
        return Err(AppError::slice_out_of_range(format!("{pos} is outside axis {axis} of extent {extent}")));
    }
    Ok(p as usize)
}

impl SliceSpec {
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Validate against `shape`. Dimensions not mentioned are taken whole.
    pub fn resolve(&self, shape: &[usize]) -> AppResult<Vec<ResolvedDim>> {
        if self.0.len() > shape.len() {
            return Err(AppError::slice_out_of_range(format!(
                "{} slice components for a region of rank {}",
                self.0.len(),
                shape.len()
            )));
        }
        let mut out = Vec::with_capacity(shape.len());
        for (axis, &extent) in shape.iter().enumerate() {
            let dim = self.0.get(axis).copied().unwrap_or(DimSlice::FULL);
            let resolved = match dim {
                DimSlice::Index(i) => {
                    let p = normalize(i, extent, axis)?;
                    if p >= extent {
                        return Err(AppError::slice_out_of_range(format!("index {i} is outside axis {axis} of extent {extent}")));
                    }
                    ResolvedDim::Index(p)
                }
                DimSlice::Range { start, stop, step } => {
                    let step = step.unwrap_or(1);
                    if step <= 0 {
                        return Err(AppError::bad_request(format!("Slice step must be positive, got {step}")));
                    }
                    let start = start.map(|s| normalize(s, extent, axis)).transpose()?.unwrap_or(0);
                    let stop = stop.map(|s| normalize(s, extent, axis)).transpose()?.unwrap_or(extent);
                    // A reversed range selects nothing.
                    let stop = stop.max(start);
                    ResolvedDim::Range { start, stop, step: step as usize }
                }
            };
            out.push(resolved);
        }
        Ok(out)
    }
}

/// Shape left after applying resolved selections.
pub fn resulting_shape(dims: &[ResolvedDim]) -> Vec<usize> {
    dims.iter()
        .filter_map(|d| match *d {
            ResolvedDim::Range { start, stop, step } => Some((stop - start).div_ceil(step)),
            ResolvedDim::Index(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_notation() {
        let s: SliceSpec = "0:5:2, :, 3, -2:".parse().unwrap();
        assert_eq!(
            s.0,
            vec![
                DimSlice::Range { start: Some(0), stop: Some(5), step: Some(2) },
                DimSlice::FULL,
                DimSlice::Index(3),
                DimSlice::Range { start: Some(-2), stop: None, step: None },
            ]
        );
        assert!("".parse::<SliceSpec>().unwrap().is_empty());
        assert!(matches!("a:b".parse::<SliceSpec>(), Err(AppError::BadRequest { .. })));
        assert!(matches!("1:2:3:4".parse::<SliceSpec>(), Err(AppError::BadRequest { .. })));
    }

    #[test]
    fn resolves_against_block_extent() {
        let s: SliceSpec = "1:3,-1".parse().unwrap();
        let r = s.resolve(&[4, 4]).unwrap();
        assert_eq!(r, vec![ResolvedDim::Range { start: 1, stop: 3, step: 1 }, ResolvedDim::Index(3)]);
        assert_eq!(resulting_shape(&r), vec![2]);
    }

    #[test]
    fn out_of_range_components_rejected() {
        let s: SliceSpec = "0:5".parse().unwrap();
        assert!(matches!(s.resolve(&[4]), Err(AppError::SliceOutOfRange { .. })));
        let s: SliceSpec = "4".parse().unwrap();
        assert!(matches!(s.resolve(&[4]), Err(AppError::SliceOutOfRange { .. })));
        let s: SliceSpec = "0,0".parse().unwrap();
        assert!(matches!(s.resolve(&[4]), Err(AppError::SliceOutOfRange { .. })));
    }

    #[test]
    fn reversed_range_is_empty() {
        let s: SliceSpec = "3:1".parse().unwrap();
        let r = s.resolve(&[4]).unwrap();
        assert_eq!(r, vec![ResolvedDim::Range { start: 3, stop: 3, step: 1 }]);
        assert_eq!(resulting_shape(&r), vec![0]);
        let s: SliceSpec = "-1:0,1:3".parse().unwrap();
        assert_eq!(resulting_shape(&s.resolve(&[4, 4]).unwrap()), vec![0, 2]);
    }

    #[test]
    fn non_positive_step_is_bad_request() {
        let s: SliceSpec = "::0".parse().unwrap();
        assert!(matches!(s.resolve(&[4]), Err(AppError::BadRequest { .. })));
    }

    #[test]
    fn stepped_shape_rounds_up() {
        let s: SliceSpec = "::3".parse().unwrap();
        let r = s.resolve(&[10]).unwrap();
        assert_eq!(resulting_shape(&r), vec![4]);
    }
}
