//! Array-side addressing: typed regions, block grids, slices, and the
//! generators backing in-process data sources.

pub mod blocks;
pub mod data;
pub mod generate;
pub mod slicing;

pub use blocks::{all_blocks, locate_block, parse_block, BlockRegion};
pub use data::ArrayData;
pub use generate::Generator;
pub use slicing::{resulting_shape, DimSlice, ResolvedDim, SliceSpec};
