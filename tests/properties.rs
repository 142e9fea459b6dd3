//! Property tests for the pure pieces: pagination windows, block grids,
//! wire encodings and path resolution.

use proptest::prelude::*;

use tiled::array::{all_blocks, locate_block, ArrayData};
use tiled::catalog::demo::demo_tree;
use tiled::catalog::{normalize_path, resolve, ArrayStructure, DType};
use tiled::media::{decode_npy, encode_npy};
use tiled::pagination::paginate;

proptest! {
    #[test]
    fn pages_reassemble_the_listing(len in 0usize..60, limit in 1usize..15) {
        let items: Vec<usize> = (0..len).collect();
        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let page = paginate(items.iter().copied(), offset, limit);
            prop_assert_eq!(page.total, len);
            prop_assert!(page.items.len() <= limit);
            if page.items.is_empty() {
                break;
            }
            seen.extend(page.items);
            offset += limit;
        }
        prop_assert_eq!(seen, items);
    }

    #[test]
    fn blocks_tile_the_array(shape in prop::collection::vec(1usize..12, 1..4), chunk in 1usize..6) {
        let chunk_shape = vec![chunk; shape.len()];
        let s = ArrayStructure::regular(shape.clone(), &chunk_shape, DType::Float64).unwrap();
        let blocks = all_blocks(&s);
        let covered: usize = blocks.iter().map(|b| b.len()).sum();
        prop_assert_eq!(covered, s.len());
        for b in &blocks {
            let located = locate_block(&s, &b.index).unwrap();
            prop_assert_eq!(&located, b);
            for d in 0..shape.len() {
                prop_assert!(b.offsets[d] + b.shape[d] <= shape[d]);
            }
        }
        let past: Vec<usize> = s.block_counts();
        prop_assert!(locate_block(&s, &past).is_err());
    }

    #[test]
    fn npy_and_raw_bytes_round_trip(values in prop::collection::vec(-1.0e6f64..1.0e6, 1..40)) {
        let n = values.len();
        let data = ArrayData::from_f64(DType::Float64, &[n], values.clone()).unwrap();
        let back = decode_npy(&encode_npy(&data)).unwrap();
        prop_assert_eq!(back.shape(), &[n]);
        prop_assert_eq!(back.to_f64_vec(), values.clone());

        let raw = ArrayData::from_le_bytes(DType::Float64, &[n], &data.to_le_bytes()).unwrap();
        prop_assert_eq!(raw.to_f64_vec(), values);
    }

    #[test]
    fn separators_do_not_change_resolution(
        segs in prop::sample::select(vec![vec!["arrays", "small"], vec!["labeled", "weather"], vec!["nested", "inner", "leaf"]]),
        lead in 0usize..3,
        trail in 0usize..3,
        doubled in any::<bool>(),
    ) {
        let root = demo_tree();
        let sep = if doubled { "//" } else { "/" };
        let messy = format!("{}{}{}", "/".repeat(lead), segs.join(sep), "/".repeat(trail));
        let clean = segs.join("/");
        prop_assert_eq!(normalize_path(&messy), clean.clone());
        let a = resolve(&root, &messy).unwrap();
        let b = resolve(&root, &clean).unwrap();
        prop_assert!(std::sync::Arc::ptr_eq(&a, &b));
    }
}
