//! Content negotiation and wire encoders.

pub mod encode;
pub mod negotiate;

pub use encode::{decode_npy, encode_npy, serialize_array};
pub use negotiate::{array_media_types, negotiate, negotiate_for, parse_accept, ResultKind, CSV, JSON, NPY, OCTET_STREAM};
