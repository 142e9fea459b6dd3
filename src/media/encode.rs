//! Array encoders for the negotiated media types.

use crate::array::ArrayData;
use crate::catalog::DType;
use crate::error::{AppError, AppResult};

use super::negotiate::{CSV, JSON, NPY, OCTET_STREAM};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_ALIGN: usize = 64;

/// Encode `data` as `media`. The media type must come from negotiation
/// against the array encoder set.
pub fn serialize_array(media: &str, data: &ArrayData) -> AppResult<Vec<u8>> {
    match media {
        OCTET_STREAM => Ok(data.to_le_bytes()),
        NPY => Ok(encode_npy(data)),
        JSON => serde_json::to_vec(&data.to_json()).map_err(|e| AppError::internal(e.to_string())),
        CSV => data
            .to_csv()
            .map(String::into_bytes)
            .ok_or_else(|| AppError::unsupported_media(&super::negotiate::array_media_types(data.ndim()))),
        other => Err(AppError::internal(format!("no encoder registered for {other}"))),
    }
}

fn shape_tuple(shape: &[usize]) -> String {
    match shape {
        [one] => format!("({one},)"),
        dims => format!("({})", dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")),
    }
}

/// NumPy `.npy` version 1.0: magic, version, little-endian u16 header
/// length, a Python-literal header dict padded so the data starts on a
/// 64-byte boundary, then raw C-order data.
pub fn encode_npy(data: &ArrayData) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        data.dtype().npy_descr(),
        shape_tuple(data.shape())
    );
    let prefix = NPY_MAGIC.len() + 2 + 2;
    let pad = NPY_ALIGN - (prefix + header.len() + 1) % NPY_ALIGN;
    header.push_str(&" ".repeat(pad % NPY_ALIGN));
    header.push('\n');

    let body = data.to_le_bytes();
    let mut out = Vec::with_capacity(prefix + header.len() + body.len());
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&body);
    out
}

fn header_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let start = header.find(&format!("'{key}':"))? + key.len() + 3;
    Some(header[start..].trim_start())
}

/// Decode what [`encode_npy`] produces. Returns `None` for anything else.
pub fn decode_npy(bytes: &[u8]) -> Option<ArrayData> {
    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC || bytes[6] != 1 {
        return None;
    }
    let hlen = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let header = std::str::from_utf8(bytes.get(10..10 + hlen)?).ok()?;
    let descr = header_value(header, "descr")?.strip_prefix('\'')?.split('\'').next()?;
    let dtype = DType::from_npy_descr(descr)?;
    if !header_value(header, "fortran_order")?.starts_with("False") {
        return None;
    }
    let shape_src = header_value(header, "shape")?.strip_prefix('(')?.split(')').next()?;
    let shape = shape_src
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().ok())
        .collect::<Option<Vec<_>>>()?;
    ArrayData::from_le_bytes(dtype, &shape, &bytes[10 + hlen..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ArrayData { ArrayData::from_f64(DType::Float64, &[10, 10], (0..100).map(f64::from).collect()).unwrap() }

    #[test]
    fn npy_header_is_aligned() {
        let bytes = encode_npy(&sample());
        let hlen = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + hlen) % 64, 0);
        assert_eq!(bytes[10 + hlen - 1], b'\n');
        let header = std::str::from_utf8(&bytes[10..10 + hlen]).unwrap();
        assert!(header.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (10, 10), }"));
        assert_eq!(bytes.len(), 10 + hlen + 800);
    }

    #[test]
    fn npy_decodes_back() {
        let a = ArrayData::from_f64(DType::Int32, &[7], (0..7).map(f64::from).collect()).unwrap();
        let bytes = encode_npy(&a);
        assert_eq!(decode_npy(&bytes), Some(a));
        let scalar = ArrayData::from_f64(DType::UInt8, &[], vec![9.0]).unwrap();
        assert_eq!(decode_npy(&encode_npy(&scalar)), Some(scalar));
    }

    #[test]
    fn octet_stream_is_raw_bytes() {
        let a = sample();
        assert_eq!(serialize_array(OCTET_STREAM, &a).unwrap().len(), 800);
    }

    #[test]
    fn json_and_csv_are_textual() {
        let a = ArrayData::from_f64(DType::Int64, &[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(serialize_array(JSON, &a).unwrap(), b"[[1,2],[3,4]]");
        assert_eq!(serialize_array(CSV, &a).unwrap(), b"1,2\n3,4\n");
        let cube = ArrayData::zeros(DType::UInt8, &[1, 1, 1]);
        assert!(matches!(serialize_array(CSV, &cube), Err(AppError::UnsupportedMediaTypes { .. })));
    }
}
