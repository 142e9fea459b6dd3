//! Path -> entry resolution over a catalog tree snapshot.

use std::sync::Arc;

use super::{Entry, EntryKind, StructureFamily};
use crate::error::{AppError, AppResult};

/// Strip leading/trailing separators and collapse empty segments, so
/// `"/a//b/"` and `"a/b"` address the same entry. The root is `""`.
pub fn normalize_path(path: &str) -> String {
    path.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/")
}

/// Descend one segment at a time from `root`. A missing key, or a data source
/// met before the path is exhausted, is `NotFound`.
pub fn resolve(root: &Arc<Entry>, path: &str) -> AppResult<Arc<Entry>> {
    let mut node = Arc::clone(root);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let next = match node.as_ref() {
            Entry::Catalog(c) => c.get(segment).cloned(),
            Entry::DataSource(_) => None,
        };
        node = next.ok_or_else(|| AppError::not_found(normalize_path(path)))?;
    }
    Ok(node)
}

/// Like [`resolve`], but fails with `WrongType` when the entry is not of the
/// variant the calling operation needs.
pub fn resolve_typed(root: &Arc<Entry>, path: &str, required: EntryKind) -> AppResult<Arc<Entry>> {
    let entry = resolve(root, path)?;
    let found = entry.kind();
    if found != required {
        return Err(AppError::wrong_type(
            normalize_path(path),
            format!("This is a {}, not a {}.", found.label(), required.label()),
        ));
    }
    Ok(entry)
}

/// Require a data source of one structure family (e.g. `/tile/dataset` on a
/// plain array is `WrongType`).
pub fn resolve_family(root: &Arc<Entry>, path: &str, family: StructureFamily) -> AppResult<Arc<Entry>> {
    let entry = resolve_typed(root, path, EntryKind::DataSource)?;
    let found = entry.family();
    if found != family {
        return Err(AppError::wrong_type(
            normalize_path(path),
            format!("This data source is a {}, not a {}.", found.as_str(), family.as_str()),
        ));
    }
    Ok(entry)
}
