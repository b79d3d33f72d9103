//! Locates the shape files backing a validation type.

use crate::domain::DomainConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("validation type '{0}' has no shape mapping")]
    Unmapped(String),

    #[error("shape location {0:?} does not exist")]
    NotFound(PathBuf),

    #[error("shape directory {0:?} contains no file with an accepted extension")]
    NoShapeFiles(PathBuf),

    #[error("failed to list shape directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Shape files for `validation_type` of `domain`, under `resource_root`.
///
/// A mapping that names a file yields that file whatever its extension. A
/// mapping that names a directory yields its direct child files whose
/// lower-cased extension is in `accepted_extensions`, sorted by name.
pub fn resolve(
    resource_root: &Path,
    domain: &DomainConfig,
    validation_type: &str,
    accepted_extensions: &[String],
) -> Result<Vec<PathBuf>, ResolveError> {
    let mapping = domain
        .shape_mapping(validation_type)
        .ok_or_else(|| ResolveError::Unmapped(validation_type.to_string()))?;
    let location = domain.directory(resource_root).join(mapping);
    shape_files_at(&location, accepted_extensions)
}

pub fn shape_files_at(
    location: &Path,
    accepted_extensions: &[String],
) -> Result<Vec<PathBuf>, ResolveError> {
    if location.is_file() {
        return Ok(vec![location.to_path_buf()]);
    }
    if !location.is_dir() {
        return Err(ResolveError::NotFound(location.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(location)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|source| ResolveError::Io {
            path: location.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let accepted = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| accepted_extensions.contains(&ext));
        if accepted {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(ResolveError::NoShapeFiles(location.to_path_buf()));
    }
    Ok(files)
}
