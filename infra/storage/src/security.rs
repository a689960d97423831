//! Path sandboxing.
//!
//! A relative path is normalized lexically (`.` dropped, `..` allowed only while it stays
//! below the root), joined to the root, and then checked physically: an existing target
//! must canonicalize inside the root, and for a target that does not exist yet, so must its
//! nearest existing ancestor. The second check defeats symlinks planted inside the root.

use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

fn traversal(path: &Path, reason: &'static str) -> StorageError {
    StorageError::PathTraversalAttempt {
        message: path.display().to_string().into(),
        context: Some(reason.into()),
    }
}

fn normalize_relative(path: &Path) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::Normal(segment) => out.push(segment),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(traversal(path, "Path attempted to escape sandbox via '..'"));
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(traversal(path, "Absolute paths are not allowed in sandbox"));
            },
        }
    }

    Ok(out)
}

/// Joins `path` to `root`, rejecting anything that lands outside of it.
pub(crate) fn resolve_path(root: &Path, path: &Path) -> Result<PathBuf, StorageError> {
    let joined = root.join(normalize_relative(path)?);

    match joined.canonicalize() {
        Ok(canonical) if canonical.starts_with(root) => Ok(canonical),
        Ok(canonical) => Err(traversal(&canonical, "Path resolves outside the sandbox")),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            verify_nearest_ancestor(root, &joined)
        },
        Err(err) => Err(StorageError::Io { source: err, context: None }),
    }
}

/// Places `path` under `namespace` and two shard directories taken from the first four
/// characters of its file name. Subdirectories in `path` are preserved; names shorter
/// than four characters are not sharded.
pub(crate) fn resolve_sharded(
    root: &Path,
    namespace: Option<&str>,
    path: &Path,
) -> Result<PathBuf, StorageError> {
    let filename = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| traversal(path, "Target must be a file name"))?;

    let mut sharded = PathBuf::new();
    if let Some(namespace) = namespace {
        sharded.push(namespace);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        sharded.push(parent);
    }

    let mut chars = filename.char_indices().map(|(i, _)| i).chain([filename.len()]);
    if let (Some(_), Some(_), Some(mid), Some(_), Some(end)) =
        (chars.next(), chars.next(), chars.next(), chars.next(), chars.next())
    {
        sharded.push(&filename[..mid]);
        sharded.push(&filename[mid..end]);
    }
    sharded.push(filename);

    resolve_path(root, &sharded)
}

fn verify_nearest_ancestor(root: &Path, joined: &Path) -> Result<PathBuf, StorageError> {
    let mut current = joined.parent();

    while let Some(dir) = current {
        if dir == root {
            return Ok(joined.to_path_buf());
        }
        if dir.exists() {
            return match dir.canonicalize() {
                Ok(canonical) if canonical.starts_with(root) => Ok(joined.to_path_buf()),
                Ok(canonical) => {
                    Err(traversal(&canonical, "Existing parent directory is outside the sandbox"))
                },
                Err(err) => Err(StorageError::Io {
                    source: err,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }
        current = dir.parent();
    }

    Err(traversal(joined, "No valid parent directory found within sandbox"))
}
