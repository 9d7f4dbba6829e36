//! Resolution of local image references relative to the Markdown file

use std::path::{Component, Path, PathBuf};

use crate::error::ImportError;

/// Resolve `reference` against the directory holding `markdown_path`.
///
/// The result is canonical (symlinks resolved) and always lies inside the
/// Markdown file's directory. Anything else is a [`ImportError::PathEscape`],
/// including a symlink inside the directory that points outside it.
pub fn resolve(markdown_path: &Path, reference: &str) -> Result<PathBuf, ImportError> {
    let markdown_path = absolutize(markdown_path)?;
    let base = markdown_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    let joined = clean(&base.join(reference));

    // Lexical check first so traversal is reported even when the tree is missing
    if !is_within(&joined, &clean(&base)) {
        log::warn!("Rejected image reference outside {}: {}", base.display(), reference);
        return Err(ImportError::PathEscape {
            reference: reference.to_string(),
            base,
        });
    }

    let canonical_base = base.canonicalize().map_err(|source| ImportError::NotFound {
        path: base.clone(),
        source,
    })?;
    let canonical_target = joined
        .canonicalize()
        .map_err(|source| ImportError::NotFound {
            path: joined.clone(),
            source,
        })?;

    if !is_within(&canonical_target, &canonical_base) {
        log::warn!(
            "Rejected image reference resolving outside {}: {} -> {}",
            canonical_base.display(),
            reference,
            canonical_target.display()
        );
        return Err(ImportError::PathEscape {
            reference: reference.to_string(),
            base: canonical_base,
        });
    }

    Ok(canonical_target)
}

fn absolutize(path: &Path) -> Result<PathBuf, ImportError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}

/// True if `path` equals `base` or is a descendant of it.
///
/// Compared component-wise on the path relative to `base`, so `/docs-other`
/// is not inside `/docs`.
fn is_within(path: &Path, base: &Path) -> bool {
    match path.strip_prefix(base) {
        Ok(rel) => !matches!(rel.components().next(), Some(Component::ParentDir)),
        Err(_) => false,
    }
}

/// Lexically normalise a path: drop `.` segments and fold `..` into its parent.
///
/// A `..` at the root stays at the root. Leading `..` segments of a relative
/// path are kept.
fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}
