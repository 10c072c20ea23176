//! Writing the store's output index to disk.
//!
//! Every write goes through the same two steps: all files are first written
//! next to their targets with a `.tmp` suffix, then renamed into place. If
//! anything fails before the renames, the temp files are removed and nothing
//! under the output directory changes. Output keys come from replacers and
//! therefore from configuration, so each one is validated to stay inside the
//! output directory.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use rustc_hash::FxHashSet;

use devtree_store::Store;

use crate::error::{BuildError, Result};

/// File name of the origin -> output map written by [`write_manifest`].
pub const MANIFEST_FILE: &str = "manifest.json";

/// Write the published content of every artifact in `store` under `dir`.
///
/// Entry documents are written with their references rewritten (see
/// [`Store::published`]). Returns the number of files written.
///
/// # Errors
///
/// - [`BuildError::InvalidOutputPath`] when an output key escapes `dir`
/// - [`BuildError::OutputExists`] when a target exists and `overwrite` is false
/// - [`BuildError::WriteFailure`] on any I/O failure (after rollback)
///
/// # Examples
///
/// ```no_run
/// use devtree_build::output::write_store_to;
/// use devtree_store::{Artifact, Store};
/// use std::path::Path;
///
/// # fn example() -> devtree_build::Result<()> {
/// let store = Store::default();
/// store.save(Artifact::new("index.html", "<html>"));
/// write_store_to(&store, Path::new("output"), true)?;
/// # Ok(())
/// # }
/// ```
pub fn write_store_to(store: &Store, dir: &Path, overwrite: bool) -> Result<usize> {
    let written = write_store_with(store, dir, overwrite, &FxHashSet::default())?;
    Ok(written.len())
}

/// Like [`write_store_to`], but files listed in `owned` (typically the paths
/// a previous call returned) may be replaced even when `overwrite` is false.
///
/// Returns the absolute paths written.
pub fn write_store_with(
    store: &Store,
    dir: &Path,
    overwrite: bool,
    owned: &FxHashSet<PathBuf>,
) -> Result<Vec<PathBuf>> {
    let dir = validate_and_normalize_dir(dir)?;

    fs::create_dir_all(&dir).map_err(|e| {
        BuildError::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations = Vec::new();
    for (key, _) in store.outputs() {
        let Some(content) = store.published(&key) else {
            continue;
        };
        let target_path = validate_output_path(&dir, &key)?;

        if !overwrite && !owned.contains(&target_path) && target_path.exists() {
            return Err(BuildError::OutputExists(format!(
                "File already exists: '{}'. Use overwrite=true to replace.",
                target_path.display()
            )));
        }

        operations.push((target_path, content.into_bytes()));
    }

    write_files_atomic(&operations)?;
    tracing::debug!(dir = %dir.display(), files = operations.len(), "wrote build output");
    Ok(operations.into_iter().map(|(path, _)| path).collect())
}

/// Write `manifest.json` (origin path -> final output path) into `dir`.
///
/// The manifest is always replaced.
pub fn write_manifest(store: &Store, dir: &Path) -> Result<PathBuf> {
    let dir = validate_and_normalize_dir(dir)?;
    let target = validate_output_path(&dir, MANIFEST_FILE)?;
    let json = serde_json::to_vec_pretty(&store.manifest())?;
    write_files_atomic(&[(target.clone(), json)])?;
    Ok(target)
}

fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();

    let absolute = if cleaned.is_absolute() {
        cleaned
    } else {
        std::env::current_dir()
            .map_err(|e| {
                BuildError::InvalidOutputPath(format!("Failed to get current directory: {}", e))
            })?
            .join(&cleaned)
            .clean()
    };

    Ok(absolute)
}

/// Join `key` onto `base_dir`, rejecting anything that resolves outside it.
fn validate_output_path(base_dir: &Path, key: &str) -> Result<PathBuf> {
    if key.contains('\0') {
        return Err(BuildError::InvalidOutputPath(
            "Output path contains null byte".to_string(),
        ));
    }

    let full_path = base_dir.join(Path::new(key).clean()).clean();

    if full_path == base_dir || !full_path.starts_with(base_dir) {
        return Err(BuildError::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            key,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

fn write_files_atomic(operations: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut temp_files = Vec::new();

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                BuildError::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_path_for(target_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            BuildError::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            BuildError::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

/// Best-effort removal of leftover temp files; failures are only logged.
fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if !temp_path.exists() {
            continue;
        }
        if let Err(e) = fs::remove_file(temp_path) {
            tracing::warn!(
                path = %temp_path.display(),
                error = %e,
                "failed to clean up temporary file"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_output_path_nested() {
        let base = Path::new("/tmp/output");
        let result = validate_output_path(base, "css/app.1a2b3c4d.css");
        assert_eq!(result.unwrap(), Path::new("/tmp/output/css/app.1a2b3c4d.css"));
    }

    #[test]
    fn test_validate_output_path_traversal() {
        let base = Path::new("/tmp/output");
        let result = validate_output_path(base, "safe/../../../../etc/passwd");
        assert!(matches!(result, Err(BuildError::InvalidOutputPath(_))));
    }

    #[test]
    fn test_validate_output_path_rejects_base_itself() {
        let base = Path::new("/tmp/output");
        assert!(validate_output_path(base, "a/..").is_err());
    }

    #[test]
    fn test_validate_output_path_null_byte() {
        let base = Path::new("/tmp/output");
        assert!(validate_output_path(base, "file\0name.js").is_err());
    }

    #[test]
    fn test_owned_files_may_be_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::default();
        store.save(devtree_store::Artifact::new("a.js", "one"));
        let written = write_store_with(&store, dir.path(), false, &FxHashSet::default()).unwrap();

        store.save(devtree_store::Artifact::new("a.js", "two"));
        let err = write_store_to(&store, dir.path(), false).unwrap_err();
        assert!(matches!(err, BuildError::OutputExists(_)));

        let owned: FxHashSet<PathBuf> = written.into_iter().collect();
        write_store_with(&store, dir.path(), false, &owned).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.js")).unwrap(), "two");
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        assert_eq!(
            temp_path_for(Path::new("/o/app.js")),
            Path::new("/o/app.js.tmp")
        );
    }
}
