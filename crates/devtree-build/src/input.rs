//! Discovery of source files for a full build.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use devtree_config::BuildConfig;
use devtree_store::Store;

use crate::error::{BuildError, Result};
use crate::util::minimatch;

/// Walks a project root and loads every eligible file through a store.
#[derive(Debug, Clone)]
pub struct InputScanner {
    root: PathBuf,
    dest: Option<PathBuf>,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl InputScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dest: None,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Scanner configured from build settings, skipping `dest`.
    pub fn from_config(
        root: impl Into<PathBuf>,
        dest: impl Into<PathBuf>,
        build: &BuildConfig,
    ) -> Self {
        Self::new(root)
            .skip_dir(dest)
            .include(build.include.clone())
            .exclude(build.exclude.clone())
    }

    /// Never descend into `dir` (typically the build output).
    pub fn skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dest = Some(dir.into());
        self
    }

    pub fn include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    /// Relative, `/`-separated paths of every file that passes the filters,
    /// in sorted order.
    pub fn files(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(BuildError::DirNotFound(self.root.clone()));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_skipped(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = relative_key(&self.root, entry.path()) else {
                continue;
            };
            if self.accepts(&relative) {
                files.push(relative);
            }
        }
        Ok(files)
    }

    /// Load every file through `store`; returns how many produced content.
    pub async fn scan(&self, store: &Store) -> Result<usize> {
        let scanner = self.clone();
        let files = tokio::task::spawn_blocking(move || scanner.files())
            .await
            .map_err(std::io::Error::from)??;

        let mut produced = 0;
        for file in files {
            let loaded = store.load(&file).await.map_err(|source| BuildError::Produce {
                path: file.clone(),
                source,
            })?;
            if loaded.is_some() {
                produced += 1;
            }
        }
        tracing::debug!(root = %self.root.display(), produced, "scanned inputs");
        Ok(produced)
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        let hidden = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'));
        let is_dest = self
            .dest
            .as_deref()
            .is_some_and(|dest| entry.path() == self.resolve_dest(dest));
        hidden || is_dest
    }

    fn resolve_dest(&self, dest: &Path) -> PathBuf {
        if dest.is_absolute() {
            dest.to_path_buf()
        } else {
            self.root.join(dest)
        }
    }

    /// Whether `relative` passes the include and exclude patterns.
    pub(crate) fn accepts(&self, relative: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| minimatch(relative, p));
        included && !self.exclude.iter().any(|p| minimatch(relative, p))
    }
}

/// `path` relative to `root` in store key form.
pub(crate) fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let key = devtree_store::path::normalize(&relative.to_string_lossy());
    (!key.is_empty()).then_some(key)
}
