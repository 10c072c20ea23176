//! Full builds and watch-driven rebuilds over a shared [`Store`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use devtree_config::DevtreeConfig;
use devtree_store::Store;

use crate::error::{BuildError, Result};
use crate::input::{InputScanner, relative_key};
use crate::output::{write_manifest, write_store_with};
use crate::producer::FsProducer;
use crate::watcher::{FileChange, FileWatcher};

const EVENT_CAPACITY: usize = 64;

/// Events in the build lifecycle, for live-reload transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    BuildStarted,

    BuildCompleted { duration_ms: u64, artifacts: usize },

    BuildFailed { error: String },

    /// Clients showing `path` should refresh
    Reload { path: String },
}

/// Owns the store for one project and keeps it in sync with the filesystem.
///
/// Nothing is cached between builds: [`DevtreeBuilder::build`] resets the
/// store and loads every input again.
pub struct DevtreeBuilder {
    config: DevtreeConfig,
    root: PathBuf,
    dest: PathBuf,
    store: Arc<Store>,
    scanner: InputScanner,
    events: broadcast::Sender<BuildEvent>,
    write_output: bool,
    /// Files this builder has written; `build.overwrite = false` only
    /// protects files it did not write itself
    written: Arc<Mutex<FxHashSet<PathBuf>>>,
}

impl DevtreeBuilder {
    /// Create a builder for `config.root`.
    ///
    /// # Errors
    ///
    /// [`BuildError::DirNotFound`] when the root does not exist, or
    /// [`BuildError::Config`] when namehash patterns do not compile.
    pub fn new(config: DevtreeConfig) -> Result<Self> {
        let root = config
            .root
            .canonicalize()
            .map_err(|_| BuildError::DirNotFound(config.root.clone()))?;
        let dest = if config.dest.is_absolute() {
            config.dest.clone()
        } else {
            root.join(&config.dest)
        };

        let producer = FsProducer::new(&root).with_mime_types(config.mime_types.clone());
        let mut store = Store::new(producer);
        if let Some(namehash) = &config.namehash {
            store = store.with_namehash(namehash.build()?);
        }

        let scanner = InputScanner::from_config(&root, &dest, &config.build);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            config,
            root,
            dest,
            store: Arc::new(store),
            scanner,
            events,
            write_output: true,
            written: Arc::default(),
        })
    }

    /// Keep builds in memory only; nothing is written to `dest`.
    pub fn in_memory(mut self) -> Self {
        self.write_output = false;
        self
    }

    pub fn config(&self) -> &DevtreeConfig {
        &self.config
    }

    /// Canonical project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BuildEvent> {
        self.events.subscribe()
    }

    /// Reset the store, load every input and write the output directory.
    ///
    /// Returns the number of artifacts in the store afterwards.
    pub async fn build(&self) -> Result<usize> {
        let start = Instant::now();
        self.emit(BuildEvent::BuildStarted);

        match self.run_build().await {
            Ok(artifacts) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                tracing::info!(artifacts, duration_ms, "build completed");
                self.emit(BuildEvent::BuildCompleted {
                    duration_ms,
                    artifacts,
                });
                Ok(artifacts)
            }
            Err(err) => {
                tracing::error!(error = %err, "build failed");
                self.emit(BuildEvent::BuildFailed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_build(&self) -> Result<usize> {
        self.store.reset();
        self.scanner.scan(&self.store).await?;
        self.flush().await?;
        Ok(self.store.len())
    }

    /// React to one filesystem change.
    ///
    /// Created and modified files are loaded again, which replaces their
    /// artifacts. The store cannot drop a single key, so a removal triggers a
    /// full [`build`](Self::build). Changes outside the root and files the
    /// `build.include` / `build.exclude` patterns reject are ignored.
    pub async fn apply_change(&self, change: &FileChange) -> Result<()> {
        let Some(key) = relative_key(&self.root, change.path()) else {
            return Ok(());
        };
        if !self.scanner.accepts(&key) {
            tracing::trace!(path = %key, "change filtered out");
            return Ok(());
        }

        if let FileChange::Removed(_) = change {
            self.build().await?;
        } else {
            let start = Instant::now();
            self.emit(BuildEvent::BuildStarted);
            if let Err(err) = self.reload(&key).await {
                self.emit(BuildEvent::BuildFailed {
                    error: err.to_string(),
                });
                return Err(err);
            }
            self.emit(BuildEvent::BuildCompleted {
                duration_ms: start.elapsed().as_millis() as u64,
                artifacts: self.store.len(),
            });
        }

        tracing::debug!(path = %key, "reload");
        self.emit(BuildEvent::Reload { path: key });
        Ok(())
    }

    async fn reload(&self, key: &str) -> Result<()> {
        self.store
            .load(key)
            .await
            .map_err(|source| BuildError::Produce {
                path: key.to_string(),
                source,
            })?;
        self.flush().await
    }

    /// Watch the root and apply changes until the watcher stops.
    ///
    /// Failed rebuilds are logged and broadcast; watching continues.
    pub async fn watch(&self) -> Result<()> {
        let mut ignore = self.config.watch.ignore.clone();
        if let Some(dest) = relative_key(&self.root, &self.dest) {
            ignore.push(dest);
        }

        let (_watcher, mut changes) =
            FileWatcher::new(self.root.clone(), ignore, self.config.watch.debounce_ms)?;

        while let Some(change) = changes.recv().await {
            if let Err(err) = self.apply_change(&change).await {
                tracing::error!(
                    path = %change.path().display(),
                    error = %err,
                    "rebuild failed"
                );
            }
        }
        Ok(())
    }

    /// Initial build, then watch when `watch.enabled` is set.
    pub async fn run(&self) -> Result<()> {
        self.build().await?;
        if self.config.watch.enabled {
            self.watch().await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        if !self.write_output {
            return Ok(());
        }
        let store = Arc::clone(&self.store);
        let written = Arc::clone(&self.written);
        let dest = self.dest.clone();
        let overwrite = self.config.build.overwrite;
        let manifest = self.config.build.manifest;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let owned = written.lock().clone();
            let paths = write_store_with(&store, &dest, overwrite, &owned)?;
            written.lock().extend(paths);
            if manifest {
                write_manifest(&store, &dest)?;
            }
            Ok(())
        })
        .await
        .map_err(std::io::Error::from)?
    }

    fn emit(&self, event: BuildEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for DevtreeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevtreeBuilder")
            .field("root", &self.root)
            .field("dest", &self.dest)
            .field("store", &self.store)
            .field("write_output", &self.write_output)
            .finish_non_exhaustive()
    }
}
