use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use compact_str::CompactString;
use dashmap::DashSet;
use tokio::sync::Semaphore;

use crate::config::settings::Settings;
use crate::error::ScanError;
use crate::models::node::ScanNode;

use super::events::{Event, EventSender};

type ScanFuture = Pin<Box<dyn Future<Output = Result<ScanNode, ScanError>> + Send>>;

/// Builds the in-memory mirror of a directory tree.
///
/// Subdirectories are scanned concurrently; a node waits for all of them
/// before aggregating its extension set. Any listing failure aborts the scan.
pub struct Scanner {
    semaphore: Arc<Semaphore>,
    event_tx: EventSender,
    visited: Arc<DashSet<PathBuf>>,
    settings: Arc<Settings>,
    dirs_scanned: Arc<AtomicUsize>,
}

impl Scanner {
    pub fn new(settings: Settings, event_tx: EventSender) -> Self {
        let max_io = settings.max_concurrent_io.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_io)),
            event_tx,
            visited: Arc::new(DashSet::new()),
            settings: Arc::new(settings),
            dirs_scanned: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn dirs_scanned(&self) -> usize {
        self.dirs_scanned.load(Ordering::Relaxed)
    }

    /// Scans `root` as the unnamed root node.
    pub async fn scan(&self, root: PathBuf) -> Result<ScanNode, ScanError> {
        let start = Instant::now();
        let _ = self.event_tx.send(Event::ScanStarted { path: root.clone() });

        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|source| ScanError::ReadDir {
                path: root.clone(),
                source,
            })?;
        if !meta.is_dir() {
            return Err(ScanError::NotADirectory(root));
        }

        if self.settings.follow_symlinks {
            if let Ok(real) = tokio::fs::canonicalize(&root).await {
                self.visited.insert(real);
            }
        }

        let node = self.scan_directory(root, true).await?;

        let _ = self.event_tx.send(Event::ScanCompleted {
            total_files: node.file_count(),
            total_dirs: node.dir_count(),
            duration_ms: start.elapsed().as_millis() as u64,
        });
        tracing::info!(
            "scan complete: {} files, extensions [{}]",
            node.file_count(),
            node.extensions
                .iter()
                .map(|e| e.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(node)
    }

    fn scan_directory(&self, path: PathBuf, is_root: bool) -> ScanFuture {
        scan_directory(
            path,
            is_root,
            Arc::clone(&self.semaphore),
            self.event_tx.clone(),
            Arc::clone(&self.visited),
            Arc::clone(&self.settings),
            Arc::clone(&self.dirs_scanned),
        )
    }
}

/// A directory entry reduced to what the scan needs.
struct DirEntryData {
    path: PathBuf,
    name: String,
    is_dir: bool,
}

/// Lists a directory in one blocking call, resolving symlinks according to
/// `follow_symlinks`. Entries that cannot be typed fail the whole listing.
fn read_dir_batch(dir_path: &Path, follow_symlinks: bool) -> Result<Vec<DirEntryData>, ScanError> {
    let mut entries = Vec::new();

    let iter = std::fs::read_dir(dir_path).map_err(|source| ScanError::ReadDir {
        path: dir_path.to_path_buf(),
        source,
    })?;

    for entry_result in iter {
        let entry = entry_result.map_err(|source| ScanError::Entry {
            path: dir_path.to_path_buf(),
            source,
        })?;
        let entry_path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        let file_type = entry.file_type().map_err(|source| ScanError::Entry {
            path: entry_path.clone(),
            source,
        })?;

        let is_dir = if file_type.is_symlink() {
            // Dangling links are neither files nor directories.
            match std::fs::metadata(&entry_path) {
                Ok(target) if target.is_dir() => {
                    if !follow_symlinks {
                        tracing::debug!("{}: skipping directory link {:?}", dir_path.display(), name);
                        continue;
                    }
                    true
                }
                Ok(target) if target.is_file() => false,
                _ => {
                    tracing::debug!("{}: skipping broken link {:?}", dir_path.display(), name);
                    continue;
                }
            }
        } else if file_type.is_dir() {
            true
        } else if file_type.is_file() {
            false
        } else {
            continue;
        };

        entries.push(DirEntryData {
            path: entry_path,
            name,
            is_dir,
        });
    }

    Ok(entries)
}

fn scan_directory(
    path: PathBuf,
    is_root: bool,
    semaphore: Arc<Semaphore>,
    event_tx: EventSender,
    visited: Arc<DashSet<PathBuf>>,
    settings: Arc<Settings>,
    dirs_scanned: Arc<AtomicUsize>,
) -> ScanFuture {
    Box::pin(async move {
        tracing::debug!("scanning {}", path.display());
        dirs_scanned.fetch_add(1, Ordering::Relaxed);

        // Permit is held only for the listing, not while waiting on children.
        let entries = {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| ScanError::Join(e.to_string()))?;
            let path_clone = path.clone();
            let follow = settings.follow_symlinks;
            tokio::task::spawn_blocking(move || read_dir_batch(&path_clone, follow))
                .await
                .map_err(|e| ScanError::Join(e.to_string()))??
        };

        let mut handles = Vec::new();
        let mut files = Vec::new();

        for entry in entries {
            if entry.is_dir {
                if settings.follow_symlinks {
                    let real = tokio::fs::canonicalize(&entry.path)
                        .await
                        .unwrap_or_else(|_| entry.path.clone());
                    if !visited.insert(real) {
                        tracing::debug!("{}: already visited, skipping", entry.path.display());
                        continue;
                    }
                }
                tracing::debug!("{}: subdir {:?}", path.display(), entry.name);

                handles.push(tokio::spawn(scan_directory(
                    entry.path,
                    false,
                    Arc::clone(&semaphore),
                    event_tx.clone(),
                    Arc::clone(&visited),
                    Arc::clone(&settings),
                    Arc::clone(&dirs_scanned),
                )));
            } else {
                tracing::debug!("{}: file {:?}", path.display(), entry.name);
                files.push(entry.path);
            }
        }

        // Children keep enumeration order; the first failure wins.
        let mut children = Vec::with_capacity(handles.len());
        for handle in handles {
            let child = handle
                .await
                .map_err(|e| ScanError::Join(e.to_string()))??;
            children.push(child);
        }

        let name = if is_root {
            CompactString::default()
        } else {
            path.file_name()
                .map(|n| CompactString::from(n.to_string_lossy()))
                .unwrap_or_default()
        };

        let _ = event_tx.send(Event::DirectoryScanned {
            path: path.clone(),
            files: files.len(),
        });

        let node = ScanNode::from_directory(path, name, files, children);
        tracing::debug!(
            "scanned {}: [{}]",
            node.path.display(),
            node.extensions
                .iter()
                .map(|e| e.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(node)
    })
}
