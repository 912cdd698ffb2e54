use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use compact_str::CompactString;

use crate::error::{ImportError, Result};
use crate::models::library::{AttachmentId, CollectionId};
use crate::models::node::ScanNode;
use crate::models::params::{AttachMode, ImportParameters};
use crate::store::{AttachmentStore, CollectionStore};

use super::events::{Event, EventSender};
use super::extension::{extension_of, is_pdf};

type ImportFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Counters for one importer, shared by every node of the walk.
#[derive(Debug, Default)]
pub struct ImportStats {
    pub imported: AtomicUsize,
    pub linked: AtomicUsize,
    pub failed: AtomicUsize,
    pub skipped_shortcuts: AtomicUsize,
    pub collections_created: AtomicUsize,
}

/// Replays a scan tree into the library, one file and one subtree at a time.
pub struct Importer {
    collections: Arc<dyn CollectionStore>,
    attachments: Arc<dyn AttachmentStore>,
    event_tx: Option<EventSender>,
    file_delay: Option<Duration>,
    shortcut_extensions: Vec<CompactString>,
    stats: ImportStats,
}

enum FileOutcome {
    Linked,
    Imported(AttachmentId),
    Skipped,
}

impl Importer {
    pub fn new(collections: Arc<dyn CollectionStore>, attachments: Arc<dyn AttachmentStore>) -> Self {
        Self {
            collections,
            attachments,
            event_tx: None,
            file_delay: None,
            shortcut_extensions: vec![CompactString::from("lnk")],
            stats: ImportStats::default(),
        }
    }

    pub fn with_events(mut self, event_tx: EventSender) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Pause inserted after every attempted file. `None` disables it.
    pub fn with_file_delay(mut self, delay: Option<Duration>) -> Self {
        self.file_delay = delay;
        self
    }

    pub fn with_shortcut_extensions(mut self, extensions: Vec<CompactString>) -> Self {
        self.shortcut_extensions = extensions;
        self
    }

    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }

    pub fn is_shortcut(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.shortcut_extensions.contains(&ext))
    }

    /// Imports `node` and its subtree below `parent`.
    ///
    /// Subtrees without a selected extension are skipped entirely. Copied
    /// PDFs are appended to `pdfs`. Per-file failures are logged and
    /// skipped; failing to create a collection aborts the walk.
    pub fn import<'a>(
        &'a self,
        node: &'a ScanNode,
        params: &'a ImportParameters,
        parent: Option<CollectionId>,
        pdfs: &'a mut Vec<AttachmentId>,
    ) -> ImportFuture<'a> {
        Box::pin(async move {
            if !node.matches(&params.filter) {
                return Ok(());
            }
            tracing::debug!("importing path {}", node.path.display());

            let mut collection = parent;
            if !node.is_root() {
                collection = Some(self.reconcile_collection(node, params, parent).await?);
            }
            if let Some(id) = collection {
                self.collections.load_collection(id).await?;
            }

            let mut files: Vec<&PathBuf> = node.files.iter().collect();
            files.sort();

            for file in files {
                if !params.filter.accepts(file) {
                    continue;
                }

                match self.attach_file(file, params, collection).await {
                    Ok(FileOutcome::Imported(item)) => {
                        self.stats.imported.fetch_add(1, Ordering::Relaxed);
                        if is_pdf(file) {
                            pdfs.push(item);
                        }
                        self.emit(Event::FileAttached { path: file.clone() });
                    }
                    Ok(FileOutcome::Linked) => {
                        self.stats.linked.fetch_add(1, Ordering::Relaxed);
                        self.emit(Event::FileAttached { path: file.clone() });
                    }
                    Ok(FileOutcome::Skipped) => {
                        self.stats.skipped_shortcuts.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        tracing::warn!("failed to attach {}: {}", file.display(), e);
                        self.stats.failed.fetch_add(1, Ordering::Relaxed);
                        self.emit(Event::FileFailed {
                            path: file.clone(),
                            error: e.to_string(),
                        });
                    }
                }

                if let Some(delay) = self.file_delay {
                    tokio::time::sleep(delay).await;
                }
                params.progress.file_processed();
            }

            for child in &node.children {
                self.import(child, params, collection, &mut *pdfs).await?;
            }

            Ok(())
        })
    }

    /// Finds the child of `parent` named like `node`, creating it if missing.
    async fn reconcile_collection(
        &self,
        node: &ScanNode,
        params: &ImportParameters,
        parent: Option<CollectionId>,
    ) -> Result<CollectionId> {
        let siblings = self
            .collections
            .child_collections(params.library_id, parent)
            .await?;

        if let Some(existing) = siblings.into_iter().find(|c| c.name == node.name) {
            tracing::debug!("{} exists under {}", node.name, describe(parent));
            self.emit(Event::CollectionReused {
                id: existing.id,
                name: existing.name,
            });
            return Ok(existing.id);
        }

        tracing::debug!("{} does not exist, creating under {}", node.name, describe(parent));
        let created = self
            .collections
            .create_collection(params.library_id, parent, &node.name)
            .await
            .map_err(|source| ImportError::CollectionCreate {
                name: node.name.clone(),
                source,
            })?;
        self.collections
            .wait_until_settled(created.id)
            .await
            .map_err(|source| ImportError::CollectionCreate {
                name: node.name.clone(),
                source,
            })?;

        self.stats.collections_created.fetch_add(1, Ordering::Relaxed);
        self.emit(Event::CollectionCreated {
            id: created.id,
            name: created.name,
        });
        Ok(created.id)
    }

    async fn attach_file(
        &self,
        file: &Path,
        params: &ImportParameters,
        collection: Option<CollectionId>,
    ) -> crate::store::StoreResult<FileOutcome> {
        match params.mode {
            AttachMode::Link => {
                tracing::debug!("linking {} into {}", file.display(), describe(collection));
                self.attachments
                    .link_file(params.library_id, file, collection)
                    .await?;
                Ok(FileOutcome::Linked)
            }
            AttachMode::Copy if self.is_shortcut(file) => {
                tracing::debug!("not copying shortcut {}", file.display());
                Ok(FileOutcome::Skipped)
            }
            AttachMode::Copy => {
                tracing::debug!("importing {} into {}", file.display(), describe(collection));
                let item = self
                    .attachments
                    .import_file(params.library_id, file, collection)
                    .await?;
                Ok(FileOutcome::Imported(item))
            }
        }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

fn describe(collection: Option<CollectionId>) -> String {
    match collection {
        Some(id) => id.to_string(),
        None => "the library root".to_string(),
    }
}
