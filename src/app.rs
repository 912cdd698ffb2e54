use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::Serialize;

use crate::config::settings::Settings;
use crate::core::events::{self, Event, EventSender};
use crate::core::importer::Importer;
use crate::core::progress::ProgressTracker;
use crate::core::scanner::Scanner;
use crate::error::{ImportError, Result};
use crate::models::library::{AttachmentId, ImportTarget};
use crate::models::node::ScanNode;
use crate::models::params::{AttachMode, ExtensionFilter, ImportParameters};
use crate::store::{
    AttachmentStore, CollectionStore, ExtensionSelector, MetadataRecognizer, NoDisplay,
    ProgressDisplay,
};

/// Outcome of one import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub done: usize,
    pub imported: usize,
    pub linked: usize,
    pub failed: usize,
    pub skipped_shortcuts: usize,
    pub collections_created: usize,
    pub pdfs: Vec<AttachmentId>,
}

/// Drives a whole run: scan, selection, import, metadata recognition.
pub struct FolderImport {
    settings: Settings,
    collections: Arc<dyn CollectionStore>,
    attachments: Arc<dyn AttachmentStore>,
    recognizer: Option<Arc<dyn MetadataRecognizer>>,
    display: Arc<dyn ProgressDisplay>,
    event_tx: Option<EventSender>,
}

impl FolderImport {
    pub fn new(
        settings: Settings,
        collections: Arc<dyn CollectionStore>,
        attachments: Arc<dyn AttachmentStore>,
    ) -> Self {
        Self {
            settings,
            collections,
            attachments,
            recognizer: None,
            display: Arc::new(NoDisplay),
            event_tx: None,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn MetadataRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_display(mut self, display: Arc<dyn ProgressDisplay>) -> Self {
        self.display = display;
        self
    }

    pub fn with_events(mut self, event_tx: EventSender) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Runs every phase. `Ok(None)` means nothing was imported because the
    /// folder held no files with an extension or the user cancelled.
    ///
    /// `mode` overrides the target's default attach mode.
    pub async fn run(
        &self,
        root: PathBuf,
        target: ImportTarget,
        mode: Option<AttachMode>,
        selector: Arc<dyn ExtensionSelector>,
    ) -> Result<Option<ImportSummary>> {
        let permissions = self.collections.permissions(target.library_id).await?;
        if !permissions.can_edit {
            return Err(ImportError::ReadOnlyLibrary);
        }
        if !permissions.can_edit_files {
            return Err(ImportError::ReadOnlyFiles);
        }

        let tree = self.scan(root).await?;
        if tree.extensions.is_empty() {
            tracing::info!("no files with an extension under {}", tree.path.display());
            return Ok(None);
        }

        let (tree, selection) = tokio::task::spawn_blocking(move || {
            let selection = selector.select(&tree);
            (tree, selection)
        })
        .await
        .map_err(|e| ImportError::Selection(e.to_string()))?;
        let Some(filter) = selection else {
            tracing::info!("extension selection cancelled");
            return Ok(None);
        };
        if filter.is_empty() {
            return Ok(None);
        }

        let mode = mode.unwrap_or_else(|| target.kind.default_mode());
        self.import_tree(&tree, filter, mode, target).await.map(Some)
    }

    pub async fn scan(&self, root: PathBuf) -> Result<ScanNode> {
        let event_tx = match &self.event_tx {
            Some(tx) => tx.clone(),
            None => events::create_event_channel().0,
        };
        let scanner = Scanner::new(self.settings.clone(), event_tx);

        self.display.show("Scanning for attachments...");
        let result = scanner.scan(root).await;
        self.display.hide();
        Ok(result?)
    }

    /// Imports an already scanned tree with a fixed filter.
    pub async fn import_tree(
        &self,
        tree: &ScanNode,
        filter: ExtensionFilter,
        mode: AttachMode,
        target: ImportTarget,
    ) -> Result<ImportSummary> {
        if mode == AttachMode::Copy {
            self.warn_shortcuts(tree, &filter);
        }

        let total = tree.selected(&filter);
        let mut tracker = ProgressTracker::new(total).with_display(Arc::clone(&self.display));
        if let Some(tx) = &self.event_tx {
            tracker = tracker.with_events(tx.clone());
        }
        let tracker = Arc::new(tracker);

        let params = ImportParameters::new(filter, mode, target.library_id, tracker.clone());
        let mut importer = Importer::new(Arc::clone(&self.collections), Arc::clone(&self.attachments))
            .with_file_delay(self.settings.file_delay())
            .with_shortcut_extensions(self.settings.shortcut_extensions.clone());
        if let Some(tx) = &self.event_tx {
            importer = importer.with_events(tx.clone());
        }

        tracing::info!(
            "importing {} files ({}) into {} as {:?}",
            total,
            params.filter,
            target.library_id,
            mode
        );
        let mut pdfs = Vec::new();
        self.display.show("Importing attachments...");
        let result = importer
            .import(tree, &params, target.collection, &mut pdfs)
            .await;
        self.display.hide();
        result?;

        if let Some(tx) = &self.event_tx {
            let _ = tx.send(Event::ImportCompleted {
                done: tracker.done(),
                total,
            });
        }

        if !pdfs.is_empty() {
            self.recognize(pdfs.clone()).await;
        }

        let stats = importer.stats();
        Ok(ImportSummary {
            total,
            done: tracker.done(),
            imported: stats.imported.load(Ordering::Relaxed),
            linked: stats.linked.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
            skipped_shortcuts: stats.skipped_shortcuts.load(Ordering::Relaxed),
            collections_created: stats.collections_created.load(Ordering::Relaxed),
            pdfs,
        })
    }

    /// Hands PDFs to the recognizer. Failures never fail the run.
    async fn recognize(&self, pdfs: Vec<AttachmentId>) {
        let Some(recognizer) = &self.recognizer else {
            return;
        };
        self.display.show("Fetching metadata for attachments...");
        if let Err(e) = recognizer.recognize(pdfs).await {
            tracing::error!("metadata recognition failed: {}", e);
        }
        self.display.hide();
    }

    fn warn_shortcuts(&self, tree: &ScanNode, filter: &ExtensionFilter) {
        for ext in &self.settings.shortcut_extensions {
            if !filter.contains(ext) {
                continue;
            }
            let count = tree.count_extension(ext);
            if count > 0 {
                tracing::warn!(
                    "{} .{} files will be skipped: shortcuts cannot be copied",
                    count,
                    ext
                );
            }
        }
    }
}
