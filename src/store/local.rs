//! A library stored in a directory.
//!
//! Layout:
//! - `library.json`: collections, attachment records and the queue of PDFs
//!   waiting for metadata recognition.
//! - `storage/<attachment-id>/<file name>`: copies made in copy mode.
//!
//! The manifest is rewritten through a temporary file and a rename after
//! every change.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::library::{AttachmentId, Collection, CollectionId, LibraryId};
use crate::models::params::AttachMode;

use super::{AttachmentStore, CollectionStore, MetadataRecognizer, StoreResult};

const MANIFEST_FILE: &str = "library.json";
const STORAGE_DIR: &str = "storage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: AttachmentId,
    pub library_id: LibraryId,
    pub collection: Option<CollectionId>,
    pub mode: AttachMode,
    /// Path the attachment came from.
    pub source: PathBuf,
    /// Managed copy, present in copy mode only.
    pub stored: Option<PathBuf>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Manifest {
    next_id: u64,
    collections: Vec<Collection>,
    attachments: Vec<AttachmentRecord>,
    recognition_queue: Vec<AttachmentId>,
}

impl Manifest {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct LocalLibrary {
    root: PathBuf,
    settle_delay: Duration,
    manifest: Mutex<Manifest>,
}

impl LocalLibrary {
    /// Opens the library at `root`, creating an empty one if needed.
    pub async fn open(root: impl Into<PathBuf>, settle_delay: Duration) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = match tokio::fs::read(&manifest_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Manifest::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("opened library at {}", root.display());

        Ok(Self {
            root,
            settle_delay,
            manifest: Mutex::new(manifest),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn collections(&self) -> Vec<Collection> {
        self.manifest.lock().await.collections.clone()
    }

    pub async fn attachments(&self) -> Vec<AttachmentRecord> {
        self.manifest.lock().await.attachments.clone()
    }

    pub async fn recognition_queue(&self) -> Vec<AttachmentId> {
        self.manifest.lock().await.recognition_queue.clone()
    }

    /// Resolves a `/`-separated path of collection names, starting at the
    /// top of `library`.
    pub async fn resolve_path(&self, library: LibraryId, path: &str) -> StoreResult<CollectionId> {
        let manifest = self.manifest.lock().await;
        let mut current: Option<CollectionId> = None;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let found = manifest
                .collections
                .iter()
                .find(|c| c.library_id == library && c.parent == current && c.name == segment)
                .ok_or_else(|| StoreError::Other(format!("no collection {segment:?} in {path:?}")))?;
            current = Some(found.id);
        }
        current.ok_or_else(|| StoreError::Other(format!("empty collection path {path:?}")))
    }

    async fn save(&self, manifest: &Manifest) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(manifest)?;
        let target = self.root.join(MANIFEST_FILE);
        let tmp = target.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    fn record(
        manifest: &mut Manifest,
        library_id: LibraryId,
        collection: Option<CollectionId>,
        mode: AttachMode,
        source: &Path,
        stored: Option<PathBuf>,
    ) -> AttachmentId {
        let id = AttachmentId(manifest.next_id());
        manifest.attachments.push(AttachmentRecord {
            id,
            library_id,
            collection,
            mode,
            source: source.to_path_buf(),
            stored,
            added_at: Utc::now(),
        });
        id
    }

    /// Drops the record added last, after its save failed.
    fn forget_last(manifest: &mut Manifest) {
        if manifest.attachments.pop().is_some() {
            manifest.next_id -= 1;
        }
    }

    fn check_collection(manifest: &Manifest, collection: Option<CollectionId>) -> StoreResult<()> {
        match collection {
            Some(id) if !manifest.collections.iter().any(|c| c.id == id) => {
                Err(StoreError::UnknownCollection(id.0))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CollectionStore for LocalLibrary {
    async fn child_collections(
        &self,
        library: LibraryId,
        parent: Option<CollectionId>,
    ) -> StoreResult<Vec<Collection>> {
        let manifest = self.manifest.lock().await;
        Ok(manifest
            .collections
            .iter()
            .filter(|c| c.library_id == library && c.parent == parent)
            .cloned()
            .collect())
    }

    async fn create_collection(
        &self,
        library: LibraryId,
        parent: Option<CollectionId>,
        name: &str,
    ) -> StoreResult<Collection> {
        let mut manifest = self.manifest.lock().await;
        Self::check_collection(&manifest, parent)?;

        let collection = Collection {
            id: CollectionId(manifest.next_id()),
            library_id: library,
            name: name.into(),
            parent,
        };
        manifest.collections.push(collection.clone());
        if let Err(e) = self.save(&manifest).await {
            manifest.collections.pop();
            manifest.next_id -= 1;
            return Err(e);
        }
        tracing::debug!("{name} created");
        Ok(collection)
    }

    async fn wait_until_settled(&self, collection: CollectionId) -> StoreResult<()> {
        tokio::time::sleep(self.settle_delay).await;
        let manifest = self.manifest.lock().await;
        Self::check_collection(&manifest, Some(collection))
    }
}

#[async_trait]
impl AttachmentStore for LocalLibrary {
    async fn link_file(
        &self,
        library: LibraryId,
        file: &Path,
        collection: Option<CollectionId>,
    ) -> StoreResult<AttachmentId> {
        let meta = tokio::fs::metadata(file).await?;
        if !meta.is_file() {
            return Err(StoreError::AttachmentFailed {
                path: file.to_path_buf(),
                reason: "not a regular file".into(),
            });
        }

        let mut manifest = self.manifest.lock().await;
        Self::check_collection(&manifest, collection)?;
        let id = Self::record(&mut manifest, library, collection, AttachMode::Link, file, None);
        if let Err(e) = self.save(&manifest).await {
            Self::forget_last(&mut manifest);
            return Err(e);
        }
        Ok(id)
    }

    async fn import_file(
        &self,
        library: LibraryId,
        file: &Path,
        collection: Option<CollectionId>,
    ) -> StoreResult<AttachmentId> {
        let file_name = file.file_name().ok_or_else(|| StoreError::AttachmentFailed {
            path: file.to_path_buf(),
            reason: "path has no file name".into(),
        })?;

        let mut manifest = self.manifest.lock().await;
        Self::check_collection(&manifest, collection)?;

        let slot = manifest.next_id + 1;
        let dir = self.root.join(STORAGE_DIR).join(slot.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let stored = dir.join(file_name);
        if let Err(e) = tokio::fs::copy(file, &stored).await {
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(e.into());
        }

        let id = Self::record(
            &mut manifest,
            library,
            collection,
            AttachMode::Copy,
            file,
            Some(stored),
        );
        if let Err(e) = self.save(&manifest).await {
            Self::forget_last(&mut manifest);
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(e);
        }
        Ok(id)
    }
}

#[async_trait]
impl MetadataRecognizer for LocalLibrary {
    /// Queues the attachments; recognition runs outside this tool.
    async fn recognize(&self, attachments: Vec<AttachmentId>) -> StoreResult<()> {
        let mut manifest = self.manifest.lock().await;
        tracing::info!("queueing {} attachments for metadata recognition", attachments.len());
        let queued = manifest.recognition_queue.len();
        manifest.recognition_queue.extend(attachments);
        if let Err(e) = self.save(&manifest).await {
            manifest.recognition_queue.truncate(queued);
            return Err(e);
        }
        Ok(())
    }
}
