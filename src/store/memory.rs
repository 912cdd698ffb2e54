//! A library held entirely in memory.
//!
//! New collections are queryable immediately, so nothing ever waits to
//! settle. Used for `--dry-run` and as the collaborator in tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use compact_str::CompactString;

use crate::error::StoreError;
use crate::models::library::{
    AttachmentId, Collection, CollectionId, LibraryId, Permissions,
};
use crate::models::params::AttachMode;

use super::{AttachmentStore, CollectionStore, MetadataRecognizer, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAttachment {
    pub id: AttachmentId,
    pub library_id: LibraryId,
    pub collection: Option<CollectionId>,
    pub path: PathBuf,
    pub mode: AttachMode,
}

#[derive(Default)]
struct State {
    next_id: u64,
    collections: Vec<Collection>,
    attachments: Vec<MemoryAttachment>,
    recognized: Vec<Vec<AttachmentId>>,
    failing_files: HashSet<PathBuf>,
    failing_collections: HashSet<CompactString>,
    permissions: Permissions,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryLibrary {
    state: Mutex<State>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every attach of `path` fail.
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.lock().failing_files.insert(path.into());
    }

    /// Makes creating a collection called `name` fail.
    pub fn fail_collection(&self, name: &str) {
        self.lock().failing_collections.insert(name.into());
    }

    pub fn set_permissions(&self, permissions: Permissions) {
        self.lock().permissions = permissions;
    }

    /// Adds a collection directly, bypassing the create path.
    pub fn insert_collection(
        &self,
        library_id: LibraryId,
        parent: Option<CollectionId>,
        name: &str,
    ) -> Collection {
        let mut state = self.lock();
        let collection = Collection {
            id: CollectionId(state.next_id()),
            library_id,
            name: name.into(),
            parent,
        };
        state.collections.push(collection.clone());
        collection
    }

    pub fn collections(&self) -> Vec<Collection> {
        self.lock().collections.clone()
    }

    pub fn attachments(&self) -> Vec<MemoryAttachment> {
        self.lock().attachments.clone()
    }

    pub fn attachments_in(&self, collection: Option<CollectionId>) -> Vec<MemoryAttachment> {
        self.lock()
            .attachments
            .iter()
            .filter(|a| a.collection == collection)
            .cloned()
            .collect()
    }

    pub fn recognized(&self) -> Vec<Vec<AttachmentId>> {
        self.lock().recognized.clone()
    }

    /// Finds a collection by name under `parent`.
    pub fn find(&self, parent: Option<CollectionId>, name: &str) -> Option<Collection> {
        self.lock()
            .collections
            .iter()
            .find(|c| c.parent == parent && c.name == name)
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not hide the recorded calls.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn attach(
        &self,
        library_id: LibraryId,
        file: &Path,
        collection: Option<CollectionId>,
        mode: AttachMode,
    ) -> StoreResult<AttachmentId> {
        let mut state = self.lock();
        if state.failing_files.contains(file) {
            return Err(StoreError::AttachmentFailed {
                path: file.to_path_buf(),
                reason: "rejected by store".into(),
            });
        }
        if let Some(id) = collection {
            if !state.collections.iter().any(|c| c.id == id) {
                return Err(StoreError::UnknownCollection(id.0));
            }
        }
        let id = AttachmentId(state.next_id());
        state.attachments.push(MemoryAttachment {
            id,
            library_id,
            collection,
            path: file.to_path_buf(),
            mode,
        });
        Ok(id)
    }
}

#[async_trait]
impl CollectionStore for MemoryLibrary {
    async fn child_collections(
        &self,
        library: LibraryId,
        parent: Option<CollectionId>,
    ) -> StoreResult<Vec<Collection>> {
        Ok(self
            .lock()
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
        if self.lock().failing_collections.contains(name) {
            return Err(StoreError::Other(format!("cannot save collection {name:?}")));
        }
        Ok(self.insert_collection(library, parent, name))
    }

    async fn permissions(&self, _library: LibraryId) -> StoreResult<Permissions> {
        Ok(self.lock().permissions)
    }
}

#[async_trait]
impl AttachmentStore for MemoryLibrary {
    async fn link_file(
        &self,
        library: LibraryId,
        file: &Path,
        collection: Option<CollectionId>,
    ) -> StoreResult<AttachmentId> {
        self.attach(library, file, collection, AttachMode::Link)
    }

    async fn import_file(
        &self,
        library: LibraryId,
        file: &Path,
        collection: Option<CollectionId>,
    ) -> StoreResult<AttachmentId> {
        self.attach(library, file, collection, AttachMode::Copy)
    }
}

#[async_trait]
impl MetadataRecognizer for MemoryLibrary {
    async fn recognize(&self, attachments: Vec<AttachmentId>) -> StoreResult<()> {
        self.lock().recognized.push(attachments);
        Ok(())
    }
}
