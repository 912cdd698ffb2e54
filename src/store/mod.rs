//! Seams to the reference library and to the user.
//!
//! The scanner and importer only talk to these traits; `memory` and `local`
//! provide the two in-tree implementations.

pub mod local;
pub mod memory;

use std::path::Path;

use async_trait::async_trait;
use compact_str::CompactString;

use crate::error::StoreError;
use crate::models::library::{AttachmentId, Collection, CollectionId, LibraryId, Permissions};
use crate::models::node::ScanNode;
use crate::models::params::ExtensionFilter;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Collection hierarchy of a library. Collections are only ever added.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Direct children of `parent`, or the top-level collections of
    /// `library` when `parent` is `None`.
    async fn child_collections(
        &self,
        library: LibraryId,
        parent: Option<CollectionId>,
    ) -> StoreResult<Vec<Collection>>;

    /// Creates and persists a collection named `name` under `parent`.
    async fn create_collection(
        &self,
        library: LibraryId,
        parent: Option<CollectionId>,
        name: &str,
    ) -> StoreResult<Collection>;

    /// Resolves once a freshly created collection can be queried and used as
    /// a parent. Stores that persist synchronously return immediately.
    async fn wait_until_settled(&self, _collection: CollectionId) -> StoreResult<()> {
        Ok(())
    }

    /// Makes sure the collection's contents are loaded before items are
    /// added to it.
    async fn load_collection(&self, _collection: CollectionId) -> StoreResult<()> {
        Ok(())
    }

    async fn permissions(&self, _library: LibraryId) -> StoreResult<Permissions> {
        Ok(Permissions::default())
    }
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Attaches `file` by reference to its current location.
    async fn link_file(
        &self,
        library: LibraryId,
        file: &Path,
        collection: Option<CollectionId>,
    ) -> StoreResult<AttachmentId>;

    /// Copies `file` into managed storage and returns the new attachment.
    async fn import_file(
        &self,
        library: LibraryId,
        file: &Path,
        collection: Option<CollectionId>,
    ) -> StoreResult<AttachmentId>;
}

/// Metadata lookup for imported PDFs.
///
/// `recognize` only hands the attachments over. Lookups finish after the
/// import run has returned.
#[async_trait]
pub trait MetadataRecognizer: Send + Sync {
    async fn recognize(&self, attachments: Vec<AttachmentId>) -> StoreResult<()>;
}

/// A meter the orchestrator drives through the phases of a run.
pub trait ProgressDisplay: Send + Sync {
    fn show(&self, label: &str);
    /// `percent` is already clamped to `0..=100`.
    fn set_percent(&self, percent: f64);
    fn hide(&self);
}

/// Lets the user narrow the discovered extensions down to the ones to import.
pub trait ExtensionSelector: Send + Sync {
    /// `None` means the user cancelled.
    fn select(&self, root: &ScanNode) -> Option<ExtensionFilter>;
}

/// Selector that takes every discovered extension, or a fixed list.
pub struct FixedSelector(pub Option<Vec<CompactString>>);

impl ExtensionSelector for FixedSelector {
    fn select(&self, root: &ScanNode) -> Option<ExtensionFilter> {
        match &self.0 {
            Some(list) => Some(ExtensionFilter::new(list)),
            None => Some(ExtensionFilter::new(&root.extensions)),
        }
    }
}

/// Display that draws nothing.
pub struct NoDisplay;

impl ProgressDisplay for NoDisplay {
    fn show(&self, _label: &str) {}
    fn set_percent(&self, _percent: f64) {}
    fn hide(&self) {}
}
