use std::fmt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::models::params::AttachMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LibraryId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachmentId(pub u64);

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "library {}", self.0)
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collection {}", self.0)
    }
}

/// A named node in a library's collection hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub library_id: LibraryId,
    pub name: CompactString,
    /// `None` for collections at the top of the library.
    pub parent: Option<CollectionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    User,
    Group,
    Publications,
}

impl LibraryKind {
    /// Personal libraries link by default; shared targets need a copy the
    /// other members can open.
    pub fn default_mode(self) -> AttachMode {
        match self {
            LibraryKind::User => AttachMode::Link,
            LibraryKind::Group | LibraryKind::Publications => AttachMode::Copy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_edit: bool,
    pub can_edit_files: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            can_edit: true,
            can_edit_files: true,
        }
    }
}

/// Where an import run lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportTarget {
    pub library_id: LibraryId,
    pub kind: LibraryKind,
    /// Pre-selected starting collection; `None` imports at the library top.
    pub collection: Option<CollectionId>,
}

impl ImportTarget {
    pub fn new(library_id: LibraryId, kind: LibraryKind) -> Self {
        Self {
            library_id,
            kind,
            collection: None,
        }
    }

    pub fn with_collection(mut self, collection: Option<CollectionId>) -> Self {
        self.collection = collection;
        self
    }
}
