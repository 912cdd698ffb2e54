use std::collections::BTreeSet;
use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::core::extension::extension_of;
use crate::models::params::ExtensionFilter;

/// One scanned directory.
///
/// `extensions` holds every extension found in this directory or anywhere
/// below it, so a node whose set misses the filter can be skipped whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanNode {
    pub path: PathBuf,
    /// Empty for the scan root, which never becomes a collection.
    pub name: CompactString,
    pub files: Vec<PathBuf>,
    pub children: Vec<ScanNode>,
    pub extensions: BTreeSet<CompactString>,
}

impl ScanNode {
    /// Builds a directory node and folds the children's extension sets into
    /// the extensions of its own files.
    pub fn from_directory(
        path: PathBuf,
        name: CompactString,
        files: Vec<PathBuf>,
        children: Vec<ScanNode>,
    ) -> Self {
        let mut extensions: BTreeSet<CompactString> =
            files.iter().filter_map(|f| extension_of(f)).collect();
        for child in &children {
            extensions.extend(child.extensions.iter().cloned());
        }

        Self {
            path,
            name,
            files,
            children,
            extensions,
        }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// True if anything in this subtree passes `filter`.
    pub fn matches(&self, filter: &ExtensionFilter) -> bool {
        self.extensions.iter().any(|ext| filter.contains(ext))
    }

    /// Number of files in the subtree whose extension passes `filter`.
    pub fn selected(&self, filter: &ExtensionFilter) -> usize {
        let own = self
            .files
            .iter()
            .filter(|f| filter.accepts(f))
            .count();
        own + self
            .children
            .iter()
            .map(|child| child.selected(filter))
            .sum::<usize>()
    }

    /// Number of files in the subtree carrying exactly `extension`.
    pub fn count_extension(&self, extension: &str) -> usize {
        let own = self
            .files
            .iter()
            .filter(|f| extension_of(f).as_deref() == Some(extension))
            .count();
        own + self
            .children
            .iter()
            .map(|child| child.count_extension(extension))
            .sum::<usize>()
    }

    pub fn file_count(&self) -> usize {
        self.files.len() + self.children.iter().map(|c| c.file_count()).sum::<usize>()
    }

    /// Directories in the subtree, this one included.
    pub fn dir_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.dir_count()).sum::<usize>()
    }
}
