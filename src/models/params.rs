use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::core::extension::{extension_of, normalize};
use crate::core::progress::ProgressSink;
use crate::models::library::LibraryId;

/// Extensions the user chose to import. Stored lowercase without a dot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionFilter(BTreeSet<CompactString>);

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            extensions
                .into_iter()
                .filter_map(|e| normalize(e.as_ref()))
                .collect(),
        )
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.0.contains(extension)
    }

    /// Whether the file's extension is selected. Files without one never are.
    pub fn accepts(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.0.contains(&ext))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompactString> {
        self.0.iter()
    }
}

impl FromIterator<CompactString> for ExtensionFilter {
    fn from_iter<T: IntoIterator<Item = CompactString>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for ExtensionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(|e| e.as_str()).collect();
        write!(f, "{}", joined.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachMode {
    /// Reference the file at its original path.
    Link,
    /// Duplicate the file into the library's managed storage.
    Copy,
}

/// Fixed for the duration of one import run.
#[derive(Clone)]
pub struct ImportParameters {
    pub filter: ExtensionFilter,
    pub mode: AttachMode,
    pub library_id: LibraryId,
    /// Told once about every attempted file.
    pub progress: Arc<dyn ProgressSink>,
}

impl fmt::Debug for ImportParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportParameters")
            .field("filter", &self.filter)
            .field("mode", &self.mode)
            .field("library_id", &self.library_id)
            .finish_non_exhaustive()
    }
}

impl ImportParameters {
    pub fn new(
        filter: ExtensionFilter,
        mode: AttachMode,
        library_id: LibraryId,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            filter,
            mode,
            library_id,
            progress,
        }
    }
}
