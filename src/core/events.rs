use std::path::PathBuf;

use compact_str::CompactString;
use tokio::sync::mpsc;

use crate::models::library::CollectionId;

#[derive(Debug, Clone)]
pub enum Event {
    // Scan phase
    ScanStarted { path: PathBuf },
    DirectoryScanned { path: PathBuf, files: usize },
    ScanCompleted { total_files: usize, total_dirs: usize, duration_ms: u64 },

    // Import phase
    CollectionCreated { id: CollectionId, name: CompactString },
    CollectionReused { id: CollectionId, name: CompactString },
    FileAttached { path: PathBuf },
    FileFailed { path: PathBuf, error: String },
    Progress { done: usize, total: usize, percent: f64 },
    ImportCompleted { done: usize, total: usize },
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
