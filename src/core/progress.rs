use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::store::ProgressDisplay;

use super::events::{Event, EventSender};

/// Receives one call per attempted file, successful or not.
pub trait ProgressSink: Send + Sync {
    fn file_processed(&self);
}

/// Import progress: `total` is fixed before the walk, `done` only grows.
pub struct ProgressTracker {
    total: usize,
    done: AtomicUsize,
    display: Option<Arc<dyn ProgressDisplay>>,
    event_tx: Option<EventSender>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: AtomicUsize::new(0),
            display: None,
            event_tx: None,
        }
    }

    pub fn with_display(mut self, display: Arc<dyn ProgressDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_events(mut self, event_tx: EventSender) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    /// Completion in percent, clamped to 100. An empty run counts as complete.
    pub fn percent(&self) -> f64 {
        percent(self.done(), self.total)
    }

    /// `Imported  7/120...` with `done` padded to the width of `total`.
    pub fn label(&self) -> String {
        let total = self.total.to_string();
        format!(
            "Imported {:>width$}/{}...",
            self.done(),
            total,
            width = total.len()
        )
    }
}

impl ProgressSink for ProgressTracker {
    fn file_processed(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let percent = percent(done, self.total);
        tracing::debug!("{}", self.label());

        if let Some(display) = &self.display {
            display.set_percent(percent);
        }
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(Event::Progress {
                done,
                total: self.total,
                percent,
            });
        }
    }
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 * 100.0 / total as f64).min(100.0)
}
