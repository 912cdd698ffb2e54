use std::io::{IsTerminal, Stderr};
use std::sync::Mutex;

use ratatui::backend::CrosstermBackend;
use ratatui::{Terminal, TerminalOptions, Viewport};

use crate::store::ProgressDisplay;
use crate::ui::widgets::progress_bar::ImportProgressBar;

struct MeterState {
    label: String,
    percent: f64,
}

/// Progress meter drawn inline on stderr. Without a terminal it only logs
/// the phase labels.
pub struct TerminalMeter {
    terminal: Mutex<Option<Terminal<CrosstermBackend<Stderr>>>>,
    state: Mutex<MeterState>,
}

impl TerminalMeter {
    pub fn new() -> Self {
        let terminal = if std::io::stderr().is_terminal() {
            Terminal::with_options(
                CrosstermBackend::new(std::io::stderr()),
                TerminalOptions {
                    viewport: Viewport::Inline(1),
                },
            )
            .map_err(|e| tracing::debug!("no inline terminal: {}", e))
            .ok()
        } else {
            None
        };

        Self {
            terminal: Mutex::new(terminal),
            state: Mutex::new(MeterState {
                label: String::new(),
                percent: 0.0,
            }),
        }
    }

    fn redraw(&self) {
        let (label, percent) = match self.state.lock() {
            Ok(state) => (state.label.clone(), state.percent),
            Err(_) => return,
        };
        let Ok(mut guard) = self.terminal.lock() else {
            return;
        };
        if let Some(terminal) = guard.as_mut() {
            let result = terminal.draw(|frame| {
                frame.render_widget(ImportProgressBar { label, percent }, frame.area());
            });
            if let Err(e) = result {
                tracing::debug!("progress redraw failed: {}", e);
            }
        }
    }
}

impl Default for TerminalMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressDisplay for TerminalMeter {
    fn show(&self, label: &str) {
        tracing::info!("{}", label);
        if let Ok(mut state) = self.state.lock() {
            state.label = label.to_string();
            state.percent = 0.0;
        }
        self.redraw();
    }

    fn set_percent(&self, percent: f64) {
        if let Ok(mut state) = self.state.lock() {
            state.percent = percent;
        }
        self.redraw();
    }

    fn hide(&self) {
        if let Ok(mut guard) = self.terminal.lock() {
            if let Some(terminal) = guard.as_mut() {
                let _ = terminal.clear();
            }
        }
    }
}
