use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Gauge, Widget},
};
use unicode_width::UnicodeWidthStr;

/// One terminal line: phase label on the left, gauge on the right.
pub struct ImportProgressBar {
    pub label: String,
    pub percent: f64,
}

impl Widget for ImportProgressBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 || area.width < 20 {
            return;
        }

        let label_width = (self.label.width() as u16 + 1).min(area.width / 2);
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(label_width), Constraint::Min(10)])
            .split(area);

        let label = truncate_label(&self.label, label_width.saturating_sub(1) as usize);
        let line = Line::from(Span::styled(label, Style::default().fg(Color::Yellow)));
        buf.set_line(chunks[0].x, chunks[0].y, &line, chunks[0].width);

        let percent = self.percent.clamp(0.0, 100.0);
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(percent / 100.0)
            .label(format!("{percent:.0}%"))
            .render(chunks[1], buf);
    }
}

/// Cuts `label` to `max_width` display columns, ending in `...` when cut.
pub fn truncate_label(label: &str, max_width: usize) -> String {
    if label.width() <= max_width {
        return label.to_string();
    }
    if max_width < 4 {
        return ".".repeat(max_width);
    }
    let mut w = 0;
    let mut out = String::new();
    for c in label.chars() {
        w += unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if w > max_width - 3 {
            break;
        }
        out.push(c);
    }
    out.push_str("...");
    out
}
