use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::app::{AppState, ToastLevel};

pub const HELP_NAV: &str = "↑/↓ move  Enter edit  ←/→ choose  Del clear  Ctrl+S submit  q quit";
pub const HELP_EDIT: &str = "Enter commit  Esc cancel  Tab other date  ↑/↓ step";

/// Toast (if any) followed by key help for the current mode.
pub fn draw_status(f: &mut Frame, area: Rect, state: &AppState) {
    let mut spans: Vec<Span> = Vec::new();
    if let Some(t) = &state.toast {
        let color = crate::theme::toast_color(t.level);
        let tag = match t.level {
            ToastLevel::Success => "[OK]",
            ToastLevel::Error => "[ERROR]",
            ToastLevel::Info => "[INFO]",
        };
        spans.push(Span::styled(
            format!(" {tag} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(t.text.clone(), Style::default().fg(color)));
        spans.push(Span::raw("  |  "));
    }
    let help = if state.form.is_editing() {
        HELP_EDIT
    } else {
        HELP_NAV
    };
    spans.push(Span::styled(help, crate::theme::text_muted()));
    let p = Paragraph::new(Line::from(spans));
    f.render_widget(p, area);
}
