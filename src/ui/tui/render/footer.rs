use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::ui::ViewState;

const KEY_HELP: &str =
    "q quit · Tab/S-Tab symbol · 1-5 timeframe · ←/→ pan · Home/End edge · +/- zoom · [/] hover · Esc unhover · r reset";

pub(super) fn render_footer(frame: &mut Frame<'_>, area: Rect, view: &ViewState) {
    let mut spans = vec![Span::styled(KEY_HELP, Style::default().fg(Color::DarkGray))];
    if let Some(note) = &view.notification {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(note.clone(), Style::default().fg(Color::Yellow)));
    }

    let paragraph =
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}
