mod footer;
mod header;
mod price_pane;
mod volume_pane;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;

use crate::chart::{ChangeSign, VisibleRange};
use crate::ui::{DOWN_RGB, UP_RGB, ViewState};

use super::ChartView;
use self::footer::render_footer;
use self::header::render_header;
use self::price_pane::render_price_pane;
use self::volume_pane::render_volume_pane;

pub(super) fn render_root(frame: &mut Frame<'_>, view: &ViewState, chart: &ChartView<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(frame.size());

    render_header(frame, chunks[0], view, chart);

    if chart.volume.is_hidden() {
        render_price_pane(frame, chunks[1], view, chart);
    } else {
        let panes = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(chunks[1]);
        render_price_pane(frame, panes[0], view, chart);
        render_volume_pane(frame, panes[1], view, chart);
    }

    render_footer(frame, chunks[2], view);
}

pub(super) fn up_color(view: &ViewState) -> Color {
    if view.enable_colors {
        Color::Rgb(UP_RGB.0, UP_RGB.1, UP_RGB.2)
    } else {
        Color::White
    }
}

pub(super) fn down_color(view: &ViewState) -> Color {
    if view.enable_colors {
        Color::Rgb(DOWN_RGB.0, DOWN_RGB.1, DOWN_RGB.2)
    } else {
        Color::Gray
    }
}

pub(super) fn direction_color(view: &ViewState, up: bool) -> Color {
    if up { up_color(view) } else { down_color(view) }
}

pub(super) fn sign_color(view: &ViewState, sign: ChangeSign) -> Color {
    direction_color(view, sign == ChangeSign::Up)
}

/// Column of the bar at logical index `idx` inside `area`, if it is visible
pub(super) fn bar_x(idx: usize, range: VisibleRange, area: Rect) -> Option<u16> {
    if area.width == 0 {
        return None;
    }
    let idx = idx as f64;
    if idx < range.from.floor() || idx > range.to.ceil() {
        return None;
    }
    let span = range.span().max(1.0);
    let rel = ((idx - range.from) / span).clamp(0.0, 1.0);
    let x = area.x + (rel * f64::from(area.width - 1)).round() as u16;
    Some(x.min(area.x + area.width - 1))
}

pub(super) fn value_to_y(value: f64, min: f64, span: f64, area: Rect) -> u16 {
    if area.height <= 1 {
        return area.y;
    }
    let normalized = ((value - min) / span).clamp(0.0, 1.0);
    let offset = ((1.0 - normalized) * f64::from(area.height - 1)).round() as u16;
    area.y + offset.min(area.height - 1)
}

pub(super) fn within(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}

pub(super) fn render_placeholder(frame: &mut Frame<'_>, area: Rect, text: &str) {
    frame.render_widget(
        Paragraph::new(text.to_string())
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center),
        area,
    );
}
