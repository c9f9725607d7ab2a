use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::super::ChartView;
use super::price_pane::draw_crosshair;
use super::{bar_x, direction_color, render_placeholder, sign_color, value_to_y, within};
use crate::chart::RenderSurface;
use crate::chart::overlay::format_volume;
use crate::ui::ViewState;

pub(super) fn render_volume_pane(
    frame: &mut Frame<'_>,
    area: Rect,
    view: &ViewState,
    chart: &ChartView<'_>,
) {
    let block = Block::default().title(" Volume ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let bars = chart.volume.data();
    let Some(range) = chart.volume.visible_range() else {
        render_placeholder(frame, inner, "");
        return;
    };
    if bars.is_empty() || inner.width < 12 || inner.height < 3 {
        render_placeholder(frame, inner, "");
        return;
    }

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);
    let overlay_area = vertical[0];

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(10), Constraint::Min(2)])
        .split(vertical[1]);
    let axis_area = horizontal[0];
    let chart_area = horizontal[1];

    // volume always scales from zero to the largest visible bar
    let max = bars
        .iter()
        .enumerate()
        .filter(|(idx, _)| bar_x(*idx, range, chart_area).is_some())
        .map(|(_, bar)| bar.value)
        .fold(0.0_f64, f64::max)
        .max(1.0);

    {
        let buffer = frame.buffer_mut();
        let bottom = chart_area.y + chart_area.height.saturating_sub(1);
        for (idx, bar) in bars.iter().enumerate() {
            let Some(x) = bar_x(idx, range, chart_area) else {
                continue;
            };
            let style = Style::default().fg(direction_color(view, bar.up));
            let top = value_to_y(bar.value, 0.0, max, chart_area);
            for y in top..=bottom {
                if within(chart_area, x, y) {
                    buffer.get_mut(x, y).set_style(style).set_symbol("█");
                }
            }
        }

        let label_style = Style::default().fg(Color::Gray);
        buffer.set_string(axis_area.x, axis_area.y, format_volume(max), label_style);
        buffer.set_string(axis_area.x, bottom, "0", label_style);
    }

    if let Some(time) = chart.volume.crosshair() {
        if let Some(idx) = bars.iter().position(|b| b.time == time) {
            draw_crosshair(frame, chart_area, idx, range);
        }
    }

    if let Some(overlay) = chart.volume.overlay() {
        let style = Style::default().fg(sign_color(view, overlay.sign));
        frame.render_widget(
            Paragraph::new(overlay.volume_text()).style(style),
            overlay_area,
        );
    }
}
