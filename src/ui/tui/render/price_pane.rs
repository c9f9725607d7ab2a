use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::super::ChartView;
use super::{bar_x, direction_color, render_placeholder, sign_color, value_to_y, within};
use crate::chart::{CandlePoint, RenderSurface, VisibleRange};
use crate::chart::overlay::format_thousands;
use crate::ui::ViewState;

pub(super) fn render_price_pane(
    frame: &mut Frame<'_>,
    area: Rect,
    view: &ViewState,
    chart: &ChartView<'_>,
) {
    let block = Block::default().title(" Price ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(message) = chart.price.error() {
        frame.render_widget(
            Paragraph::new(message.to_string())
                .style(Style::default().fg(Color::Red))
                .alignment(ratatui::layout::Alignment::Center),
            inner,
        );
        return;
    }

    if inner.width < 12 || inner.height < 4 {
        render_placeholder(frame, inner, "Terminal too small");
        return;
    }

    let points = chart.price.data();
    let (Some(range), Some(values)) = (chart.price.visible_range(), chart.price.value_range())
    else {
        let text = if chart.loading { "Loading chart..." } else { "No chart data" };
        render_placeholder(frame, inner, text);
        return;
    };
    if points.is_empty() {
        render_placeholder(frame, inner, "No chart data");
        return;
    }

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(2)])
        .split(inner);
    let overlay_area = vertical[0];

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(10), Constraint::Min(2)])
        .split(vertical[1]);
    let axis_area = horizontal[0];
    let chart_area = horizontal[1];

    let span = (values.max - values.min).max(f64::EPSILON);
    draw_candlesticks(frame, chart_area, view, points, range, values.min, span);

    if let Some(time) = chart.price.crosshair() {
        if let Some(idx) = points.iter().position(|p| p.time == time) {
            draw_crosshair(frame, chart_area, idx, range);
        }
    }

    // Render value axis labels (max, mid, min)
    {
        let buffer = frame.buffer_mut();
        let label_style = Style::default().fg(Color::Gray);
        let labels = [
            (axis_area.y, values.max),
            (axis_area.y + axis_area.height / 2, (values.min + values.max) / 2.0),
            (axis_area.y + axis_area.height.saturating_sub(1), values.min),
        ];
        for (y, value) in labels {
            let label = format_axis_label(value, axis_area.width);
            buffer.set_string(axis_area.x, y, label, label_style);
        }
    }

    if let Some(overlay) = chart.price.overlay() {
        let style = Style::default().fg(sign_color(view, overlay.sign));
        let mut spans = vec![Span::styled(overlay.price_text(), style)];
        if !overlay.is_latest {
            spans.push(Span::styled(" ◆", Style::default().add_modifier(Modifier::DIM)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), overlay_area);
    }
}

fn draw_candlesticks(
    frame: &mut Frame<'_>,
    area: Rect,
    view: &ViewState,
    points: &[CandlePoint],
    range: VisibleRange,
    min: f64,
    span: f64,
) {
    if area.width < 2 || area.height < 2 {
        return;
    }

    let buffer = frame.buffer_mut();

    for (idx, point) in points.iter().enumerate() {
        let Some(x) = bar_x(idx, range, area) else {
            continue;
        };
        let style = Style::default().fg(direction_color(view, point.close >= point.open));

        let mut y_high = value_to_y(point.high, min, span, area);
        let mut y_low = value_to_y(point.low, min, span, area);
        if y_high > y_low {
            std::mem::swap(&mut y_high, &mut y_low);
        }
        for y in y_high..=y_low {
            if within(area, x, y) {
                buffer.get_mut(x, y).set_style(style).set_symbol("│");
            }
        }

        let mut y_open = value_to_y(point.open, min, span, area);
        let mut y_close = value_to_y(point.close, min, span, area);
        if y_open > y_close {
            std::mem::swap(&mut y_open, &mut y_close);
        }

        if y_open == y_close {
            if within(area, x, y_open) {
                buffer.get_mut(x, y_open).set_style(style).set_symbol("─");
            }
        } else {
            for y in y_open..=y_close {
                if within(area, x, y) {
                    buffer.get_mut(x, y).set_style(style).set_symbol("█");
                }
            }
        }
    }
}

pub(super) fn draw_crosshair(frame: &mut Frame<'_>, area: Rect, idx: usize, range: VisibleRange) {
    let Some(x) = bar_x(idx, range, area) else {
        return;
    };
    let buffer = frame.buffer_mut();
    for y in area.y..area.y + area.height {
        let cell = buffer.get_mut(x, y);
        if cell.symbol() == " " {
            cell.set_symbol("┆").set_style(Style::default().fg(Color::DarkGray));
        } else {
            cell.set_style(Style::default().add_modifier(Modifier::REVERSED));
        }
    }
}

fn format_axis_label(value: f64, width: u16) -> String {
    let mut label = format_thousands(value);
    let max_len = width as usize;
    if max_len > 0 && label.len() > max_len {
        label.truncate(max_len);
    }
    label
}
