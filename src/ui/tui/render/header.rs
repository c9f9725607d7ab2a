use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use super::super::ChartView;
use crate::feed::ConnectionStatus;
use crate::market_data::Timeframe;
use crate::ui::ViewState;

pub(super) fn render_header(
    frame: &mut Frame<'_>,
    area: Rect,
    view: &ViewState,
    chart: &ChartView<'_>,
) {
    let mut spans = Vec::new();

    for (idx, symbol) in view.symbols.iter().enumerate() {
        let style = if idx == view.selected_symbol {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", symbol), style));
    }
    spans.push(Span::raw("│"));

    for timeframe in Timeframe::ALL {
        let label = if timeframe == Timeframe::Minute {
            format!(" {}분 ", view.tic_scope)
        } else {
            format!(" {} ", timeframe.label())
        };
        let style = if timeframe == view.timeframe {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(label, style));
    }
    spans.push(Span::raw(" "));

    let status = match view.connection.status {
        ConnectionStatus::Connected => {
            Span::styled("● Connected ", Style::default().fg(Color::Green))
        }
        ConnectionStatus::Connecting => {
            Span::styled("● Connecting ", Style::default().fg(Color::Yellow))
        }
        ConnectionStatus::Disconnected => {
            Span::styled("● Disconnected ", Style::default().fg(Color::Red))
        }
    };
    spans.push(status);

    spans.push(Span::styled(
        format!(
            "Ticks: {} ({:.1}/s) | Fetch p50/p95: {}/{}ms ",
            view.connection.ticks_applied,
            view.connection.ticks_per_second,
            view.connection.fetch_latency_p50,
            view.connection.fetch_latency_p95
        ),
        Style::default().fg(Color::Gray),
    ));

    if chart.loading {
        spans.push(Span::styled(
            "LOADING",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    } else if chart.loading_older {
        spans.push(Span::styled("LOADING OLDER", Style::default().fg(Color::Yellow)));
    }

    let title = match chart.selection {
        Some(selection) => format!(" {} · {} ", selection.symbol, selection.timeframe),
        None => " stockchart ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let paragraph = Paragraph::new(vec![Line::from(spans)])
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
