//! Ratatui layout and widget rendering for the taxi dashboard.

use std::collections::BTreeMap;

use chrono::DateTime;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph,
};
use ratatui::Frame;

use fareboard_viz::binder::RenderedOutput;
use fareboard_viz::chart::{ChartData, MapLayer};
use fareboard_viz::spec::ChartKind;
use fareboard_warehouse::local::decode_cell_center;

use crate::app::{App, Page};

const SERIES_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::Blue,
    Color::Red,
];

/// Draw the entire dashboard.
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Status
            Constraint::Min(10),   // Content
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_status(f, app, chunks[1]);
    draw_content(f, app, chunks[2]);
    draw_footer(f, app, chunks[3]);
}

/// Header: app title, current page, busy marker.
fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(
            " FAREBOARD ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(app.page.title(), Style::default().fg(Color::White)),
    ];
    if app.busy {
        spans.push(Span::styled(
            "  running...",
            Style::default().fg(Color::Yellow),
        ));
    }
    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(header, area);
}

/// Status line: last query/export outcome.
fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let status = Paragraph::new(Line::from(vec![Span::styled(
        format!(" {}", app.status),
        Style::default().fg(Color::DarkGray),
    )]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

/// Content: SQL text, overview text, or the bound visualization.
fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    if app.show_sql {
        draw_sql(f, app, area);
        return;
    }
    match app.current_output() {
        None => draw_overview(f, app, area),
        Some(Ok(RenderedOutput::Chart(chart))) => match chart.kind {
            ChartKind::Line => draw_line_chart(f, &chart, area),
            ChartKind::GroupedBar => draw_grouped_bars(f, &chart, area),
            ChartKind::StackedArea => draw_stacked_area(f, &chart, area),
        },
        Some(Ok(RenderedOutput::Map(layer))) => draw_map(f, &layer, area),
        Some(Ok(RenderedOutput::Prompt(msg))) => draw_message(f, &msg, Color::Yellow, area),
        Some(Err(e)) => draw_message(f, &e.to_string(), Color::Red, area),
    }
}

/// The SQL behind the current page, for the curious.
fn draw_sql(f: &mut Frame, app: &App, area: Rect) {
    let def = app.current_query();
    let lines: Vec<Line> = def
        .sql
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Gray))))
        .collect();
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(format!(" SQL: {} ", def.name))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(paragraph, area);
}

/// Overview page: dataset shape as text.
fn draw_overview(f: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .overview_lines()
        .into_iter()
        .map(|l| Line::from(Span::styled(format!("  {l}"), Style::default().fg(Color::White))))
        .collect();
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(" DATASET OVERVIEW ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(paragraph, area);
}

fn draw_message(f: &mut Frame, msg: &str, color: Color, area: Rect) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        format!(" {msg}"),
        Style::default().fg(color),
    )))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

/// Multi-series line chart over the period axis.
fn draw_line_chart(f: &mut Frame, chart: &ChartData, area: Rect) {
    let (Some(x_bounds), Some(y_bounds)) = (chart.x_bounds(), chart.y_bounds()) else {
        draw_message(f, "Chart has no points.", Color::Yellow, area);
        return;
    };

    let datasets: Vec<Dataset> = chart
        .series
        .iter()
        .enumerate()
        .map(|(i, series)| {
            Dataset::default()
                .name(series.name.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                .data(&series.points)
        })
        .collect();

    let widget = Chart::new(datasets)
        .block(
            Block::default()
                .title(format!(" {} ", chart.title))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([x_bounds.0, x_bounds.1])
                .labels(x_labels(x_bounds)),
        )
        .y_axis(
            Axis::default()
                .title(chart.y_label.clone())
                .style(Style::default().fg(Color::DarkGray))
                .bounds([y_bounds.0.min(0.0), y_bounds.1])
                .labels(vec![
                    format!("{:.0}", y_bounds.0.min(0.0)),
                    format!("{:.0}", y_bounds.1),
                ]),
        );
    f.render_widget(widget, area);
}

/// Grouped bars: one group per period, one bar per series.
fn draw_grouped_bars(f: &mut Frame, chart: &ChartData, area: Rect) {
    // Pivot to period-major order. Dense frames make every series cover
    // every period, but absent combinations just draw a zero bar.
    let mut by_period: BTreeMap<i64, Vec<(usize, f64)>> = BTreeMap::new();
    for (i, series) in chart.series.iter().enumerate() {
        for &(x, y) in &series.points {
            by_period.entry(x as i64).or_default().push((i, y));
        }
    }
    if by_period.is_empty() {
        draw_message(f, "Chart has no points.", Color::Yellow, area);
        return;
    }

    let groups: Vec<(String, Vec<Bar>)> = by_period
        .iter()
        .map(|(day, bars)| {
            let group_bars = bars
                .iter()
                .map(|&(i, y)| {
                    Bar::default()
                        .value(y.max(0.0).round() as u64)
                        .text_value(format!("{y:.1}"))
                        .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                })
                .collect();
            (format_year(*day as f64), group_bars)
        })
        .collect();

    let mut widget = BarChart::default()
        .block(
            Block::default()
                .title(format!(" {} ", chart.title))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .bar_width(7)
        .bar_gap(1)
        .group_gap(3);
    for (label, bars) in &groups {
        widget = widget.data(BarGroup::default().label(Line::from(label.as_str())).bars(bars));
    }
    f.render_widget(widget, area);
}

/// Stacked areas drawn as cumulative lines, bottom series first.
fn draw_stacked_area(f: &mut Frame, chart: &ChartData, area: Rect) {
    let Some(x_bounds) = chart.x_bounds() else {
        draw_message(f, "Chart has no points.", Color::Yellow, area);
        return;
    };

    let mut running: BTreeMap<i64, f64> = BTreeMap::new();
    let mut stacked: Vec<(String, Vec<(f64, f64)>)> = Vec::new();
    for series in &chart.series {
        let mut points = Vec::with_capacity(series.points.len());
        for &(x, y) in &series.points {
            let total = running.entry(x as i64).or_insert(0.0);
            *total += y;
            points.push((x, *total));
        }
        stacked.push((series.name.clone(), points));
    }
    let y_max = running.values().copied().fold(1.0, f64::max);

    // Draw from the tallest stack down so lower bands stay visible.
    let datasets: Vec<Dataset> = stacked
        .iter()
        .enumerate()
        .rev()
        .map(|(i, (name, points))| {
            Dataset::default()
                .name(name.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                .data(points)
        })
        .collect();

    let widget = Chart::new(datasets)
        .block(
            Block::default()
                .title(format!(" {} ", chart.title))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([x_bounds.0, x_bounds.1])
                .labels(x_labels(x_bounds)),
        )
        .y_axis(
            Axis::default()
                .title(chart.y_label.clone())
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, y_max])
                .labels(vec!["0".to_string(), format!("{y_max:.0}")]),
        );
    f.render_widget(widget, area);
}

/// Pickup density: decoded cell centers on a canvas, hot cells red.
fn draw_map(f: &mut Frame, layer: &MapLayer, area: Rect) {
    let max_weight = layer.max_weight().max(1.0);
    let mut hot: Vec<(f64, f64)> = Vec::new();
    let mut warm: Vec<(f64, f64)> = Vec::new();
    let mut cool: Vec<(f64, f64)> = Vec::new();
    for cell in &layer.cells {
        let Some((lat, lng)) = decode_cell_center(&cell.cell) else {
            continue;
        };
        let share = cell.weight / max_weight;
        if share > 0.66 {
            hot.push((lng, lat));
        } else if share > 0.33 {
            warm.push((lng, lat));
        } else {
            cool.push((lng, lat));
        }
    }

    let center = layer.viewport;
    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(format!(
                    " {} ({} cells) ",
                    layer.title,
                    layer.cells.len()
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .x_bounds([center.longitude - 0.5, center.longitude + 0.5])
        .y_bounds([center.latitude - 0.4, center.latitude + 0.4])
        .paint(move |ctx| {
            ctx.draw(&Points {
                coords: &cool,
                color: Color::Green,
            });
            ctx.draw(&Points {
                coords: &warm,
                color: Color::Yellow,
            });
            ctx.draw(&Points {
                coords: &hot,
                color: Color::Red,
            });
        });
    f.render_widget(canvas, area);
}

/// Footer: keyboard shortcuts.
fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("Quit  "),
        Span::styled("[Tab] ", Style::default().fg(Color::Yellow)),
        Span::raw("Page  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("Run  "),
        Span::styled("[e] ", Style::default().fg(Color::Yellow)),
        Span::raw("Export  "),
        Span::styled("[s] ", Style::default().fg(Color::Yellow)),
        Span::raw("SQL  "),
    ];
    match app.page {
        Page::MonthlyKpi => {
            spans.push(Span::styled("[k] ", Style::default().fg(Color::Yellow)));
            spans.push(Span::raw(format!("Metric ({})", app.kpi_metric())));
        }
        Page::YearIndicator => {
            spans.push(Span::styled("[i] ", Style::default().fg(Color::Yellow)));
            spans.push(Span::raw("Indicator"));
        }
        _ => {}
    }
    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

/// Min/mid/max x-axis labels, days since epoch rendered as year-month.
fn x_labels(bounds: (f64, f64)) -> Vec<String> {
    let mid = (bounds.0 + bounds.1) / 2.0;
    vec![
        format_month(bounds.0),
        format_month(mid),
        format_month(bounds.1),
    ]
}

fn format_month(day: f64) -> String {
    format_day(day, "%Y-%m")
}

fn format_year(day: f64) -> String {
    format_day(day, "%Y")
}

fn format_day(day: f64, format: &str) -> String {
    DateTime::from_timestamp(day as i64 * 86_400, 0)
        .map(|ts| ts.format(format).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_formatting() {
        // 2021-01-01 is 18628 days after the epoch.
        assert_eq!(format_month(18_628.0), "2021-01");
        assert_eq!(format_year(18_628.0), "2021");
    }
}
