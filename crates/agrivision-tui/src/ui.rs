//! Dashboard rendering.
//!
//! Pure presentation: every function reads a [`DashboardViewState`] snapshot
//! and paints widgets; nothing here mutates state.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{
    BarChart, Block, Borders, Cell, Gauge, Paragraph, Row, Sparkline, Table, Tabs,
};

use agrivision_core::dashboard::{
    DashboardTab, DashboardViewState, average_yield, crop_distribution, latest,
};
use agrivision_core::prediction::PredictionRecord;

use crate::fixtures::{CROP_EVENTS, FIELDS, HARVESTS, ROTATIONS};

const ACCENT: Color = Color::Green;

fn crop_color(crop: &str) -> Color {
    match crop {
        "Wheat" => Color::Yellow,
        "Maize" => Color::Green,
        "Rice" => Color::Blue,
        _ => Color::Magenta,
    }
}

pub fn draw(frame: &mut Frame, state: &DashboardViewState, email: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(3), // tab bar
            Constraint::Min(10),   // body
            Constraint::Length(1), // footer
        ])
        .split(frame.size());

    draw_header(frame, state, email, chunks[0]);
    draw_tabs(frame, state, chunks[1]);
    match state.selected_tab {
        DashboardTab::Overview => draw_overview(frame, state, chunks[2]),
        DashboardTab::Predictions => draw_predictions(frame, state, chunks[2]),
        DashboardTab::Analytics => draw_analytics(frame, state, chunks[2]),
        DashboardTab::Map => draw_map(frame, chunks[2]),
        DashboardTab::Calendar => draw_calendar(frame, chunks[2]),
    }
    draw_footer(frame, chunks[3]);
}

fn draw_header(frame: &mut Frame, state: &DashboardViewState, email: &str, area: Rect) {
    let sync = if state.loading {
        Span::styled("  syncing…", Style::default().fg(Color::Cyan))
    } else {
        Span::raw("")
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " AgriVision ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("Smart Agriculture Dashboard", Style::default().fg(Color::DarkGray)),
        sync,
    ]))
    .block(
        Block::default().borders(Borders::ALL).title(Line::from(vec![
            Span::raw(format!(" {} ", state.selected_tab.title())),
            Span::styled(
                format!("· {email} "),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!("· {} updates ", state.notifications),
                Style::default().fg(Color::Cyan),
            ),
        ])),
    );
    frame.render_widget(header, area);
}

fn draw_tabs(frame: &mut Frame, state: &DashboardViewState, area: Rect) {
    let titles: Vec<Line> = DashboardTab::ALL
        .iter()
        .map(|tab| Line::from(tab.label()))
        .collect();
    let selected = DashboardTab::ALL
        .iter()
        .position(|tab| *tab == state.selected_tab)
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, area);
}

fn draw_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(Span::styled(
        " Tab/←→ switch · 1-5 jump · r refresh · o sign out · q quit",
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(footer, area);
}

fn draw_overview(frame: &mut Frame, state: &DashboardViewState, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(10),
            Constraint::Length(8),
        ])
        .split(area);

    draw_stat_cards(frame, state, rows[0]);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);
    draw_yield_chart(frame, &state.records, charts[0]);
    draw_distribution(frame, &state.records, charts[1]);

    draw_recent_activity(frame, &state.records, rows[2]);
}

fn draw_stat_cards(frame: &mut Frame, state: &DashboardViewState, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    let distribution = crop_distribution(&state.records);
    let latest_record = latest(&state.records);

    stat_card(
        frame,
        cards[0],
        "Total Predictions",
        state.total_predictions().to_string(),
        format!("{} crop types tracked", distribution.len()),
        Color::Blue,
    );
    stat_card(
        frame,
        cards[1],
        "Latest Yield",
        latest_record
            .map(|r| format!("{:.2} t/ha", r.yield_tons_per_ha))
            .unwrap_or_else(|| "N/A".to_string()),
        latest_record
            .map(|r| format!("{:.1}% confidence", r.confidence_percent()))
            .unwrap_or_default(),
        ACCENT,
    );
    let most_frequent = distribution
        .iter()
        .max_by_key(|(_, count)| *count)
        .map(|(crop, _)| crop.clone());
    stat_card(
        frame,
        cards[2],
        "Latest Crop",
        latest_record
            .map(|r| r.crop_type.clone())
            .unwrap_or_else(|| "N/A".to_string()),
        most_frequent
            .map(|crop| format!("most frequent: {crop}"))
            .unwrap_or_default(),
        Color::Yellow,
    );
    stat_card(
        frame,
        cards[3],
        "Average Yield",
        format!("{:.2} t/ha", average_yield(&state.records)),
        format!("across {} records", state.total_predictions()),
        Color::Magenta,
    );
}

fn stat_card(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    value: String,
    trend: String,
    color: Color,
) {
    let card = Paragraph::new(vec![
        Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(trend, Style::default().fg(Color::DarkGray))),
    ])
    .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(card, area);
}

fn draw_yield_chart(frame: &mut Frame, records: &[PredictionRecord], area: Rect) {
    let bars: Vec<(String, u64)> = records
        .iter()
        .take(8)
        .map(|r| {
            let label = r.crop_type.chars().take(5).collect::<String>();
            (label, r.yield_tons_per_ha.round() as u64)
        })
        .collect();
    let data: Vec<(&str, u64)> = bars.iter().map(|(label, v)| (label.as_str(), *v)).collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Yield by Crop Type (t/ha)"),
        )
        .data(&data)
        .bar_width(7)
        .bar_gap(1)
        .bar_style(Style::default().fg(ACCENT))
        .value_style(Style::default().fg(Color::Black).bg(ACCENT));
    frame.render_widget(chart, area);
}

fn draw_distribution(frame: &mut Frame, records: &[PredictionRecord], area: Rect) {
    let distribution = crop_distribution(records);
    let total = records.len().max(1);

    let lines: Vec<Line> = distribution
        .iter()
        .map(|(crop, count)| {
            let percent = *count as f64 / total as f64 * 100.0;
            let bar_len = (percent / 5.0).round() as usize;
            Line::from(vec![
                Span::styled(
                    format!("{crop:<10}"),
                    Style::default().fg(crop_color(crop)),
                ),
                Span::raw("█".repeat(bar_len)),
                Span::styled(
                    format!(" {count} ({percent:.0}%)"),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();

    let body = if lines.is_empty() {
        Paragraph::new("no predictions yet")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
    } else {
        Paragraph::new(lines)
    };
    frame.render_widget(
        body.block(Block::default().borders(Borders::ALL).title("Crop Distribution")),
        area,
    );
}

fn draw_recent_activity(frame: &mut Frame, records: &[PredictionRecord], area: Rect) {
    let lines: Vec<Line> = records
        .iter()
        .take(5)
        .map(|r| {
            Line::from(vec![
                Span::styled("● ", Style::default().fg(crop_color(&r.crop_type))),
                Span::raw(format!("{} prediction recorded", r.crop_type)),
                Span::styled(
                    format!(
                        "  {:.2} t/ha · {:.1}% · {}",
                        r.yield_tons_per_ha,
                        r.confidence_percent(),
                        r.created_at.format("%H:%M:%S")
                    ),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();

    let activity = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Recent Activity"));
    frame.render_widget(activity, area);
}

fn draw_predictions(frame: &mut Frame, state: &DashboardViewState, area: Rect) {
    let header = Row::new(["Crop", "Yield", "Confidence", "Date"])
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = state
        .records
        .iter()
        .map(|r| {
            let filled = (r.confidence * 10.0).round() as usize;
            let confidence_bar = format!(
                "{}{} {:.1}%",
                "█".repeat(filled),
                "░".repeat(10usize.saturating_sub(filled)),
                r.confidence_percent()
            );
            Row::new(vec![
                Cell::from(Span::styled(
                    r.crop_type.clone(),
                    Style::default().fg(crop_color(&r.crop_type)),
                )),
                Cell::from(format!("{:.2} t/ha", r.yield_tons_per_ha)),
                Cell::from(confidence_bar),
                Cell::from(r.created_at.format("%Y-%m-%d %H:%M").to_string()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Recent Predictions ({})", state.records.len())),
    );
    frame.render_widget(table, area);
}

fn draw_analytics(frame: &mut Frame, state: &DashboardViewState, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    // Oldest to newest, so the trend reads left to right.
    let trend: Vec<u64> = state
        .records
        .iter()
        .rev()
        .map(|r| r.yield_tons_per_ha.round() as u64)
        .collect();
    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Yield Trend (t/ha, oldest → newest)"),
        )
        .data(&trend)
        .style(Style::default().fg(ACCENT));
    frame.render_widget(sparkline, rows[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    draw_health_indicators(frame, panels[0]);
    draw_resource_allocation(frame, panels[1]);
}

fn draw_health_indicators(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Crop Health Indicators");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let indicators: [(&str, u16); 4] = [
        ("Soil Moisture", 85),
        ("Nutrients", 78),
        ("Pest Control", 92),
        ("Growth Rate", 81),
    ];
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2); 4])
        .split(inner);

    for ((label, percent), slot) in indicators.iter().zip(slots.iter()) {
        let gauge = Gauge::default()
            .block(Block::default().title(*label))
            .gauge_style(Style::default().fg(ACCENT))
            .percent(*percent);
        frame.render_widget(gauge, *slot);
    }
}

fn draw_resource_allocation(frame: &mut Frame, area: Rect) {
    let allocation: [(&str, u16, Color); 4] = [
        ("Water", 35, Color::Blue),
        ("Fertilizer", 25, Color::Green),
        ("Labor", 20, Color::Yellow),
        ("Equipment", 20, Color::Magenta),
    ];
    let lines: Vec<Line> = allocation
        .iter()
        .map(|(label, percent, color)| {
            Line::from(vec![
                Span::styled(format!("{label:<12}"), Style::default().fg(*color)),
                Span::raw("█".repeat(*percent as usize / 2)),
                Span::styled(format!(" {percent}%"), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Resource Allocation"),
    );
    frame.render_widget(panel, area);
}

fn draw_map(frame: &mut Frame, area: Rect) {
    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Field Locations"))
        .x_bounds([30.02, 30.08])
        .y_bounds([-1.96, -1.92])
        .paint(|ctx| {
            for field in &FIELDS {
                ctx.draw(&Points {
                    coords: &[(field.lng, field.lat)],
                    color: crop_color(field.crop),
                });
                ctx.print(
                    field.lng,
                    field.lat,
                    Line::from(Span::styled(
                        format!("◉ {}", field.name),
                        Style::default().fg(crop_color(field.crop)),
                    )),
                );
            }
        });
    frame.render_widget(canvas, panels[0]);

    let lines: Vec<Line> = FIELDS
        .iter()
        .flat_map(|field| {
            vec![
                Line::from(Span::styled(
                    field.name,
                    Style::default()
                        .fg(crop_color(field.crop))
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("  crop: {} · area: {} ha", field.crop, field.area_ha),
                    Style::default().fg(Color::DarkGray),
                )),
                Line::from(Span::styled(
                    format!("  {:.4}, {:.4}", field.lat, field.lng),
                    Style::default().fg(Color::DarkGray),
                )),
                Line::from(""),
            ]
        })
        .collect();
    let details = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Fields"));
    frame.render_widget(details, panels[1]);
}

fn draw_calendar(frame: &mut Frame, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(10)])
        .split(area);

    let lines: Vec<Line> = CROP_EVENTS
        .iter()
        .map(|event| {
            let range = if event.start_date() == event.end_date() {
                event.start_date().format("%b %e, %Y").to_string()
            } else {
                format!(
                    "{} - {}",
                    event.start_date().format("%b %e"),
                    event.end_date().format("%b %e, %Y")
                )
            };
            Line::from(vec![
                Span::styled("▌ ", Style::default().fg(crop_color(event.crop))),
                Span::styled(event.title, Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  {range} · {}", event.field),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();
    let upcoming = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Crop Management Calendar"),
    );
    frame.render_widget(upcoming, rows[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let rotation_lines: Vec<Line> = ROTATIONS
        .iter()
        .map(|r| {
            Line::from(vec![
                Span::raw(format!("{:<12}", r.field)),
                Span::styled(
                    format!("{} → {} ({})", r.current, r.next, r.when),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(rotation_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Crop Rotation Schedule"),
        ),
        panels[0],
    );

    let harvest_lines: Vec<Line> = HARVESTS
        .iter()
        .map(|h| {
            Line::from(vec![
                Span::styled("● ", Style::default().fg(crop_color(h.crop))),
                Span::raw(format!("{} Harvest", h.crop)),
                Span::styled(
                    format!("  {} · {}", h.field, h.window),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(harvest_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Harvest Timeline"),
        ),
        panels[1],
    );
}
