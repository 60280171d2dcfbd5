use crate::results::{FixOutcome, ResultFilter, ResultSet, ScanRow};
use crate::task::{TaskKind, TaskStatus};
use crate::tui::{
    state::{AppState, Status},
    widgets::{RowLegend, SummaryBar, TaskProgress},
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

/// Render the TUI (Elm Architecture - View)
pub fn render(frame: &mut Frame, state: &AppState) {
    // Clear the frame to prevent ghost characters
    frame.render_widget(
        Block::default().style(Style::default().bg(Color::Reset)),
        frame.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(4), // Status message
            Constraint::Length(3), // Progress
            Constraint::Length(4), // Summary
            Constraint::Length(1), // Row legend
            Constraint::Min(5),    // Results (responsive)
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state);
    render_status(frame, chunks[1], state);
    render_progress(frame, chunks[2], state);
    SummaryBar::new(state.summary).render(frame, chunks[3]);
    RowLegend::render(frame, chunks[4]);
    render_results(frame, chunks[5], state);
    render_footer(frame, chunks[6], state);
}

fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let title = match &state.status {
        Status::Idle => "playarr - Idle".to_string(),
        Status::Active(kind, TaskStatus::Cancelling) => {
            format!("playarr - Stopping {}...", kind)
        }
        Status::Active(kind, _) => format!("playarr - {}...", kind.activity()),
        Status::Done(kind, status) => format!("playarr - {} {}", kind.label(), status),
        Status::Error(_) => "playarr - Polling stopped".to_string(),
    };

    let context = format!(
        "  |  profile: {}  |  dir: {}",
        state.selected_profile().unwrap_or("<none>"),
        if state.directory.is_empty() {
            "<none>"
        } else {
            state.directory.as_str()
        }
    );

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(context, Style::default().fg(Color::Gray)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

fn render_status(frame: &mut Frame, area: Rect, state: &AppState) {
    let style = match state.status {
        Status::Error(_) | Status::Done(_, TaskStatus::Failed) => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let widget = Paragraph::new(state.status_message.as_str())
        .style(style)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(widget, area);
}

fn render_progress(frame: &mut Frame, area: Rect, state: &AppState) {
    let caption = format!(
        "{}% ({}/{})",
        state.progress,
        state.processed,
        state.total.unwrap_or(0)
    );
    TaskProgress::new(state.progress, caption, state.controls.progress_visible).render(frame, area);
}

fn render_results(frame: &mut Frame, area: Rect, state: &AppState) {
    let (all_label, attention_label) = state.filter_labels();
    let active = match state.filter {
        ResultFilter::All => &all_label,
        ResultFilter::NeedsAttention => &attention_label,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Results | {} | {}  [{}]", all_label, attention_label, active));
    let inner = block.inner(area);

    let max_width = inner.width.saturating_sub(2) as usize;
    let visible_lines = inner.height as usize;

    let items: Vec<ListItem> = match state.visible_results() {
        ResultSet::Informational(msg) => vec![ListItem::new(msg)],
        ResultSet::Empty => vec![ListItem::new(Span::styled(
            empty_placeholder(state),
            Style::default().fg(Color::DarkGray),
        ))],
        ResultSet::Scan(rows) => rows
            .iter()
            .skip(state.scroll_offset)
            .take(visible_lines)
            .map(|row| scan_item(row, max_width))
            .collect(),
        ResultSet::Fix(rows) => rows
            .iter()
            .skip(state.scroll_offset)
            .take(visible_lines)
            .map(|row| {
                let (symbol, color) = match row.status {
                    FixOutcome::Success => ("[✓]", Color::Green),
                    FixOutcome::Failed => ("[!]", Color::Red),
                    FixOutcome::Skipped => ("[○]", Color::Blue),
                };
                let text = truncate(
                    &format!("{} {}  {}", row.status.as_str(), row.path(), row.message),
                    max_width.saturating_sub(4),
                );
                ListItem::new(Line::from(vec![
                    Span::styled(symbol, Style::default().fg(color)),
                    Span::raw(format!(" {}", text)),
                ]))
            })
            .collect(),
    };

    let list = List::new(items)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(list, area);
}

fn scan_item(row: &ScanRow, max_width: usize) -> ListItem<'static> {
    let (symbol, color) = if row.is_errored() {
        ("[!]", Color::Red)
    } else if row.is_compatible {
        ("[✓]", Color::Green)
    } else {
        ("[~]", Color::Yellow)
    };

    let audio = row
        .audio_tracks
        .first()
        .map(|track| track.describe())
        .unwrap_or_else(|| "N/A".to_string());
    let text = format!(
        "{}  {}  {}  {}  {}",
        row.file_name(),
        row.container.as_deref().unwrap_or("N/A"),
        row.video_details.as_deref().unwrap_or("N/A"),
        audio,
        row.note()
    );

    ListItem::new(Line::from(vec![
        Span::styled(symbol, Style::default().fg(color)),
        Span::raw(format!(" {}", truncate(&text, max_width.saturating_sub(4)))),
    ]))
}

fn empty_placeholder(state: &AppState) -> &'static str {
    match (state.results_kind, state.filter) {
        (Some(TaskKind::Fix), _) => "No fix results available.",
        (_, ResultFilter::NeedsAttention) => "No items match 'Needs Attention' filter.",
        _ => "Scan results will appear here.",
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn render_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let controls = state.controls;
    let hints = [
        ("s", "Scan", controls.submit_enabled),
        ("p", "Profile", controls.submit_enabled),
        ("f", "Fix", controls.remediation_enabled),
        ("c", "Cancel", controls.cancel_enabled),
        ("a", "Filter", controls.filters_enabled),
        ("e", "Export", state.results.has_file_rows()),
        ("q", "Quit", true),
    ];

    let mut spans = Vec::new();
    for (i, (key, label, enabled)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" | "));
        }
        let key_style = if *enabled {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let label_style = if *enabled {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(format!(" {}", label), label_style));
    }

    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-much-longer-line", 10), "a-much-...");
    }
}
