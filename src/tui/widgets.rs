use crate::results::Summary;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
    Frame,
};

/// Single-colour task progress bar with a `p% (done/total)` caption
pub struct TaskProgress {
    percent: u8,
    caption: String,
    visible: bool,
}

impl TaskProgress {
    pub fn new(percent: u8, caption: String, visible: bool) -> Self {
        Self {
            percent: percent.min(100),
            caption,
            visible,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Progress");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if !self.visible {
            return;
        }

        let caption_width = self.caption.chars().count() + 1;
        let bar_width = (inner.width as usize)
            .saturating_sub(2)
            .saturating_sub(caption_width);
        if bar_width == 0 {
            return;
        }

        let filled = bar_width * self.percent as usize / 100;
        let spans = vec![
            Span::styled("█".repeat(filled), Style::default().fg(Color::Green)),
            Span::styled(
                "░".repeat(bar_width - filled),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw(format!(" {}", self.caption)),
        ];

        let bar_area = Rect {
            x: inner.x + 1,
            y: inner.y,
            width: inner.width.saturating_sub(2),
            height: 1,
        };
        frame.render_widget(Line::from(spans), bar_area);
    }
}

/// Segmented bar of the reconciled summary counts
pub struct SummaryBar {
    segments: Vec<(usize, Color, &'static str)>,
    total: usize,
}

impl SummaryBar {
    pub fn new(summary: Option<Summary>) -> Self {
        match summary {
            Some(Summary::Scan(s)) => Self {
                segments: vec![
                    (s.compatible, Color::Green, "Direct Play"),
                    (s.incompatible, Color::Yellow, "Needs Attention"),
                    (s.errors, Color::Red, "Errors"),
                ],
                total: s.total,
            },
            Some(Summary::Fix(s)) => Self {
                segments: vec![
                    (s.success, Color::Green, "Success"),
                    (s.failed, Color::Red, "Failed"),
                    (s.skipped, Color::Blue, "Skipped"),
                ],
                total: s.total,
            },
            None => Self {
                segments: Vec::new(),
                total: 0,
            },
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Summary");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.segments.is_empty() {
            let placeholder = Line::from(Span::styled(
                "Summary will appear here.",
                Style::default().fg(Color::DarkGray),
            ));
            frame.render_widget(placeholder, inner);
            return;
        }

        let bar_width = inner.width.saturating_sub(2) as usize;
        if bar_width > 0 && self.total > 0 {
            let mut spans = Vec::new();
            let mut filled = 0;
            for (count, color, _) in &self.segments {
                let width = count * bar_width / self.total;
                if width > 0 {
                    spans.push(Span::styled("█".repeat(width), Style::default().fg(*color)));
                    filled += width;
                }
            }
            let empty = bar_width.saturating_sub(filled);
            if empty > 0 {
                spans.push(Span::styled(
                    "░".repeat(empty),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            let bar_area = Rect {
                x: inner.x + 1,
                y: inner.y,
                width: bar_width as u16,
                height: 1,
            };
            frame.render_widget(Line::from(spans), bar_area);
        }

        if inner.height > 1 {
            let mut legend = Vec::new();
            for (count, color, label) in &self.segments {
                legend.push(Span::styled("● ", Style::default().fg(*color)));
                legend.push(Span::raw(format!("{}: {} ", label, count)));
            }
            legend.push(Span::raw(format!("| Total: {}", self.total)));

            let legend_area = Rect {
                x: inner.x + 1,
                y: inner.y + 1,
                width: inner.width.saturating_sub(2),
                height: 1,
            };
            frame.render_widget(Line::from(legend), legend_area);
        }
    }
}

pub struct RowLegend;

impl RowLegend {
    pub fn render(frame: &mut Frame, area: Rect) {
        let legend = Line::from(vec![
            Span::styled("[✓]", Style::default().fg(Color::Green)),
            Span::raw(" Direct Play / Fixed | "),
            Span::styled("[~]", Style::default().fg(Color::Yellow)),
            Span::raw(" Needs Attention | "),
            Span::styled("[○]", Style::default().fg(Color::Blue)),
            Span::raw(" Skipped | "),
            Span::styled("[!]", Style::default().fg(Color::Red)),
            Span::raw(" Error / Failed"),
        ]);

        frame.render_widget(legend, area);
    }
}
