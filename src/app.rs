use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::calendar::{intensity_level, month_labels, ContributionCalendar};
use crate::config::Config;
use crate::event::{EventKind, NormalizedEvent};
use crate::feed::{detail_lines, format_day_label, group_by_day, SpanStyle};

/// Messages sent by the background fetch tasks into the UI loop.
#[derive(Debug)]
pub enum FeedEvent {
    ActivityLoaded(Vec<NormalizedEvent>),
    ActivityFailed(String),
    CalendarLoaded(ContributionCalendar),
    CalendarFailed(String),
}

/// Lifecycle of one fetchable view: idle until first requested, then
/// loading, then either loaded or failed. An aborted fetch never reports,
/// so the state simply stays where it was.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        LoadState::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Feed,
    Calendar,
}

pub struct App {
    pub should_quit: bool,
    pub config: Config,
    pub username: String,
    pub view: View,
    pub feed: LoadState<Vec<NormalizedEvent>>,
    pub calendar: LoadState<ContributionCalendar>,
    pub group_by_day: bool,
    pub show_details: bool,
    pub scroll_offset: usize,
}

impl App {
    pub fn new(config: Config, username: String) -> App {
        let group_by_day = config.ui.group_by_day;
        let show_details = config.ui.show_details;
        App {
            should_quit: false,
            config,
            username,
            view: View::Feed,
            feed: LoadState::Idle,
            calendar: LoadState::Idle,
            group_by_day,
            show_details,
            scroll_offset: 0,
        }
    }

    pub fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::ActivityLoaded(events) => {
                self.feed = LoadState::Loaded(events);
                self.scroll_offset = 0;
            }
            FeedEvent::ActivityFailed(msg) => {
                self.feed = LoadState::Failed(msg);
                self.scroll_offset = 0;
            }
            FeedEvent::CalendarLoaded(calendar) => {
                self.calendar = LoadState::Loaded(calendar);
            }
            FeedEvent::CalendarFailed(msg) => {
                self.calendar = LoadState::Failed(msg);
            }
        }
    }

    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            View::Feed => View::Calendar,
            View::Calendar => View::Feed,
        };
        self.scroll_offset = 0;
    }

    pub fn toggle_grouping(&mut self) {
        self.group_by_day = !self.group_by_day;
        self.scroll_offset = 0;
    }

    pub fn toggle_details(&mut self) {
        self.show_details = !self.show_details;
        self.scroll_offset = 0;
    }

    pub fn scroll_down(&mut self) {
        if self.scroll_offset + 1 < self.content_lines().len() {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        if self.scroll_offset > 0 {
            self.scroll_offset -= 1;
        }
    }

    fn kind_color(kind: EventKind) -> Color {
        match kind {
            EventKind::Push => Color::Green,
            EventKind::PullRequest => Color::Magenta,
            EventKind::Issues => Color::Yellow,
            EventKind::Create => Color::Cyan,
            EventKind::Fork => Color::Blue,
            EventKind::Delete => Color::Red,
            EventKind::Release => Color::LightGreen,
            EventKind::IssueComment => Color::LightYellow,
            EventKind::Watch => Color::LightMagenta,
            EventKind::PullRequestReview => Color::LightBlue,
        }
    }

    fn inline_style(style: SpanStyle) -> Style {
        match style {
            SpanStyle::Plain => Style::default(),
            SpanStyle::Bold => Style::default().add_modifier(Modifier::BOLD),
            SpanStyle::Italic => Style::default().add_modifier(Modifier::ITALIC),
            SpanStyle::BoldItalic => {
                Style::default().add_modifier(Modifier::BOLD | Modifier::ITALIC)
            }
            SpanStyle::Code => Style::default().fg(Color::Yellow),
            SpanStyle::Strike => Style::default().add_modifier(Modifier::CROSSED_OUT),
        }
    }

    fn level_color(level: u8) -> Color {
        match level {
            0 => Color::DarkGray,
            1 => Color::Rgb(14, 68, 41),
            2 => Color::Rgb(0, 109, 50),
            3 => Color::Rgb(38, 166, 65),
            _ => Color::Rgb(57, 211, 83),
        }
    }

    fn entry_lines(&self, event: &NormalizedEvent, show_date: bool, lines: &mut Vec<Line<'static>>) {
        let tag = format!("[{}]", event.kind.label());
        let mut spans = vec![
            Span::raw("  "),
            Span::styled(tag, Style::default().fg(Self::kind_color(event.kind))),
            Span::raw(" "),
            Span::raw(event.title().unwrap_or("(pending)").to_string()),
        ];
        if show_date {
            let today = Utc::now().date_naive();
            spans.push(Span::styled(
                format!("  {}", format_day_label(&event.date, today)),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));

        if self.show_details {
            for detail in event.details() {
                for detail_line in detail_lines(detail) {
                    let mut spans = vec![Span::raw("      ")];
                    if detail_line.list_item {
                        spans.push(Span::styled("• ", Style::default().fg(Color::DarkGray)));
                    }
                    for inline in detail_line.spans {
                        spans.push(Span::styled(inline.text, Self::inline_style(inline.style)));
                    }
                    lines.push(Line::from(spans));
                }
            }
        }
    }

    fn feed_lines(&self) -> Vec<Line<'static>> {
        match &self.feed {
            LoadState::Idle | LoadState::Loading => {
                vec![Line::from("[ ] Fetching activity…")]
            }
            LoadState::Failed(msg) => vec![Line::from(Span::styled(
                format!("[ERR] {}", msg),
                Style::default().fg(Color::Red),
            ))],
            LoadState::Loaded(events) if events.is_empty() => {
                vec![Line::from("No recent activity found.")]
            }
            LoadState::Loaded(events) => {
                let mut lines = Vec::new();
                if self.group_by_day {
                    let today = Utc::now().date_naive();
                    for group in group_by_day(events, today) {
                        lines.push(Line::from(Span::styled(
                            group.label.clone(),
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        )));
                        for event in &group.events {
                            self.entry_lines(event, false, &mut lines);
                        }
                        lines.push(Line::from("")); // Empty line between days
                    }
                } else {
                    for event in events {
                        self.entry_lines(event, true, &mut lines);
                    }
                }
                lines
            }
        }
    }

    fn calendar_lines(&self) -> Vec<Line<'static>> {
        match &self.calendar {
            LoadState::Idle | LoadState::Loading => {
                vec![Line::from("[ ] Fetching contributions…")]
            }
            LoadState::Failed(msg) => vec![Line::from(Span::styled(
                format!("[ERR] {}", msg),
                Style::default().fg(Color::Red),
            ))],
            LoadState::Loaded(calendar) => {
                let mut lines = Vec::new();
                lines.push(Line::from(Span::styled(
                    format!("{} contributions in the last year", calendar.total_contributions),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(""));

                // Month labels, positioned over their first week column.
                const GUTTER: usize = 4;
                let mut header = String::new();
                for (label, week_index) in month_labels(&calendar.weeks) {
                    let col = GUTTER + week_index * 2;
                    if col >= header.len() {
                        header.push_str(&" ".repeat(col - header.len()));
                        header.push_str(&label);
                    }
                }
                lines.push(Line::from(header));

                let max = calendar.max_daily_count();
                let day_labels = ["", "Mon", "", "Wed", "", "Fri", ""];
                for (row, day_label) in day_labels.iter().enumerate() {
                    let mut spans = vec![Span::raw(format!("{:<4}", day_label))];
                    for week in &calendar.weeks {
                        match week.days.get(row) {
                            Some(day) => {
                                let level = intensity_level(day.count, max);
                                spans.push(Span::styled(
                                    "■ ",
                                    Style::default().fg(Self::level_color(level)),
                                ));
                            }
                            None => spans.push(Span::raw("  ")),
                        }
                    }
                    lines.push(Line::from(spans));
                }

                lines.push(Line::from(""));
                let mut legend = vec![Span::raw("Less ")];
                for level in 0..=4 {
                    legend.push(Span::styled(
                        "■ ",
                        Style::default().fg(Self::level_color(level)),
                    ));
                }
                legend.push(Span::raw("More"));
                lines.push(Line::from(legend));
                lines
            }
        }
    }

    fn content_lines(&self) -> Vec<Line<'static>> {
        match self.view {
            View::Feed => self.feed_lines(),
            View::Calendar => self.calendar_lines(),
        }
    }

    pub fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Min(1),    // Main content
                Constraint::Length(3), // Footer
            ])
            .split(f.area());

        let count = match &self.feed {
            LoadState::Loaded(events) => format!("    {} events", events.len()),
            _ => String::new(),
        };
        let title = Paragraph::new(format!("ghgrip    @{}{}", self.username, count))
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        f.render_widget(title, chunks[0]);

        let content_lines = self.content_lines();

        // Apply scrolling: calculate visible area and slice content
        let available_height = chunks[1].height.saturating_sub(2) as usize; // Minus borders
        let visible_lines = if content_lines.len() > available_height && available_height > 0 {
            let start = self.scroll_offset.min(content_lines.len().saturating_sub(1));
            let end = (start + available_height).min(content_lines.len());
            content_lines[start..end].to_vec()
        } else {
            content_lines
        };

        let pane_title = match self.view {
            View::Feed => "Activity",
            View::Calendar => "Contributions",
        };
        let main_content = Paragraph::new(visible_lines)
            .block(Block::default().borders(Borders::ALL).title(pane_title))
            .style(Style::default().fg(Color::White));
        f.render_widget(main_content, chunks[1]);

        let footer = Paragraph::new(Line::from(vec![
            Span::styled("j/k", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" scroll  "),
            Span::styled("g", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" group  "),
            Span::styled("d", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" details  "),
            Span::styled("Tab", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" calendar  "),
            Span::styled("r", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" refresh  "),
            Span::styled("q", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" quit"),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray));
        f.render_widget(footer, chunks[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Summary;
    use chrono::TimeZone;

    fn app() -> App {
        App::new(Config::default(), "octocat".to_string())
    }

    fn sample_event(id: &str) -> NormalizedEvent {
        NormalizedEvent {
            id: id.to_string(),
            kind: EventKind::Watch,
            repo: "user/repo".to_string(),
            date: Utc.with_ymd_and_hms(2026, 2, 15, 10, 0, 0).unwrap(),
            summary: Summary::Ready {
                title: "Starred user/repo".to_string(),
                details: Vec::new(),
            },
        }
    }

    #[test]
    fn test_app_new() {
        let app = app();
        assert!(!app.should_quit);
        assert_eq!(app.view, View::Feed);
        assert_eq!(app.feed, LoadState::Idle);
        assert_eq!(app.calendar, LoadState::Idle);
        assert!(app.group_by_day);
        assert_eq!(app.scroll_offset, 0);
    }

    #[test]
    fn test_apply_activity_transitions() {
        let mut app = app();
        app.feed = LoadState::Loading;
        app.scroll_offset = 3;

        app.apply(FeedEvent::ActivityLoaded(vec![sample_event("1")]));
        assert!(matches!(&app.feed, LoadState::Loaded(events) if events.len() == 1));
        assert_eq!(app.scroll_offset, 0);

        app.apply(FeedEvent::ActivityFailed("GitHub API returned HTTP 404".to_string()));
        assert!(matches!(&app.feed, LoadState::Failed(msg) if msg.contains("404")));
    }

    #[test]
    fn test_empty_success_and_error_render_differently() {
        let mut app = app();

        app.apply(FeedEvent::ActivityLoaded(Vec::new()));
        let empty_lines = app.feed_lines();
        assert_eq!(empty_lines.len(), 1);
        assert!(empty_lines[0].to_string().contains("No recent activity"));

        app.apply(FeedEvent::ActivityFailed("boom".to_string()));
        let error_lines = app.feed_lines();
        assert!(error_lines[0].to_string().starts_with("[ERR]"));
    }

    #[test]
    fn test_toggle_view_and_grouping() {
        let mut app = app();
        app.toggle_view();
        assert_eq!(app.view, View::Calendar);
        app.toggle_view();
        assert_eq!(app.view, View::Feed);

        assert!(app.group_by_day);
        app.toggle_grouping();
        assert!(!app.group_by_day);
    }

    #[test]
    fn test_scroll_bounds() {
        let mut app = app();
        app.apply(FeedEvent::ActivityLoaded(vec![
            sample_event("1"),
            sample_event("2"),
            sample_event("3"),
        ]));

        app.scroll_up();
        assert_eq!(app.scroll_offset, 0);

        let max_lines = app.content_lines().len();
        for _ in 0..max_lines + 5 {
            app.scroll_down();
        }
        assert!(app.scroll_offset < max_lines);
    }

    #[test]
    fn test_grouped_feed_has_day_header() {
        let mut app = app();
        app.apply(FeedEvent::ActivityLoaded(vec![sample_event("1")]));

        let grouped: Vec<String> = app.feed_lines().iter().map(|l| l.to_string()).collect();
        assert!(grouped.iter().any(|l| l.starts_with("Feb 15")));

        app.toggle_grouping();
        let flat: Vec<String> = app.feed_lines().iter().map(|l| l.to_string()).collect();
        assert!(!flat.iter().any(|l| l.starts_with("Feb 15")));
        assert!(flat[0].contains("[STAR] Starred user/repo"));
    }

    #[test]
    fn test_calendar_states() {
        let mut app = app();
        app.view = View::Calendar;
        assert!(app.calendar_lines()[0].to_string().contains("Fetching"));

        app.apply(FeedEvent::CalendarFailed("GitHub token not configured".to_string()));
        assert!(app.calendar_lines()[0].to_string().starts_with("[ERR]"));

        let calendar = ContributionCalendar {
            total_contributions: 42,
            weeks: Vec::new(),
        };
        app.apply(FeedEvent::CalendarLoaded(calendar));
        assert!(app.calendar_lines()[0].to_string().contains("42 contributions"));
    }
}
