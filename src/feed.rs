use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::event::NormalizedEvent;

/// A contiguous run of events sharing a calendar day. Grouping assumes the
/// input is already sorted; a day key that reappears after a different day
/// opens a new group instead of merging into the earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub day_key: String,
    pub label: String,
    pub events: Vec<NormalizedEvent>,
}

/// Partitions a chronologically ordered event list into day groups.
/// `today` anchors the year-suffix rule of the labels.
pub fn group_by_day(events: &[NormalizedEvent], today: NaiveDate) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();

    for event in events {
        let day_key = event.day_key();
        match groups.last_mut() {
            Some(group) if group.day_key == day_key => group.events.push(event.clone()),
            _ => groups.push(DayGroup {
                day_key,
                label: format_day_label(&event.date, today),
                events: vec![event.clone()],
            }),
        }
    }

    groups
}

/// Compact date label: "Jun 01" within the current year, "Jun 01, 2025"
/// otherwise.
pub fn format_day_label(date: &DateTime<Utc>, today: NaiveDate) -> String {
    if date.year() == today.year() {
        date.format("%b %d").to_string()
    } else {
        date.format("%b %d, %Y").to_string()
    }
}

/// Inline styles recognized by the markdown-lite tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Plain,
    BoldItalic,
    Bold,
    Italic,
    Code,
    Strike,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineSpan {
    pub style: SpanStyle,
    pub text: String,
}

impl InlineSpan {
    fn new(style: SpanStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

// Pattern order matters: longest/most specific first breaks index ties.
// The inline-code pattern reuses the block-fence delimiter on purpose.
static PATTERNS: LazyLock<[(Regex, SpanStyle); 5]> = LazyLock::new(|| {
    [
        (
            Regex::new(r"\*\*\*(.+?)\*\*\*").unwrap(),
            SpanStyle::BoldItalic,
        ),
        (Regex::new(r"\*\*(.+?)\*\*").unwrap(), SpanStyle::Bold),
        (Regex::new(r"\*(.+?)\*").unwrap(), SpanStyle::Italic),
        (Regex::new(r"```(.+?)```").unwrap(), SpanStyle::Code),
        (Regex::new(r"~~(.+?)~~").unwrap(), SpanStyle::Strike),
    ]
});

/// Scans a single line left to right, emitting literal text as plain spans
/// and the earliest-starting pattern match as a styled span, until nothing
/// matches in the remainder.
pub fn tokenize_inline(text: &str) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let mut earliest: Option<(usize, usize, usize, usize, SpanStyle)> = None;

        for (regex, style) in PATTERNS.iter() {
            if let Some(caps) = regex.captures(remaining) {
                let whole = caps.get(0).expect("group 0 always present");
                let inner = caps.get(1).expect("pattern has one capture group");
                let replace = match earliest {
                    Some((start, ..)) => whole.start() < start,
                    None => true,
                };
                if replace {
                    earliest = Some((
                        whole.start(),
                        whole.end(),
                        inner.start(),
                        inner.end(),
                        *style,
                    ));
                }
            }
        }

        let Some((start, end, inner_start, inner_end, style)) = earliest else {
            spans.push(InlineSpan::new(SpanStyle::Plain, remaining));
            break;
        };

        if start > 0 {
            spans.push(InlineSpan::new(SpanStyle::Plain, &remaining[..start]));
        }
        spans.push(InlineSpan::new(style, &remaining[inner_start..inner_end]));
        remaining = &remaining[end..];
    }

    spans
}

/// One renderable line of a detail block.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailLine {
    pub list_item: bool,
    pub spans: Vec<InlineSpan>,
}

/// Splits a (possibly multi-line) detail string into renderable lines.
/// Blank lines are dropped; a "- " prefix marks a list item and is
/// stripped before tokenizing.
pub fn detail_lines(text: &str) -> Vec<DetailLine> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                return None;
            }
            Some(match trimmed.strip_prefix("- ") {
                Some(rest) => DetailLine {
                    list_item: true,
                    spans: tokenize_inline(rest),
                },
                None => DetailLine {
                    list_item: false,
                    spans: tokenize_inline(trimmed),
                },
            })
        })
        .collect()
}
