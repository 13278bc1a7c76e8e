use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::github::{FetchError, GithubClient};

/// GraphQL query for the contribution calendar: daily counts grouped by
/// week plus the period total.
const CONTRIBUTIONS_QUERY: &str = r#"
query ($username: String!, $from: DateTime!, $to: DateTime!) {
  user(login: $username) {
    contributionsCollection(from: $from, to: $to) {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            contributionCount
            date
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContributionCalendar {
    #[serde(rename = "totalContributions")]
    pub total_contributions: u32,
    pub weeks: Vec<Week>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Week {
    #[serde(rename = "contributionDays")]
    pub days: Vec<ContributionDay>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContributionDay {
    #[serde(rename = "contributionCount")]
    pub count: u32,
    pub date: NaiveDate,
}

// Envelope structs mirroring the GraphQL response nesting.
#[derive(Debug, Deserialize)]
struct CalendarData {
    user: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
struct UserNode {
    #[serde(rename = "contributionsCollection")]
    contributions: ContributionsCollection,
}

#[derive(Debug, Deserialize)]
struct ContributionsCollection {
    #[serde(rename = "contributionCalendar")]
    calendar: ContributionCalendar,
}

impl ContributionCalendar {
    /// Highest daily count in the period, floored at 1 so the intensity
    /// ratio is always defined.
    pub fn max_daily_count(&self) -> u32 {
        self.weeks
            .iter()
            .flat_map(|w| w.days.iter())
            .map(|d| d.count)
            .max()
            .unwrap_or(0)
            .max(1)
    }
}

/// Bins a daily count into an intensity level 0..=4 relative to the
/// period maximum.
pub fn intensity_level(count: u32, max_count: u32) -> u8 {
    if count == 0 || max_count == 0 {
        return 0;
    }
    let ratio = count as f64 / max_count as f64;
    if ratio <= 0.25 {
        1
    } else if ratio <= 0.5 {
        2
    } else if ratio <= 0.75 {
        3
    } else {
        4
    }
}

/// Scans the first day of each week for month changes, yielding
/// `(label, week_index)` pairs used to position month headers.
pub fn month_labels(weeks: &[Week]) -> Vec<(String, usize)> {
    let mut labels = Vec::new();
    let mut last_month: Option<String> = None;

    for (week_index, week) in weeks.iter().enumerate() {
        let Some(first) = week.days.first() else {
            continue;
        };
        let month = first.date.format("%b").to_string();
        if last_month.as_deref() != Some(month.as_str()) {
            labels.push((month.clone(), week_index));
            last_month = Some(month);
        }
    }

    labels
}

/// Fetches contribution calendars, caching per (username, from, to).
pub struct CalendarFetcher {
    client: GithubClient,
    cache: HashMap<String, ContributionCalendar>,
}

impl CalendarFetcher {
    pub fn new(client: GithubClient) -> Self {
        Self {
            client,
            cache: HashMap::new(),
        }
    }

    pub async fn fetch(
        &mut self,
        username: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ContributionCalendar, FetchError> {
        let key = format!("{}-{}-{}", username, from.to_rfc3339(), to.to_rfc3339());
        if let Some(cached) = self.cache.get(&key) {
            debug!(%key, "calendar cache hit");
            return Ok(cached.clone());
        }

        let variables = serde_json::json!({
            "username": username,
            "from": from.to_rfc3339(),
            "to": to.to_rfc3339(),
        });
        let data: CalendarData = self.client.graphql(CONTRIBUTIONS_QUERY, variables).await?;

        let calendar = data
            .user
            .ok_or_else(|| FetchError::GraphQl {
                message: format!("no such user: {}", username),
            })?
            .contributions
            .calendar;

        self.cache.insert(key, calendar.clone());
        Ok(calendar)
    }
}
