use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// The event kinds we know how to render. Anything else coming out of the
/// events API is dropped during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Push,
    PullRequest,
    Issues,
    Create,
    Fork,
    Delete,
    Release,
    IssueComment,
    Watch,
    PullRequestReview,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Push,
        EventKind::PullRequest,
        EventKind::Issues,
        EventKind::Create,
        EventKind::Fork,
        EventKind::Delete,
        EventKind::Release,
        EventKind::IssueComment,
        EventKind::Watch,
        EventKind::PullRequestReview,
    ];

    /// Maps the `type` tag of a raw event to a kind, if recognized.
    pub fn from_tag(tag: &str) -> Option<EventKind> {
        match tag {
            "PushEvent" => Some(EventKind::Push),
            "PullRequestEvent" => Some(EventKind::PullRequest),
            "IssuesEvent" => Some(EventKind::Issues),
            "CreateEvent" => Some(EventKind::Create),
            "ForkEvent" => Some(EventKind::Fork),
            "DeleteEvent" => Some(EventKind::Delete),
            "ReleaseEvent" => Some(EventKind::Release),
            "IssueCommentEvent" => Some(EventKind::IssueComment),
            "WatchEvent" => Some(EventKind::Watch),
            "PullRequestReviewEvent" => Some(EventKind::PullRequestReview),
            _ => None,
        }
    }

    /// The API-side `type` tag for this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::Push => "PushEvent",
            EventKind::PullRequest => "PullRequestEvent",
            EventKind::Issues => "IssuesEvent",
            EventKind::Create => "CreateEvent",
            EventKind::Fork => "ForkEvent",
            EventKind::Delete => "DeleteEvent",
            EventKind::Release => "ReleaseEvent",
            EventKind::IssueComment => "IssueCommentEvent",
            EventKind::Watch => "WatchEvent",
            EventKind::PullRequestReview => "PullRequestReviewEvent",
        }
    }

    /// Short tag shown before each feed entry, terminal style.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Push => "PUSH",
            EventKind::PullRequest => "PR",
            EventKind::Issues => "ISSUE",
            EventKind::Create => "NEW",
            EventKind::Fork => "FORK",
            EventKind::Delete => "DEL",
            EventKind::Release => "REL",
            EventKind::IssueComment => "COMMENT",
            EventKind::Watch => "STAR",
            EventKind::PullRequestReview => "REVIEW",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    /// Accepts the short CLI aliases as well as the raw API tags.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" | "pushevent" => Ok(EventKind::Push),
            "pr" | "pullrequestevent" => Ok(EventKind::PullRequest),
            "issue" | "issuesevent" => Ok(EventKind::Issues),
            "create" | "createevent" => Ok(EventKind::Create),
            "fork" | "forkevent" => Ok(EventKind::Fork),
            "delete" | "deleteevent" => Ok(EventKind::Delete),
            "release" | "releaseevent" => Ok(EventKind::Release),
            "comment" | "issuecommentevent" => Ok(EventKind::IssueComment),
            "star" | "watchevent" => Ok(EventKind::Watch),
            "review" | "pullrequestreviewevent" => Ok(EventKind::PullRequestReview),
            other => Err(format!("unknown event kind: {}", other)),
        }
    }
}

/// Parses a comma-separated kind filter from the CLI.
pub fn parse_kinds(list: &str) -> Result<Vec<EventKind>, String> {
    list.split(',')
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.parse())
        .collect()
}

/// Raw event as returned by `/users/{username}/events/public`. Payload
/// fields are per-type and frequently absent, so everything is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub repo: RawRepo,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: RawPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRepo {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
    pub action: Option<String>,
    pub size: Option<usize>,
    pub commits: Option<Vec<RawCommit>>,
    pub before: Option<String>,
    pub head: Option<String>,
    pub pull_request: Option<RawPullRequest>,
    pub issue: Option<RawIssue>,
    pub ref_type: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub description: Option<String>,
    pub forkee: Option<RawForkee>,
    pub release: Option<RawRelease>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCommit {
    pub message: String,
    pub distinct: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPullRequest {
    pub number: u64,
    pub title: Option<String>,
    pub merged: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    pub number: u64,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawForkee {
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRelease {
    pub tag_name: Option<String>,
    pub name: Option<String>,
}

/// Render state of a normalized event. Push events whose payload omitted
/// the commit list stay `PendingPush` until the compare lookup resolves
/// them; everything else is `Ready` straight out of normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Ready { title: String, details: Vec<String> },
    PendingPush { before: String, head: String },
}

/// Uniform record produced from one raw event.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub id: String,
    pub kind: EventKind,
    pub repo: String,
    pub date: DateTime<Utc>,
    pub summary: Summary,
}

impl NormalizedEvent {
    pub fn title(&self) -> Option<&str> {
        match &self.summary {
            Summary::Ready { title, .. } => Some(title),
            Summary::PendingPush { .. } => None,
        }
    }

    pub fn details(&self) -> &[String] {
        match &self.summary {
            Summary::Ready { details, .. } => details,
            Summary::PendingPush { .. } => &[],
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.summary, Summary::PendingPush { .. })
    }

    /// Calendar-day key used for grouping (the date part of the timestamp).
    pub fn day_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.title() {
            Some(title) => write!(f, "[{}] {}", self.kind.label(), title),
            None => write!(f, "[{}] (pending) {}", self.kind.label(), self.repo),
        }
    }
}

/// Title for a push event with a known commit count.
pub fn push_title(count: usize, repo: &str) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("Pushed {} commit{} to {}", count, plural, repo)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Maps one raw event to a normalized record, or `None` for unrecognized
/// kinds and payloads too malformed to summarize.
pub fn normalize(raw: &RawEvent) -> Option<NormalizedEvent> {
    let kind = EventKind::from_tag(&raw.event_type)?;
    let repo = raw.repo.name.clone();
    let payload = &raw.payload;

    let summary = match kind {
        EventKind::Push => {
            let commits = payload.commits.as_deref().unwrap_or(&[]);
            if !commits.is_empty() {
                let count = payload.size.unwrap_or(commits.len());
                let details = commits
                    .iter()
                    .filter(|c| c.distinct != Some(false))
                    .map(|c| c.message.clone())
                    .collect();
                Summary::Ready {
                    title: push_title(count, &repo),
                    details,
                }
            } else if let (Some(before), Some(head)) = (&payload.before, &payload.head) {
                Summary::PendingPush {
                    before: before.clone(),
                    head: head.clone(),
                }
            } else {
                // No inline commits and no refs to compare against.
                Summary::Ready {
                    title: push_title(0, &repo),
                    details: Vec::new(),
                }
            }
        }
        EventKind::PullRequest => {
            let pr = payload.pull_request.as_ref()?;
            let action = payload.action.as_deref()?;
            let verb = if action == "opened" {
                "Opened".to_string()
            } else if action == "closed" && pr.merged == Some(true) {
                "Merged".to_string()
            } else {
                capitalize(action)
            };
            Summary::Ready {
                title: format!("{} PR #{} in {}", verb, pr.number, repo),
                details: pr.title.clone().into_iter().collect(),
            }
        }
        EventKind::Issues => {
            let issue = payload.issue.as_ref()?;
            let action = payload.action.as_deref()?;
            Summary::Ready {
                title: format!("{} issue #{} in {}", capitalize(action), issue.number, repo),
                details: issue.title.clone().into_iter().collect(),
            }
        }
        EventKind::Create => {
            let ref_type = payload.ref_type.as_deref()?;
            let title = match payload.git_ref.as_deref() {
                Some(r) => format!("Created {} \"{}\" in {}", ref_type, r, repo),
                None => format!("Created {} in {}", ref_type, repo),
            };
            Summary::Ready {
                title,
                details: payload.description.clone().into_iter().collect(),
            }
        }
        EventKind::Fork => Summary::Ready {
            title: format!("Forked {}", repo),
            details: payload
                .forkee
                .as_ref()
                .and_then(|f| f.full_name.clone())
                .into_iter()
                .collect(),
        },
        EventKind::Delete => {
            let ref_type = payload.ref_type.as_deref()?;
            let git_ref = payload.git_ref.as_deref()?;
            Summary::Ready {
                title: format!("Deleted {} \"{}\" in {}", ref_type, git_ref, repo),
                details: Vec::new(),
            }
        }
        EventKind::Release => {
            let tag = payload
                .release
                .as_ref()
                .and_then(|r| r.tag_name.as_deref())
                .unwrap_or("new version");
            Summary::Ready {
                title: format!("Released {} in {}", tag, repo),
                details: payload
                    .release
                    .as_ref()
                    .and_then(|r| r.name.clone())
                    .into_iter()
                    .collect(),
            }
        }
        EventKind::IssueComment => {
            let issue = payload.issue.as_ref()?;
            Summary::Ready {
                title: format!("Commented on #{} in {}", issue.number, repo),
                details: issue.title.clone().into_iter().collect(),
            }
        }
        EventKind::Watch => Summary::Ready {
            title: format!("Starred {}", repo),
            details: Vec::new(),
        },
        EventKind::PullRequestReview => {
            let pr = payload.pull_request.as_ref()?;
            Summary::Ready {
                title: format!("Reviewed PR #{} in {}", pr.number, repo),
                details: pr.title.clone().into_iter().collect(),
            }
        }
    };

    Some(NormalizedEvent {
        id: raw.id.clone(),
        kind,
        repo,
        date: raw.created_at,
        summary,
    })
}
