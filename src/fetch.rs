use futures::future::join_all;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::event::{normalize, push_title, EventKind, NormalizedEvent, Summary};
use crate::github::{FetchError, GithubClient};

pub const DEFAULT_LIMIT: usize = 30;
pub const MAX_PER_PAGE: u32 = 100;

/// Parameters of one activity lookup. Queries with equal cache keys are
/// served from the fetcher's cache without touching the network.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityQuery {
    pub username: String,
    pub limit: usize,
    pub kinds: Option<Vec<EventKind>>,
    pub per_page: u32,
}

impl ActivityQuery {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            limit: DEFAULT_LIMIT,
            kinds: None,
            per_page: MAX_PER_PAGE,
        }
    }

    /// Cache key: username, limit, and the sorted kind filter (or "all").
    /// The page size is deliberately not part of the key.
    pub fn cache_key(&self) -> String {
        let kinds = match &self.kinds {
            Some(kinds) => {
                let mut tags: Vec<&str> = kinds.iter().map(|k| k.tag()).collect();
                tags.sort_unstable();
                tags.join(",")
            }
            None => "all".to_string(),
        };
        format!("{}-{}-{}", self.username, self.limit, kinds)
    }
}

/// Resolves every pending push event in the batch via the compare API.
/// All lookups run concurrently; output length and order match the input
/// exactly. A failed lookup downgrades to a zero-commit push rather than
/// surfacing an error.
pub async fn enrich_push_events(
    events: Vec<NormalizedEvent>,
    client: &GithubClient,
) -> Vec<NormalizedEvent> {
    let lookups = events.into_iter().map(|mut event| async move {
        if let Summary::PendingPush { before, head } = event.summary.clone() {
            let messages = match client.compare_commits(&event.repo, &before, &head).await {
                Ok(messages) => messages,
                Err(err) => {
                    warn!(repo = %event.repo, error = %err, "commit lookup failed, showing empty push");
                    Vec::new()
                }
            };
            event.summary = Summary::Ready {
                title: push_title(messages.len(), &event.repo),
                details: messages,
            };
        }
        event
    });

    join_all(lookups).await
}

/// Fetches and normalizes a user's public activity. Owns a per-instance
/// cache keyed by query, so repeating a query is free.
pub struct ActivityFetcher {
    client: GithubClient,
    cache: HashMap<String, Vec<NormalizedEvent>>,
}

impl ActivityFetcher {
    pub fn new(client: GithubClient) -> Self {
        Self {
            client,
            cache: HashMap::new(),
        }
    }

    /// Runs the full pipeline: fetch raw events, normalize (dropping
    /// unrecognized kinds), filter by the kind allow-list, cap to the
    /// display limit, then enrich only the events that will be shown.
    pub async fn fetch(
        &mut self,
        query: &ActivityQuery,
    ) -> Result<Vec<NormalizedEvent>, FetchError> {
        let key = query.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            debug!(%key, "activity cache hit");
            return Ok(cached.clone());
        }

        let per_page = query.per_page.min(MAX_PER_PAGE);
        let raw = self
            .client
            .user_public_events(&query.username, per_page)
            .await?;

        let mut events: Vec<NormalizedEvent> = raw.iter().filter_map(normalize).collect();
        if let Some(kinds) = &query.kinds {
            events.retain(|e| kinds.contains(&e.kind));
        }
        events.truncate(query.limit);

        let events = enrich_push_events(events, &self.client).await;
        debug!(%key, count = events.len(), "activity fetched");

        self.cache.insert(key, events.clone());
        Ok(events)
    }
}
