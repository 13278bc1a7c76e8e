//! ghgrip - a terminal UI for browsing a GitHub user's public activity
//! feed and contribution calendar.
//!
//! The pipeline: fetch raw events from the public events API, normalize
//! each recognized kind into a uniform record, enrich push events whose
//! payload omitted commit data via the compare API, then group by day and
//! render as a terminal-style timeline.

pub mod app;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod event;
pub mod feed;
pub mod fetch;
pub mod github;
