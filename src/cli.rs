use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "ghgrip")]
#[command(about = "A terminal UI for browsing a GitHub user's activity feed")]
pub struct CliArgs {
    /// GitHub username to show activity for (overrides config)
    pub username: Option<String>,

    /// Maximum number of events to display
    #[arg(long)]
    pub limit: Option<usize>,

    /// Comma-separated event kinds to show
    /// (push, pr, issue, create, fork, delete, release, comment, star, review)
    #[arg(long)]
    pub kinds: Option<String>,

    /// Events per API page (max 100)
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Render a flat list instead of grouping by day
    #[arg(long)]
    pub flat: bool,

    /// GitHub API token (overrides config file and env)
    #[arg(long)]
    pub token: Option<String>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
