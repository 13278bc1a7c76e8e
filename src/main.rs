use anyhow::{anyhow, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use ghgrip::app::{App, FeedEvent, LoadState, View};
use ghgrip::calendar::CalendarFetcher;
use ghgrip::cli::CliArgs;
use ghgrip::config::Config;
use ghgrip::event::parse_kinds;
use ghgrip::fetch::{ActivityFetcher, ActivityQuery, MAX_PER_PAGE};
use ghgrip::github::GithubClient;

fn main() -> Result<()> {
    // Initialize tracing with env filter
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli_args = CliArgs::parse();
    let config_path = cli_args.config.clone();
    let config = Config::from_cli_and_file(&cli_args, config_path)?;

    let username = config.username.clone();
    if username.is_empty() {
        return Err(anyhow!(
            "no username given; pass one as an argument or set it in the config file"
        ));
    }

    let mut query = ActivityQuery::new(&username);
    query.limit = config.ui.limit;
    if let Some(kinds) = &cli_args.kinds {
        query.kinds = Some(parse_kinds(kinds).map_err(|e| anyhow!(e))?);
    }
    if let Some(per_page) = cli_args.per_page {
        query.per_page = per_page.min(MAX_PER_PAGE);
    }

    info!("Starting ghgrip for @{}", username);

    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let client = GithubClient::new(config.resolve_token());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, username);
    let res = run(&mut app, &mut terminal, &runtime, client, query);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {}", err);
        println!("Error: {}", err);
    }

    info!("ghgrip shut down cleanly");
    Ok(())
}

/// Background workers for the two views. Each in-flight fetch is a tokio
/// task whose handle the UI keeps; aborting it drops the futures, so no
/// result event arrives and the fetcher cache stays untouched.
struct Workers {
    runtime_handle: tokio::runtime::Handle,
    activity: Arc<Mutex<ActivityFetcher>>,
    calendar: Arc<Mutex<CalendarFetcher>>,
    tx: Sender<FeedEvent>,
    activity_inflight: Option<JoinHandle<()>>,
    calendar_inflight: Option<JoinHandle<()>>,
}

impl Workers {
    fn new(runtime: &Runtime, client: GithubClient, tx: Sender<FeedEvent>) -> Self {
        Self {
            runtime_handle: runtime.handle().clone(),
            activity: Arc::new(Mutex::new(ActivityFetcher::new(client.clone()))),
            calendar: Arc::new(Mutex::new(CalendarFetcher::new(client))),
            tx,
            activity_inflight: None,
            calendar_inflight: None,
        }
    }

    fn request_activity(&mut self, query: ActivityQuery) {
        if let Some(handle) = self.activity_inflight.take() {
            handle.abort();
        }
        let fetcher = Arc::clone(&self.activity);
        let tx = self.tx.clone();
        self.activity_inflight = Some(self.runtime_handle.spawn(async move {
            let mut fetcher = fetcher.lock().await;
            match fetcher.fetch(&query).await {
                Ok(events) => {
                    let _ = tx.send(FeedEvent::ActivityLoaded(events));
                }
                Err(err) => {
                    warn!("activity fetch failed: {}", err);
                    let _ = tx.send(FeedEvent::ActivityFailed(err.to_string()));
                }
            }
        }));
    }

    fn request_calendar(&mut self, username: String) {
        if let Some(handle) = self.calendar_inflight.take() {
            handle.abort();
        }
        let fetcher = Arc::clone(&self.calendar);
        let tx = self.tx.clone();
        self.calendar_inflight = Some(self.runtime_handle.spawn(async move {
            let to = Utc::now();
            let from = to - ChronoDuration::days(365);
            let mut fetcher = fetcher.lock().await;
            match fetcher.fetch(&username, from, to).await {
                Ok(calendar) => {
                    let _ = tx.send(FeedEvent::CalendarLoaded(calendar));
                }
                Err(err) => {
                    warn!("calendar fetch failed: {}", err);
                    let _ = tx.send(FeedEvent::CalendarFailed(err.to_string()));
                }
            }
        }));
    }

    fn abort_all(&mut self) {
        if let Some(handle) = self.activity_inflight.take() {
            handle.abort();
        }
        if let Some(handle) = self.calendar_inflight.take() {
            handle.abort();
        }
    }
}

fn run(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runtime: &Runtime,
    client: GithubClient,
    query: ActivityQuery,
) -> Result<()> {
    let (tx, rx): (Sender<FeedEvent>, Receiver<FeedEvent>) = unbounded();
    let mut workers = Workers::new(runtime, client, tx);

    app.feed = LoadState::Loading;
    workers.request_activity(query.clone());

    loop {
        // Drain events from the fetch tasks
        while let Ok(feed_event) = rx.try_recv() {
            app.apply(feed_event);
        }

        terminal.draw(|f| app.ui(f))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            info!("Quit requested by user");
                            app.should_quit = true;
                        }
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            info!("Ctrl+C pressed, quitting");
                            app.should_quit = true;
                        }
                        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
                        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
                        KeyCode::Char('g') => app.toggle_grouping(),
                        KeyCode::Char('d') => app.toggle_details(),
                        KeyCode::Tab => {
                            app.toggle_view();
                            // First visit to the calendar triggers its fetch
                            if app.view == View::Calendar && app.calendar == LoadState::Idle {
                                app.calendar = LoadState::Loading;
                                workers.request_calendar(app.username.clone());
                            }
                        }
                        KeyCode::Char('r') => match app.view {
                            View::Feed => {
                                app.feed = LoadState::Loading;
                                workers.request_activity(query.clone());
                            }
                            View::Calendar => {
                                app.calendar = LoadState::Loading;
                                workers.request_calendar(app.username.clone());
                            }
                        },
                        _ => {}
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    workers.abort_all();
    Ok(())
}
