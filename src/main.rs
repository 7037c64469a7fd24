mod cli;

use subcover::report::{
    render_languages, render_notices, render_page_info, render_progress, render_rows,
    render_status, render_summary,
};
use subcover::{AppState, Backend, LibraryView, ViewStatus};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use sc_client::HttpBackend;
use sc_core::config::Config;
use sc_core::{JobId, ProfileId};
use sc_view::{JobPhase, SortKey, SortSpec};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// Config files tried, in order, when `--config` is not given.
const DEFAULT_CONFIG_PATHS: &[&str] = &["./subcover.toml", "~/.config/subcover/config.toml"];

/// How often `--follow` prints a progress line.
const FOLLOW_INTERVAL: Duration = Duration::from_secs(1);

/// Time given to the pump to apply buffered events once the stream ends.
const STREAM_DRAIN: Duration = Duration::from_millis(200);

fn find_default_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_PATHS
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
        .find(|p| p.is_file())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "subcover=trace,sc_client=debug,sc_view=debug,sc_coverage=debug,sc_core=debug".to_string()
        } else {
            "subcover=info,sc_client=info,sc_view=info,sc_coverage=warn,sc_core=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().or_else(find_default_config);

    match cli.command {
        Commands::Coverage {
            profile,
            search,
            sort,
            desc,
            page,
        } => {
            let config = Config::load_or_default(config_path.as_deref());
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_coverage(config, profile, search, sort, desc, page))
        }
        Commands::Missing { profile } => {
            let config = Config::load_or_default(config_path.as_deref());
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_missing(config, profile))
        }
        Commands::SearchMissing { profile, follow } => {
            let config = Config::load_or_default(config_path.as_deref());
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(search_missing(config, profile, follow))
        }
        Commands::Validate { path } => {
            let path = path.or(config_path);
            validate_config(path.as_deref())
        }
        Commands::Languages => {
            print!("{}", render_languages());
            Ok(())
        }
        Commands::Version => {
            println!("subcover {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Build a view over the configured HTTP backend.
fn open_view(
    scope: &str,
    profile: Option<i64>,
    config: Config,
) -> (Arc<AppState>, Arc<HttpBackend>, LibraryView) {
    let state = AppState::new(config);
    let http = Arc::new(HttpBackend::new(&state.config.backend));
    let mut view = LibraryView::new(scope, Backend::new(Arc::clone(&http)), &state);
    if let Some(id) = profile {
        view.set_profile(ProfileId::new(id));
    }
    (state, http, view)
}

/// Load every page, failing only when nothing at all could be shown.
async fn load(view: &mut LibraryView) -> Result<()> {
    view.refresh_all().await;
    if let Some(warning) = render_status(view.status()) {
        eprintln!("{warning}");
    }
    if let ViewStatus::Degraded { message, .. } = view.status() {
        if view.units().is_empty() || view.profile().is_none() {
            anyhow::bail!("Could not load the library from the backend: {message}");
        }
    }
    Ok(())
}

async fn show_coverage(
    config: Config,
    profile: Option<i64>,
    search: Option<String>,
    sort: Option<String>,
    desc: bool,
    page: usize,
) -> Result<()> {
    let (_state, _http, mut view) = open_view("library", profile, config);

    let current = view.query().sort;
    let key = match sort {
        Some(sort) => sort.parse::<SortKey>()?,
        None => current.key,
    };
    view.set_sort(SortSpec::new(key, desc || current.descending));

    load(&mut view).await?;

    if let Some(text) = search {
        view.input_search(text);
        view.submit_search();
    }
    view.set_page(page);

    let info = view.page_info();
    let rows = view.rows();
    if rows.is_empty() {
        println!("No matching episodes.");
    } else {
        print!("{}", render_rows(&rows));
    }
    println!("{}", render_page_info(&info));
    Ok(())
}

async fn show_missing(config: Config, profile: Option<i64>) -> Result<()> {
    let (_state, _http, mut view) = open_view("wanted", profile, config);
    load(&mut view).await?;
    print!("{}", render_summary(&view.summary(), view.profile()));
    Ok(())
}

async fn search_missing(config: Config, profile: Option<i64>, follow: bool) -> Result<()> {
    let (state, http, mut view) = open_view("wanted", profile, config);
    load(&mut view).await?;

    // Subscribe and connect before dispatching so no event for the new job
    // is missed.
    let mut refresh = state.subscribe_refresh();
    let tasks = if follow {
        let connected = http
            .connect_progress()
            .await
            .context("Could not subscribe to progress events; nothing was started")?;
        let pump = state.spawn_progress_pump();
        let bus = Arc::clone(&state.bus);
        let stream = tokio::spawn(async move { connected.pump(&bus).await });
        Some((pump, stream))
    } else {
        None
    };

    let started = match view.search_missing().await {
        Ok(Some(started)) => started,
        Ok(None) => {
            println!("Nothing is missing.");
            return Ok(());
        }
        Err(e) => {
            eprint!("{}", render_notices(&view.take_notices()));
            return Err(e).context("Failed to start the search");
        }
    };
    println!(
        "Started job {} for {} missing subtitles.",
        started.job_id, started.total_items
    );

    let Some((pump, mut stream)) = tasks else {
        return Ok(());
    };
    println!("Following progress. Stopping here does not cancel the batch on the backend.");

    let mut ticker = tokio::time::interval(FOLLOW_INTERVAL);
    let finished = loop {
        tokio::select! {
            _ = ticker.tick() => print_progress(&state, started.job_id),
            signal = refresh.recv() => match signal {
                Ok(job_id) if job_id == started.job_id => break true,
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Refresh listener lagged, {} signals skipped", n);
                }
                Err(RecvError::Closed) => break false,
            },
            result = &mut stream => {
                // The final event may still be on its way through the pump.
                tokio::time::sleep(STREAM_DRAIN).await;
                if state.progress.lock().phase(started.job_id) == JobPhase::Terminal {
                    break true;
                }
                match result {
                    Ok(Ok(())) => eprintln!("Progress stream closed before the batch finished."),
                    Ok(Err(e)) => eprintln!("Progress stream failed: {e}"),
                    Err(e) => eprintln!("Progress stream task failed: {e}"),
                }
                break false;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped following; the batch keeps running on the backend.");
                break false;
            }
        }
    };

    pump.abort();
    stream.abort();

    if finished {
        print_progress(&state, started.job_id);
        view.refresh_all().await;
        print!("{}", render_summary(&view.summary(), view.profile()));
    }
    Ok(())
}

fn print_progress(state: &AppState, job_id: JobId) {
    if let Some(progress) = state.progress.lock().get(job_id) {
        println!("{}", render_progress(progress));
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file {}", p.display()))?;
            Config::from_toml(&contents)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for warning in &warnings {
            println!("warning: {warning}");
        }
    }
    println!("  Backend: {}", config.backend.url);
    println!("  Profile: {}", config.profile_id);
    println!("  Page size: {}", config.view.page_size);
    println!("  Default sort: {}", config.view.default_sort);
    Ok(())
}
