//! Podium CLI
//!
//! Terminal front end for a live leaderboard server:
//! - Watch the live ranking
//! - List teams
//! - Print a one-shot ranking
//! - Generate a config file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use podium::config::{generate_default_config, LoggingConfig};
use podium::view::group_thousands;
use podium::{
    Config, LiveSubscriber, LoadState, NavTarget, RankingView, Screen, SessionState,
    SnapshotClient, SnapshotFetcher, TeamSelector, ViewMode,
};

#[derive(Parser)]
#[command(name = "podium")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live competition leaderboard in the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Leaderboard server URL (overrides config)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the live leaderboard
    Watch {
        /// "all" for every team, or a 1-based team position to pin
        #[arg(short, long, default_value = "all")]
        team: String,
    },

    /// List teams
    Teams,

    /// Print the current ranking once
    Snapshot {
        /// Rank the members of this team instead of the teams
        #[arg(long)]
        team_id: Option<String>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_deref());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default().context("loading config")?,
    };
    if let Some(url) = cli.server {
        config.server.url = url;
        config.validate()?;
    }

    init_logging(&config.logging)?;
    tracing::debug!(server = %config.server.url, "Podium v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Watch { team } => watch(&config, NavTarget::parse(&team)).await,
        Commands::Teams => list_teams(&config).await,
        Commands::Snapshot { team_id } => print_snapshot(&config, team_id.as_deref()).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("podium={}", logging.level)))
        .context("invalid log level")?;

    let (writer, ansi) = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path))?;
            (BoxMakeWriter::new(std::sync::Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .init();
    }
    Ok(())
}

async fn watch(config: &Config, target: NavTarget) -> Result<()> {
    let separator = config.display.thousands_separator.clone();
    let clear = config.display.clear_screen;

    let state = SessionState::new(target.clone());
    render(&Screen::from_state(&state), &separator, clear)?;

    let client = SnapshotClient::from_config(&config.server)?;
    let snapshot = SnapshotFetcher::new(client).fetch(&target).await;

    let mut subscriber = LiveSubscriber::connect(state, &config.server, &config.channel)?;
    subscriber.load_snapshot(snapshot);
    render(&Screen::from_state(subscriber.state()), &separator, clear)?;

    if matches!(subscriber.state().load(), LoadState::NotFound { .. }) {
        subscriber.shutdown().await;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut channel_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => {
                        if !handle_input(&mut subscriber, line.trim()) {
                            break;
                        }
                    }
                    None => stdin_open = false,
                }
            }
            event = subscriber.next_event(), if channel_open => {
                if event.is_none() {
                    // The channel gave up; keep showing the last ranking offline
                    channel_open = false;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }

        render(&Screen::from_state(subscriber.state()), &separator, clear)?;
    }

    subscriber.shutdown().await;
    Ok(())
}

/// Apply one line of keyboard input. Returns `false` to quit.
fn handle_input(subscriber: &mut LiveSubscriber, input: &str) -> bool {
    if input.is_empty() {
        return true;
    }
    if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
        return false;
    }

    if let Ok(position) = input.parse::<usize>() {
        subscriber.select_team_at(position);
    } else if let Ok(mode) = input.parse::<ViewMode>() {
        subscriber.set_view_mode(mode);
    } else {
        tracing::debug!(input = %input, "Unrecognized command");
    }
    true
}

fn render(screen: &Screen, separator: &str, clear: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if clear {
        write!(out, "\x1b[2J\x1b[H")?;
    }
    write!(out, "{}", screen.display(separator))?;
    out.flush()?;
    Ok(())
}

async fn list_teams(config: &Config) -> Result<()> {
    let client = SnapshotClient::from_config(&config.server)?;
    let teams = client.teams().await.context("fetching teams")?;

    match TeamSelector::build(&teams, None) {
        Some(selector) => print!("{}", selector),
        None => println!("No teams"),
    }
    Ok(())
}

async fn print_snapshot(config: &Config, team_id: Option<&str>) -> Result<()> {
    let client = SnapshotClient::from_config(&config.server)?;
    let ranking = client
        .leaderboard(team_id)
        .await
        .context("fetching leaderboard")?;

    let mode = if team_id.is_some() {
        ViewMode::Users
    } else {
        ViewMode::Teams
    };
    let view = RankingView::build(&ranking, mode);
    print!("{}", view.display(&config.display.thousands_separator));

    let total = ranking
        .iter()
        .fold(0u64, |acc, e| acc.saturating_add(e.score));
    if !ranking.is_empty() {
        println!();
        println!(
            "Total: {} pts",
            group_thousands(total, &config.display.thousands_separator)
        );
    }
    Ok(())
}

fn write_default_config(output: Option<&std::path::Path>) -> Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote default config to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
