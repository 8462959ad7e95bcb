mod apple;
mod batch;
mod config;
mod lyrics;
mod prompt;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use apple::{AppleMusicClient, AuthState};
use batch::{BatchOrchestrator, Job};
use lyrics::LrcWriter;

#[derive(Debug, Parser)]
#[command(name = "lrcfetch", version, about = "Download Apple Music lyrics as .lrc files")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for .lrc files.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of tracks processed at the same time.
    #[arg(short, long)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search a song and download its lyrics.
    Search {
        query: String,
        /// Take the first result without asking.
        #[arg(short, long)]
        auto: bool,
        /// Number of results to show.
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Read search terms from a file, one per line.
    Batch { file: PathBuf },
    /// Every song in the library.
    Library,
    /// Pick one of the library playlists.
    Playlist,
    /// Full discography of an artist.
    Artist {
        name: String,
        /// Take the first matching artist without asking.
        #[arg(short, long)]
        auto: bool,
    },
    /// Current top songs.
    Charts {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Manage the stored media-user-token.
    Auth {
        #[command(subcommand)]
        method: AuthCommand,
    },
}

#[derive(Debug, Subcommand)]
enum AuthCommand {
    /// Store the `media-user-token` copied from music.apple.com local storage.
    Set { token: String },
    /// Remove stored tokens.
    Clear,
}

struct Session {
    client: Arc<AppleMusicClient>,
    writer: Arc<LrcWriter>,
    orchestrator: BatchOrchestrator<AppleMusicClient>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref()).context("load config")?;

    if let Command::Auth { method } = &cli.command {
        match method {
            AuthCommand::Set { token } => {
                cfg.apple.media_user_token = Some(token.trim().to_string());
                config::save(&cfg, cli.config.as_deref()).context("save config")?;
                println!("Stored media-user-token.");
            }
            AuthCommand::Clear => {
                cfg.apple.media_user_token = None;
                cfg.apple.developer_token = None;
                config::save(&cfg, cli.config.as_deref()).context("save config")?;
                println!("Cleared stored tokens.");
            }
        }
        return Ok(());
    }

    if let Some(dir) = cli.output {
        cfg.paths.output_dir = dir;
    }
    if let Some(n) = cli.threads {
        cfg.batch.workers = n;
    }
    let cfg = cfg;
    let session = make_session(&cfg).await?;

    match cli.command {
        Command::Search { query, auto, limit } => {
            let limit = limit.unwrap_or(cfg.batch.search_limit);
            let tracks = session.client.search_tracks(&query, limit).await?;
            if tracks.is_empty() {
                println!("No results.");
                return Ok(());
            }
            let choice = if auto || tracks.len() == 1 {
                Some(0)
            } else {
                let labels: Vec<String> = tracks
                    .iter()
                    .map(|t| format!("{} - {}", t.title(), t.artist_name()))
                    .collect();
                prompt::choose("Results", &labels, Some(0))?
            };
            let Some(choice) = choice else {
                println!("Invalid choice.");
                return Ok(());
            };
            let track = tracks[choice].clone();
            let result =
                batch::process_track(session.client.as_ref(), Arc::clone(&session.writer), track)
                    .await;
            println!("{}", result.message);
            if let Some(out) = result.output.filter(|o| !o.reused()) {
                println!("Saved to {}", out.path.display());
            }
        }
        Command::Batch { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let jobs: Vec<Job> = raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| Job::Query(l.to_string()))
                .collect();
            run_batch(&session, jobs, "search terms").await;
        }
        Command::Library => {
            let tracks = session.client.library_songs().await;
            run_batch(&session, tracks, "library songs").await;
        }
        Command::Playlist => {
            let playlists = session.client.library_playlists().await;
            if playlists.is_empty() {
                println!("No playlists found.");
                return Ok(());
            }
            let labels: Vec<String> = playlists.iter().map(|p| p.name.clone()).collect();
            let Some(choice) = prompt::choose("Playlists", &labels, None)? else {
                println!("Invalid choice.");
                return Ok(());
            };
            let selected = &playlists[choice];
            println!("Playlist: {}", selected.name);
            let tracks = session.client.playlist_tracks(&selected.id).await;
            run_batch(&session, tracks, "playlist tracks").await;
        }
        Command::Artist { name, auto } => {
            let artists = session
                .client
                .search_artists(&name, cfg.batch.search_limit)
                .await?;
            if artists.is_empty() {
                println!("Artist not found.");
                return Ok(());
            }
            let choice = if auto || artists.len() == 1 {
                Some(0)
            } else {
                let labels: Vec<String> = artists
                    .iter()
                    .map(|a| format!("{} ({})", a.name, a.genre.as_deref().unwrap_or("unknown")))
                    .collect();
                prompt::choose("Artists", &labels, None)?
            };
            let Some(choice) = choice else {
                println!("Invalid choice.");
                return Ok(());
            };
            let artist = &artists[choice];
            println!("Discography: {}", artist.name);
            let tracks = session.client.artist_discography(&artist.id).await?;
            run_batch(&session, tracks, "discography songs").await;
        }
        Command::Charts { limit } => {
            let limit = limit.unwrap_or(cfg.batch.charts_limit);
            let tracks = session.client.charts(limit).await?;
            run_batch(&session, tracks, "chart songs").await;
        }
        Command::Auth { .. } => unreachable!("handled before the session is created"),
    }

    Ok(())
}

async fn make_session(cfg: &config::Config) -> anyhow::Result<Session> {
    let http = AppleMusicClient::bootstrap_http()?;
    let auth = AuthState::resolve(
        &http,
        cfg.apple.developer_token.as_deref(),
        cfg.apple.media_user_token.as_deref(),
    )
    .await
    .context("resolve Apple Music tokens")?;

    let client = Arc::new(AppleMusicClient::new(&auth, &cfg.apple.storefront)?);
    let writer = Arc::new(LrcWriter::new(&cfg.paths.output_dir)?);
    let orchestrator =
        BatchOrchestrator::new(Arc::clone(&client), Arc::clone(&writer), cfg.batch.workers);

    Ok(Session {
        client,
        writer,
        orchestrator,
    })
}

async fn run_batch<J>(session: &Session, jobs: Vec<J>, label: &str)
where
    J: Into<Job>,
{
    if jobs.is_empty() {
        println!("No {label} found.");
        return;
    }

    println!(
        "Downloading lyrics for {} {label} ({} workers) into {}...\n",
        jobs.len(),
        session.orchestrator.workers(),
        session.writer.dir().display()
    );
    let summary = session
        .orchestrator
        .run(jobs, |done, total, result| {
            println!("[{done}/{total}] {}", result.message);
        })
        .await;
    println!(
        "\nDone: {}/{} lyrics downloaded.",
        summary.succeeded, summary.total
    );
}
