use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use playarr::api::profiles::ProfileClient;
use playarr::api::types::FixOptions;
use playarr::api::{PlayarrClient, Transport};
use playarr::config::{EngineConfig, DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL_MS};
use playarr::session::TaskStateStore;
use playarr::task::TaskId;
use playarr::Engine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "playarr", version, about = "Scan media libraries for direct-play compatibility and fix what fails")]
struct Cli {
    /// Base URL of the Playarr server
    #[arg(long, env = "PLAYARR_SERVER", default_value = DEFAULT_BASE_URL, global = true)]
    server: String,

    /// Milliseconds between status polls
    #[arg(long, env = "PLAYARR_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS, global = true)]
    poll_interval_ms: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive terminal UI (default)
    Tui(TuiArgs),
    /// Manage device profiles
    Profiles {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
    /// Poll a task once and print its status
    Status { task_id: String },
    /// Ask the server to stop a task
    Stop { task_id: String },
}

#[derive(Args, Debug)]
struct TuiArgs {
    /// Media directory to scan
    #[arg(short, long, default_value = "")]
    directory: String,

    /// Profile to select initially
    #[arg(short, long)]
    profile: Option<String>,

    /// Target audio codec for fixes
    #[arg(long, default_value = "aac")]
    audio_codec: String,

    /// Target audio bitrate for fixes, e.g. 192k
    #[arg(long)]
    audio_bitrate: Option<String>,

    /// Suffix appended to fixed output files
    #[arg(long, default_value = ".fixed")]
    output_suffix: String,

    /// Keep a backup of each original file
    #[arg(long)]
    backup: bool,
}

impl Default for TuiArgs {
    fn default() -> Self {
        let fix = FixOptions::default();
        Self {
            directory: String::new(),
            profile: None,
            audio_codec: fix.target_audio_codec,
            audio_bitrate: fix.target_audio_bitrate,
            output_suffix: fix.output_suffix,
            backup: fix.backup,
        }
    }
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    List,
    Show { name: String },
    /// Create a profile from a JSON file
    Import { name: String, file: PathBuf },
    /// Replace a profile's content from a JSON file
    Update { name: String, file: PathBuf },
    Clone { source: String, new_name: String },
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::new(cli.server.clone(), cli.poll_interval_ms);

    // Initialize file-based logging so the TUI owns the terminal
    let log_dir = playarr::paths::get_log_dir()?;
    let file_appender = tracing_appender::rolling::never(&log_dir, "playarr.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playarr=debug,reqwest=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    tracing::info!(
        "Using server {} (poll every {:?})",
        config.base_url,
        config.poll_interval
    );

    match cli.command {
        None => run_tui(config, TuiArgs::default()).await,
        Some(Commands::Tui(args)) => run_tui(config, args).await,
        Some(Commands::Profiles { action }) => {
            run_profiles(&config, action.unwrap_or(ProfileAction::List)).await
        }
        Some(Commands::Status { task_id }) => {
            let client = PlayarrClient::new(&config);
            let snapshot = client.poll(&TaskId::new(task_id.clone())).await?;
            println!("Task {}: {}", task_id, snapshot.status);
            println!(
                "Progress: {}% ({}/{})",
                snapshot.progress,
                snapshot.processed_count,
                snapshot.total_count.unwrap_or(0)
            );
            if let Some(item) = snapshot.current_item {
                println!("Current: {}", item);
            }
            if let Some(error) = snapshot.error {
                println!("Error: {}", error);
            }
            Ok(())
        }
        Some(Commands::Stop { task_id }) => {
            let client = PlayarrClient::new(&config);
            let ack = client.request_cancel(&TaskId::new(task_id)).await?;
            println!("{}", ack);
            Ok(())
        }
    }
}

async fn run_profiles(config: &EngineConfig, action: ProfileAction) -> Result<()> {
    let client = ProfileClient::new(config);
    match action {
        ProfileAction::List => {
            for name in client.list().await? {
                println!("{}", name);
            }
        }
        ProfileAction::Show { name } => {
            let document = client.get(&name).await?;
            println!("{}", document.content);
        }
        ProfileAction::Import { name, file } => {
            let content = read_profile_file(&file)?;
            let stored = client.create(&name, &content).await?;
            println!("Profile '{}' created.", stored);
        }
        ProfileAction::Update { name, file } => {
            let content = read_profile_file(&file)?;
            println!("{}", client.update(&name, &content).await?);
        }
        ProfileAction::Clone { source, new_name } => {
            let stored = client.clone_profile(&source, &new_name).await?;
            println!("Profile '{}' cloned to '{}'.", source, stored);
        }
        ProfileAction::Delete { name } => {
            println!("{}", client.delete(&name).await?);
        }
    }
    Ok(())
}

fn read_profile_file(file: &Path) -> Result<String> {
    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read profile file: {}", file.display()))
}

async fn run_tui(config: EngineConfig, args: TuiArgs) -> Result<()> {
    tracing::info!("Starting playarr TUI");

    let mut profiles = match ProfileClient::new(&config).list().await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!("Could not load profiles: {:#}", e);
            Vec::new()
        }
    };
    // Put the requested profile first so it is selected
    if let Some(wanted) = args.profile {
        profiles.retain(|name| name != &wanted);
        profiles.insert(0, wanted);
    }

    let fix_options = FixOptions {
        target_audio_codec: args.audio_codec,
        target_audio_bitrate: args.audio_bitrate,
        output_suffix: args.output_suffix,
        backup: args.backup,
    };

    let session_path = playarr::paths::get_session_path()?;
    tracing::info!("Session file: {}", session_path.display());
    let store = TaskStateStore::new(session_path);

    // Create mpsc channels
    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = tokio::sync::mpsc::unbounded_channel();

    let transport: Arc<dyn Transport> = Arc::new(PlayarrClient::new(&config));
    let mut engine = Engine::new(&config, transport, store, events_tx);
    if let Some(task_id) = engine.recover_session() {
        tracing::info!("Resuming task {}", task_id);
    }

    // Spawn engine task
    let engine_handle = tokio::spawn(engine.run(commands_rx));

    // Run TUI
    let state = playarr::tui::state::AppState::new(args.directory, profiles, fix_options);
    let mut app = playarr::tui::App::new(
        state,
        events_rx,
        commands_tx,
        playarr::paths::get_export_path()?,
    );
    app.run().await?;

    // Wait for engine to shut down
    engine_handle.await?;

    Ok(())
}
