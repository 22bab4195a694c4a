use clap::{Parser, Subcommand};
use eyre::{Context, Result, eyre};
use std::io::Stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tasklist::config::{Config, StorageBackend};
use tasklist::render::TerminalRenderer;
use tasklist::store::CreatedTask;
use tasklist::{
    FileStorage, Filter, Frame, Gesture, HttpRemote, NoRemote, Pending, Remote, RemoteError, SqliteStorage, Storage,
    SyncMode, TaskStore, ViewProjector,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Task list with local persistence and best-effort remote sync")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the config file (default: <config dir>/tasklist/tasklist.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the persisted task list
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Keep new tasks local and never call the remote
    #[arg(long)]
    local: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Toggle the task shown at position N
    Toggle {
        n: usize,
        /// View the position refers to
        #[arg(short, long, default_value = "all")]
        filter: Filter,
    },

    /// Delete the task shown at position N
    Rm {
        n: usize,
        /// View the position refers to
        #[arg(short, long, default_value = "all")]
        filter: Filter,
    },

    /// Show tasks
    List {
        #[arg(short, long, default_value = "all")]
        filter: Filter,
    },

    /// Interactive session
    Shell,
}

type Projector = ViewProjector<TerminalRenderer<Stdout>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing; stdout is reserved for rendered frames
    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.storage.path = dir.clone();
    }
    if cli.local {
        config.mode = SyncMode::Local;
    }

    let mut store = open_store(&config).await?;
    let mut view = ViewProjector::new(TerminalRenderer::new(std::io::stdout()));

    match cli.command {
        Commands::Add { text } => {
            view.handle(&mut store, Gesture::Add(text.join(" "))).await;
        }
        Commands::Toggle { n, filter } => {
            store.set_filter(filter);
            let record = row(&view.frame(&store), n)?;
            view.handle(&mut store, record.on_toggle.into()).await;
        }
        Commands::Rm { n, filter } => {
            store.set_filter(filter);
            let record = row(&view.frame(&store), n)?;
            view.handle(&mut store, record.on_delete.into()).await;
        }
        Commands::List { filter } => {
            store.set_filter(filter);
            view.render(&store);
        }
        Commands::Shell => shell(&mut store, &mut view).await?,
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<TaskStore> {
    let storage: Box<dyn Storage> = match config.storage.backend {
        StorageBackend::Sqlite => Box::new(
            SqliteStorage::open(&config.storage.path)
                .context(format!("Failed to open storage at {}", config.storage.path.display()))?,
        ),
        StorageBackend::File => Box::new(
            FileStorage::open(&config.storage.path)
                .context(format!("Failed to open storage at {}", config.storage.path.display()))?,
        ),
    };

    let remote: Arc<dyn Remote> = match config.mode {
        SyncMode::Local => Arc::new(NoRemote),
        SyncMode::Remote => Arc::new(
            HttpRemote::new(&config.remote.base_url, Duration::from_millis(config.remote.timeout_ms))
                .context("Failed to build HTTP client")?,
        ),
    };

    let mut store = TaskStore::open(storage, remote, config.mode);
    if config.mode == SyncMode::Remote && config.remote.seed_on_empty && store.is_empty() {
        // Failure is logged by the store; start empty
        if let Ok(count) = store.seed_from_remote().await {
            info!(count, "Seeded from remote");
        }
    }

    Ok(store)
}

fn row(frame: &Frame, n: usize) -> Result<tasklist::RenderRecord> {
    n.checked_sub(1)
        .and_then(|i| frame.records.get(i))
        .cloned()
        .ok_or_else(|| eyre!("No task at position {} ({} shown)", n, frame.records.len()))
}

// ============================================================================
// Interactive shell
// ============================================================================

#[derive(Debug, PartialEq)]
enum Input {
    Gesture(Gesture),
    Show,
    Help,
    Quit,
}

const HELP: &str = "commands: add <text> | toggle <n> | rm <n> | menu | filter <all|completed|incomplete> | list | quit";

fn parse_input(line: &str, frame: &Frame) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let pick = |rest: &str| -> Result<tasklist::RenderRecord, String> {
        let n: usize = rest.parse().map_err(|_| format!("not a position: {:?}", rest))?;
        row(frame, n).map_err(|e| e.to_string())
    };

    match word {
        "add" | "a" => Ok(Input::Gesture(Gesture::Add(rest.to_string()))),
        "toggle" | "t" => Ok(Input::Gesture(pick(rest)?.on_toggle.into())),
        "rm" | "delete" => Ok(Input::Gesture(pick(rest)?.on_delete.into())),
        "menu" | "m" => Ok(Input::Gesture(Gesture::MenuTriggerClicked)),
        "filter" | "f" => Ok(Input::Gesture(Gesture::FilterSelected(rest.parse()?))),
        "list" | "ls" | "" => Ok(Input::Show),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" | "q" => Ok(Input::Quit),
        other => Err(format!("unknown command: {}", other)),
    }
}

enum Settled {
    Created(Result<CreatedTask, RemoteError>),
    Updated,
}

async fn shell(store: &mut TaskStore, view: &mut Projector) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: JoinSet<Settled> = JoinSet::new();

    eprintln!("{}", HELP);
    view.render(store);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line, &view.frame(store)) {
                    Ok(Input::Gesture(gesture)) => match view.dispatch(store, gesture) {
                        Some(Pending::Create(pending)) => {
                            in_flight.spawn(async move { Settled::Created(pending.send().await) });
                        }
                        Some(Pending::Update(pending)) => {
                            in_flight.spawn(async move {
                                let _ = pending.send().await;
                                Settled::Updated
                            });
                        }
                        None => {}
                    },
                    Ok(Input::Show) => view.render(store),
                    Ok(Input::Help) => eprintln!("{}", HELP),
                    Ok(Input::Quit) => break,
                    Err(msg) => eprintln!("{}", msg),
                }
            }
            Some(joined) = in_flight.join_next() => {
                settle(store, view, joined);
            }
        }
    }

    // Let in-flight creates land before exiting
    while let Some(joined) = in_flight.join_next().await {
        settle(store, view, joined);
    }

    Ok(())
}

fn settle(store: &mut TaskStore, view: &mut Projector, joined: Result<Settled, tokio::task::JoinError>) {
    match joined {
        Ok(Settled::Created(outcome)) => {
            view.settle(store, outcome);
        }
        Ok(Settled::Updated) => {}
        Err(e) => debug!(error = %e, "remote task aborted"),
    }
}
