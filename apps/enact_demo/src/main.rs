mod config;
mod host;

use std::{path::PathBuf, rc::Rc, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use enact_core::{MountHandle, ScopeManager, UiEvent};
use search_client::NpmsClient;
use tokio::task::LocalSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use workflows::{counter, search, stopwatch, SearchProps, StopwatchProps};

use crate::{
    config::{load_settings, Settings},
    host::FramePrinter,
};

#[derive(Parser, Debug)]
#[command(name = "enact-demo", about = "Drive enact components from the terminal")]
struct Cli {
    /// Settings file (defaults to ./enact.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the stopwatch, let it run, then stop it.
    Stopwatch {
        #[arg(long, default_value_t = 250)]
        run_ms: u64,
        #[arg(long)]
        tick_ms: Option<u64>,
    },
    /// Click the counter a few times.
    Counter {
        #[arg(long, default_value_t = 3)]
        clicks: u32,
    },
    /// Type each query into the search box in turn.
    Search {
        queries: Vec<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        debounce_ms: Option<u64>,
        /// How long to keep rendering after the last query.
        #[arg(long, default_value_t = 3000)]
        wait_ms: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    LocalSet::new().block_on(&runtime, run(cli.command, settings))
}

async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
    let manager = ScopeManager::new();
    let mut printer = FramePrinter::new(std::io::stdout());
    let frame = Duration::from_millis(settings.frame_ms.max(1));

    match command {
        Command::Stopwatch { run_ms, tick_ms } => {
            let tick = Duration::from_millis(tick_ms.unwrap_or(settings.tick_ms));
            let (handle, _task) = manager.mount(stopwatch, StopwatchProps { tick })?;
            printer.run(handle.slot(), frame, frame).await?;
            click(&handle, "start", UiEvent::Click);
            printer.run(handle.slot(), frame, Duration::from_millis(run_ms)).await?;
            click(&handle, "stop", UiEvent::Click);
            printer.run(handle.slot(), frame, frame * 2).await?;
        }
        Command::Counter { clicks } => {
            let (handle, _task) = manager.mount(counter, 0)?;
            printer.run(handle.slot(), frame, frame).await?;
            for _ in 0..clicks {
                click(&handle, "count", UiEvent::Click);
                printer.run(handle.slot(), frame, frame).await?;
            }
        }
        Command::Search {
            queries,
            url,
            debounce_ms,
            wait_ms,
        } => {
            let url = url.unwrap_or(settings.search_url);
            let client = NpmsClient::new(&url)
                .with_context(|| format!("invalid search url '{url}'"))?
                .with_page_size(settings.search_page_size);
            let props = SearchProps {
                query: None,
                client: Rc::new(client),
                debounce: Duration::from_millis(debounce_ms.unwrap_or(settings.search_debounce_ms)),
            };
            let (handle, _task) = manager.mount(search, props)?;
            printer.run(handle.slot(), frame, frame).await?;
            for query in queries {
                info!(%query, "typing query");
                click(&handle, "query", UiEvent::Input(query));
                printer.run(handle.slot(), frame, frame * 4).await?;
            }
            printer.run(handle.slot(), frame, Duration::from_millis(wait_ms)).await?;
        }
    }

    manager.shutdown().await?;
    info!(frames = printer.frames(), "demo finished");
    Ok(())
}

fn click<P: Clone + 'static>(handle: &MountHandle<P>, id: &str, event: UiEvent) {
    if !handle.slot().dispatch(id, &event) {
        warn!(id, ?event, "event was not handled");
    }
}
