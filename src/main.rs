//! Thread reactor replay driver
//!
//! Reads engine lifecycle events as JSON lines from a file or stdin, feeds
//! them through the reactor and prints every title request it publishes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thread_reactor::bus::{handler, BusEvent, EventBus, EventKind};
use thread_reactor::config::ReactorConfig;
use thread_reactor::db::Database;
use thread_reactor::runtime::{hydrate_store, ProductionReactor};
use thread_reactor::store::ReactiveStore;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Extra time after the settle window for the last deferred tasks to land
const SETTLE_MARGIN: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries title requests
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thread_reactor=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ReactorConfig::from_env()?;
    let db_path = std::env::var("THREAD_REACTOR_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.thread-reactor/threads.db")
    });

    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    let store = Arc::new(ReactiveStore::new());
    hydrate_store(&store, &db)?;

    let mut load_status = store.watch_load_status();
    tokio::spawn(async move {
        while load_status.changed().await.is_ok() {
            let status = load_status.borrow_and_update().clone();
            tracing::info!(status = ?status, model = status.model(), "Model load status changed");
        }
    });

    let bus = Arc::new(EventBus::new());
    let printer = handler(|event| {
        if let BusEvent::MessageSendRequested(request) = event {
            match serde_json::to_string(request) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Failed to encode title request"),
            }
        }
    });
    bus.subscribe(EventKind::MessageSendRequested, &printer);

    let settle_window = config.settle_window();
    let reactor = ProductionReactor::production(Arc::clone(&bus), Arc::clone(&store), db, config);
    reactor.activate();

    let input: Box<dyn AsyncRead + Unpin + Send> = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(path = %path, "Replaying events from file");
            Box::new(tokio::fs::File::open(path).await?)
        }
        None => Box::new(tokio::io::stdin()),
    };
    let forwarded = replay(&bus, input).await?;

    // Let the loop drain, then give deferred work its window
    let mut processed = reactor.watch_processed();
    processed.wait_for(|n| *n >= forwarded).await?;
    tokio::time::sleep(settle_window + SETTLE_MARGIN).await;

    reactor.shutdown().await;
    bus.unsubscribe(EventKind::MessageSendRequested, &printer);
    tracing::info!(events = forwarded, "Replay finished");
    Ok(())
}

/// Publish every event line; returns how many went to the reactor
async fn replay(bus: &EventBus, input: impl AsyncRead + Unpin) -> std::io::Result<u64> {
    let mut lines = BufReader::new(input).lines();
    let mut forwarded = 0;
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<BusEvent>(&line) {
            Ok(event) => {
                tracing::debug!(line = line_no, kind = %event.kind(), "Publishing event");
                if event.kind() != EventKind::MessageSendRequested {
                    forwarded += 1;
                }
                bus.publish(&event);
            }
            Err(e) => tracing::warn!(line = line_no, error = %e, "Skipping malformed event"),
        }
    }

    Ok(forwarded)
}
