//! home-dashboard-daemon: Backend for the voice-controlled home dashboard
//!
//! Mirrors three switches (alarm, override, movie night) from a realtime
//! database and changes them on request from dashboard clients:
//! - Direct toggles of one switch
//! - Voice commands: the client captures speech, the daemon classifies the
//!   transcript and writes the value the intent carries
//! - IPC over a Unix socket for status, requests, and push notifications
//!
//! Speech recognition, storage, and intent classification are external;
//! this daemon only connects them.

mod classifier;
mod config;
mod dispatch;
mod events;
mod ipc;
mod lifecycle;
mod state;
mod store;
mod sync;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::classifier::{DialogflowClassifier, IntentClassifier, Unconfigured};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::events::DashboardEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::state::{DashboardMachine, DashboardState};
use crate::store::{MemoryStore, RealtimeDbStore, RemoteStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "home-dashboard-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config, "configuration loaded");

    let mut shutdown = ShutdownSignal::new().context("failed to register signal handlers")?;

    let store: Arc<dyn RemoteStore> = match &config.database {
        Some(database) => Arc::new(
            RealtimeDbStore::new(&database.url, database.auth.clone())
                .context("invalid realtime database configuration")?,
        ),
        None => {
            warn!("no realtime database configured, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let classifier: Arc<dyn IntentClassifier> = match &config.classifier {
        Some(c) => Arc::new(DialogflowClassifier::new(
            &c.project_id,
            &c.access_token,
            &c.language_code,
        )),
        None => {
            warn!("no intent classifier configured, voice commands will be refused");
            Arc::new(Unconfigured)
        }
    };

    // Subscriptions, IPC requests, and finished work -> dashboard loop
    let (input_tx, input_rx) = mpsc::channel(64);
    // Dashboard loop -> subscribed IPC clients
    let (event_tx, _event_rx) = broadcast::channel::<DashboardEvent>(64);
    // Dashboard loop -> status queries
    let (snapshot_tx, snapshot_rx) = watch::channel(DashboardState::default());

    let dispatcher = Arc::new(Dispatcher::new(classifier, Arc::clone(&store)));
    let mut machine = DashboardMachine::new(
        Arc::clone(&store),
        dispatcher,
        input_tx.clone(),
        event_tx.clone(),
        snapshot_tx,
    );

    let subscriptions = sync::spawn_subscriptions(
        Arc::clone(&store),
        input_tx.clone(),
        sync::Backoff::default(),
    );

    let server = Server::new(&config.socket_path, input_tx, snapshot_rx, event_tx)?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        _ = machine.run(input_rx) => {
            info!("dashboard loop exited");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    for subscription in subscriptions {
        subscription.abort();
    }
    server.shutdown().await;

    info!("home-dashboard-daemon stopped");

    Ok(())
}
