//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! dashboard events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::events::DashboardEvent;
use crate::state::{DashboardState, Input};

use super::protocol::{read_frame, write_frame, DashboardStatus, Request, Response};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Handles every client needs
struct Shared {
    input_tx: mpsc::Sender<Input>,
    snapshot_rx: watch::Receiver<DashboardState>,
    event_tx: broadcast::Sender<DashboardEvent>,
    start_time: Instant,
}

impl Server {
    /// Bind the socket and prepare to serve the dashboard
    pub fn new(
        socket_path: &Path,
        input_tx: mpsc::Sender<Input>,
        snapshot_rx: watch::Receiver<DashboardState>,
        event_tx: broadcast::Sender<DashboardEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            shared: Arc::new(Shared {
                input_tx,
                snapshot_rx,
                event_tx,
                start_time: Instant::now(),
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        // Responses and notifications share one writer so frames never interleave
        let (out_tx, mut out_rx) = mpsc::channel::<Response>(64);
        let writer_task: JoinHandle<Result<()>> = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                write_frame(&mut writer, &msg).await?;
            }
            Ok(())
        });

        let mut forwarder: Option<JoinHandle<()>> = None;
        let result = Self::serve_requests(&mut reader, &shared, &out_tx, &mut forwarder).await;

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        drop(out_tx);
        match writer_task.await {
            Ok(Err(e)) => debug!(?e, "client writer stopped"),
            Err(e) => debug!(?e, "client writer task failed"),
            Ok(Ok(())) => {}
        }

        result
    }

    /// Read requests until the client disconnects
    async fn serve_requests(
        reader: &mut OwnedReadHalf,
        shared: &Shared,
        out_tx: &mpsc::Sender<Response>,
        forwarder: &mut Option<JoinHandle<()>>,
    ) -> Result<()> {
        loop {
            let Some(body) = read_frame(reader).await? else {
                debug!("client disconnected");
                return Ok(());
            };

            let response = match serde_json::from_slice::<Request>(&body) {
                Ok(request) => {
                    debug!(?request, "received request");
                    let subscribe = request == Request::Subscribe;
                    let response = Self::process_request(request, shared).await;

                    if subscribe && forwarder.is_none() {
                        debug!("client subscribed to notifications");
                        *forwarder = Some(Self::forward_events(shared, out_tx.clone()));
                    }
                    response
                }
                Err(e) => {
                    warn!(?e, "malformed request");
                    Response::error("bad_request", e.to_string())
                }
            };

            if out_tx.send(response).await.is_err() {
                // Writer gone, the client stopped reading
                return Ok(());
            }
        }
    }

    /// Push every dashboard event to one client
    fn forward_events(shared: &Shared, out_tx: mpsc::Sender<Response>) -> JoinHandle<()> {
        let mut events = shared.event_tx.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if out_tx.send(Response::Notification { event }).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged behind dashboard events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Process a request and return a response
    async fn process_request(request: Request, shared: &Shared) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let state = shared.snapshot_rx.borrow().clone();
                let uptime = shared.start_time.elapsed().as_secs();
                Response::Status(DashboardStatus::new(state, uptime))
            }

            Request::Subscribe => Response::Subscribed,

            request => {
                let Some(input) = request.into_input() else {
                    return Response::error("bad_request", "request carries no action");
                };
                match shared.input_tx.send(input).await {
                    Ok(()) => Response::Accepted,
                    Err(_) => Response::error("unavailable", "dashboard loop stopped"),
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoticeLevel;
    use crate::state::DeviceAttribute;

    struct Fixture {
        server: Arc<Server>,
        input_rx: mpsc::Receiver<Input>,
        snapshot_tx: watch::Sender<DashboardState>,
        event_tx: broadcast::Sender<DashboardEvent>,
        socket_path: PathBuf,
    }

    fn fixture() -> Fixture {
        let socket_path =
            std::env::temp_dir().join(format!("home-dashboard-{}.sock", uuid::Uuid::new_v4()));
        let (input_tx, input_rx) = mpsc::channel(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardState::default());
        let (event_tx, _) = broadcast::channel(16);

        let server = Arc::new(
            Server::new(&socket_path, input_tx, snapshot_rx, event_tx.clone()).unwrap(),
        );
        let running = Arc::clone(&server);
        tokio::spawn(async move { running.run().await });

        Fixture {
            server,
            input_rx,
            snapshot_tx,
            event_tx,
            socket_path,
        }
    }

    async fn call(stream: &mut UnixStream, request: &Request) -> Response {
        write_frame(stream, request).await.unwrap();
        receive(stream).await
    }

    async fn receive(stream: &mut UnixStream) -> Response {
        let body = read_frame(stream).await.unwrap().unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_ping_and_status() {
        let f = fixture();
        let mut stream = UnixStream::connect(&f.socket_path).await.unwrap();

        assert_eq!(call(&mut stream, &Request::Ping).await, Response::Pong);

        f.snapshot_tx.send_modify(|s| s.values.alarm = "on".into());
        match call(&mut stream, &Request::GetStatus).await {
            Response::Status(status) => {
                assert_eq!(status.state.values.alarm, "on");
                assert!(!status.listening);
            }
            other => panic!("unexpected response {other:?}"),
        }

        f.server.shutdown().await;
        assert!(!f.socket_path.exists());
    }

    #[tokio::test]
    async fn test_toggle_is_forwarded_to_dashboard() {
        let mut f = fixture();
        let mut stream = UnixStream::connect(&f.socket_path).await.unwrap();

        let request = Request::Toggle {
            attribute: DeviceAttribute::Override,
        };
        assert_eq!(call(&mut stream, &request).await, Response::Accepted);
        assert!(matches!(
            f.input_rx.recv().await,
            Some(Input::Toggle(DeviceAttribute::Override))
        ));

        f.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_request_keeps_connection() {
        let f = fixture();
        let mut stream = UnixStream::connect(&f.socket_path).await.unwrap();

        write_frame(&mut stream, &serde_json::json!({"type": "launch_rockets"}))
            .await
            .unwrap();
        assert!(matches!(
            receive(&mut stream).await,
            Response::Error { code, .. } if code == "bad_request"
        ));
        assert_eq!(call(&mut stream, &Request::Ping).await, Response::Pong);

        f.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let f = fixture();
        let mut stream = UnixStream::connect(&f.socket_path).await.unwrap();

        assert_eq!(call(&mut stream, &Request::Subscribe).await, Response::Subscribed);

        // The forwarder subscribes before the reply is queued
        let event = DashboardEvent::notice(NoticeLevel::Warning, "No intent detected.");
        f.event_tx.send(event.clone()).unwrap();

        assert_eq!(receive(&mut stream).await, Response::Notification { event });

        f.server.shutdown().await;
    }
}
