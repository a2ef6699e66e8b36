//! UDP Listener Manager
//!
//! One receive loop per bound socket. Every datagram is decoded and
//! dispatched on its own short-lived task, so a slow sink never holds up
//! the socket. There is no application-level queue: under load the kernel
//! socket buffer is the only back-pressure.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use contracts::{EventDispatch, ListenerKind, ListenerState, UdpServerConfig};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::decoder;
use crate::error::{IngestionError, Result};
use crate::metrics::{ListenerMetrics, MetricsSnapshot};

/// Largest possible UDP payload
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Pause after a receive error before reading again
const SOCKET_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Starts UDP listeners that feed the shared dispatch pipeline
pub struct ListenerManager {
    dispatch: Arc<dyn EventDispatch>,
}

impl ListenerManager {
    pub fn new(dispatch: Arc<dyn EventDispatch>) -> Self {
        Self { dispatch }
    }

    /// Bind one listener and start its receive loop
    ///
    /// Publishes a `Bound` status on success and an `Error` status when the
    /// bind fails.
    ///
    /// # Errors
    /// `IngestionError::Bind` if the address is unavailable
    #[instrument(name = "listener_start", skip(self), fields(listener = %kind))]
    pub async fn start_listener(
        &self,
        kind: ListenerKind,
        host: &str,
        port: u16,
    ) -> Result<ListenerHandle> {
        let addr = format!("{host}:{port}");
        let bound = match UdpSocket::bind((host, port)).await {
            Ok(socket) => socket.local_addr().map(|local| (socket, local)),
            Err(e) => Err(e),
        };

        let (socket, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                error!(listener = %kind, addr = %addr, error = %source, "failed to bind UDP server");
                observability::record_listener_state(kind, ListenerState::Error);
                self.dispatch
                    .publish_status(kind, ListenerState::Error, None)
                    .await;
                return Err(IngestionError::Bind {
                    listener: kind,
                    addr,
                    source,
                });
            }
        };

        let shared = Arc::new(ListenerShared {
            kind,
            local_addr,
            state: Mutex::new(ListenerState::Bound),
            metrics: ListenerMetrics::new(),
            dispatch: self.dispatch.clone(),
        });

        info!(listener = %kind, local_addr = %local_addr, "UDP server listening");
        observability::record_listener_state(kind, ListenerState::Bound);
        self.dispatch
            .publish_status(kind, ListenerState::Bound, Some(local_addr))
            .await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(receive_loop(shared.clone(), socket, shutdown_rx));

        Ok(ListenerHandle {
            shared,
            shutdown_tx,
            task: Some(task),
        })
    }

    /// Start both listeners from configuration
    ///
    /// A listener that fails to bind is logged and skipped; the other one
    /// still starts.
    pub async fn start_configured(&self, udp: &UdpServerConfig) -> Vec<ListenerHandle> {
        let mut handles = Vec::with_capacity(ListenerKind::ALL.len());
        for kind in ListenerKind::ALL {
            match self.start_listener(kind, &udp.host, udp.port_for(kind)).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(listener = %kind, error = %e, "listener unavailable until restart")
                }
            }
        }
        handles
    }
}

/// State shared between a handle, its receive loop and datagram tasks
struct ListenerShared {
    kind: ListenerKind,
    local_addr: SocketAddr,
    state: Mutex<ListenerState>,
    metrics: ListenerMetrics,
    dispatch: Arc<dyn EventDispatch>,
}

impl ListenerShared {
    fn state(&self) -> ListenerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a transition if legal; true when the state changed
    fn transition(&self, next: ListenerState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.can_transition_to(next) {
            *state = next;
            true
        } else {
            false
        }
    }

    /// Only the first error of a listener's lifetime is published
    fn on_socket_error(self: &Arc<Self>, err: std::io::Error, tasks: &mut JoinSet<()>) {
        self.metrics.record_socket_error();

        if !self.transition(ListenerState::Error) {
            warn!(
                listener = %self.kind,
                local_addr = %self.local_addr,
                error = %err,
                "UDP server error"
            );
            return;
        }

        error!(
            listener = %self.kind,
            local_addr = %self.local_addr,
            error = %err,
            "UDP server error, listener degraded"
        );
        observability::record_listener_state(self.kind, ListenerState::Error);

        let shared = self.clone();
        tasks.spawn(async move {
            shared
                .dispatch
                .publish_status(shared.kind, ListenerState::Error, Some(shared.local_addr))
                .await;
        });
    }
}

/// Receive until shutdown, then wait for every datagram task it spawned
///
/// Dispatches started before shutdown run to completion; each is bounded
/// by the dispatcher's sink timeout.
async fn receive_loop(
    shared: Arc<ListenerShared>,
    socket: UdpSocket,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    warn!(listener = %shared.kind, error = %e, "datagram task ended abnormally");
                }
            }

            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => {
                    shared.metrics.record_received();
                    observability::record_datagram_received(shared.kind, len);
                    let raw = Bytes::copy_from_slice(&buf[..len]);
                    in_flight.spawn(handle_datagram(shared.clone(), raw, peer));
                }
                Err(err) => {
                    shared.on_socket_error(err, &mut in_flight);
                    tokio::time::sleep(SOCKET_ERROR_BACKOFF).await;
                }
            }
        }
    }

    drop(socket);
    if !in_flight.is_empty() {
        debug!(
            listener = %shared.kind,
            pending = in_flight.len(),
            "waiting for in-flight dispatches"
        );
    }
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!(listener = %shared.kind, error = %e, "datagram task ended abnormally");
        }
    }

    debug!(listener = %shared.kind, "receive loop stopped");
}

async fn handle_datagram(shared: Arc<ListenerShared>, raw: Bytes, peer: SocketAddr) {
    let event = match decoder::decode(shared.kind, &raw) {
        Ok(event) => event,
        Err(err) => {
            shared.metrics.record_decode_failure();
            observability::record_decode_failure(shared.kind);
            warn!(
                listener = %shared.kind,
                peer = %peer,
                error = %err,
                "dropping malformed datagram"
            );
            return;
        }
    };

    debug!(
        listener = %shared.kind,
        peer = %peer,
        source_id = %event.source_id,
        category = %event.category(),
        "datagram decoded"
    );

    shared.metrics.record_dispatched();
    let report = shared.dispatch.dispatch(event).await;
    if report.is_empty() {
        debug!(listener = %shared.kind, category = %report.category, "no sink routed");
    }
}

/// Handle to a running listener
///
/// Dropping the handle stops the receive loop as well; `shutdown` also
/// waits for it to exit, including every dispatch it had started.
pub struct ListenerHandle {
    shared: Arc<ListenerShared>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn kind(&self) -> ListenerKind {
        self.shared.kind
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.shared.local_addr
    }

    pub fn state(&self) -> ListenerState {
        self.shared.state()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop receiving and release the socket
    #[instrument(
        name = "listener_shutdown",
        skip(self),
        fields(listener = %self.shared.kind, local_addr = %self.shared.local_addr)
    )]
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "receive loop ended abnormally");
            }
        }
        info!("UDP server stopped");
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
