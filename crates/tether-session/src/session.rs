//! Session lifecycle: the state machine and the driver task that
//! polls the MQTT event loop.
//!
//! One long-lived connection per `SessionManager`. The driver task
//! owns all state transitions; observers read them through a watch
//! channel (current state) and a broadcast stream (transition events).

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, Packet};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use tether_identity::DeviceIdentity;

use crate::client::{PubSubClient, SharedTransport};
use crate::config::ConnectionConfig;
use crate::error::{SessionError, SessionResult};
use crate::state::{SessionState, StatusEvent};
use crate::subscriptions::SubscriptionTable;
use crate::transport::{self, MqttTransport, Transport};

/// How long `disconnect` waits for the driver task before aborting it.
const DRIVER_JOIN_TIMEOUT: Duration = Duration::from_millis(1500);

/// Capacity of the status event broadcast channel.
const STATUS_CHANNEL_CAPACITY: usize = 32;

// ── Shared session state ──────────────────────────────────────

/// State shared between the manager, the driver task, and facades.
pub(crate) struct SessionShared {
    state_tx: watch::Sender<SessionState>,
    events_tx: broadcast::Sender<StatusEvent>,
    pub(crate) table: Arc<SubscriptionTable>,
}

impl SessionShared {
    pub(crate) fn new(initial: SessionState) -> Arc<Self> {
        let (state_tx, _) = watch::channel(initial);
        let (events_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Arc::new(Self {
            state_tx,
            events_tx,
            table: Arc::new(SubscriptionTable::new()),
        })
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<StatusEvent> {
        self.events_tx.subscribe()
    }

    /// Move to `state`, notifying observers. Re-entering the current
    /// state is a no-op so repeated reconnect attempts don't spam the
    /// event stream.
    pub(crate) fn transition(&self, state: SessionState, error: Option<String>) {
        if self.state() == state {
            return;
        }
        self.state_tx.send_replace(state);
        match &error {
            Some(e) => tracing::warn!(state = %state, error = %e, "session state changed"),
            None => tracing::info!(state = %state, "session state changed"),
        }
        let _ = self.events_tx.send(StatusEvent {
            state,
            error,
            timestamp: chrono::Utc::now(),
        });
    }
}

// ── Reconnect backoff ─────────────────────────────────────────

/// Exponential backoff between reconnect attempts, reset on a
/// successful CONNACK.
struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    fn next(&mut self) -> Duration {
        let factor = 1u32 << self.attempt.min(16);
        let delay = self.base.saturating_mul(factor).min(self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}

// ── Driver ────────────────────────────────────────────────────

/// What the driver should do after handling a poll error.
enum Step {
    /// Sleep, then poll again (rumqttc reconnects on the next poll).
    Retry(Duration),
    /// Stop; retrying with the same identity cannot succeed.
    Terminal,
}

struct Driver {
    shared: Arc<SessionShared>,
    backoff: Backoff,
}

impl Driver {
    fn new(shared: Arc<SessionShared>, config: &ConnectionConfig) -> Self {
        let backoff = Backoff::new(
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_secs(config.backoff_max_secs),
        );
        Self { shared, backoff }
    }

    /// CONNACK received. Success resets backoff and enters Connected;
    /// a rejection is terminal.
    fn on_connack(&mut self, code: ConnectReturnCode) -> Option<Step> {
        if code == ConnectReturnCode::Success {
            self.backoff.reset();
            self.shared.transition(SessionState::Connected, None);
            None
        } else {
            self.shared.transition(
                SessionState::TerminallyFailed,
                Some(SessionError::AuthRejected(format!("{code:?}")).to_string()),
            );
            Some(Step::Terminal)
        }
    }

    /// Poll failed. Auth/TLS rejections are terminal; everything else
    /// enters the reconnect path. A drop of an established session
    /// passes through ConnectionLost first; the subscription table is
    /// cleared because the broker forgot our subscriptions with it.
    fn on_error(&mut self, error: &ConnectionError) -> Step {
        if is_terminal(error) {
            self.shared.transition(
                SessionState::TerminallyFailed,
                Some(SessionError::AuthRejected(error.to_string()).to_string()),
            );
            return Step::Terminal;
        }

        if self.shared.state() == SessionState::Connected {
            self.shared
                .transition(SessionState::ConnectionLost, Some(error.to_string()));
            self.shared.table.clear();
        }
        self.shared
            .transition(SessionState::Reconnecting, Some(error.to_string()));
        Step::Retry(self.backoff.next())
    }
}

/// Rejections that cannot be fixed by retrying with the same identity.
fn is_terminal(error: &ConnectionError) -> bool {
    matches!(
        error,
        ConnectionError::ConnectionRefused(_) | ConnectionError::Tls(_)
    )
}

/// Drive the MQTT event loop until disconnect or terminal failure.
async fn run_driver(
    mut eventloop: EventLoop,
    shared: Arc<SessionShared>,
    config: ConnectionConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut driver = Driver::new(Arc::clone(&shared), &config);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                break;
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if let Some(Step::Terminal) = driver.on_connack(ack.code) {
                        return;
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    shared.table.dispatch(&publish.topic, &publish.payload);
                }
                Ok(_) => {}
                Err(e) => match driver.on_error(&e) {
                    Step::Terminal => return,
                    Step::Retry(delay) => {
                        tracing::debug!(delay_ms = delay.as_millis() as u64, "reconnect backoff");
                        tokio::select! {
                            _ = shutdown_rx.changed() => break,
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                },
            }
        }
    }

    // Shutdown requested.
    shared.table.clear();
    shared.transition(SessionState::Disconnected, None);
}

// ── Session manager ───────────────────────────────────────────

/// Owns the TLS+MQTT session lifecycle for one device.
///
/// `connect` spawns a driver task that polls the event loop, applies
/// state transitions, and dispatches inbound publishes. `disconnect`
/// is safe in any state and unblocks an in-progress connect attempt
/// within a bounded time.
pub struct SessionManager {
    config: ConnectionConfig,
    shared: Arc<SessionShared>,
    transport: SharedTransport,
    identity: StdMutex<Option<DeviceIdentity>>,
    shutdown_tx: StdMutex<Option<watch::Sender<bool>>>,
    driver: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(config: ConnectionConfig) -> SessionResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            shared: SessionShared::new(SessionState::Disconnected),
            transport: Arc::new(StdMutex::new(None)),
            identity: StdMutex::new(None),
            shutdown_tx: StdMutex::new(None),
            driver: tokio::sync::Mutex::new(None),
        })
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Stream of state transitions.
    pub fn status_events(&self) -> broadcast::Receiver<StatusEvent> {
        self.shared.subscribe_events()
    }

    /// Pub/sub facade bound to this session. Cheap to clone; all
    /// operations check the session state.
    pub fn client(&self) -> PubSubClient {
        PubSubClient::new(
            Arc::clone(&self.shared),
            Arc::clone(&self.transport),
            self.config.max_payload_bytes,
        )
    }

    /// Cache `identity` and connect with it.
    pub async fn connect_with(&self, identity: DeviceIdentity) -> SessionResult<()> {
        *self.identity.lock().unwrap() = Some(identity);
        self.connect().await
    }

    /// Connect using the cached identity.
    ///
    /// Fails with `NoIdentity` if none was supplied, `AlreadyConnected`
    /// if a session is active.
    pub async fn connect(&self) -> SessionResult<()> {
        if self.state().is_active() {
            return Err(SessionError::AlreadyConnected);
        }
        let identity = self
            .identity
            .lock()
            .unwrap()
            .clone()
            .ok_or(SessionError::NoIdentity)?;

        let options = transport::build_mqtt_options(&self.config, &identity)?;
        let (client, eventloop) = AsyncClient::new(options, 64);
        *self.transport.lock().unwrap() =
            Some(Arc::new(MqttTransport::new(client)) as Arc<dyn Transport>);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.shutdown_tx.lock().unwrap() = Some(shutdown_tx);

        tracing::info!(
            client_id = %self.config.client_id,
            endpoint = %self.config.endpoint_host,
            certificate_id = %identity.certificate_id,
            "connecting"
        );
        self.shared.transition(SessionState::Connecting, None);

        let handle = tokio::spawn(run_driver(
            eventloop,
            Arc::clone(&self.shared),
            self.config.clone(),
            shutdown_rx,
        ));
        *self.driver.lock().await = Some(handle);
        Ok(())
    }

    /// Disconnect the session. Safe in any state; terminal until the
    /// next `connect`. Unblocks an in-progress connect/reconnect
    /// attempt promptly rather than waiting for a network timeout.
    pub async fn disconnect(&self) {
        if let Some(tx) = self.shutdown_tx.lock().unwrap().take() {
            let _ = tx.send(true);
        }

        // Best effort: a clean DISCONNECT so the broker skips the LWT.
        let transport = self.transport.lock().unwrap().take();
        if let Some(transport) = transport {
            let _ = transport.disconnect().await;
        }

        if let Some(mut handle) = self.driver.lock().await.take() {
            if tokio::time::timeout(DRIVER_JOIN_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                tracing::warn!("driver task did not stop in time; aborting");
                handle.abort();
            }
        }

        self.shared.table.clear();
        self.shared.transition(SessionState::Disconnected, None);
    }

    /// Wait until the session state satisfies `pred`, or time out.
    pub async fn wait_for_state(
        &self,
        pred: impl Fn(SessionState) -> bool,
        timeout: Duration,
    ) -> SessionResult<SessionState> {
        let mut rx = self.shared.subscribe_state();
        tokio::time::timeout(timeout, async move {
            loop {
                let state = *rx.borrow_and_update();
                if pred(state) {
                    return state;
                }
                if rx.changed().await.is_err() {
                    return state;
                }
            }
        })
        .await
        .map_err(|_| SessionError::Timeout("waiting for session state".into()))
    }
}
