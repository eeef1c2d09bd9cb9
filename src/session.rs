//! Connection session state machine.
//!
//! The link layer pushes connect/disconnect events onto a channel; the
//! [`SessionDriver`] is the sole owner of the [`Session`] aggregate and
//! processes events sequentially, so a connect racing with an in-progress
//! discovery sequence serializes behind it instead of corrupting shared
//! state. A disconnect at any point discards the session wholesale; the next
//! connect starts a brand-new one from scratch.

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::ble::client::{DiscoveredCharacteristic, GattClient, NotificationEvent};
use crate::ble::uuids::THERMO_NOTIFY_UUID;
use crate::identity::DeviceIdentity;
use crate::mqtt::{MessageTransport, TelemetryPublisher};
use crate::profile;
use crate::reading::ProbeReading;

/// Connection session status.
///
/// Transitions are monotonic forward except for the Disconnected reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// No link to the peripheral; initial state and reset target.
    #[default]
    Disconnected,
    /// Link established, profile not yet resolved.
    Connected,
    /// Discovery script completed, notify characteristic known.
    ProfileResolved,
    /// Notification subscription active, telemetry flowing.
    Streaming,
    /// A fatal discovery or subscription error occurred; absorbing until the
    /// next disconnect.
    Failed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected => write!(f, "Connected"),
            Self::ProfileResolved => write!(f, "ProfileResolved"),
            Self::Streaming => write!(f, "Streaming"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Event from the radio link layer.
pub enum LinkEvent<C> {
    /// The peripheral connected; carries the GATT client for the new session.
    Connected(C),
    /// The link dropped.
    Disconnected,
}

/// The aggregate connection state: status, identity, and the notify
/// characteristic handle. Exactly one session is live at a time.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Current status.
    pub status: SessionStatus,
    /// Identity populated during profile resolution.
    pub identity: DeviceIdentity,
    /// The subscribed thermo characteristic, once streaming.
    pub notify_characteristic: Option<DiscoveredCharacteristic>,
}

/// Drives sessions in response to link events and routes notification frames
/// to the telemetry publisher.
pub struct SessionDriver<C, T> {
    publisher: TelemetryPublisher<T>,
    device_name_fallback: String,
    session: Session,
    client: Option<C>,
    notifications: Option<broadcast::Receiver<NotificationEvent>>,
}

impl<C: GattClient, T: MessageTransport> SessionDriver<C, T> {
    /// Create a driver in the Disconnected state.
    pub fn new(publisher: TelemetryPublisher<T>, device_name_fallback: String) -> Self {
        Self {
            publisher,
            device_name_fallback,
            session: Session::default(),
            client: None,
            notifications: None,
        }
    }

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    /// The current session aggregate.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Process link events until the channel closes.
    ///
    /// Fatal session errors do not end the loop; the driver keeps awaiting
    /// the next connect event.
    pub async fn run(mut self, mut events: mpsc::Receiver<LinkEvent<C>>) {
        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(LinkEvent::Connected(client)) => self.handle_connect(client).await,
                        Some(LinkEvent::Disconnected) => self.handle_disconnect(),
                        None => break,
                    }
                }
                Some(notification) = next_notification(&mut self.notifications) => {
                    self.handle_notification(notification).await;
                }
            }
        }

        debug!("Link event channel closed, session driver stopping");
    }

    /// A connect event: start a brand-new session and run the discovery
    /// sequence through to streaming.
    async fn handle_connect(&mut self, client: C) {
        self.reset();
        self.set_status(SessionStatus::Connected);
        info!("Peripheral connected, resolving device profile");

        let resolved = match profile::resolve_profile(&client).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("Profile resolution failed: {}", e);
                self.client = Some(client);
                self.set_status(SessionStatus::Failed);
                return;
            }
        };

        self.session.identity = resolved.identity;
        self.set_status(SessionStatus::ProfileResolved);

        // The retained config must go out before any state message, and
        // again on every reconnect. A failed publish is logged but does not
        // fail the session; telemetry is still worth streaming.
        if let Err(e) = self
            .publisher
            .publish_device_config(&self.session.identity, &self.device_name_fallback)
            .await
        {
            warn!("Could not publish device config: {}", e);
        }

        match client.subscribe_notify(&resolved.notify_characteristic).await {
            Ok(()) => {
                self.notifications = Some(client.notifications());
                self.session.notify_characteristic = Some(resolved.notify_characteristic);
                self.client = Some(client);
                self.set_status(SessionStatus::Streaming);
                info!("Subscribed to thermo notifications, streaming telemetry");
            }
            Err(e) => {
                error!("Could not subscribe to thermo notifications: {}", e);
                self.client = Some(client);
                self.set_status(SessionStatus::Failed);
            }
        }
    }

    /// A disconnect event: discard the session regardless of which step was
    /// in flight. All discovered characteristic handles die with the client.
    fn handle_disconnect(&mut self) {
        info!("Peripheral disconnected, resetting session");
        self.reset();
    }

    /// Route one notification frame to the publisher.
    ///
    /// Must stay non-blocking on the radio side: decode and publish only.
    async fn handle_notification(&self, event: NotificationEvent) {
        if event.characteristic_uuid != THERMO_NOTIFY_UUID {
            return;
        }

        let reading = match ProbeReading::decode(&event.data) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Dropping malformed thermo notification: {}", e);
                return;
            }
        };

        if let Err(e) = self.publisher.publish_probe_value(&reading).await {
            warn!("Could not publish probe {} value: {}", reading.probe, e);
        }
    }

    fn reset(&mut self) {
        self.client = None;
        self.notifications = None;
        self.session = Session::default();
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.session.status != status {
            debug!("Session status: {} -> {}", self.session.status, status);
            self.session.status = status;
        }
    }
}

/// Await the next notification, pending forever while no subscription is
/// active so the select loop parks on link events alone.
async fn next_notification(
    notifications: &mut Option<broadcast::Receiver<NotificationEvent>>,
) -> Option<NotificationEvent> {
    use tokio::sync::broadcast::error::RecvError;

    let Some(receiver) = notifications.as_mut() else {
        return std::future::pending().await;
    };

    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Notification receiver lagged, {} frames skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }

    debug!("Notification channel closed");
    *notifications = None;
    std::future::pending().await
}
