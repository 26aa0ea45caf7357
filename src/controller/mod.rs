//! Router Controller: the outer state machine — connect, authenticate,
//! request host, wait-for-host, relay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::auth::ClientAuthenticator;
use crate::channel::{ChannelListener, NetworkChannel};
use crate::codec::{
    self, ConnectionOffer, HostStatusKind, OfferErrorCode, PeerToRouter, RouterToPeer, WireMessage,
};
use crate::config::RouterConfig;
use crate::error::{ControllerError, NetworkError, RouterErrorCode};
use crate::relay::{RelayListener, RelayPeer, TcpRelayPeer};
use crate::types::{HostId, Version, ROUTER_CHANNEL_ID_SESSION, VERSION_2_6_0};

const WAIT_FOR_HOST_POLL: Duration = Duration::from_secs(5);

/// Explicit controller phases. Monotone except the
/// `WaitingForHost ↔ RequestingHost` oscillation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Connecting,
    Authenticating,
    RequestingHost,
    WaitingForHost,
    Relaying,
    Terminated,
}

/// The controller's four outbound callbacks.
#[async_trait]
pub trait Delegate: Send + Sync {
    async fn on_router_connected(&self, router_version: Version);
    async fn on_host_awaiting(&self);
    async fn on_host_connected(&self, data_channel: Box<dyn NetworkChannel>);
    async fn on_error_occurred(&self, error: ControllerError);
}

type SharedChannel = Arc<tokio::sync::Mutex<Box<dyn NetworkChannel>>>;

enum Event {
    Disconnected(NetworkError),
    Received(u8, Bytes),
}

struct QueueListener(mpsc::UnboundedSender<Event>);

impl ChannelListener for QueueListener {
    fn on_connected(&mut self) {}
    fn on_disconnected(&mut self, error: NetworkError) {
        let _ = self.0.send(Event::Disconnected(error));
    }
    fn on_message_received(&mut self, channel_id: u8, bytes: Bytes) {
        let _ = self.0.send(Event::Received(channel_id, bytes));
    }
    fn on_message_written(&mut self, _channel_id: u8, _bytes_written: usize, _pending: usize) {}
}

/// Drives one router session to completion. One instance, one session.
pub struct RouterController {
    config: RouterConfig,
    client_version: Version,
    phase: Mutex<ControllerPhase>,
    wait_timer: Mutex<Option<JoinHandle<()>>>,
    relay_peer: Mutex<Option<Box<dyn RelayPeer>>>,
    relay_factory: Box<dyn Fn() -> Box<dyn RelayPeer> + Send + Sync>,
}

impl RouterController {
    pub fn new(config: RouterConfig, client_version: Version) -> Arc<Self> {
        Self::with_relay_factory(config, client_version, || Box::new(TcpRelayPeer::new()))
    }

    /// As [`RouterController::new`], but constructs relay peers with
    /// `relay_factory` instead of [`TcpRelayPeer`] — used by tests to swap
    /// in [`crate::relay::testing::MockRelayPeer`].
    pub fn with_relay_factory(
        config: RouterConfig,
        client_version: Version,
        relay_factory: impl Fn() -> Box<dyn RelayPeer> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            client_version,
            phase: Mutex::new(ControllerPhase::Idle),
            wait_timer: Mutex::new(None),
            relay_peer: Mutex::new(None),
            relay_factory: Box::new(relay_factory),
        })
    }

    pub fn phase(&self) -> ControllerPhase {
        *self.phase.lock()
    }

    /// Begins the session against `host_id` over `channel`. Preconditions:
    /// `host_id.is_valid()`. `channel` is not yet connected — this drives
    /// `connect`, the handshake, and the router-session protocol to either a
    /// live relay or a terminal error, reporting through `delegate`.
    pub async fn connect_to(
        self: &Arc<Self>,
        mut channel: Box<dyn NetworkChannel>,
        host_id: HostId,
        wait_for_host: bool,
        delegate: Arc<dyn Delegate>,
    ) {
        if !host_id.is_valid() {
            delegate
                .on_error_occurred(ControllerError::Router(RouterErrorCode::PeerNotFound))
                .await;
            return;
        }

        *self.phase.lock() = ControllerPhase::Connecting;
        if let Err(err) = channel.connect(&self.config.address, self.config.port).await {
            *self.phase.lock() = ControllerPhase::Terminated;
            delegate.on_error_occurred(ControllerError::Network(err)).await;
            return;
        }

        channel.set_keep_alive(true);
        channel.set_no_delay(true);

        *self.phase.lock() = ControllerPhase::Authenticating;
        let authenticator = ClientAuthenticator::new(
            self.config.username.clone(),
            self.config.password.expose().to_string(),
            self.client_version,
        );
        let outcome = match authenticator.run(channel).await {
            Ok(outcome) => outcome,
            Err(err) => {
                *self.phase.lock() = ControllerPhase::Terminated;
                delegate
                    .on_error_occurred(ControllerError::Authentication(err))
                    .await;
                return;
            }
        };

        info!(peer_version = ?outcome.peer_version, "router connected");
        delegate.on_router_connected(outcome.peer_version).await;

        let mut channel = outcome.channel;
        let (tx, mut rx) = mpsc::unbounded_channel();
        channel.set_listener(Box::new(QueueListener(tx)));
        if outcome.peer_version >= VERSION_2_6_0 {
            channel.set_channel_id_support(true);
        }
        channel.resume();
        let channel: SharedChannel = Arc::new(tokio::sync::Mutex::new(channel));

        *self.phase.lock() = ControllerPhase::RequestingHost;
        self.send_connection_request(&channel, host_id).await;

        loop {
            match rx.recv().await {
                Some(Event::Disconnected(err)) => {
                    *self.phase.lock() = ControllerPhase::Terminated;
                    delegate.on_error_occurred(ControllerError::Network(err)).await;
                    return;
                }
                Some(Event::Received(channel_id, bytes)) => {
                    if channel_id != ROUTER_CHANNEL_ID_SESSION {
                        warn!(channel_id, "ignoring message on unexpected channel");
                        continue;
                    }
                    let message = match codec::decode_message(&bytes) {
                        Ok(message) => message,
                        Err(err) => {
                            warn!(%err, "dropping malformed router message");
                            continue;
                        }
                    };
                    if self
                        .handle_router_message(message, &channel, host_id, wait_for_host, &delegate)
                        .await
                    {
                        *self.phase.lock() = ControllerPhase::Terminated;
                        return;
                    }
                }
                None => {
                    *self.phase.lock() = ControllerPhase::Terminated;
                    delegate
                        .on_error_occurred(ControllerError::Network(NetworkError::Reset))
                        .await;
                    return;
                }
            }
        }
    }

    async fn send_connection_request(&self, channel: &SharedChannel, host_id: HostId) {
        let message = WireMessage::PeerToRouter(PeerToRouter::ConnectionRequest { host_id });
        self.send(channel, &message).await;
    }

    async fn send_check_host_status(&self, channel: &SharedChannel, host_id: HostId) {
        let message = WireMessage::PeerToRouter(PeerToRouter::CheckHostStatus { host_id });
        self.send(channel, &message).await;
    }

    async fn send(&self, channel: &SharedChannel, message: &WireMessage) {
        match codec::encode_message(message) {
            Ok(bytes) => channel.lock().await.send(ROUTER_CHANNEL_ID_SESSION, bytes),
            Err(err) => warn!(%err, "failed to encode router message"),
        }
    }

    /// Returns `true` if the session should terminate.
    async fn handle_router_message(
        self: &Arc<Self>,
        message: WireMessage,
        channel: &SharedChannel,
        host_id: HostId,
        wait_for_host: bool,
        delegate: &Arc<dyn Delegate>,
    ) -> bool {
        match message {
            WireMessage::RouterToPeer(RouterToPeer::ConnectionOffer(offer)) => {
                self.handle_connection_offer(offer, channel, host_id, wait_for_host, delegate)
                    .await
            }
            WireMessage::RouterToPeer(RouterToPeer::HostStatus(status)) => {
                match status.status {
                    HostStatusKind::Online => {
                        self.cancel_wait_timer();
                        *self.phase.lock() = ControllerPhase::RequestingHost;
                        self.send_connection_request(channel, host_id).await;
                    }
                    HostStatusKind::Offline => {
                        self.enter_waiting_for_host(channel, host_id, delegate).await;
                    }
                }
                false
            }
            other => {
                warn!(?other, "ignoring unrecognized router message");
                false
            }
        }
    }

    /// Returns `true` if the session should terminate.
    async fn handle_connection_offer(
        self: &Arc<Self>,
        offer: ConnectionOffer,
        channel: &SharedChannel,
        host_id: HostId,
        wait_for_host: bool,
        delegate: &Arc<dyn Delegate>,
    ) -> bool {
        if self.relay_peer.lock().is_some() {
            warn!(?host_id, "dropping duplicate connection offer");
            return false;
        }

        match offer.error_code {
            OfferErrorCode::Success if offer.peer_role == crate::codec::PeerRole::Client => {
                let listener = Arc::new(ControllerRelayListener {
                    delegate: delegate.clone(),
                });
                let mut peer = (self.relay_factory)();
                peer.start(offer, listener);
                *self.relay_peer.lock() = Some(peer);
                false
            }
            OfferErrorCode::Success => {
                warn!("connection offer succeeded with unexpected peer role");
                delegate
                    .on_error_occurred(ControllerError::Router(RouterErrorCode::Unknown))
                    .await;
                true
            }
            OfferErrorCode::PeerNotFound => {
                if wait_for_host {
                    self.enter_waiting_for_host(channel, host_id, delegate).await;
                    false
                } else {
                    delegate
                        .on_error_occurred(ControllerError::Router(RouterErrorCode::PeerNotFound))
                        .await;
                    true
                }
            }
            OfferErrorCode::AccessDenied => {
                delegate
                    .on_error_occurred(ControllerError::Router(RouterErrorCode::AccessDenied))
                    .await;
                true
            }
            OfferErrorCode::KeyPoolEmpty => {
                delegate
                    .on_error_occurred(ControllerError::Router(RouterErrorCode::KeyPoolEmpty))
                    .await;
                true
            }
            OfferErrorCode::Other(_) => {
                delegate
                    .on_error_occurred(ControllerError::Router(RouterErrorCode::Unknown))
                    .await;
                true
            }
        }
    }

    async fn enter_waiting_for_host(
        self: &Arc<Self>,
        channel: &SharedChannel,
        host_id: HostId,
        delegate: &Arc<dyn Delegate>,
    ) {
        let was_waiting = matches!(*self.phase.lock(), ControllerPhase::WaitingForHost);
        *self.phase.lock() = ControllerPhase::WaitingForHost;
        if !was_waiting {
            delegate.on_host_awaiting().await;
        }
        self.arm_wait_timer(channel.clone(), host_id);
    }

    fn arm_wait_timer(self: &Arc<Self>, channel: SharedChannel, host_id: HostId) {
        self.cancel_wait_timer();
        let this = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(WAIT_FOR_HOST_POLL).await;
            this.send_check_host_status(&channel, host_id).await;
        });
        *self.wait_timer.lock() = Some(handle);
    }

    fn cancel_wait_timer(&self) {
        if let Some(handle) = self.wait_timer.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for RouterController {
    fn drop(&mut self) {
        self.cancel_wait_timer();
    }
}

struct ControllerRelayListener {
    delegate: Arc<dyn Delegate>,
}

#[async_trait]
impl RelayListener for ControllerRelayListener {
    async fn on_relay_connection_ready(&self, channel: Box<dyn NetworkChannel>) {
        self.delegate.on_host_connected(channel).await;
    }

    async fn on_relay_connection_error(&self) {
        self.delegate
            .on_error_occurred(ControllerError::Router(RouterErrorCode::RelayError))
            .await;
    }
}
