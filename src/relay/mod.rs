//! Relay Peer (consumed contract): given a connection offer, produces a new
//! data channel to the host, or reports failure. Exactly one of
//! [`RelayListener::on_relay_connection_ready`] /
//! [`RelayListener::on_relay_connection_error`] is delivered.

pub mod testing;

use std::sync::Arc;

use async_trait::async_trait;

use crate::channel::{NetworkChannel, TcpChannel};
use crate::codec::ConnectionOffer;

/// Receives the outcome of a [`RelayPeer::start`] call.
#[async_trait]
pub trait RelayListener: Send + Sync {
    async fn on_relay_connection_ready(&self, channel: Box<dyn NetworkChannel>);
    async fn on_relay_connection_error(&self);
}

/// Opens a data channel to a host along the coordinates in a connection
/// offer.
pub trait RelayPeer: Send {
    fn start(&mut self, offer: ConnectionOffer, listener: Arc<dyn RelayListener>);
}

/// The production [`RelayPeer`]: connects to the relay address/port in the
/// offer and hands the resulting [`TcpChannel`] to the listener.
pub struct TcpRelayPeer {
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TcpRelayPeer {
    pub fn new() -> Self {
        Self { task: None }
    }
}

impl Default for TcpRelayPeer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TcpRelayPeer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl RelayPeer for TcpRelayPeer {
    fn start(&mut self, offer: ConnectionOffer, listener: Arc<dyn RelayListener>) {
        self.task = Some(tokio::spawn(async move {
            let mut channel: Box<dyn NetworkChannel> = Box::new(TcpChannel::new());
            match channel.connect(&offer.relay_address, offer.relay_port).await {
                Ok(()) => listener.on_relay_connection_ready(channel).await,
                Err(_) => listener.on_relay_connection_error().await,
            }
        }));
    }
}
