//! Test double for [`super::RelayPeer`] that completes synchronously with a
//! canned outcome instead of opening a real connection.

use std::sync::Arc;

use crate::channel::testing::mock_channel_pair;

use super::{ConnectionOffer, RelayListener, RelayPeer};

pub enum MockOutcome {
    Ready,
    Error,
}

/// A [`RelayPeer`] that immediately reports `outcome` without touching the
/// network, handing back one end of an in-process [`mock_channel_pair`] on
/// success.
pub struct MockRelayPeer {
    outcome: MockOutcome,
}

impl MockRelayPeer {
    pub fn new(outcome: MockOutcome) -> Self {
        Self { outcome }
    }
}

impl RelayPeer for MockRelayPeer {
    fn start(&mut self, _offer: ConnectionOffer, listener: Arc<dyn RelayListener>) {
        match self.outcome {
            MockOutcome::Ready => {
                let (client_end, _host_end) = mock_channel_pair();
                tokio::spawn(async move {
                    listener.on_relay_connection_ready(Box::new(client_end)).await;
                });
            }
            MockOutcome::Error => {
                tokio::spawn(async move {
                    listener.on_relay_connection_error().await;
                });
            }
        }
    }
}
