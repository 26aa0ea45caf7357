//! Network Channel: the transport contract consumed by the authenticator and
//! the controller, plus the one concrete implementation (`TcpChannel`).
//!
//! The channel has exactly one listener at a time: `set_listener` replaces
//! whatever was installed before, never appends. Ownership handoff between
//! the authenticator and the controller relies on this structurally — the
//! old owner's callbacks simply stop firing the moment the new owner calls
//! `set_listener`.

pub mod tcp;
pub mod testing;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::NetworkError;

pub use tcp::TcpChannel;

/// Receives events from a [`NetworkChannel`]. Exactly one listener is
/// installed at any time.
pub trait ChannelListener: Send {
    fn on_connected(&mut self);
    fn on_disconnected(&mut self, error: NetworkError);
    fn on_message_received(&mut self, channel_id: u8, bytes: Bytes);
    fn on_message_written(&mut self, channel_id: u8, bytes_written: usize, pending: usize);
}

/// Ordered, bidirectional, optionally multiplexed byte-message transport.
#[async_trait]
pub trait NetworkChannel: Send {
    async fn connect(&mut self, address: &str, port: u16) -> Result<(), NetworkError>;

    /// Enqueues `bytes` for ordered delivery on `channel_id`.
    fn send(&mut self, channel_id: u8, bytes: Bytes);

    /// Installs `listener` as the sole receiver of future events, replacing
    /// whichever listener (if any) was installed before.
    fn set_listener(&mut self, listener: Box<dyn ChannelListener>);

    /// Removes and returns the previously installed listener, if any.
    fn take_listener(&mut self) -> Option<Box<dyn ChannelListener>>;

    /// Suspends delivery of `on_message_received`/`on_message_written`
    /// events until [`NetworkChannel::resume`] is called.
    fn pause(&mut self);

    fn resume(&mut self);

    fn set_keep_alive(&mut self, enabled: bool);

    fn set_no_delay(&mut self, enabled: bool);

    /// Enables channel-id multiplexing, gated by peer version (see
    /// [`crate::types::VERSION_2_6_0`]).
    fn set_channel_id_support(&mut self, enabled: bool);
}
