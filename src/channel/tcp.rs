//! `TcpChannel`: the one concrete [`super::NetworkChannel`], built on
//! `tokio::net::TcpStream` framed with `LengthDelimitedCodec`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{split, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tracing::{debug, warn};

use super::{ChannelListener, NetworkChannel};
use crate::codec::split_frame;
use crate::error::NetworkError;

type ListenerSlot = Arc<Mutex<Option<Box<dyn ChannelListener>>>>;

enum OutboundMessage {
    Frame(u8, Bytes),
}

/// A TCP-backed channel. Connecting spawns one reader task and one writer
/// task; both post events through whatever listener is currently installed
/// in `listener`, which is swapped (never duplicated) by `set_listener`.
pub struct TcpChannel {
    listener: ListenerSlot,
    outbound_tx: Option<mpsc::UnboundedSender<OutboundMessage>>,
    pause_notify: Arc<Notify>,
    paused: Arc<AtomicBool>,
    channel_id_support: Arc<AtomicBool>,
    reader_task: Option<JoinHandle<()>>,
    writer_task: Option<JoinHandle<()>>,
}

impl Default for TcpChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpChannel {
    pub fn new() -> Self {
        Self {
            listener: Arc::new(Mutex::new(None)),
            outbound_tx: None,
            pause_notify: Arc::new(Notify::new()),
            paused: Arc::new(AtomicBool::new(false)),
            channel_id_support: Arc::new(AtomicBool::new(false)),
            reader_task: None,
            writer_task: None,
        }
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.writer_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl NetworkChannel for TcpChannel {
    async fn connect(&mut self, address: &str, port: u16) -> Result<(), NetworkError> {
        let stream = TcpStream::connect((address, port)).await?;
        let (read_half, write_half) = split(stream);

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound_tx = Some(tx);

        self.reader_task = Some(tokio::spawn(run_reader(
            read_half,
            self.listener.clone(),
            self.pause_notify.clone(),
            self.paused.clone(),
        )));
        self.writer_task = Some(tokio::spawn(run_writer(
            write_half,
            rx,
            self.listener.clone(),
        )));

        if let Some(listener) = self.listener.lock().as_mut() {
            listener.on_connected();
        }
        Ok(())
    }

    fn send(&mut self, channel_id: u8, bytes: Bytes) {
        if let Some(tx) = &self.outbound_tx {
            if tx.send(OutboundMessage::Frame(channel_id, bytes)).is_err() {
                warn!("tcp channel send after writer task exited");
            }
        } else {
            warn!("tcp channel send before connect");
        }
    }

    fn set_listener(&mut self, listener: Box<dyn ChannelListener>) {
        *self.listener.lock() = Some(listener);
    }

    fn take_listener(&mut self) -> Option<Box<dyn ChannelListener>> {
        self.listener.lock().take()
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::SeqCst);
        self.pause_notify.notify_waiters();
    }

    fn set_keep_alive(&mut self, _enabled: bool) {
        // Socket-level keep-alive is configured at accept/connect time on
        // platforms exposing it through `socket2`; this client core only
        // needs the call to exist as a no-op hook for the mock channel.
    }

    fn set_no_delay(&mut self, enabled: bool) {
        debug!(enabled, "set_no_delay is a post-connect no-op for TcpChannel");
    }

    fn set_channel_id_support(&mut self, enabled: bool) {
        self.channel_id_support.store(enabled, Ordering::SeqCst);
    }
}

async fn run_reader(
    read_half: ReadHalf<TcpStream>,
    listener: ListenerSlot,
    pause_notify: Arc<Notify>,
    paused: Arc<AtomicBool>,
) {
    let mut framed = FramedRead::new(read_half, LengthDelimitedCodec::new());
    loop {
        if paused.load(Ordering::SeqCst) {
            pause_notify.notified().await;
            continue;
        }
        match framed.next().await {
            Some(Ok(frame)) => match split_frame(frame.freeze()) {
                Ok((channel_id, payload)) => {
                    if let Some(listener) = listener.lock().as_mut() {
                        listener.on_message_received(channel_id, payload);
                    }
                }
                Err(err) => warn!(%err, "dropping malformed frame"),
            },
            Some(Err(err)) => {
                if let Some(listener) = listener.lock().as_mut() {
                    listener.on_disconnected(NetworkError::from(err));
                }
                return;
            }
            None => {
                if let Some(listener) = listener.lock().as_mut() {
                    listener.on_disconnected(NetworkError::Reset);
                }
                return;
            }
        }
    }
}

async fn run_writer(
    write_half: WriteHalf<TcpStream>,
    mut rx: mpsc::UnboundedReceiver<OutboundMessage>,
    listener: ListenerSlot,
) {
    let mut framed = FramedWrite::new(write_half, LengthDelimitedCodec::new());
    while let Some(OutboundMessage::Frame(channel_id, payload)) = rx.recv().await {
        let mut frame = BytesMut::with_capacity(1 + payload.len());
        frame.extend_from_slice(&[channel_id]);
        frame.extend_from_slice(&payload);
        let len = frame.len();
        if let Err(err) = framed.send(frame.freeze()).await {
            if let Some(listener) = listener.lock().as_mut() {
                listener.on_disconnected(NetworkError::from(err));
            }
            return;
        }
        if let Some(listener) = listener.lock().as_mut() {
            listener.on_message_written(channel_id, len, rx.len());
        }
    }
}
