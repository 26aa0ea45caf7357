//! In-process loopback channel pair for tests: a transport implementation
//! backed by channels rather than a socket, so authenticator/controller
//! logic can be exercised without a real TCP connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use super::{ChannelListener, NetworkChannel};
use crate::error::NetworkError;

type ListenerSlot = Arc<Mutex<Option<Box<dyn ChannelListener>>>>;

/// One end of an in-process channel pair created by [`mock_channel_pair`].
pub struct MockChannel {
    listener: ListenerSlot,
    outbound_tx: mpsc::UnboundedSender<(u8, Bytes)>,
    inbound_rx: Option<mpsc::UnboundedReceiver<(u8, Bytes)>>,
    paused: Arc<AtomicBool>,
    resume_notify: Arc<Notify>,
    pump_task: Option<JoinHandle<()>>,
}

/// Creates two connected, in-process [`MockChannel`]s: sending on one
/// delivers `on_message_received` on the other.
pub fn mock_channel_pair() -> (MockChannel, MockChannel) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    let a = MockChannel {
        listener: Arc::new(Mutex::new(None)),
        outbound_tx: a_tx,
        inbound_rx: Some(a_rx),
        paused: Arc::new(AtomicBool::new(false)),
        resume_notify: Arc::new(Notify::new()),
        pump_task: None,
    };
    let b = MockChannel {
        listener: Arc::new(Mutex::new(None)),
        outbound_tx: b_tx,
        inbound_rx: Some(b_rx),
        paused: Arc::new(AtomicBool::new(false)),
        resume_notify: Arc::new(Notify::new()),
        pump_task: None,
    };
    (a, b)
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        if let Some(task) = self.pump_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl NetworkChannel for MockChannel {
    async fn connect(&mut self, _address: &str, _port: u16) -> Result<(), NetworkError> {
        let mut rx = self
            .inbound_rx
            .take()
            .expect("connect called twice on MockChannel");
        let listener = self.listener.clone();
        let paused = self.paused.clone();
        let resume_notify = self.resume_notify.clone();
        self.pump_task = Some(tokio::spawn(async move {
            let mut buffered = Vec::new();
            loop {
                tokio::select! {
                    received = rx.recv() => {
                        match received {
                            Some((channel_id, bytes)) => {
                                if paused.load(Ordering::SeqCst) {
                                    buffered.push((channel_id, bytes));
                                } else if let Some(listener) = listener.lock().as_mut() {
                                    listener.on_message_received(channel_id, bytes);
                                }
                            }
                            None => return,
                        }
                    }
                    _ = resume_notify.notified() => {
                        if !paused.load(Ordering::SeqCst) {
                            for (channel_id, bytes) in buffered.drain(..) {
                                if let Some(listener) = listener.lock().as_mut() {
                                    listener.on_message_received(channel_id, bytes);
                                }
                            }
                        }
                    }
                }
            }
        }));
        if let Some(listener) = self.listener.lock().as_mut() {
            listener.on_connected();
        }
        Ok(())
    }

    fn send(&mut self, channel_id: u8, bytes: Bytes) {
        let len = bytes.len();
        let _ = self.outbound_tx.send((channel_id, bytes));
        if let Some(listener) = self.listener.lock().as_mut() {
            listener.on_message_written(channel_id, len, 0);
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
        self.resume_notify.notify_one();
    }

    fn set_keep_alive(&mut self, _enabled: bool) {}

    fn set_no_delay(&mut self, _enabled: bool) {}

    fn set_channel_id_support(&mut self, _enabled: bool) {}
}
