//! Client Authenticator: drives the SRP-6a handshake to completion, then
//! relinquishes the channel, paused, to its caller.

mod srp;

use std::fmt;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::channel::{ChannelListener, NetworkChannel};
use crate::codec::{
    self, AuthMethod, ClientHello, ClientKeyExchange, ClientResponsePayload, IdentifyMessage,
    ServerChallengePayload, ServerHello, ServerKeyExchange, SessionChallenge, SessionResponse,
    WireMessage,
};
use crate::error::NetworkError;
use crate::types::{Identify, SessionType, Version, VERSION_2_6_0};

pub use srp::SrpState;

/// Explicit authenticator states, matching the handshake's wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticatorState {
    SendClientHello,
    ReadServerHello,
    SendIdentify,
    ReadServerKeyExchange,
    SendClientKeyExchange,
    ReadSessionChallenge,
    SendSessionResponse,
    Done,
    Failed,
}

/// Authentication failure taxonomy surfaced to [`crate::error::ControllerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthErrorCode {
    #[error("unknown authentication error")]
    Unknown,
    #[error("network error during authentication")]
    NetworkError,
    #[error("protocol error")]
    ProtocolError,
    #[error("access denied")]
    AccessDenied,
    #[error("session denied")]
    SessionDenied,
    #[error("version denied")]
    VersionDenied,
    #[error("key exchange failure")]
    KeyExchangeFailure,
}

impl From<NetworkError> for AuthErrorCode {
    fn from(_: NetworkError) -> Self {
        AuthErrorCode::NetworkError
    }
}

/// Outcome of a completed handshake: the validated peer version and the
/// channel, handed back paused.
pub struct AuthOutcome {
    pub peer_version: Version,
    pub channel: Box<dyn NetworkChannel>,
}

impl fmt::Debug for AuthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthOutcome")
            .field("peer_version", &self.peer_version)
            .finish_non_exhaustive()
    }
}

/// Drives the SRP-6a handshake over an owned [`NetworkChannel`].
///
/// The authenticator is the channel's sole listener for the duration of
/// `run`; events arrive through an internal `mpsc` queue fed by a thin
/// [`ChannelListener`] adapter so the state machine can `.await` between
/// steps instead of living entirely inside listener callbacks.
pub struct ClientAuthenticator {
    state: AuthenticatorState,
    username: String,
    password: String,
    client_version: Version,
    srp: Option<SrpState>,
    session_cipher: Option<crate::crypto::SessionCipher>,
    peer_version: Option<Version>,
    pending_challenge_nonce: Vec<u8>,
    failure_code: Option<AuthErrorCode>,
}

enum Event {
    Connected,
    Disconnected(NetworkError),
    Received(u8, Bytes),
}

struct QueueListener(tokio::sync::mpsc::UnboundedSender<Event>);

impl ChannelListener for QueueListener {
    fn on_connected(&mut self) {
        let _ = self.0.send(Event::Connected);
    }
    fn on_disconnected(&mut self, error: NetworkError) {
        let _ = self.0.send(Event::Disconnected(error));
    }
    fn on_message_received(&mut self, channel_id: u8, bytes: Bytes) {
        let _ = self.0.send(Event::Received(channel_id, bytes));
    }
    fn on_message_written(&mut self, _channel_id: u8, _bytes_written: usize, _pending: usize) {}
}

const HANDSHAKE_CHANNEL_ID: u8 = 0;

impl ClientAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>, client_version: Version) -> Self {
        Self {
            state: AuthenticatorState::SendClientHello,
            username: username.into(),
            password: password.into(),
            client_version,
            srp: None,
            session_cipher: None,
            peer_version: None,
            pending_challenge_nonce: Vec::new(),
            failure_code: None,
        }
    }

    /// Runs the handshake to completion, returning the channel (paused) and
    /// the validated peer version, or an [`AuthErrorCode`] on failure.
    pub async fn run(
        mut self,
        mut channel: Box<dyn NetworkChannel>,
    ) -> Result<AuthOutcome, AuthErrorCode> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        channel.set_listener(Box::new(QueueListener(tx)));

        while !matches!(self.state, AuthenticatorState::Done | AuthenticatorState::Failed) {
            match self.state {
                AuthenticatorState::SendClientHello => {
                    self.send_client_hello(channel.as_mut());
                    self.state = AuthenticatorState::ReadServerHello;
                }
                AuthenticatorState::SendIdentify => {
                    self.send_identify(channel.as_mut());
                    self.state = AuthenticatorState::ReadServerKeyExchange;
                }
                AuthenticatorState::SendClientKeyExchange => {
                    match self.send_client_key_exchange(channel.as_mut()) {
                        Ok(()) => self.state = AuthenticatorState::ReadSessionChallenge,
                        Err(err) => self.fail(err),
                    }
                }
                AuthenticatorState::SendSessionResponse => {
                    match self.send_session_response(channel.as_mut()) {
                        Ok(()) => {}
                        Err(err) => self.fail(err),
                    }
                }
                _ => match rx.recv().await {
                    Some(Event::Connected) => {}
                    Some(Event::Disconnected(_)) => self.fail(AuthErrorCode::NetworkError),
                    Some(Event::Received(channel_id, bytes)) => {
                        if channel_id != HANDSHAKE_CHANNEL_ID {
                            warn!(channel_id, "ignoring message on unexpected channel during handshake");
                            continue;
                        }
                        self.on_message(bytes);
                    }
                    None => self.fail(AuthErrorCode::NetworkError),
                },
            }
        }

        channel.pause();
        channel.take_listener();

        match self.state {
            AuthenticatorState::Done => {
                info!(peer_version = ?self.peer_version, "authentication succeeded");
                Ok(AuthOutcome {
                    peer_version: self.peer_version.expect("Done implies peer_version set"),
                    channel,
                })
            }
            _ => Err(self.failure_code.unwrap_or(AuthErrorCode::Unknown)),
        }
    }

    fn fail(&mut self, code: AuthErrorCode) {
        warn!(?code, "authentication failed");
        self.failure_code = Some(code);
        self.state = AuthenticatorState::Failed;
    }

    fn on_message(&mut self, bytes: Bytes) {
        let message = match codec::decode_message(&bytes) {
            Ok(message) => message,
            Err(_) => return self.fail(AuthErrorCode::ProtocolError),
        };
        match (self.state, message) {
            (AuthenticatorState::ReadServerHello, WireMessage::ServerHello(hello)) => {
                self.read_server_hello(hello)
            }
            (AuthenticatorState::ReadServerKeyExchange, WireMessage::ServerKeyExchange(ske)) => {
                self.read_server_key_exchange(ske)
            }
            (AuthenticatorState::ReadSessionChallenge, WireMessage::SessionChallenge(sc)) => {
                self.read_session_challenge(sc)
            }
            _ => self.fail(AuthErrorCode::ProtocolError),
        }
    }

    fn send_client_hello(&mut self, channel: &mut dyn NetworkChannel) {
        let hello = WireMessage::ClientHello(ClientHello {
            supported_methods: vec![AuthMethod::Srp],
            client_version: self.client_version,
            nonce_c: crate::crypto::bigint::random_exponent(crate::crypto::group::safe_prime())
                .to_bytes_be(),
        });
        self.send(channel, &hello);
    }

    fn read_server_hello(&mut self, hello: ServerHello) {
        if !matches!(hello.method, AuthMethod::Srp) {
            return self.fail(AuthErrorCode::ProtocolError);
        }
        self.peer_version = Some(hello.server_version);
        self.state = AuthenticatorState::SendIdentify;
    }

    fn send_identify(&mut self, channel: &mut dyn NetworkChannel) {
        let identify = WireMessage::Identify(IdentifyMessage {
            identify: Identify::Srp,
            username_utf16: codec::encode_utf16(&self.username),
            display_name_utf16: Vec::new(),
        });
        self.send(channel, &identify);
    }

    fn read_server_key_exchange(&mut self, ske: ServerKeyExchange) {
        match SrpState::from_server_key_exchange(&ske, &self.username, &self.password) {
            Ok(srp) => {
                self.srp = Some(srp);
                self.state = AuthenticatorState::SendClientKeyExchange;
            }
            Err(()) => self.fail(AuthErrorCode::KeyExchangeFailure),
        }
    }

    fn send_client_key_exchange(&mut self, channel: &mut dyn NetworkChannel) -> Result<(), AuthErrorCode> {
        let srp = self.srp.as_ref().ok_or(AuthErrorCode::ProtocolError)?;
        let shared_secret = srp.shared_secret_hash();
        let cipher = crate::crypto::SessionCipher::derive(&shared_secret, b"aspia-router-session")
            .map_err(|_| AuthErrorCode::KeyExchangeFailure)?;
        self.session_cipher = Some(cipher);

        let message = WireMessage::ClientKeyExchange(ClientKeyExchange {
            a: srp.public_value_bytes(),
        });
        self.send(channel, &message);
        Ok(())
    }

    fn read_session_challenge(&mut self, challenge: SessionChallenge) {
        let Some(cipher) = &self.session_cipher else {
            return self.fail(AuthErrorCode::ProtocolError);
        };
        let plaintext = match cipher.open(challenge.counter, b"session-challenge", &challenge.ciphertext) {
            Ok(plaintext) => plaintext,
            Err(_) => return self.fail(AuthErrorCode::KeyExchangeFailure),
        };
        let payload: ServerChallengePayload = match serde_cbor::from_slice(&plaintext) {
            Ok(payload) => payload,
            Err(_) => return self.fail(AuthErrorCode::ProtocolError),
        };
        if !payload
            .allowed_session_types
            .contains(&SessionType::RouterSessionClient)
        {
            return self.fail(AuthErrorCode::SessionDenied);
        }
        self.peer_version = Some(payload.peer_version);
        self.pending_challenge_nonce = payload.challenge_nonce;
        self.state = AuthenticatorState::SendSessionResponse;
    }

    fn send_session_response(&mut self, channel: &mut dyn NetworkChannel) -> Result<(), AuthErrorCode> {
        let srp = self.srp.as_ref().ok_or(AuthErrorCode::ProtocolError)?;
        let cipher = self.session_cipher.as_ref().ok_or(AuthErrorCode::ProtocolError)?;
        let proof = crate::crypto::hash(&[&srp.shared_secret_hash(), &self.pending_challenge_nonce]);
        let payload = ClientResponsePayload {
            proof: proof.to_vec(),
        };
        let plaintext = serde_cbor::to_vec(&payload).map_err(|_| AuthErrorCode::ProtocolError)?;
        let ciphertext = cipher
            .seal(1, b"session-response", &plaintext)
            .map_err(|_| AuthErrorCode::KeyExchangeFailure)?;

        let message = WireMessage::SessionResponse(SessionResponse {
            session_type: SessionType::RouterSessionClient,
            chosen_version: self.peer_version.unwrap_or(VERSION_2_6_0).min(self.client_version),
            counter: 1,
            ciphertext,
        });
        self.send(channel, &message);
        self.state = AuthenticatorState::Done;
        Ok(())
    }

    fn send(&self, channel: &mut dyn NetworkChannel, message: &WireMessage) {
        match codec::encode_message(message) {
            Ok(bytes) => channel.send(HANDSHAKE_CHANNEL_ID, bytes),
            Err(err) => warn!(%err, "failed to encode handshake message"),
        }
    }
}

impl Drop for ClientAuthenticator {
    fn drop(&mut self) {
        self.password.zeroize();
        if let Some(srp) = &mut self.srp {
            srp.zeroize();
        }
    }
}
