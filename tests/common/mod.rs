//! Mock router server fixture shared by the integration tests: drives the
//! server side of the handshake and the router-session protocol over one
//! end of an in-process [`router_client::channel::testing::mock_channel_pair`].

use std::sync::Arc;

use bytes::Bytes;
use num_bigint::BigUint;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use router_client::channel::testing::MockChannel;
use router_client::channel::{ChannelListener, NetworkChannel};
use router_client::codec::{
    self, AuthMethod, ClientHello, ClientKeyExchange, ClientResponsePayload, ConnectionOffer,
    HostStatus, HostStatusKind, IdentifyMessage, OfferErrorCode, PeerRole, PeerToRouter,
    RouterToPeer, ServerChallengePayload, ServerHello, ServerKeyExchange, SessionChallenge,
    SessionResponse, WireMessage,
};
use router_client::crypto::{bigint, group, hash, SessionCipher};
use router_client::types::{HostId, SessionType, Version};

pub const HANDSHAKE_CHANNEL_ID: u8 = 0;
pub const SESSION_CHANNEL_ID: u8 = router_client::types::ROUTER_CHANNEL_ID_SESSION;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "pw";
pub const SERVER_VERSION: Version = Version::new(2, 7, 0);

/// What the mock router replies with once a `ConnectionRequest` arrives.
#[derive(Clone, Copy)]
pub enum OfferScript {
    Success,
    PeerNotFound,
    AccessDenied,
}

enum Event {
    Received(u8, Bytes),
}

struct QueueListener(mpsc::UnboundedSender<Event>);

impl ChannelListener for QueueListener {
    fn on_connected(&mut self) {}
    fn on_disconnected(&mut self, _error: router_client::error::NetworkError) {}
    fn on_message_received(&mut self, channel_id: u8, bytes: Bytes) {
        let _ = self.0.send(Event::Received(channel_id, bytes));
    }
    fn on_message_written(&mut self, _channel_id: u8, _bytes_written: usize, _pending: usize) {}
}

/// Tracks what the mock server has observed, for test assertions.
#[derive(Default)]
pub struct ServerObservations {
    pub connection_requests: Vec<HostId>,
    pub check_host_status: Vec<HostId>,
}

pub struct MockRouterServer {
    pub observations: Arc<Mutex<ServerObservations>>,
}

impl MockRouterServer {
    /// Spawns the server loop over `channel`, running until the channel
    /// closes. `corrupt_key_exchange` lets S5-style tests force an invalid
    /// `ServerKeyExchange`.
    pub fn spawn(
        mut channel: MockChannel,
        offer_script: OfferScript,
        corrupt_key_exchange: bool,
    ) -> Arc<Mutex<ServerObservations>> {
        let observations = Arc::new(Mutex::new(ServerObservations::default()));
        let obs = observations.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        channel.set_listener(Box::new(QueueListener(tx)));

        tokio::spawn(async move {
            channel.connect("mock", 0).await.ok();

            let mut session_cipher: Option<SessionCipher> = None;
            let mut server_b_secret: Option<BigUint> = None;
            let mut capital_a: Option<BigUint> = None;
            let mut capital_b: Option<BigUint> = None;
            let mut verifier: Option<BigUint> = None;
            let mut client_nonce: Option<Vec<u8>> = None;

            while let Some(Event::Received(channel_id, bytes)) = rx.recv().await {
                let message = match codec::decode_message(&bytes) {
                    Ok(m) => m,
                    Err(_) => continue,
                };

                if channel_id == HANDSHAKE_CHANNEL_ID {
                    match message {
                        WireMessage::ClientHello(ClientHello { nonce_c, .. }) => {
                            client_nonce = Some(nonce_c);
                            let reply = WireMessage::ServerHello(ServerHello {
                                method: AuthMethod::Srp,
                                server_version: SERVER_VERSION,
                                nonce_s: vec![0x42; 8],
                            });
                            send(&mut channel, HANDSHAKE_CHANNEL_ID, &reply);
                        }
                        WireMessage::Identify(IdentifyMessage { .. }) => {
                            let n = group::safe_prime().clone();
                            let g = group::generator();
                            let salt = vec![0xAA; 16];

                            let (n_bytes, g_bytes) = if corrupt_key_exchange {
                                (vec![0x02], vec![0x02])
                            } else {
                                (n.to_bytes_be(), g.to_bytes_be())
                            };

                            let inner = hash::hash(&[USERNAME.as_bytes(), b":", PASSWORD.as_bytes()]);
                            let x_bytes = hash::hash(&[&salt, &inner]);
                            let x = bigint::bytes_to_bigint(&x_bytes);
                            let v = bigint::modexp(&g, &x, &n);

                            let len = group::padded_len();
                            let k_bytes = hash::hash(&[
                                &bigint::bigint_to_padded_bytes(&n, len),
                                &bigint::bigint_to_padded_bytes(&g, len),
                            ]);
                            let k = bigint::bytes_to_bigint(&k_bytes);

                            let b_secret = bigint::random_exponent(&n);
                            let b_pub = bigint::addmod(
                                &bigint::mulmod(&k, &v, &n),
                                &bigint::modexp(&g, &b_secret, &n),
                                &n,
                            );
                            server_b_secret = Some(b_secret);
                            capital_b = Some(b_pub.clone());

                            let reply = WireMessage::ServerKeyExchange(ServerKeyExchange {
                                n: n_bytes,
                                g: g_bytes,
                                s: salt,
                                b: b_pub.to_bytes_be(),
                            });
                            send(&mut channel, HANDSHAKE_CHANNEL_ID, &reply);
                            verifier = Some(v);
                        }
                        WireMessage::ClientKeyExchange(ClientKeyExchange { a }) => {
                            let n = group::safe_prime().clone();
                            let a_pub = bigint::bytes_to_bigint(&a);
                            capital_a = Some(a_pub.clone());
                            let b_pub = capital_b.clone().expect("B computed before A arrives");
                            let b_secret = server_b_secret.clone().expect("b computed before A arrives");
                            let v = verifier.clone().expect("v computed before A arrives");

                            let len = group::padded_len();
                            let u_bytes = hash::hash(&[
                                &bigint::bigint_to_padded_bytes(&a_pub, len),
                                &bigint::bigint_to_padded_bytes(&b_pub, len),
                            ]);
                            let u = bigint::bytes_to_bigint(&u_bytes);

                            let shared = bigint::modexp(
                                &bigint::mulmod(&a_pub, &bigint::modexp(&v, &u, &n), &n),
                                &b_secret,
                                &n,
                            );
                            let shared_secret = hash::hash(&[&shared.to_bytes_be()]);
                            let cipher =
                                SessionCipher::derive(&shared_secret, b"aspia-router-session")
                                    .expect("derive session cipher");

                            let nonce = client_nonce.clone().unwrap_or_default();
                            let payload = ServerChallengePayload {
                                challenge_nonce: nonce.clone(),
                                peer_version: SERVER_VERSION,
                                allowed_session_types: vec![SessionType::RouterSessionClient],
                            };
                            let plaintext = serde_cbor::to_vec(&payload).unwrap();
                            let ciphertext = cipher
                                .seal(0, b"session-challenge", &plaintext)
                                .expect("seal challenge");
                            session_cipher = Some(cipher);

                            let reply = WireMessage::SessionChallenge(SessionChallenge {
                                counter: 0,
                                ciphertext,
                            });
                            send(&mut channel, HANDSHAKE_CHANNEL_ID, &reply);
                        }
                        WireMessage::SessionResponse(SessionResponse { counter, ciphertext, .. }) => {
                            let Some(cipher) = &session_cipher else { continue };
                            let Ok(plaintext) = cipher.open(counter, b"session-response", &ciphertext)
                            else {
                                continue;
                            };
                            let _: ClientResponsePayload =
                                serde_cbor::from_slice(&plaintext).expect("decode client proof");
                            // Handshake complete; router-session traffic now
                            // arrives on SESSION_CHANNEL_ID.
                        }
                        _ => {}
                    }
                } else if channel_id == SESSION_CHANNEL_ID {
                    match message {
                        WireMessage::PeerToRouter(PeerToRouter::ConnectionRequest { host_id }) => {
                            obs.lock().connection_requests.push(host_id);
                            let offer = match offer_script {
                                OfferScript::Success => ConnectionOffer {
                                    error_code: OfferErrorCode::Success,
                                    peer_role: PeerRole::Client,
                                    relay_address: "127.0.0.1".into(),
                                    relay_port: 0,
                                    key: vec![1, 2, 3],
                                },
                                OfferScript::PeerNotFound => ConnectionOffer {
                                    error_code: OfferErrorCode::PeerNotFound,
                                    peer_role: PeerRole::Client,
                                    relay_address: String::new(),
                                    relay_port: 0,
                                    key: Vec::new(),
                                },
                                OfferScript::AccessDenied => ConnectionOffer {
                                    error_code: OfferErrorCode::AccessDenied,
                                    peer_role: PeerRole::Client,
                                    relay_address: String::new(),
                                    relay_port: 0,
                                    key: Vec::new(),
                                },
                            };
                            let reply = WireMessage::RouterToPeer(RouterToPeer::ConnectionOffer(offer));
                            send(&mut channel, SESSION_CHANNEL_ID, &reply);
                        }
                        WireMessage::PeerToRouter(PeerToRouter::CheckHostStatus { host_id }) => {
                            obs.lock().check_host_status.push(host_id);
                            let reply = WireMessage::RouterToPeer(RouterToPeer::HostStatus(HostStatus {
                                status: HostStatusKind::Online,
                            }));
                            send(&mut channel, SESSION_CHANNEL_ID, &reply);
                        }
                        _ => {}
                    }
                }
            }
            let _ = capital_a;
        });

        observations
    }
}

fn send(channel: &mut MockChannel, channel_id: u8, message: &WireMessage) {
    let bytes = codec::encode_message(message).expect("encode test message");
    channel.send(channel_id, bytes);
}
