//! Wire message schema for the handshake channel and the post-handshake
//! peer-to-router / router-to-peer union.

use serde::{Deserialize, Serialize};

use crate::types::{HostId, Identify, SessionType, Version};

/// Authentication method tag carried in `ClientHello`/`ServerHello`. This
/// client only ever proposes and accepts [`AuthMethod::Srp`], but the tag is
/// a real enum (not a unit type) because the wire format reserves space for
/// methods this client does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMethod {
    Srp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientHello {
    pub supported_methods: Vec<AuthMethod>,
    pub client_version: Version,
    pub nonce_c: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerHello {
    pub method: AuthMethod,
    pub server_version: Version,
    pub nonce_s: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyMessage {
    pub identify: Identify,
    /// UTF-16LE-encoded username, see [`crate::codec::encode_utf16`].
    pub username_utf16: Vec<u8>,
    /// UTF-16LE-encoded display name; empty when not set.
    pub display_name_utf16: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerKeyExchange {
    pub n: Vec<u8>,
    pub g: Vec<u8>,
    pub s: Vec<u8>,
    pub b: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientKeyExchange {
    pub a: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionChallenge {
    /// Per-message AEAD counter, see [`crate::crypto::SessionCipher`].
    pub counter: u64,
    pub ciphertext: Vec<u8>,
}

/// Plaintext sealed inside [`SessionChallenge::ciphertext`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerChallengePayload {
    pub challenge_nonce: Vec<u8>,
    pub peer_version: Version,
    pub allowed_session_types: Vec<SessionType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_type: SessionType,
    pub chosen_version: Version,
    pub counter: u64,
    pub ciphertext: Vec<u8>,
}

/// Plaintext sealed inside [`SessionResponse::ciphertext`]: proof of
/// knowledge of the shared secret `K`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientResponsePayload {
    pub proof: Vec<u8>,
}

/// Router-to-peer `ConnectionOffer` error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferErrorCode {
    Success,
    PeerNotFound,
    AccessDenied,
    KeyPoolEmpty,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerRole {
    Client,
    Host,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOffer {
    pub error_code: OfferErrorCode,
    pub peer_role: PeerRole,
    pub relay_address: String,
    pub relay_port: u16,
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostStatusKind {
    Online,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostStatus {
    pub status: HostStatusKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PeerToRouter {
    ConnectionRequest { host_id: HostId },
    CheckHostStatus { host_id: HostId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RouterToPeer {
    ConnectionOffer(ConnectionOffer),
    HostStatus(HostStatus),
}

/// The full tagged union of messages exchanged on the handshake channel and
/// (once authenticated) the router session channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireMessage {
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    Identify(IdentifyMessage),
    ServerKeyExchange(ServerKeyExchange),
    ClientKeyExchange(ClientKeyExchange),
    SessionChallenge(SessionChallenge),
    SessionResponse(SessionResponse),
    PeerToRouter(PeerToRouter),
    RouterToPeer(RouterToPeer),
}
