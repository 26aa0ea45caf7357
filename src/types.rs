//! Core data model shared across the codec, authenticator, and controller.

use serde::{Deserialize, Serialize};

/// Unsigned 64-bit host identifier. Zero is reserved and invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostId(pub u64);

/// `host_id = 0` is reserved and never a valid target.
pub const INVALID_HOST_ID: HostId = HostId(0);

impl HostId {
    pub fn is_valid(&self) -> bool {
        *self != INVALID_HOST_ID
    }
}

/// Semantic version triple, totally ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// The version at which channel-id multiplexing support was introduced.
pub const VERSION_2_6_0: Version = Version::new(2, 6, 0);

/// Session-type tag. This client always requests
/// [`SessionType::RouterSessionClient`], but the wire format reserves the
/// tag space for other session kinds this client never speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    RouterSessionClient,
}

/// Authentication method tag. This client always uses
/// [`Identify::Srp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identify {
    Srp,
}

/// The reserved channel id for post-authentication router-session traffic.
pub const ROUTER_CHANNEL_ID_SESSION: u8 = 1;
