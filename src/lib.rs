//! Client-side router controller and SRP-6a authentication handshake for an
//! Aspia-style remote-desktop relay system.
//!
//! A [`controller::RouterController`] connects to a router, authenticates
//! with [`auth::ClientAuthenticator`], and negotiates a relay path to a
//! target host, reporting progress through a [`controller::Delegate`].

pub mod auth;
pub mod channel;
pub mod codec;
pub mod config;
pub mod controller;
pub mod crypto;
pub mod error;
pub mod relay;
pub mod types;

pub use config::{ConfigError, RouterConfig, SecretString};
pub use controller::{ControllerPhase, Delegate, RouterController};
pub use error::ControllerError;
pub use types::{HostId, Version, INVALID_HOST_ID, VERSION_2_6_0};
