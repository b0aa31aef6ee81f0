//! # livechat
//!
//! Live session client for a room-based chat service.
//!
//! The crate is split the same way the data flows:
//! - `state` holds the small focused models (session, membership, typing, chat views)
//! - `client` is the pure reducer: operations and inbound events in, effects out
//! - `net` owns I/O: the websocket transport driving the reducer and the stats API
//! - `profile` turns stats API results into display panels
//!
//! Wire types live in the sibling `events` crate so the CLI and tests can
//! speak the protocol without pulling in the transport.

pub mod client;
pub mod config;
pub mod net;
pub mod profile;
pub mod state;

pub use client::{Effect, LiveSession, Patch, SessionError};
pub use config::{ClientConfig, ConfigError};
