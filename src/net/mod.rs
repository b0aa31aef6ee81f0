//! Networking modules for the websocket session and the HTTP stats API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` owns the websocket and drives the `client` reducer; `api`
//! handles REST calls. Wire types come from the `events` crate.

pub mod api;
pub mod transport;
