//! Client-side state models.
//!
//! DESIGN
//! ======
//! State is split by concern (`session`, `membership`, `typing`, `chat`) so
//! the reducer in `client` composes small focused models. None of these
//! types perform I/O.

pub mod chat;
pub mod membership;
pub mod session;
pub mod typing;
