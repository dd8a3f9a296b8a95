//! Domain layer for the extranet.
//!
//! Pure types and rules; no I/O beyond parsing buffers handed in by callers.

pub mod accounts;
pub mod credentials;
pub mod dates;
pub mod entities;
pub mod errors;
pub mod mail;
pub mod naming;
pub mod pagination;

pub use entities::*;
pub use errors::{messages, ExtranetError, ExtranetResult};
