//! Middleware stack for the HTTP API.
//!
//! Layer order: Request → Tracing → CORS → Body limit (uploads only) → Handler

pub mod cors;
pub mod tracing;

pub use cors::create_cors_layer;
pub use tracing::TracingLayer;
