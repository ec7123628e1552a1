//! Outbound side of the platform.
//!
//! Provides the token-bucket rate limiter and the FIFO dispatch queue that
//! throttle calls to the external document-hosting service, plus HTTP
//! clients for that service and for the text-generation backend.

pub mod dispatch;
pub mod document;
pub mod generation;
pub mod rate_limiter;
