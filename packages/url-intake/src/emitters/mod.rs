//! Job emitter implementations.
//!
//! - `NatsJobEmitter` - publishes to NATS (requires `nats` feature)
//!
//! Test doubles live in [`crate::testing`].

#[cfg(feature = "nats")]
pub mod nats;

#[cfg(feature = "nats")]
pub use nats::NatsJobEmitter;
