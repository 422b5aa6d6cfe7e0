//! Core trait abstractions for URL intake.
//!
//! Applications implement these to plug in storage and the worker channel.

pub mod emitter;
pub mod store;
