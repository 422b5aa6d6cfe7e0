//! Domain types for URL intake.

pub mod content;
pub mod identity;
pub mod job;
pub mod lifecycle;
pub mod request;
pub mod resource;
