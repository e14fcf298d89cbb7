//! Host-facing value types and capabilities.

pub mod event;
pub mod geometry;
pub mod timer;
pub mod window;
