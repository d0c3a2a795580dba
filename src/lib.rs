//! Group climate feed library.
//!
//! Keeps a live, per-group temperature/humidity snapshot from a reconnecting
//! WebSocket sensor feed and exposes it to a presentation layer.

pub mod config;
pub mod error;
pub mod feed;
pub mod presentation;
