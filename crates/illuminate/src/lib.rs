//! Illuminate relay library.
//!
//! Keeps a session per live broadcaster and relays its game state to the
//! channel's extension viewers through the extension message API.

pub mod api;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod registry;
