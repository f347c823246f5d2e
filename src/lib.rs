//! Request correlation demo service.
//!
//! This library crate exposes the config loader and router for integration
//! testing.

pub mod config;
pub mod server;
