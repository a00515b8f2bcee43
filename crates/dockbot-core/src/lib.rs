//! Core domain + application logic for the container-control bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the container
//! engine live behind ports (traits) implemented in adapter crates.

pub mod commands;
pub mod compose;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod memory;
pub mod messaging;
pub mod security;

pub use errors::{Error, Result};
