//! docchat-common - Shared types, configuration, and logging for docchat.
//!
//! This crate provides:
//! - The unified configuration structure, loaded once at startup
//! - Error types and handling utilities
//! - Logging setup with structured output

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
