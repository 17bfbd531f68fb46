//! docchat-session - Session lifecycle for docchat.
//!
//! This crate owns the bounded-lifetime conversation state:
//! - [`SessionStore`]: in-memory key-value cache with sliding per-session TTL
//!   and an expiry event channel
//! - [`ExpiryWatcher`]: background task that keeps the external vector store
//!   consistent with session expiry
//! - Collaborator traits for the external vector store and document loader

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod store;
pub mod traits;
pub mod watcher;

pub use store::{ChatTurn, SessionSnapshot, SessionStore};
pub use traits::{DocumentLoader, PlainTextLoader, VectorStore};
pub use watcher::ExpiryWatcher;
