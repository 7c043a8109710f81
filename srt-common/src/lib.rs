//! # SRT Common Library
//!
//! Shared code for the School Review Toolkit services including:
//! - Database initialization
//! - Event types (SrtEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Server-Sent Events helpers
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, SrtEvent};
