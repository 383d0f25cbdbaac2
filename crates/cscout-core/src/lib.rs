//! Core of the course-link scout.
//!
//! Framework-agnostic: the Telegram channel, the bot and the page loader live
//! behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod links;
pub mod logging;
pub mod messaging;
pub mod output;
pub mod pipeline;
pub mod ports;
pub mod reader;
pub mod resolver;
pub mod seen;

pub use errors::{Error, Result};
