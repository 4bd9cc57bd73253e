//! `pw-domain`: configuration and error types shared by the pushwire crates.

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
