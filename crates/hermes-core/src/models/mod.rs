//! Shared data models for Hermes stream consumers

mod download;
mod event;
mod token;

pub use download::*;
pub use event::*;
pub use token::*;
