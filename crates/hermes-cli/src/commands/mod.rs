//! Command implementations for hermes-cli

mod health;
mod queue;
mod stats;
mod token;
mod watch;

pub use health::health;
pub use queue::queue;
pub use stats::stats;
pub use token::token;
pub use watch::watch;
