//! Top-level facade crate for muninnbot.
//!
//! Re-exports the protocol types and the bot library so users can depend on a single crate.

pub mod core {
    pub use muninn_core::*;
}

pub mod bot {
    pub use muninn_bot::*;
}
