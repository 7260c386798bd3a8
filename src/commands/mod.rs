//! Host command handlers
//!
//! Name-level entry points for hosts that drive the adapter by command, each
//! returning `Result<_, ErrorResponse>`.

pub mod recording;
pub mod system;

#[cfg(feature = "tauri")]
pub mod tauri;

pub use recording::RelayState;
