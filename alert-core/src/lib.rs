#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Shared logic for the wrist alert feature set.
//
// Detection, countdown, delivery, and receiver-side history all live here so
// the wrist firmware and the host emulator drive the exact same state
// machines. The crate avoids the Rust standard library and heap allocation;
// every buffer is bounded by a `heapless` container.

pub mod config;
pub mod contact;
pub mod delivery;
pub mod error;
pub mod history;
pub mod link;
pub mod message;
pub mod orchestrator;
pub mod receiver;
pub mod signal;
pub mod store;
pub mod time;
pub mod wire;

pub use error::AlertError;
