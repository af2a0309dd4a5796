//! Ambient utilities: errors, tracing setup, and shared request state

mod errors;
mod shared;
pub mod trace;

pub use errors::ApiError;
pub use shared::{AppState, Shared};
