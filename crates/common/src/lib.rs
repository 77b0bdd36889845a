//! Shared types used across the storefront backend crates.

pub mod types;

pub use types::{Money, OrderId, UserId};
