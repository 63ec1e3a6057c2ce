//! Core business logic abstractions

pub mod config;
pub mod currency;
pub mod log;
pub mod quote;
pub mod throttle;

// Re-export main types for cleaner imports
pub use currency::{FetchError, RateSource};
pub use quote::{QuoteRecord, RateStore, StoreError};
pub use throttle::{Throttle, ThrottleDecision};
