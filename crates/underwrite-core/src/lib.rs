pub mod error;
pub mod time_value;
pub mod types;
pub mod underwriting;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use error::UnderwriteError;
pub use types::*;

/// Standard result type for all underwriting operations
pub type UnderwriteResult<T> = Result<T, UnderwriteError>;
