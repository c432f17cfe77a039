//! Cooperative cancellation of a migration run.

mod token;

pub use token::CancellationToken;
