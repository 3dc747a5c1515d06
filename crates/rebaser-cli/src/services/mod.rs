//! Service layer for business logic with dependency injection.
//!
//! Services accept trait-based dependencies, enabling testing with mock
//! implementations.

pub mod run;

#[cfg(test)]
pub mod test_mocks;

pub use run::{RunOutcome, RunService};
