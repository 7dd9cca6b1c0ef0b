pub mod config;
pub mod daemon;
pub mod dns;
pub mod error;
pub mod secrets;
pub mod solver;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ErrorKind, Result, SolverError};
