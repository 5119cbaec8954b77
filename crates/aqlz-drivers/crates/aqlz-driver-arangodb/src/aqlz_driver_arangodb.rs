//! ArangoDB driver for AQLZ
//!
//! ArangoDB is a multi-model database queried through AQL. This driver
//! speaks its HTTP API directly: explain, parse, cursor and the query
//! tracking endpoints of a single database.

mod driver;
#[cfg(test)]
mod driver_tests;
pub mod wire;
#[cfg(test)]
mod wire_tests;

pub use driver::*;
