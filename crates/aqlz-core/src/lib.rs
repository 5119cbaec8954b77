//! AQLZ Core - Core abstractions and types for the AQL console
//!
//! This crate provides the fundamental traits and types that all other
//! AQLZ crates depend on. It defines:
//!
//! - `DatabaseDriver` - Trait for database driver implementations
//! - `Connection` - Trait for the AQL query API of a connection
//! - `AqlzError` - The error taxonomy shared by every crate
//! - Common types like `BindVars`, `QueryRequest`, `QueryCursor`,
//!   `ExplainPlan`, `QueryDescriptor` and `TrackingProperties`

mod connection;
mod driver;
mod error;
mod tracking;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use tracking::*;
pub use types::*;
