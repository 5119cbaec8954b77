//! AQLZ Drivers - Database driver implementations
//!
//! This crate collects the concrete implementations of the driver traits
//! defined in `aqlz-core`, each behind a cargo feature.

#[cfg(feature = "arangodb")]
pub use aqlz_driver_arangodb as arangodb;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from aqlz-core
pub use aqlz_core::{
    AqlzError, Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities, Result,
};
