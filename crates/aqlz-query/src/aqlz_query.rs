//! AQLZ Query - Sessions, action dispatch and query history
//!
//! Every user action goes through the [`ActionDispatcher`], which fetches the
//! connection from a [`Session`] and performs exactly one operation on it.

mod dispatcher;
mod history;
mod session;
#[cfg(test)]
mod test_helpers;
mod view_models;

pub use dispatcher::{ActionDispatcher, ExecutePolicy};
pub use history::{QueryHistory, QueryHistoryEntry};
pub use session::{Session, SessionState};
pub use view_models::{ExecuteOutcome, StepOutcome};
