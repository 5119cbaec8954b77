//! Actions shared by the one-shot subcommands and the interactive shell

use serde_json::Value;

use aqlz_core::{ExplainOptions, QueryId, QueryRequest, Result};
use aqlz_query::ActionDispatcher;

use crate::output::{self, OutputFormat};

/// One dispatcher action with its arguments
#[derive(Debug, Clone)]
pub enum Action {
    Execute {
        request: QueryRequest,
        explain: ExplainOptions,
    },
    Running,
    Slow,
    ClearSlow,
    Tracking,
    SetTracking(Vec<(String, Value)>),
    Kill(QueryId),
}

/// Rendered result of an action
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub text: String,
    /// False when a step of an execute action failed
    pub success: bool,
}

impl Output {
    fn ok(text: String) -> Self {
        Self { text, success: true }
    }
}

/// Run `action` and render its result
///
/// Execute step failures are rendered into the output. Every other failure
/// is returned as the error.
pub async fn perform(
    dispatcher: &ActionDispatcher,
    action: Action,
    format: OutputFormat,
) -> Result<Output> {
    tracing::debug!(?action, "performing action");
    match action {
        Action::Execute { request, explain } => {
            let outcome = dispatcher.execute_request(&request, &explain).await?;
            Ok(Output {
                text: output::render_outcome(&outcome, format),
                success: outcome.first_error().is_none(),
            })
        }
        Action::Running => {
            let queries = dispatcher.running_queries().await?;
            Ok(Output::ok(output::render_queries(&queries, format)))
        }
        Action::Slow => {
            let queries = dispatcher.slow_queries().await?;
            Ok(Output::ok(output::render_queries(&queries, format)))
        }
        Action::ClearSlow => {
            dispatcher.clear_slow_queries().await?;
            Ok(Output::ok(output::render_ack("slow query list cleared", format)))
        }
        Action::Tracking => {
            let properties = dispatcher.tracking().await?;
            Ok(Output::ok(output::render_tracking(&properties, format)))
        }
        Action::SetTracking(pairs) => {
            let properties = dispatcher.set_tracking(pairs).await?;
            Ok(Output::ok(output::render_tracking(&properties, format)))
        }
        Action::Kill(id) => {
            dispatcher.kill(id).await?;
            Ok(Output::ok(output::render_ack(
                &format!("query {} killed", id),
                format,
            )))
        }
    }
}
