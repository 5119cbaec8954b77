//! Rendering of results as tables or JSON

use comfy_table::{
    Cell, CellAlignment, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};
use serde_json::{Value, json};

use aqlz_core::{
    AqlzError, BindVars, ConnectionConfig, DatabaseDriver, QueryDescriptor, TrackingProperties,
    TrackingProperty,
};
use aqlz_query::{ExecuteOutcome, QueryHistoryEntry, StepOutcome};

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Tables with borders
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

/// Column used for records that are not objects
const VALUE_COLUMN: &str = "value";

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(columns: &[String]) -> Vec<Cell> {
    columns
        .iter()
        .map(|col| Cell::new(col).fg(Color::Cyan))
        .collect()
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn count_label(n: usize, singular: &str, plural: &str) -> String {
    format!("{} {}", n, if n == 1 { singular } else { plural })
}

/// Plain text for a table cell
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn value_cell(value: Option<&Value>) -> Cell {
    match value {
        None => Cell::new(""),
        Some(Value::Null) => Cell::new("null").fg(Color::Grey),
        Some(v @ Value::Number(_)) => Cell::new(cell_text(v)).set_alignment(CellAlignment::Right),
        Some(v) => Cell::new(cell_text(v)),
    }
}

/// Columns for a set of records: object keys in order of first appearance,
/// plus a value column when any record is not an object
pub fn record_columns(records: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut has_scalars = false;
    for record in records {
        match record {
            Value::Object(map) => {
                for key in map.keys() {
                    if !columns.iter().any(|c| c == key) {
                        columns.push(key.clone());
                    }
                }
            }
            _ => has_scalars = true,
        }
    }
    if has_scalars || columns.is_empty() {
        columns.insert(0, VALUE_COLUMN.to_string());
    }
    columns
}

/// Result records as a table with a row count footer
pub fn records_table(records: &[Value]) -> String {
    let columns = record_columns(records);
    let mut table = new_table();
    table.set_header(header(&columns));

    for record in records {
        let row: Vec<Cell> = columns
            .iter()
            .map(|col| match record {
                Value::Object(map) => value_cell(map.get(col)),
                scalar if col == VALUE_COLUMN => value_cell(Some(scalar)),
                _ => value_cell(None),
            })
            .collect();
        table.add_row(row);
    }

    format!("{}\n{}", table, count_label(records.len(), "record", "records"))
}

fn error_json(err: &AqlzError) -> Value {
    json!({
        "kind": err.kind(),
        "message": err.to_string(),
        "httpCode": err.http_code(),
        "errorNum": err.error_num(),
    })
}

fn step_json<T>(step: &StepOutcome<T>, value: impl FnOnce(&T) -> Value) -> Value {
    match step {
        StepOutcome::Done(v) => json!({ "status": "ok", "value": value(v) }),
        StepOutcome::Failed(err) => json!({ "status": "failed", "error": error_json(err) }),
        StepOutcome::Skipped => json!({ "status": "skipped" }),
    }
}

/// Render an error for display
pub fn render_error(err: &AqlzError, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format!("error ({}): {}", err.kind(), err),
        OutputFormat::Json => pretty(&json!({ "error": error_json(err) })),
    }
}

/// Render all three steps of an execute outcome
pub fn render_outcome(outcome: &ExecuteOutcome, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => pretty(&json!({
            "query": outcome.query,
            "bindVars": outcome.bind_vars,
            "durationMs": outcome.duration_ms,
            "plan": step_json(&outcome.plan, |plan| json!(plan)),
            "validation": step_json(&outcome.validation, |report| json!(report)),
            "result": step_json(&outcome.result, |cursor| json!({
                "records": cursor.records,
                "count": cursor.count,
                "cached": cursor.cached,
                "stats": cursor.stats,
                "warnings": cursor.warnings,
                "batches": cursor.batches,
                "executionTimeMs": cursor.execution_time_ms,
            })),
        })),
        OutputFormat::Table => {
            let mut sections = Vec::new();

            sections.push(match &outcome.plan {
                StepOutcome::Done(plan) => {
                    let cost = plan
                        .estimated_cost()
                        .map(|c| format!(", estimated cost {}", c))
                        .unwrap_or_default();
                    let mut text = format!("Plan: {}{}", plan.node_types().join(" -> "), cost);
                    if !plan.plans.is_empty() {
                        text.push_str(&format!(" ({} candidate plans)", plan.plans.len()));
                    }
                    text
                }
                StepOutcome::Failed(err) => format!("Plan: failed: {}", err),
                StepOutcome::Skipped => "Plan: skipped".to_string(),
            });

            sections.push(match &outcome.validation {
                StepOutcome::Done(report) => {
                    let mut text = format!(
                        "Validation: parsed, collections [{}], bind variables [{}]",
                        report.collections.join(", "),
                        report.bind_vars.join(", ")
                    );
                    let missing = report.missing_bind_vars(&outcome.bind_vars);
                    if !missing.is_empty() {
                        text.push_str(&format!("\n  missing bind variables: {}", missing.join(", ")));
                    }
                    text
                }
                StepOutcome::Failed(err) => format!("Validation: failed: {}", err),
                StepOutcome::Skipped => "Validation: skipped".to_string(),
            });

            sections.push(match &outcome.result {
                StepOutcome::Done(cursor) => {
                    let mut text = records_table(&cursor.records);
                    text.push_str(&format!(" in {} ms", cursor.execution_time_ms));
                    if let Some(count) = cursor.count {
                        text.push_str(&format!(", server count {}", count));
                    }
                    if let Some(full_count) = cursor
                        .stats
                        .as_ref()
                        .and_then(|stats| stats.get("fullCount"))
                    {
                        text.push_str(&format!(", full count {}", full_count));
                    }
                    for warning in &cursor.warnings {
                        text.push_str(&format!("\nwarning {}: {}", warning.code, warning.message));
                    }
                    text
                }
                StepOutcome::Failed(err) => format!("Result: failed: {}", err),
                StepOutcome::Skipped => "Result: skipped (query did not validate)".to_string(),
            });

            sections.join("\n\n")
        }
    }
}

/// Render running or slow query descriptors
pub fn render_queries(queries: &[QueryDescriptor], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => pretty(&json!(queries)),
        OutputFormat::Table => {
            let columns: Vec<String> = ["id", "user", "state", "run time (s)", "started", "query"]
                .iter()
                .map(|c| c.to_string())
                .collect();
            let mut table = new_table();
            table.set_header(header(&columns));
            for q in queries {
                table.add_row(vec![
                    Cell::new(q.id.to_string()).set_alignment(CellAlignment::Right),
                    Cell::new(q.user.as_deref().unwrap_or("")),
                    Cell::new(q.state.as_deref().unwrap_or("")),
                    Cell::new(q.run_time.map(|t| format!("{:.3}", t)).unwrap_or_default())
                        .set_alignment(CellAlignment::Right),
                    Cell::new(q.started.map(|t| t.to_rfc3339()).unwrap_or_default()),
                    Cell::new(&q.query),
                ]);
            }
            format!("{}\n{}", table, count_label(queries.len(), "query", "queries"))
        }
    }
}

/// Render tracking properties as name/value pairs
pub fn render_tracking(properties: &TrackingProperties, format: OutputFormat) -> String {
    let value = json!(properties);
    match format {
        OutputFormat::Json => pretty(&value),
        OutputFormat::Table => {
            let mut table = new_table();
            table.set_header(header(&["property".to_string(), "value".to_string()]));
            for property in TrackingProperty::ALL {
                table.add_row(vec![
                    Cell::new(property.wire_name()),
                    value_cell(value.get(property.wire_name())),
                ]);
            }
            table.to_string()
        }
    }
}

/// Render the session's bind variables
pub fn render_bind_vars(bind_vars: &BindVars, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => pretty(&json!(bind_vars)),
        OutputFormat::Table => {
            if bind_vars.is_empty() {
                return "no bind variables".to_string();
            }
            let mut table = new_table();
            table.set_header(header(&["name".to_string(), "value".to_string()]));
            for (name, value) in bind_vars.iter() {
                table.add_row(vec![Cell::new(name), Cell::new(value.to_string())]);
            }
            table.to_string()
        }
    }
}

/// Render history entries, most recent first
pub fn render_history(entries: &[QueryHistoryEntry], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => pretty(&json!(entries)),
        OutputFormat::Table => {
            let columns: Vec<String> = ["executed at", "ms", "records", "query", "error"]
                .iter()
                .map(|c| c.to_string())
                .collect();
            let mut table = new_table();
            table.set_header(header(&columns));
            for entry in entries {
                let error = match &entry.error {
                    Some(e) => Cell::new(e).fg(Color::Red),
                    None => Cell::new(""),
                };
                table.add_row(vec![
                    Cell::new(entry.executed_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                    Cell::new(entry.duration_ms).set_alignment(CellAlignment::Right),
                    Cell::new(entry.record_count.map(|n| n.to_string()).unwrap_or_default())
                        .set_alignment(CellAlignment::Right),
                    Cell::new(&entry.query),
                    error,
                ]);
            }
            table.to_string()
        }
    }
}

/// Describe a driver: identity, endpoint, capabilities and connection fields
pub fn render_driver_info(
    driver: &dyn DatabaseDriver,
    config: &ConnectionConfig,
    format: OutputFormat,
) -> String {
    let caps = driver.capabilities();
    let capabilities = [
        ("explain", caps.supports_explain),
        ("validation", caps.supports_validation),
        ("bind variables", caps.supports_bind_vars),
        ("query tracking", caps.supports_query_tracking),
        ("kill", caps.supports_kill),
        ("streaming cursors", caps.supports_streaming_cursors),
    ];
    let mut params: Vec<(String, String)> = driver.default_params().into_iter().collect();
    params.sort();
    let schema = driver.connection_field_schema();

    match format {
        OutputFormat::Json => pretty(&json!({
            "id": driver.id(),
            "displayName": driver.display_name(),
            "version": driver.version(),
            "endpoint": driver.build_connection_string(config),
            "defaultHost": driver.default_host(),
            "help": driver.connection_string_help(),
            "capabilities": capabilities
                .iter()
                .map(|(name, supported)| (name.to_string(), json!(supported)))
                .collect::<serde_json::Map<_, _>>(),
            "defaultParams": params
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect::<serde_json::Map<_, _>>(),
            "fields": schema.fields.iter().map(|field| json!({
                "id": field.id,
                "label": field.label,
                "type": field.field_type.as_str(),
                "required": field.required,
                "default": field.default_value,
                "help": field.help_text,
            })).collect::<Vec<_>>(),
        })),
        OutputFormat::Table => {
            let mut about = new_table();
            about.set_header(header(&["driver".to_string(), driver.display_name().to_string()]));
            about.add_row(vec![Cell::new("id"), Cell::new(driver.id())]);
            about.add_row(vec![Cell::new("version"), Cell::new(driver.version())]);
            about.add_row(vec![
                Cell::new("endpoint"),
                Cell::new(driver.build_connection_string(config)),
            ]);
            for (name, supported) in capabilities {
                about.add_row(vec![
                    Cell::new(name),
                    Cell::new(if supported { "yes" } else { "no" }),
                ]);
            }
            for (key, value) in &params {
                about.add_row(vec![Cell::new(format!("default {}", key)), Cell::new(value)]);
            }

            let columns: Vec<String> = ["field", "label", "type", "required", "default"]
                .iter()
                .map(|c| c.to_string())
                .collect();
            let mut fields = new_table();
            fields.set_header(header(&columns));
            for field in &schema.fields {
                fields.add_row(vec![
                    Cell::new(&field.id),
                    Cell::new(&field.label),
                    Cell::new(field.field_type.as_str()),
                    Cell::new(if field.required { "yes" } else { "" }),
                    Cell::new(field.default_value.as_deref().unwrap_or_default()),
                ]);
            }

            let mut text = format!("{}\n{}\n{}", about, schema.title, fields);
            let help = driver.connection_string_help();
            if !help.is_empty() {
                text.push_str(&format!("\n{}", help));
            }
            text
        }
    }
}

/// Confirmation line for actions without a result
pub fn render_ack(message: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => message.to_string(),
        OutputFormat::Json => pretty(&json!({ "ok": true, "message": message })),
    }
}
