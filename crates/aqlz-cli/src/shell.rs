//! Interactive shell
//!
//! Text lines accumulate into a query which runs on `\g` or when a line
//! ends with `;`. Lines starting with a backslash are meta commands. One
//! session serves the whole shell.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::Value;

use aqlz_core::{
    AqlzError, BindVars, CursorOptions, ExplainOptions, QueryId, QueryRequest, Result,
    parse_assignment,
};
use aqlz_query::ActionDispatcher;

use crate::commands::{self, Action};
use crate::output::{self, OutputFormat};

const PROMPT: &str = "aqlz> ";
const CONTINUATION_PROMPT: &str = "   -> ";

/// Number of entries `\history` shows
const HISTORY_LIMIT: usize = 20;

pub const HELP: &str = "\
Type an AQL query; it runs when a line ends with ';' or on \\g.

  \\g                 run the buffered query
  \\c                 discard the buffered query
  \\bind NAME=VALUE   set a bind variable (VALUE is JSON, else a string)
  \\unbind NAME       remove a bind variable
  \\binds             list bind variables
  \\running           list running queries
  \\slow              list slow queries
  \\clear-slow        clear the slow query list
  \\tracking          show query tracking properties
  \\set NAME=VALUE... update query tracking properties
  \\kill ID           kill a running query
  \\history [TEXT]    show recently executed queries, optionally matching TEXT
  \\help              show this help
  \\q                 quit";

/// A parsed meta command
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Go,
    ClearBuffer,
    Bind(String, Value),
    Unbind(String),
    ShowBinds,
    Running,
    Slow,
    ClearSlow,
    Tracking,
    SetTracking(Vec<(String, Value)>),
    Kill(QueryId),
    /// Recent history, optionally filtered by query text
    History(Option<String>),
    Help,
    Quit,
}

fn usage(text: &str) -> AqlzError {
    AqlzError::Validation(format!("usage: {}", text))
}

/// Parse a line starting with a backslash
pub fn parse_command(line: &str) -> Result<ShellCommand> {
    let line = line.trim();
    let body = line.strip_prefix('\\').unwrap_or(line);
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };
    let no_args = |command: ShellCommand| {
        if rest.is_empty() {
            Ok(command)
        } else {
            Err(usage(&format!("\\{}", name)))
        }
    };

    match name {
        "g" => no_args(ShellCommand::Go),
        "c" => no_args(ShellCommand::ClearBuffer),
        "bind" => {
            if rest.is_empty() {
                return Err(usage("\\bind NAME=VALUE"));
            }
            let (key, value) = parse_assignment(rest)?;
            Ok(ShellCommand::Bind(key, value))
        }
        "unbind" => match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
            [name] => Ok(ShellCommand::Unbind(name.to_string())),
            _ => Err(usage("\\unbind NAME")),
        },
        "binds" => no_args(ShellCommand::ShowBinds),
        "running" => no_args(ShellCommand::Running),
        "slow" => no_args(ShellCommand::Slow),
        "clear-slow" => no_args(ShellCommand::ClearSlow),
        "tracking" => no_args(ShellCommand::Tracking),
        "set" => {
            let pairs = rest
                .split_whitespace()
                .map(parse_assignment)
                .collect::<Result<Vec<_>>>()?;
            if pairs.is_empty() {
                return Err(usage("\\set NAME=VALUE..."));
            }
            Ok(ShellCommand::SetTracking(pairs))
        }
        "kill" => {
            if rest.is_empty() {
                return Err(usage("\\kill ID"));
            }
            Ok(ShellCommand::Kill(rest.parse()?))
        }
        "history" => Ok(ShellCommand::History(
            (!rest.is_empty()).then(|| rest.to_string()),
        )),
        "help" | "h" | "?" => Ok(ShellCommand::Help),
        "q" | "quit" => Ok(ShellCommand::Quit),
        other => Err(AqlzError::Validation(format!(
            "unknown command '\\{}' (try \\help)",
            other
        ))),
    }
}

/// What to do after feeding a line to the buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Keep reading lines
    Pending,
    /// Run this query
    Run(String),
    Command(ShellCommand),
}

/// Lines of the query being typed
#[derive(Debug, Default)]
pub struct QueryBuffer {
    lines: Vec<String>,
}

impl QueryBuffer {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Take the buffered query, if it has any text
    pub fn take(&mut self) -> Option<String> {
        let query = self.lines.join("\n").trim().to_string();
        self.lines.clear();
        (!query.is_empty()).then_some(query)
    }

    pub fn feed(&mut self, line: &str) -> Result<Step> {
        let trimmed = line.trim();
        if trimmed.starts_with('\\') {
            return match parse_command(trimmed)? {
                ShellCommand::Go => self
                    .take()
                    .map(Step::Run)
                    .ok_or_else(|| AqlzError::Validation("query buffer is empty".to_string())),
                ShellCommand::ClearBuffer => {
                    self.clear();
                    Ok(Step::Pending)
                }
                command => Ok(Step::Command(command)),
            };
        }
        if trimmed.is_empty() && self.is_empty() {
            return Ok(Step::Pending);
        }

        let text = line.trim_end();
        match text.strip_suffix(';') {
            Some(head) => {
                self.lines.push(head.trim_end_matches(';').to_string());
                Ok(self.take().map(Step::Run).unwrap_or(Step::Pending))
            }
            None => {
                self.lines.push(text.to_string());
                Ok(Step::Pending)
            }
        }
    }
}

/// Shell state for one session
pub struct Shell<'a> {
    dispatcher: &'a ActionDispatcher,
    format: OutputFormat,
    explain: ExplainOptions,
    cursor_options: CursorOptions,
    bind_vars: BindVars,
    buffer: QueryBuffer,
}

impl<'a> Shell<'a> {
    pub fn new(dispatcher: &'a ActionDispatcher, format: OutputFormat) -> Self {
        Self {
            dispatcher,
            format,
            explain: ExplainOptions::default(),
            cursor_options: CursorOptions::default(),
            bind_vars: BindVars::new(),
            buffer: QueryBuffer::default(),
        }
    }

    pub fn with_explain_options(mut self, explain: ExplainOptions) -> Self {
        self.explain = explain;
        self
    }

    pub fn with_cursor_options(mut self, options: CursorOptions) -> Self {
        self.cursor_options = options;
        self
    }

    /// Read and run lines until `\q` or end of input
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut editor = DefaultEditor::new()?;
        let config = self.dispatcher.session().config();
        println!(
            "aqlz shell for {} (database {}). Type \\help for commands.",
            config.host,
            config.database.as_deref().unwrap_or_default()
        );

        loop {
            let prompt = if self.buffer.is_empty() { PROMPT } else { CONTINUATION_PROMPT };
            let line = match tokio::task::block_in_place(|| editor.readline(prompt)) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    self.buffer.clear();
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            if !line.trim().is_empty() {
                if let Err(e) = editor.add_history_entry(line.as_str()) {
                    tracing::debug!(error = %e, "failed to record line history");
                }
            }

            let step = match self.buffer.feed(&line) {
                Ok(step) => step,
                Err(e) => {
                    eprintln!("{}", output::render_error(&e, self.format));
                    continue;
                }
            };
            match step {
                Step::Pending => {}
                Step::Command(ShellCommand::Quit) => break,
                Step::Run(query) => self.run_query(query).await,
                Step::Command(command) => self.handle(command).await,
            }
        }

        tracing::debug!("shell finished");
        Ok(())
    }

    async fn run_query(&mut self, query: String) {
        let mut request = QueryRequest::new(query).with_bind_vars(self.bind_vars.clone());
        request.options = self.cursor_options.clone();
        self.perform(Action::Execute {
            request,
            explain: self.explain.clone(),
        })
        .await;
    }

    async fn perform(&self, action: Action) {
        match commands::perform(self.dispatcher, action, self.format).await {
            Ok(out) => println!("{}", out.text),
            Err(e) => eprintln!("{}", output::render_error(&e, self.format)),
        }
    }

    async fn handle(&mut self, command: ShellCommand) {
        match command {
            ShellCommand::Bind(name, value) => {
                self.bind_vars.insert(name, value);
            }
            ShellCommand::Unbind(name) => {
                if self.bind_vars.remove(&name).is_none() {
                    eprintln!("no bind variable named '{}'", name);
                }
            }
            ShellCommand::ShowBinds => {
                println!("{}", output::render_bind_vars(&self.bind_vars, self.format))
            }
            ShellCommand::Running => self.perform(Action::Running).await,
            ShellCommand::Slow => self.perform(Action::Slow).await,
            ShellCommand::ClearSlow => self.perform(Action::ClearSlow).await,
            ShellCommand::Tracking => self.perform(Action::Tracking).await,
            ShellCommand::SetTracking(pairs) => self.perform(Action::SetTracking(pairs)).await,
            ShellCommand::Kill(id) => self.perform(Action::Kill(id)).await,
            ShellCommand::History(filter) => {
                let history = self.dispatcher.history();
                let entries: Vec<_> = match filter {
                    Some(text) => history
                        .read()
                        .search(&text)
                        .take(HISTORY_LIMIT)
                        .cloned()
                        .collect(),
                    None => history.read().recent(HISTORY_LIMIT),
                };
                println!("{}", output::render_history(&entries, self.format));
            }
            ShellCommand::Help => println!("{}", HELP),
            // Handled by the buffer or the read loop
            ShellCommand::Go | ShellCommand::ClearBuffer | ShellCommand::Quit => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    mod parse_command_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_simple_commands() {
            assert_eq!(parse_command("\\g").unwrap(), ShellCommand::Go);
            assert_eq!(parse_command("\\running").unwrap(), ShellCommand::Running);
            assert_eq!(parse_command("\\slow").unwrap(), ShellCommand::Slow);
            assert_eq!(parse_command("\\clear-slow").unwrap(), ShellCommand::ClearSlow);
            assert_eq!(parse_command("\\tracking").unwrap(), ShellCommand::Tracking);
            assert_eq!(parse_command("\\binds").unwrap(), ShellCommand::ShowBinds);
            assert_eq!(parse_command("\\history").unwrap(), ShellCommand::History(None));
            assert_eq!(parse_command("\\help").unwrap(), ShellCommand::Help);
            assert_eq!(parse_command("  \\q  ").unwrap(), ShellCommand::Quit);
        }

        #[test]
        fn test_bind_parses_json_or_string() {
            assert_eq!(
                parse_command("\\bind limit=10").unwrap(),
                ShellCommand::Bind("limit".to_string(), json!(10))
            );
            assert_eq!(
                parse_command("\\bind @coll=users").unwrap(),
                ShellCommand::Bind("@coll".to_string(), json!("users"))
            );
            assert_eq!(
                parse_command("\\bind tags=[\"a\", \"b\"]").unwrap(),
                ShellCommand::Bind("tags".to_string(), json!(["a", "b"]))
            );
        }

        #[test]
        fn test_bind_requires_assignment() {
            assert!(matches!(parse_command("\\bind"), Err(AqlzError::Validation(_))));
            assert!(matches!(parse_command("\\bind =5"), Err(AqlzError::Validation(_))));
        }

        #[test]
        fn test_unbind() {
            assert_eq!(
                parse_command("\\unbind limit").unwrap(),
                ShellCommand::Unbind("limit".to_string())
            );
            assert!(parse_command("\\unbind").is_err());
            assert!(parse_command("\\unbind a b").is_err());
        }

        #[test]
        fn test_set_tracking_pairs() {
            assert_eq!(
                parse_command("\\set enabled=false slowQueryThreshold=2.5").unwrap(),
                ShellCommand::SetTracking(vec![
                    ("enabled".to_string(), json!(false)),
                    ("slowQueryThreshold".to_string(), json!(2.5)),
                ])
            );
            assert!(parse_command("\\set").is_err());
        }

        #[test]
        fn test_kill_parses_id() {
            assert_eq!(
                parse_command("\\kill 12345").unwrap(),
                ShellCommand::Kill(QueryId(12345))
            );
            assert!(matches!(parse_command("\\kill abc"), Err(AqlzError::Validation(_))));
            assert!(parse_command("\\kill").is_err());
        }

        #[test]
        fn test_history_filter() {
            assert_eq!(
                parse_command("\\history FOR u IN").unwrap(),
                ShellCommand::History(Some("FOR u IN".to_string()))
            );
        }

        #[test]
        fn test_unknown_and_extra_arguments() {
            assert!(matches!(parse_command("\\frobnicate"), Err(AqlzError::Validation(_))));
            assert!(parse_command("\\running now").is_err());
        }
    }

    mod buffer_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_semicolon_runs_query() {
            let mut buffer = QueryBuffer::default();
            assert_eq!(buffer.feed("RETURN 1;").unwrap(), Step::Run("RETURN 1".to_string()));
            assert!(buffer.is_empty());
        }

        #[test]
        fn test_lines_accumulate_until_go() {
            let mut buffer = QueryBuffer::default();
            assert_eq!(buffer.feed("FOR u IN users").unwrap(), Step::Pending);
            assert_eq!(buffer.feed("  RETURN u").unwrap(), Step::Pending);
            assert!(!buffer.is_empty());
            assert_eq!(
                buffer.feed("\\g").unwrap(),
                Step::Run("FOR u IN users\n  RETURN u".to_string())
            );
            assert!(buffer.is_empty());
        }

        #[test]
        fn test_multiline_query_ending_in_semicolon() {
            let mut buffer = QueryBuffer::default();
            buffer.feed("FOR i IN 1..3").unwrap();
            assert_eq!(
                buffer.feed("RETURN i ;").unwrap(),
                Step::Run("FOR i IN 1..3\nRETURN i".to_string())
            );
        }

        #[test]
        fn test_go_on_empty_buffer_is_error() {
            let mut buffer = QueryBuffer::default();
            assert!(matches!(buffer.feed("\\g"), Err(AqlzError::Validation(_))));
        }

        #[test]
        fn test_commands_keep_buffer() {
            let mut buffer = QueryBuffer::default();
            buffer.feed("RETURN @x").unwrap();
            assert_eq!(
                buffer.feed("\\bind x=1").unwrap(),
                Step::Command(ShellCommand::Bind("x".to_string(), json!(1)))
            );
            assert_eq!(buffer.feed("\\g").unwrap(), Step::Run("RETURN @x".to_string()));
        }

        #[test]
        fn test_clear_discards_buffer() {
            let mut buffer = QueryBuffer::default();
            buffer.feed("RETURN 1").unwrap();
            assert_eq!(buffer.feed("\\c").unwrap(), Step::Pending);
            assert!(buffer.is_empty());
        }

        #[test]
        fn test_blank_lines_and_lone_semicolon() {
            let mut buffer = QueryBuffer::default();
            assert_eq!(buffer.feed("   ").unwrap(), Step::Pending);
            assert_eq!(buffer.feed(";").unwrap(), Step::Pending);
            assert!(buffer.is_empty());
        }
    }
}
