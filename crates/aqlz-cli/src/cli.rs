//! `aqlz` - run and inspect AQL queries from the terminal

mod commands;
mod config;
mod logging;
mod output;
mod shell;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use aqlz_core::{
    BindVars, CursorOptions, ExplainOptions, QueryId, QueryRequest, parse_assignment,
};
use aqlz_drivers::DriverRegistry;
use aqlz_query::{ActionDispatcher, ExecutePolicy, Session};

use commands::Action;
use config::{ConfigOverrides, Settings};
use logging::LoggingConfig;
use output::OutputFormat;
use shell::Shell;

#[derive(Parser, Debug)]
#[command(name = "aqlz", version, about = "Run and inspect AQL queries against ArangoDB")]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Server endpoint [env: ARANGO_HOST] [default: http://localhost:8529]
    #[arg(long, global = true)]
    host: Option<String>,

    /// Database name [env: ARANGO_DATABASE] [default: test]
    #[arg(long, global = true)]
    database: Option<String>,

    /// User name [env: ARANGO_USERNAME]
    #[arg(long, global = true)]
    username: Option<String>,

    /// Password [env: ARANGO_PASSWORD]
    #[arg(long, global = true)]
    password: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Explain, validate and execute a query
    Execute(ExecuteArgs),
    /// List running queries
    Running,
    /// List slow queries
    Slow,
    /// Clear the slow query list
    ClearSlow,
    /// Show query tracking properties
    Tracking,
    /// Update query tracking properties
    SetTracking {
        /// Properties to set, e.g. `enabled=true slowQueryThreshold=5`
        #[arg(required = true, value_name = "NAME=VALUE")]
        assignments: Vec<String>,
    },
    /// Kill a running query
    Kill {
        /// Id of the running query
        id: QueryId,
    },
    /// Start an interactive shell
    Shell(QueryOptions),
    /// Show the driver, its capabilities and the resolved endpoint
    DriverInfo,
    /// Check that the server answers with the configured credentials
    Ping,
}

#[derive(Args, Debug)]
struct ExecuteArgs {
    /// Query text; read from stdin when neither QUERY nor --file is given
    query: Option<String>,

    /// Read the query from a file
    #[arg(short, long, conflicts_with = "query")]
    file: Option<PathBuf>,

    /// Bind variable; VALUE is parsed as JSON, otherwise used as a string
    #[arg(short, long = "bind", value_name = "NAME=VALUE")]
    bind: Vec<String>,

    #[command(flatten)]
    options: QueryOptions,
}

#[derive(Args, Debug, Clone)]
struct QueryOptions {
    /// Execute even when the server rejects the query during validation
    #[arg(long)]
    always_run: bool,

    /// Return every candidate plan instead of the optimal one
    #[arg(long)]
    all_plans: bool,

    /// Number of records fetched per round trip
    #[arg(long)]
    batch_size: Option<u32>,

    /// Ask the server for the total number of results
    #[arg(long)]
    count: bool,

    /// Report how many documents matched before the last LIMIT
    #[arg(long)]
    full_count: bool,

    /// Abort the query on the server after this many seconds
    #[arg(long, value_name = "SECS")]
    max_runtime: Option<f64>,

    /// Return execution profiling information with the result
    #[arg(long)]
    profile: bool,
}

impl QueryOptions {
    fn policy(&self) -> ExecutePolicy {
        if self.always_run {
            ExecutePolicy::AlwaysRun
        } else {
            ExecutePolicy::SkipOnInvalid
        }
    }

    fn apply(&self, mut request: QueryRequest) -> QueryRequest {
        if let Some(size) = self.batch_size {
            request = request.with_batch_size(size);
        }
        if let Some(seconds) = self.max_runtime {
            request = request.with_max_runtime(seconds);
        }
        request
            .with_count(self.count)
            .with_full_count(self.full_count)
            .with_profile(self.profile)
    }

    fn cursor_options(&self) -> CursorOptions {
        self.apply(QueryRequest::default()).options
    }

    fn explain(&self) -> ExplainOptions {
        ExplainOptions {
            all_plans: self.all_plans,
            ..ExplainOptions::default()
        }
    }
}

impl ExecuteArgs {
    fn query_text(&self) -> Result<String> {
        let text = match (&self.query, &self.file) {
            (Some(query), _) => query.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read query file: {}", path.display()))?,
            (None, None) => std::io::read_to_string(std::io::stdin())
                .context("Failed to read query from stdin")?,
        };
        if text.trim().is_empty() {
            bail!("no query given");
        }
        Ok(text)
    }

    fn request(&self) -> Result<QueryRequest> {
        let bind_vars = BindVars::from_assignments(&self.bind)?;
        let request = QueryRequest::new(self.query_text()?).with_bind_vars(bind_vars);
        Ok(self.options.apply(request))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match logging::init(LoggingConfig::from_env(cli.verbose)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("warning: logging disabled: {}", e);
            None
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "aqlz failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let overrides = ConfigOverrides {
        host: cli.host,
        database: cli.database,
        username: cli.username,
        password: cli.password,
    };
    let settings = Settings::load(&overrides)?;
    let connection_config = settings.to_connection_config();

    let registry = DriverRegistry::with_defaults();
    let driver = registry.driver_for(&connection_config)?;
    let format = cli.format;

    match cli.command {
        Command::DriverInfo => {
            println!(
                "{}",
                output::render_driver_info(driver.as_ref(), &connection_config, format)
            );
            return Ok(ExitCode::SUCCESS);
        }
        Command::Ping => {
            let endpoint = driver.build_connection_string(&connection_config);
            return Ok(match driver.test_connection(&connection_config).await {
                Ok(()) => {
                    println!(
                        "{}",
                        output::render_ack(&format!("{} is reachable", endpoint), format)
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}", output::render_error(&e, format));
                    ExitCode::FAILURE
                }
            });
        }
        _ => {}
    }

    let session = Arc::new(Session::new(driver, connection_config));

    let code = match cli.command {
        Command::Shell(options) => {
            let dispatcher = ActionDispatcher::new(session.clone()).with_policy(options.policy());
            Shell::new(&dispatcher, format)
                .with_explain_options(options.explain())
                .with_cursor_options(options.cursor_options())
                .run()
                .await?;
            ExitCode::SUCCESS
        }
        command => {
            let (action, policy) = one_shot_action(command)?;
            let dispatcher = ActionDispatcher::new(session.clone()).with_policy(policy);
            match commands::perform(&dispatcher, action, format).await {
                Ok(out) => {
                    println!("{}", out.text);
                    if out.success {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    }
                }
                Err(e) => {
                    eprintln!("{}", output::render_error(&e, format));
                    ExitCode::FAILURE
                }
            }
        }
    };

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "failed to close session");
    }
    Ok(code)
}

fn one_shot_action(command: Command) -> Result<(Action, ExecutePolicy)> {
    let policy = ExecutePolicy::default();
    Ok(match command {
        Command::Execute(args) => (
            Action::Execute {
                request: args.request()?,
                explain: args.options.explain(),
            },
            args.options.policy(),
        ),
        Command::Running => (Action::Running, policy),
        Command::Slow => (Action::Slow, policy),
        Command::ClearSlow => (Action::ClearSlow, policy),
        Command::Tracking => (Action::Tracking, policy),
        Command::SetTracking { assignments } => {
            let pairs = assignments
                .iter()
                .map(|a| parse_assignment(a))
                .collect::<aqlz_core::Result<Vec<_>>>()?;
            (Action::SetTracking(pairs), policy)
        }
        Command::Kill { id } => (Action::Kill(id), policy),
        Command::Shell(_) | Command::DriverInfo | Command::Ping => {
            bail!("not a session action")
        }
    })
}
