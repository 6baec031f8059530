// crates/query-gate-cli/src/main.rs
// ============================================================================
// Module: Query Gate CLI Entry Point
// Description: Command dispatcher for the query gateway server and tooling.
// Purpose: Launch the HTTP gateway and preview routing and statements offline.
// Dependencies: clap, query-gate-config, query-gate-core, query-gate-mssql,
// query-gate-server, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! `query-gate serve` runs the HTTP gateway against SQL Server. The offline
//! commands (`build`, `resolve`, `config`) exercise the same validation,
//! routing, and configuration code without opening a database connection.
//! Security posture: inputs are untrusted; `resolve` never prints
//! credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use query_gate_cli::serve_policy::BindOutcome;
use query_gate_cli::serve_policy::enforce_bind_policy;
use query_gate_cli::serve_policy::resolve_allow_non_loopback;
use query_gate_config::QueryGateConfig;
use query_gate_config::config_toml_example;
use query_gate_core::ANONYMOUS_CALLER;
use query_gate_core::ConnectionResolver;
use query_gate_core::ProcessEnvLookup;
use query_gate_core::RawQueryRequest;
use query_gate_core::prepare_statement;
use query_gate_core::tenant_key;
use query_gate_mssql::MssqlBackend;
use query_gate_server::ServerState;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "query-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP query gateway.
    Serve(ServeCommand),
    /// Validate parameters and print the statement they produce.
    Build(BuildCommand),
    /// Show which connection entry serves a caller identity.
    Resolve(ResolveCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to query-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Allow binding to non-loopback addresses.
    #[arg(long)]
    allow_non_loopback: bool,
}

/// Arguments for `build`.
#[derive(Args, Debug)]
struct BuildCommand {
    /// Comma-separated column list.
    #[arg(long)]
    select: Option<String>,
    /// Row limit.
    #[arg(long)]
    top: Option<String>,
    /// Dotted source identifier.
    #[arg(long)]
    from: Option<String>,
    /// Raw predicate.
    #[arg(long = "where", value_name = "FILTER")]
    filter: Option<String>,
}

/// Arguments for `resolve`.
#[derive(Args, Debug)]
struct ResolveCommand {
    /// Caller identity; omitted means the anonymous caller.
    #[arg(long)]
    identity: Option<String>,
    /// Optional config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file.
    Validate {
        /// Optional config file path.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Print a canonical example config.
    Example,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Build(command) => command_build(&command),
        Commands::Resolve(command) => command_resolve(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let allow_non_loopback = resolve_allow_non_loopback(command.allow_non_loopback)
        .map_err(|err| CliError::new(err.to_string()))?;
    let bind_outcome = enforce_bind_policy(&config, allow_non_loopback)
        .map_err(|err| CliError::new(err.to_string()))?;
    warn_bind_outcome(&bind_outcome)?;

    let state = ServerState::from_config(
        &config,
        Box::new(ProcessEnvLookup),
        Arc::new(MssqlBackend::new()),
    )
    .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stderr_line(&format!("query-gate listening on http://{}", bind_outcome.bind_addr))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    query_gate_server::serve(bind_outcome.bind_addr, Arc::new(state))
        .await
        .map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Emits startup warnings for exposed or unaudited servers.
fn warn_bind_outcome(outcome: &BindOutcome) -> CliResult<()> {
    if outcome.network_exposed {
        write_stderr_line(&format!(
            "warning: binding {} exposes the gateway beyond loopback; the identity header must \
             be set by a trusted proxy",
            outcome.bind_addr
        ))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    if !outcome.audit_enabled {
        write_stderr_line("warning: audit logging is disabled")
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Offline Commands
// ============================================================================

/// Executes the `build` command.
fn command_build(command: &BuildCommand) -> CliResult<ExitCode> {
    let request = RawQueryRequest::from_params(
        None,
        command.select.as_deref(),
        command.top.as_deref(),
        command.from.as_deref(),
        command.filter.as_deref(),
    );
    match prepare_statement(&request) {
        Ok(statement) => {
            write_stdout_line(statement.sql())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => Err(CliError::new(format!(
            "{} (code {})",
            failure.message,
            failure.kind.code()
        ))),
    }
}

/// Executes the `resolve` command.
fn command_resolve(command: &ResolveCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let caller =
        command.identity.as_deref().filter(|value| !value.is_empty()).unwrap_or(ANONYMOUS_CALLER);
    let resolver = ConnectionResolver::new(ProcessEnvLookup, config.connections.resolver_config());
    let Some(resolved) = resolver.resolve(caller) else {
        return Err(CliError::new(format!(
            "no connection entry resolves for {caller} (tried {})",
            tried_entries(&resolver, caller).join(", ")
        )));
    };
    let summary = json!({
        "caller": caller,
        "tenant_key": tenant_key(caller),
        "entry_name": resolved.entry_name,
        "resolution": resolved.source,
        "server": resolved.descriptor.server,
        "database": resolved.descriptor.options.database,
        "auth_mode": resolved.descriptor.auth_mode(),
    });
    let text = serde_json::to_string_pretty(&summary)
        .map_err(|err| CliError::new(format!("output encode failed: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Lists the entry names a resolution attempt reads, in order.
fn tried_entries(resolver: &ConnectionResolver<ProcessEnvLookup>, caller: &str) -> Vec<String> {
    let config = resolver.config();
    let mut entries = Vec::new();
    if let Some(key) = tenant_key(caller) {
        entries.push(config.entry_name(&key));
    }
    entries.push(config.entry_name(&config.default_key));
    entries
}

/// Executes `config` subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate {
            config,
        } => {
            let config = load_config(config.as_deref())?;
            write_stdout_line(&format!("config ok (bind {})", config.server.bind))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration from an explicit path or the default location.
fn load_config(path: Option<&Path>) -> CliResult<QueryGateConfig> {
    QueryGateConfig::load(path)
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
