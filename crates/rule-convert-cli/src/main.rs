// crates/rule-convert-cli/src/main.rs
// ============================================================================
// Module: Rule Convert CLI Entry Point
// Description: Interactive and scripted batch conversion of detection rules.
// Purpose: Resolve inputs, verify the tool server, and drive a conversion run.
// Dependencies: clap, rule-convert-config, rule-convert-core, thiserror, tokio.
// ============================================================================

//! ## Overview
//! `rule-convert` reads a directory of third-party detection rules, converts
//! each one through the remote rule-generation tools, and writes one
//! detection+response document per rule plus a `report.txt` summary. Missing
//! inputs are prompted for unless `--non-interactive` is given; `--verify`
//! runs pre-flight checks instead of converting.
//!
//! All user-facing strings are routed through the i18n catalog. Security
//! posture: inputs are untrusted and validated before any network activity;
//! API keys are only displayed masked.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::StdinLock;
use std::io::Stdout;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Parser;
use rule_convert_cli::prompt::PromptError;
use rule_convert_cli::prompt::Prompter;
use rule_convert_cli::t;
use rule_convert_config::ConfigError;
use rule_convert_config::Credentials;
use rule_convert_config::DEFAULT_ENDPOINT;
use rule_convert_config::DEFAULT_RULES_DIR;
use rule_convert_config::DEFAULT_TOKEN_ENDPOINT;
use rule_convert_config::DiscoveredCredentials;
use rule_convert_config::RunSettings;
use rule_convert_config::WorkerCount;
use rule_convert_config::discover_credentials;
use rule_convert_config::resolve_user_path;
use rule_convert_config::validate_endpoint;
use rule_convert_core::BatchRunner;
use rule_convert_core::ConversionOutcome;
use rule_convert_core::EventSink;
use rule_convert_core::FileEventSink;
use rule_convert_core::McpClient;
use rule_convert_core::McpClientConfig;
use rule_convert_core::NoopEventSink;
use rule_convert_core::ProgressSink;
use rule_convert_core::RuleConverter;
use rule_convert_core::RunStatistics;
use rule_convert_core::StderrEventSink;
use rule_convert_core::batch::GENERIC_FAILURE;
use rule_convert_core::batch::discover_rule_files;
use rule_convert_core::convert::REQUIRED_TOOLS;
use rule_convert_core::convert::missing_required_tools;
use rule_convert_core::report::ReportError;
use rule_convert_core::report::local_now;
use rule_convert_core::report::render_report;
use rule_convert_core::report::write_report;
use rule_convert_core::setup::SetupCheck;
use rule_convert_core::setup::SetupVerifier;
use rule_convert_core::setup::TOOLS_CHECK_TIMEOUT;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Width of the banner and ingestion rules.
const BANNER_WIDTH: usize = 70;
/// Width of the end-of-run summary rules.
const SUMMARY_WIDTH: usize = 50;
/// Worker count used when `--parallel-workers` is omitted.
const DEFAULT_PARALLEL_WORKERS: i64 = 10;
/// `--event-log` value selecting stderr instead of a file.
const STDERR_EVENT_LOG: &str = "-";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "rule-convert",
    about = "Convert security rules to LimaCharlie D&R format",
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue)]
    show_version: bool,
    /// LimaCharlie organization ID.
    #[arg(long, value_name = "OID")]
    oid: Option<String>,
    /// LimaCharlie API key.
    #[arg(long = "api-key", value_name = "KEY")]
    api_key: Option<String>,
    /// Source platform name (e.g. okta, crowdstrike).
    #[arg(long, value_name = "NAME")]
    platform: Option<String>,
    /// Directory containing source rules.
    #[arg(long = "rules-dir", value_name = "DIR")]
    rules_dir: Option<PathBuf>,
    /// Output directory (default: <rules-dir>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Number of parallel conversion workers (1-50).
    #[arg(
        long = "parallel-workers",
        value_name = "N",
        default_value_t = DEFAULT_PARALLEL_WORKERS,
        allow_negative_numbers = true
    )]
    parallel_workers: i64,
    /// Skip the data ingestion confirmation prompt.
    #[arg(long = "skip-confirmation", action = ArgAction::SetTrue)]
    skip_confirmation: bool,
    /// Tool server endpoint.
    #[arg(long, value_name = "URL", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Never prompt; missing values are errors.
    #[arg(long = "non-interactive", action = ArgAction::SetTrue)]
    non_interactive: bool,
    /// Append JSON-line events to PATH (`-` for stderr).
    #[arg(long = "event-log", value_name = "PATH")]
    event_log: Option<PathBuf>,
    /// Run setup checks and exit without converting.
    #[arg(long, action = ArgAction::SetTrue)]
    verify: bool,
    /// Token endpoint used by `--verify` to check credentials.
    #[arg(long = "jwt-endpoint", value_name = "URL", default_value = DEFAULT_TOKEN_ENDPOINT)]
    jwt_endpoint: String,
}

/// Everything a conversion run needs once prompting is over.
#[derive(Debug)]
struct RunInputs {
    /// Organization credentials.
    credentials: Credentials,
    /// Validated run settings.
    settings: RunSettings,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl From<PromptError> for CliError {
    fn from(error: PromptError) -> Self {
        Self::new(t!("config.invalid", error = error))
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Wraps a configuration failure.
fn config_error(error: ConfigError) -> CliError {
    CliError::new(t!("config.invalid", error = error))
}

/// Wraps a report failure.
fn report_error(error: ReportError) -> CliError {
    CliError::new(t!("run.report_failed", error = error))
}

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

/// Parses arguments and dispatches to conversion or verification.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        stdout_line(&t!("main.version", version = version))?;
        return Ok(ExitCode::SUCCESS);
    }

    let workers = WorkerCount::new(cli.parallel_workers).map_err(config_error)?;
    if cli.verify {
        return command_verify(&cli).await;
    }
    command_convert(&cli, workers).await
}

// ============================================================================
// SECTION: Convert Command
// ============================================================================

/// Runs a full conversion: inputs, tool discovery, batch, report.
async fn command_convert(cli: &Cli, workers: WorkerCount) -> CliResult<ExitCode> {
    write_banner(&t!("main.banner.title"))?;
    let discovered = discover_unless_explicit(cli);
    let RunInputs {
        credentials,
        settings,
    } = {
        let mut prompter = terminal_prompter();
        gather_run_inputs(cli, workers, discovered, &mut prompter)?
    };

    stdout_line("")?;
    stdout_line(&t!("run.rules_dir", path = settings.rules_dir.display()))?;
    stdout_line(&t!("run.output_dir", path = settings.output_dir.display()))?;
    stdout_line("")?;

    let events = open_event_sink(cli.event_log.as_deref())?;
    let client = McpClient::new(McpClientConfig::new(settings.endpoint.clone(), credentials))
        .map_err(|err| CliError::new(t!("run.client_failed", error = err)))?;
    if !discover_tools(&client).await? {
        return Err(CliError::new(t!("tools.missing_guidance")));
    }
    stdout_line("")?;

    let pending = discover_rule_files(&settings.rules_dir)
        .await
        .map_err(|err| CliError::new(t!("run.batch_failed", error = err)))?;
    if pending.is_empty() {
        stdout_line(&t!("run.no_files", path = settings.rules_dir.display()))?;
    } else {
        stdout_line(&t!(
            "run.processing",
            count = pending.len(),
            workers = settings.workers.get()
        ))?;
        stdout_line("")?;
    }

    let converter = Arc::new(RuleConverter::new(
        Arc::new(client),
        settings.platform.clone(),
        Arc::clone(&events),
    ));
    let runner = BatchRunner::new(converter, settings.workers, events);
    let progress = ConsoleProgress;
    let summary = tokio::select! {
        result = runner.run(&settings.rules_dir, &settings.output_dir, &progress) => {
            result.map_err(|err| CliError::new(t!("run.batch_failed", error = err)))?
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            return Err(CliError::new(t!("run.interrupted")));
        }
    };

    let report = render_report(&summary.statistics, local_now(), summary.duration)
        .map_err(report_error)?;
    let report_path = write_report(&settings.output_dir, &report).map_err(report_error)?;
    for line in console_summary(&summary.statistics, &report_path) {
        stdout_line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Lists server tools and reports whether both generation tools exist.
async fn discover_tools(client: &McpClient) -> CliResult<bool> {
    stdout_line(&t!("tools.discovering"))?;
    let tools = match client.list_tools().await {
        Ok(tools) => tools,
        Err(err) => {
            stdout_line(&t!("tools.discovery_failed", error = err))?;
            return Ok(false);
        }
    };
    let missing = missing_required_tools(&tools);
    for tool in REQUIRED_TOOLS {
        if missing.contains(&tool) {
            stdout_line(&t!("tools.missing", tool = tool))?;
        } else {
            stdout_line(&t!("tools.found", tool = tool))?;
        }
    }
    Ok(missing.is_empty())
}

/// Opens the event sink selected by `--event-log`.
fn open_event_sink(path: Option<&Path>) -> CliResult<Arc<dyn EventSink>> {
    let Some(path) = path else {
        return Ok(Arc::new(NoopEventSink));
    };
    if path.as_os_str() == STDERR_EVENT_LOG {
        return Ok(Arc::new(StderrEventSink));
    }
    let sink = FileEventSink::new(path).map_err(|err| {
        CliError::new(t!("run.event_log_failed", path = path.display(), error = err))
    })?;
    Ok(Arc::new(sink))
}

/// Progress sink printing one line per completed file.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn file_completed(&self, completed: usize, total: usize, outcome: &ConversionOutcome) {
        let _ = write_stdout_line(&progress_line(completed, total, outcome));
    }
}

/// Formats the progress line for one completed file.
fn progress_line(completed: usize, total: usize, outcome: &ConversionOutcome) -> String {
    let file = outcome.file_name();
    if outcome.is_success() {
        return t!("run.progress.success", completed = completed, total = total, file = file);
    }
    let error = outcome.error.as_deref().unwrap_or(GENERIC_FAILURE);
    t!("run.progress.failure", completed = completed, total = total, file = file, error = error)
}

/// Builds the end-of-run console summary.
fn console_summary(statistics: &RunStatistics, report_path: &Path) -> Vec<String> {
    let rule = "=".repeat(SUMMARY_WIDTH);
    vec![
        String::new(),
        rule.clone(),
        t!("summary.title"),
        rule.clone(),
        t!("summary.converted", success = statistics.success, total = statistics.total),
        t!("summary.failed", failed = statistics.failed, total = statistics.total),
        t!("summary.report", path = report_path.display()),
        rule,
        String::new(),
    ]
}

// ============================================================================
// SECTION: Verify Command
// ============================================================================

/// Runs the setup checks; exit code reflects whether all passed.
async fn command_verify(cli: &Cli) -> CliResult<ExitCode> {
    write_banner(&t!("verify.banner.title"))?;
    let discovered = discover_unless_explicit(cli);
    let credentials = {
        let mut prompter = terminal_prompter();
        resolve_credentials(cli, discovered, &mut prompter)?
    };
    let endpoint = validate_endpoint(&cli.endpoint).map_err(config_error)?;
    let token_endpoint = validate_endpoint(&cli.jwt_endpoint).map_err(config_error)?;

    let mut config = McpClientConfig::new(endpoint, credentials.clone());
    config.rpc_timeout = TOOLS_CHECK_TIMEOUT;
    let client = McpClient::new(config)
        .map_err(|err| CliError::new(t!("verify.init_failed", error = err)))?;
    let verifier = SetupVerifier::new(token_endpoint, credentials)
        .map_err(|err| CliError::new(t!("verify.init_failed", error = err)))?;
    let checks = verifier.verify(&client).await;

    stdout_line("")?;
    for check in &checks {
        stdout_line(&check_line(check))?;
    }
    let passed = checks.iter().filter(|check| check.passed).count();
    stdout_line("")?;
    stdout_line(&t!("verify.summary", passed = passed, total = checks.len()))?;
    if passed == checks.len() {
        stdout_line(&t!("verify.ok"))?;
        return Ok(ExitCode::SUCCESS);
    }
    Ok(emit_error(&t!("verify.failed")))
}

/// Formats one setup check result.
fn check_line(check: &SetupCheck) -> String {
    let name = check.name.label();
    if check.passed {
        t!("verify.check.pass", name = name, detail = check.detail)
    } else {
        t!("verify.check.fail", name = name, detail = check.detail)
    }
}

// ============================================================================
// SECTION: Interactive Inputs
// ============================================================================

/// Returns a prompter bound to the process terminal.
fn terminal_prompter() -> Prompter<StdinLock<'static>, Stdout> {
    Prompter::new(std::io::stdin().lock(), std::io::stdout())
}

/// Discovers stored credentials unless both were passed as flags.
fn discover_unless_explicit(cli: &Cli) -> Option<DiscoveredCredentials> {
    if cli.oid.is_some() && cli.api_key.is_some() {
        return None;
    }
    discover_credentials()
}

/// Resolves credentials, settings, and the ingestion confirmation.
fn gather_run_inputs<R: BufRead, W: Write>(
    cli: &Cli,
    workers: WorkerCount,
    discovered: Option<DiscoveredCredentials>,
    prompter: &mut Prompter<R, W>,
) -> CliResult<RunInputs> {
    if cli.non_interactive && !cli.skip_confirmation {
        return Err(CliError::new(t!("config.confirmation_required")));
    }
    let credentials = resolve_credentials(cli, discovered, prompter)?;

    let platform = if let Some(platform) = &cli.platform {
        platform.clone()
    } else {
        prompter.say("")?;
        prompter.say(&t!("platform.intro"))?;
        ask_value(cli, prompter, &t!("platform.prompt"), None, "platform")?.to_lowercase()
    };

    let rules_dir = if let Some(rules_dir) = &cli.rules_dir {
        rules_dir.clone()
    } else {
        prompter.say("")?;
        prompter.say(&t!("rules_dir.intro"))?;
        let answer = ask_value(
            cli,
            prompter,
            &t!("rules_dir.prompt"),
            Some(DEFAULT_RULES_DIR),
            "rules directory",
        )?;
        resolve_user_path(&answer)
    };

    let settings =
        RunSettings::new(&platform, rules_dir, cli.output_dir.clone(), workers, &cli.endpoint)
            .map_err(config_error)?;

    if !cli.skip_confirmation && !confirm_data_ingestion(&settings.platform, prompter)? {
        return Err(CliError::new(t!("ingestion.declined")));
    }
    Ok(RunInputs {
        credentials,
        settings,
    })
}

/// Resolves credentials from flags, discovery, and prompts, in that order.
fn resolve_credentials<R: BufRead, W: Write>(
    cli: &Cli,
    discovered: Option<DiscoveredCredentials>,
    prompter: &mut Prompter<R, W>,
) -> CliResult<Credentials> {
    if let (Some(oid), Some(api_key)) = (&cli.oid, &cli.api_key) {
        return Credentials::new(oid.as_str(), api_key.as_str()).map_err(config_error);
    }

    let mut oid = cli.oid.clone();
    let mut api_key = cli.api_key.clone();
    if let Some(found) = discovered {
        prompter.say(&t!("credentials.found", source = found.source))?;
        prompter.say(&t!("credentials.oid", oid = found.credentials.oid))?;
        prompter.say(&t!("credentials.api_key", api_key = found.credentials.masked_api_key()))?;
        prompter.say("")?;
        let accepted = cli.non_interactive || prompter.accept(&t!("credentials.confirm"))?;
        if accepted {
            prompter.say(&t!("credentials.accepted"))?;
            oid = oid.or(Some(found.credentials.oid));
            api_key = api_key.or(Some(found.credentials.api_key));
        } else {
            prompter.say(&t!("credentials.declined"))?;
        }
        prompter.say("")?;
    }

    if (oid.is_none() || api_key.is_none()) && !cli.non_interactive {
        prompter.say(&t!("credentials.intro"))?;
        prompter.say(&t!("credentials.intro_hint"))?;
        prompter.say("")?;
    }
    let oid = match oid {
        Some(oid) => oid,
        None => ask_value(cli, prompter, &t!("credentials.prompt.oid"), None, "organization id")?,
    };
    let api_key = match api_key {
        Some(api_key) => api_key,
        None => ask_value(cli, prompter, &t!("credentials.prompt.api_key"), None, "api key")?,
    };
    Credentials::new(oid, api_key).map_err(config_error)
}

/// Prompts for a required value, or fails when prompting is disabled.
fn ask_value<R: BufRead, W: Write>(
    cli: &Cli,
    prompter: &mut Prompter<R, W>,
    prompt: &str,
    default: Option<&str>,
    field: &'static str,
) -> CliResult<String> {
    if cli.non_interactive {
        return Err(config_error(ConfigError::Missing(field)));
    }
    Ok(prompter.ask(prompt, default, true)?)
}

/// Explains the ingestion prerequisite and asks whether it is met.
fn confirm_data_ingestion<R: BufRead, W: Write>(
    platform: &str,
    prompter: &mut Prompter<R, W>,
) -> CliResult<bool> {
    let rule = "=".repeat(BANNER_WIDTH);
    prompter.say("")?;
    prompter.say(&rule)?;
    prompter.say(&t!("ingestion.header"))?;
    prompter.say(&rule)?;
    prompter.say("")?;
    prompter.say(&t!("ingestion.body", platform = platform))?;
    prompter.say("")?;
    prompter.say(&rule)?;
    prompter.say("")?;
    Ok(prompter.confirm(&t!("ingestion.question"))?)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes the title banner.
fn write_banner(title: &str) -> CliResult<()> {
    let rule = "=".repeat(BANNER_WIDTH);
    stdout_line(&rule)?;
    stdout_line(title)?;
    stdout_line(&rule)?;
    stdout_line("")
}

/// Writes a line to stdout, mapping failures to a localized error.
fn stdout_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
