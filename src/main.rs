use std::{fmt, path::PathBuf, sync::LazyLock, time::Duration};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use validator::Validate;

mod auxiliary;
mod cli_command;
mod fetcher;
mod request;
mod retry;
mod scheme;
mod transfer;
mod validate;

use crate::{
    auxiliary::CompletionArgs,
    fetcher::ArtifactFetcher,
    request::{FetchOptions, FetchRequest},
};

/// fetch remote artifacts from object storage or HTTP(S), once
#[derive(Parser)]
#[command(name = "artifetch", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    fetch_args: FetchArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch an artifact to a local path (default command)
    #[command(name = "fetch", alias = "get")]
    Fetch(FetchArgs),
    /// Generate shell completion script for specified shell (alias: comp)
    #[command(name = "completion", alias = "comp")]
    Completion(CompletionArgs),
}

#[derive(Clone, Debug, Args, Validate)]
struct FetchArgs {
    // NOTE: Keep these optional to avoid duplicating required args in subcommand usage.
    // We enforce required-ness via validator.
    #[arg(help = "Source locator (s3://bucket/key or http(s) URL)")]
    #[validate(required)]
    source: Option<String>,

    #[arg(short = 'o', long = "out", help = "Destination file path")]
    #[validate(required)]
    output: Option<PathBuf>,

    #[command(flatten)]
    options: FetchOptions,

    #[arg(
        long = "log-level",
        default_value_t = LogLevel::Info,
        help = "Set log level"
    )]
    log_level: LogLevel,

    #[arg(long = "no-progress", help = "Disable progress bar")]
    no_progress: bool,
}

/// Thin wrapper around log levels for clap
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    /// No logging
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(text)
    }
}

const FETCH_COLOR_HEX: &str = "#FFEADB";

static FETCH_SPINNER_TEMPLATE: LazyLock<String> =
    LazyLock::new(|| format!("{{spinner:.{FETCH_COLOR_HEX}}} {{msg}} [{{elapsed}}]"));

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        command,
        fetch_args,
    } = Cli::parse();

    let fetch_args = match command {
        Some(Command::Completion(args)) => {
            auxiliary::handle_completion(&args)?;
            return Ok(());
        }
        Some(Command::Fetch(args)) => args,
        None => fetch_args,
    };

    // Enable RUST_LOG environment variable support
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(format!("artifetch={}", fetch_args.log_level)),
    )
    .init();

    debug!("Fetch arguments: {fetch_args:?}");

    if let Err(err) = fetch_args.validate() {
        Cli::command()
            .error(ErrorKind::MissingRequiredArgument, err.to_string())
            .exit();
    }

    let FetchArgs {
        source,
        output,
        options,
        no_progress,
        ..
    } = fetch_args;
    // Both are guaranteed by validation above
    let (Some(source), Some(output)) = (source, output) else {
        unreachable!("source and output are required");
    };

    let request = FetchRequest::new(source, output);
    let fetcher = ArtifactFetcher::default().with_progress(create_spinner(no_progress));
    let result = fetcher.fetch(&request, &options).await;
    debug!("Fetch result: {result:?}");

    match (result.success, result.error) {
        (true, _) => {
            match result.bytes_written {
                Some(bytes) => info!(
                    "Wrote {bytes} bytes to {:?}",
                    request.destination_path()
                ),
                None => info!("Nothing to do for {:?}", request.destination_path()),
            }
            Ok(())
        }
        (false, Some(kind)) => Err(anyhow::anyhow!(
            "failed to fetch '{}': {kind} after {} attempt(s)",
            request.source_locator(),
            result.attempts
        )),
        (false, None) => Err(anyhow::anyhow!(
            "failed to fetch '{}'",
            request.source_locator()
        )),
    }
}

/// Create and configure a spinner progress bar
/// NOTE: After calling spinner.set_message, be aware that logging will cause a newline.
fn create_spinner(no_progress: bool) -> ProgressBar {
    if no_progress {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(60));
    spinner.set_style(
        ProgressStyle::with_template(FETCH_SPINNER_TEMPLATE.as_str())
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner
}
