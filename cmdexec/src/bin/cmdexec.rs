//! Command executor CLI
//!
//! Runs a sequence of commands against the demo tool provider and prints the
//! resulting message and context as JSON.
//!
//! Usage:
//!   cmdexec commands.txt
//!   cmdexec -c "x = 1 + 1" -c "echo(x * 2)" --context '{"y": 3}'
//!   echo '["x = 1", "warn(x)"]' | cmdexec -

use anyhow::{bail, Context as _};
use clap::Parser;
use cmdexec::demo::demo_provider;
use cmdexec::{ExecMessage, Executor, ExecutorConfig};
use cmdlang::Context;
use serde_json::json;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cmdexec")]
#[command(about = "Execute agent commands against a shared context")]
#[command(version)]
struct Args {
    /// File with commands: a JSON array of strings, or one command per
    /// non-blank line. Use `-` for stdin.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Command to run (repeatable; runs after the ones from FILE)
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    commands: Vec<String>,

    /// JSON object seeding the context
    #[arg(long, value_name = "JSON")]
    context: Option<String>,

    /// Executor configuration file (TOML)
    #[arg(long, env = "CMDEXEC_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Install prelude builtins (len, str, int, ...) into the context
    #[arg(long)]
    prelude: bool,

    /// Log rewritten commands at debug level
    #[arg(long)]
    log_rewrites: bool,

    /// Override the rewriter pass limit
    #[arg(long, value_name = "N")]
    max_rewrite_passes: Option<usize>,

    /// Abort the whole invocation after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl Args {
    /// Config file values with command-line flags on top.
    fn executor_config(&self) -> anyhow::Result<ExecutorConfig> {
        let mut config = match &self.config {
            Some(path) => ExecutorConfig::load_from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ExecutorConfig::default(),
        };
        if self.prelude {
            config.install_prelude = true;
        }
        if self.log_rewrites {
            config.log_rewrites = true;
        }
        if let Some(passes) = self.max_rewrite_passes {
            config.max_rewrite_passes = passes;
        }
        Ok(config)
    }

    fn load_commands(&self) -> anyhow::Result<Vec<String>> {
        let mut commands = match &self.file {
            Some(path) if path.as_os_str() == "-" => {
                let mut input = String::new();
                std::io::stdin()
                    .read_to_string(&mut input)
                    .context("reading commands from stdin")?;
                parse_commands(&input)?
            }
            Some(path) => {
                let input = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                parse_commands(&input)?
            }
            None => Vec::new(),
        };
        commands.extend(self.commands.iter().cloned());
        if commands.is_empty() && self.file.is_none() {
            bail!("no commands given: pass FILE, `-` or --command");
        }
        Ok(commands)
    }

    fn seed_context(&self) -> anyhow::Result<Context> {
        match &self.context {
            Some(raw) => {
                let json: serde_json::Value =
                    serde_json::from_str(raw).context("parsing --context")?;
                Ok(Context::from_json(json)?)
            }
            None => Ok(Context::new()),
        }
    }
}

/// A JSON array of strings, or one command per non-blank line.
fn parse_commands(input: &str) -> anyhow::Result<Vec<String>> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("parsing JSON command list");
    }
    Ok(input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = args.executor_config()?;
    let commands = args.load_commands()?;
    let mut context = args.seed_context()?;
    let mut provider = demo_provider();
    let executor = Executor::new(config);

    info!(commands = commands.len(), "starting execution");
    let execution = executor.run(&commands, &mut context, &mut provider);
    let outcome = match args.timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), execution)
            .await
            .with_context(|| format!("timed out after {}s", secs))??,
        None => execution.await?,
    };

    print_result(&outcome.message, &context, args.pretty)?;
    Ok(if outcome.message.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_result(message: &ExecMessage, context: &Context, pretty: bool) -> anyhow::Result<()> {
    let output = json!({
        "message": message,
        "context": context.to_json(),
    });
    let rendered = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", rendered);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cmdexec=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
