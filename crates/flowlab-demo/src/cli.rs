use std::io::Write;
use std::time::Duration;

use clap::{Parser, Subcommand};

use flowlab_core::logging::{self, LogFormat};
use flowlab_runtime::policy::ConsumerPolicy;
use flowlab_runtime::source::CountdownSource;

use crate::config::{DEFAULT_HANDLER_MS, DEFAULT_PLACEHOLDER, DEFAULT_REPLAY, DemoConfig};
use crate::display::{line_presses, run_screen, scripted_presses};
use crate::error::Result;
use crate::session::Session;
use crate::strategies::{self, DEFAULT_FOLD_SEED};
use crate::transcript::{Event, OutputFormat, Transcript};

const DEFAULT_LOG_DIRECTIVE: &str = "warn";

#[derive(Debug, Parser)]
#[command(
    name = "flowlab-demo",
    about = "Countdown, counter and consumer-policy demos for flowlab",
    version
)]
pub struct Cli {
    /// Countdown start value.
    #[arg(long, global = true, env = "FLOWLAB_START", default_value_t = CountdownSource::DEFAULT_START)]
    pub start: u32,

    /// Milliseconds between countdown values.
    #[arg(long = "tick-ms", global = true, env = "FLOWLAB_TICK_MS", default_value_t = 1000)]
    pub tick_ms: u64,

    /// Value shown before the first real emission.
    #[arg(long, global = true, env = "FLOWLAB_PLACEHOLDER", default_value_t = DEFAULT_PLACEHOLDER)]
    pub placeholder: u64,

    /// How many shared values late subscribers receive.
    #[arg(long, global = true, env = "FLOWLAB_REPLAY", default_value_t = DEFAULT_REPLAY)]
    pub replay: usize,

    /// How long the course handler takes per item.
    #[arg(long = "handler-ms", global = true, env = "FLOWLAB_HANDLER_MS", default_value_t = DEFAULT_HANDLER_MS)]
    pub handler_ms: u64,

    /// Press the button N times instead of reading stdin.
    #[arg(long, global = true, env = "FLOWLAB_PRESSES")]
    pub presses: Option<u32>,

    #[arg(long, global = true, env = "FLOWLAB_OUTPUT", value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Log line format on stderr (pretty|json). Filter via FLOWLAB_LOG or RUST_LOG.
    #[arg(long = "log-format", global = true, env = "FLOWLAB_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Counter button plus countdown; one press per stdin line (default).
    Screen,

    /// Print `Time is N` for each even countdown value, doubled.
    Collect,

    /// Count the even values after staging.
    Count,

    /// Sum the countdown without a seed.
    Reduce,

    /// Sum the countdown from a seed.
    Fold {
        #[arg(long, default_value_t = DEFAULT_FOLD_SEED)]
        seed: u64,
    },

    /// Serve the timed course under a consumer policy.
    Courses {
        /// buffer | conflate | collect-latest
        #[arg(long, env = "FLOWLAB_POLICY", default_value = "collect-latest")]
        policy: ConsumerPolicy,
    },

    /// Burst 0..=10 into the shared log and replay it to a late subscriber.
    Shared,
}

impl Cli {
    pub fn config(&self) -> Result<DemoConfig> {
        DemoConfig {
            start: self.start,
            tick: Duration::from_millis(self.tick_ms),
            placeholder: self.placeholder,
            replay: self.replay,
            handler: Duration::from_millis(self.handler_ms),
            presses: self.presses,
            output: self.output,
        }
        .validate()
    }
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    logging::init(cli.log_format, DEFAULT_LOG_DIRECTIVE)?;
    let config = cli.config()?;
    let command = cli.command.unwrap_or(Command::Screen);
    tracing::debug!(?command, ?config, "demo.start");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(execute(&command, &config, std::io::stdout()))?;
    Ok(())
}

/// Run one command against a fresh session, echoing the transcript to `out`.
pub async fn execute<W>(command: &Command, config: &DemoConfig, out: W) -> Result<Vec<Event>>
where
    W: Write + 'static,
{
    let transcript = Transcript::new(config.output).echo_to(out);
    let session = Session::new(config);

    match command {
        Command::Screen => {
            let view = match config.presses {
                Some(n) => {
                    let presses = scripted_presses(n, config.tick / 2);
                    run_screen(&session, config.placeholder, presses, &transcript).await?
                }
                None => {
                    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
                    run_screen(&session, config.placeholder, line_presses(stdin), &transcript)
                        .await?
                }
            };
            tracing::info!(count = view.count(), "screen.closed");
        }
        Command::Collect => {
            strategies::collect(&session, &transcript).await;
        }
        Command::Count => {
            strategies::count_even(&session, &transcript).await;
        }
        Command::Reduce => {
            strategies::sum_reduce(&session, &transcript).await?;
        }
        Command::Fold { seed } => {
            strategies::sum_fold(&session, *seed, &transcript).await;
        }
        Command::Courses { policy } => {
            strategies::courses(*policy, config.handler, &transcript).await;
        }
        Command::Shared => {
            strategies::shared(&session, &transcript).await;
        }
    }

    transcript.finish()
}
