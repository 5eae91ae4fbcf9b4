//! Stride Channel Harness CLI
//!
//! Runs the covert channel evaluation matrix against Docker-hosted agents.

use clap::Parser;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use stride_env::{DockerBackend, DropCachesEvictor};
use stride_harness::{
    CommandTransport, ExperimentDriver, HarnessConfig, HarnessError, Interrupt, InterruptTrigger,
};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Strided page-cache covert channel experiment driver
#[derive(Parser, Debug)]
#[command(name = "stride-harness")]
#[command(
    about = "Measure a page-cache covert channel across an evaluation matrix",
    long_about = None
)]
struct Args {
    /// JSON configuration file (flags below override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// R: cache evict intervals (0 = only at scenario start)
    #[arg(short = 'R', long, value_delimiter = ',')]
    evict_intervals: Option<Vec<u32>>,

    /// C: container runtimes
    #[arg(short = 'C', long, value_delimiter = ',')]
    runtimes: Option<Vec<String>>,

    /// S: page strides
    #[arg(short = 'S', long, value_delimiter = ',')]
    strides: Option<Vec<u32>>,

    /// Bits per message
    #[arg(short, long)]
    message_length: Option<usize>,

    /// Repetitions per pattern and scenario
    #[arg(short, long)]
    repetitions: Option<u32>,

    /// Number of random patterns
    #[arg(short, long)]
    patterns: Option<usize>,

    /// Pattern seed
    #[arg(short, long, conflicts_with = "no_seed")]
    seed: Option<u64>,

    /// Draw non-reproducible patterns
    #[arg(long)]
    no_seed: bool,

    /// Receiver cached/uncached threshold in cycles
    #[arg(long)]
    cycle_threshold: Option<u64>,

    /// CSV result log
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settle delay in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Do not pass the stride to the agents (fixed-stride agent builds)
    #[arg(long)]
    no_stride_arg: bool,

    /// Run docker and drop_caches without sudo
    #[arg(long)]
    no_sudo: bool,

    /// Agent container image
    #[arg(long)]
    image: Option<String>,

    /// Shared file path inside the containers
    #[arg(long)]
    target_file: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print a JSON run summary on completion
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Defaults, then the config file, then flags.
    fn to_config(&self) -> Result<HarnessConfig, HarnessError> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_json_file(path)?,
            None => HarnessConfig::default(),
        };

        if let Some(v) = &self.evict_intervals {
            config.evict_intervals = v.clone();
        }
        if let Some(v) = &self.runtimes {
            config.runtimes = v.clone();
        }
        if let Some(v) = &self.strides {
            config.stride_sizes = v.clone();
        }
        if let Some(v) = self.message_length {
            config.message_length = v;
        }
        if let Some(v) = self.repetitions {
            config.repetitions = v;
        }
        if let Some(v) = self.patterns {
            config.pattern_count = v;
        }
        if self.no_seed {
            config.seed = None;
        } else if let Some(v) = self.seed {
            config.seed = Some(v);
        }
        if let Some(v) = self.cycle_threshold {
            config.cycle_threshold = v;
        }
        if let Some(v) = &self.output {
            config.output_path = v.clone();
        }
        if let Some(v) = self.settle_ms {
            config.settle_delay_ms = v;
        }
        if self.no_stride_arg {
            config.pass_stride = false;
        }
        if self.no_sudo {
            config.use_sudo = false;
        }
        if let Some(v) = &self.image {
            config.image = v.clone();
        }
        if let Some(v) = &self.target_file {
            config.target_file = v.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Fires `trigger` on the first signal and calls `force_exit` on the second.
async fn forward_signals<S, Fut>(
    trigger: InterruptTrigger,
    mut next_signal: S,
    force_exit: impl FnOnce(),
)
where
    S: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if next_signal().await.is_err() {
        return;
    }
    warn!("Interrupt received, tearing down (press Ctrl-C again to exit immediately)");
    trigger.fire();

    if next_signal().await.is_ok() {
        error!("Second interrupt, exiting without cleanup");
        force_exit();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let backend = Arc::new(DockerBackend::new(config.image.clone()).with_sudo(config.use_sudo));
    let transport = Arc::new(CommandTransport::new(backend.clone(), &config));
    let evictor = Arc::new(DropCachesEvictor::new(config.use_sudo));

    let (trigger, interrupt) = Interrupt::channel();
    tokio::spawn(forward_signals(trigger, tokio::signal::ctrl_c, || {
        std::process::exit(1)
    }));

    let mut driver = match ExperimentDriver::new(config, backend, transport, evictor) {
        Ok(driver) => driver.with_interrupt(interrupt),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match driver.run().await {
        Ok(summary) => {
            info!("");
            info!("Analysis:");
            info!(
                "  Run the plotting scripts on {} to analyze results",
                summary.output_path.display()
            );
            if args.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => error!("Failed to serialize summary: {}", e),
                }
            }
            ExitCode::SUCCESS
        }
        Err(HarnessError::Interrupted) => {
            error!("");
            error!("Experiment interrupted by user");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("");
            error!("Experiment aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
