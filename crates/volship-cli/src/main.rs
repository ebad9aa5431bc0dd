use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use env_logger::{Env, Target};
use log::{debug, error, info};

use volship_core::app::{Orchestrator, RunLog};
use volship_core::config::Config;
use volship_core::impls::{HttpBackupFetcher, RecordingSink, TelegramSink};
use volship_core::ports::{DeliverySink, SystemClock};

/// Archive every volume directory and send it to the configured chat.
///
/// All settings come from the environment (BOT_TOKEN, BOT_DEST, ROOT_DIR, ...).
#[derive(Parser, Debug)]
#[command(name = "volship", version)]
struct Cli {
    /// Build and delete archives as usual but send nothing.
    #[arg(long)]
    dry_run: bool,
}

const DEFAULT_LOG_FILTER: &str = "info,volship=debug,volship_core=debug";

fn init_logging(run_log: &RunLog) {
    let env = Env::default().default_filter_or(DEFAULT_LOG_FILTER);
    let mut builder = env_logger::Builder::from_env(env);
    builder.target(Target::Pipe(Box::new(run_log.writer())));
    builder.format(|buf, record| {
        let ts = buf.timestamp_seconds();
        writeln!(buf, "{} {:<5} {}", ts, record.level(), record.args())
    });
    builder.init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let run_log = RunLog::new();
    init_logging(&run_log);

    // Nothing may touch the sink, the roots or the temp dir before this passes.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    debug!("Configuration: {config:?}");

    let sink: Arc<dyn DeliverySink> = if cli.dry_run {
        info!("Dry run: nothing will be sent");
        Arc::new(RecordingSink::new())
    } else {
        match TelegramSink::new(&config.sink) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                error!("Cannot build Bot API client: {e}");
                return ExitCode::FAILURE;
            }
        }
    };

    let mut orchestrator =
        Orchestrator::new(config.run.clone(), sink, Arc::new(SystemClock), run_log);
    if let Some(external) = &config.external {
        match HttpBackupFetcher::new(external) {
            Ok(fetcher) => orchestrator = orchestrator.with_backup_source(Arc::new(fetcher)),
            Err(e) => {
                error!("Cannot build external backup client: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Cannot start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = runtime.block_on(orchestrator.run());
    info!(
        "Run finished in [{}] with {} failure(s)",
        report.run_dir.display(),
        report.failure_count()
    );
    ExitCode::SUCCESS
}
