//! flurry CLI: run one pipeline stage on a single JSON event.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use flurry::{
    CliArgs, Handler, LogFormat, MetricsController, StoragePool, env_lookup, init_metrics,
    init_tracing, read_event,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let format = match LogFormat::from_lookup(&env_lookup) {
        Ok(format) => format,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(format);

    if args.metrics
        && let Err(e) = init_metrics()
    {
        eprintln!("Failed to initialize metrics: {e}");
        return ExitCode::FAILURE;
    }

    let pool = Arc::new(StoragePool::new());
    let handler = match args.command.build_handler(&env_lookup, pool) {
        Ok(handler) => handler,
        Err(e) => {
            error!(kind = e.kind().as_str(), "Failed to build handler");
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let event = match read_event(args.event.as_deref()).await {
        Ok(event) => event,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    info!(stage = handler.name(), "Handling event");
    let result = handler.handle(event).await;

    if args.metrics
        && let Ok(controller) = MetricsController::get()
    {
        eprint!("{}", controller.render());
    }

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = handler.name(), kind = e.kind().as_str(), "Handler failed");
            eprintln!("{} failed: {e}", handler.name());
            ExitCode::FAILURE
        }
    }
}
