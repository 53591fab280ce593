mod config;
mod dataset;
mod error;
mod evaluation;
mod logging;
mod metrics;
mod model;
mod params;
mod tracking;

use std::process::ExitCode;
use tracing::error;

use evaluation::EvaluationPipeline;

fn main() -> ExitCode {
    let config = config::Config::from_env();

    if let Err(e) = logging::init(&config) {
        eprintln!("Failed to initialise logging: {:#}", e);
        return ExitCode::FAILURE;
    }
    config.print_banner();

    match EvaluationPipeline::new(config).run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("An error occurred in the evaluation pipeline: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
