//! FinPulse CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use finpulse_telemetry::{LogFormat, TelemetryConfig, init_telemetry};

use finpulse_cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let format = if cli.global.json_logs { LogFormat::Json } else { LogFormat::Pretty };
    let telemetry = TelemetryConfig::from_verbosity(cli.global.verbose).with_format(format);
    if let Err(e) = init_telemetry(&telemetry) {
        eprintln!("warning: logging disabled: {e}");
    }

    match finpulse_cli::commands::execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
