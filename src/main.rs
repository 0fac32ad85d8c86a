use std::process::ExitCode;

use cloudprobe::{LoggingConfig, init_logging, load_env_overrides, run};

#[tokio::main]
async fn main() -> ExitCode {
    let overrides = load_env_overrides();
    init_logging(&LoggingConfig::from_env());
    if let Err(err) = overrides {
        tracing::error!(error = %err, "cloudprobe failed");
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "cloudprobe failed");
            ExitCode::FAILURE
        }
    }
}
