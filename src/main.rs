use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use usage_logs_export::cli;
use usage_logs_export::errors::AppError;

fn main() -> ExitCode {
    init_tracing();

    let result = tokio::runtime::Runtime::new()
        .map_err(|e| AppError::IoError(e.to_string()))
        .and_then(|rt| rt.block_on(cli::cli()));

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
