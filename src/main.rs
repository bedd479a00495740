use std::error::Error as _;

use clap::Parser;

use housekeeper::cli::{self, Cli};
use housekeeper::error::{AppError, AppResult, EXIT_ALREADY_LOCKED};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(&cli).await {
        Ok(()) => 0,
        Err(e) => {
            let code = e.exit_code();
            // Lock contention was already logged by the manager
            if code != EXIT_ALREADY_LOCKED {
                eprintln!("Error: {}", error_chain(&e));
            }
            code
        }
    };

    std::process::exit(code);
}

async fn run(cli: &Cli) -> AppResult<()> {
    let settings = cli::load_and_merge_config(cli)?;
    cli::init_logger_from_settings(&settings)?;

    tracing::debug!(
        version = housekeeper::pkg_version(),
        lock_file = %settings.maintenance.lock_file,
        "Configuration loaded"
    );

    cli::execute_command(cli, settings).await
}

fn error_chain(error: &AppError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
