//! navydash - genset telemetry browser and CSV exporter
//!
//! # Usage
//!
//! ```bash
//! # Export a day of Check-mode samples
//! navydash export --start-date 2025-08-28 --end-date 2025-08-29 --check
//!
//! # Page through the same window interactively
//! navydash browse --start-date 2025-08-28 --end-date 2025-08-29 --interactive
//! ```

use navydash::cli::CliInterface;

/// Application entry point
#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = match CliInterface::new() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    initialize_logging(&cli);

    if let Err(e) = cli.run().await {
        eprintln!("{}", cli.colorizer().error(&e.to_string()));
        std::process::exit(1);
    }
}

/// Initialize logging system
///
/// `RUST_LOG` takes precedence over the configured level.
fn initialize_logging(cli: &CliInterface) {
    use tracing_subscriber::EnvFilter;

    let level = cli.config().logging.level.to_tracing_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("navydash={}", level)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.args().no_color)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
