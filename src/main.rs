use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use shortener::config::load_or_default;
use shortener::App;

const DEFAULT_CONFIG: &str = "./config.toml";

const EXIT_CONFIG: u8 = 1;
const EXIT_BOOT: u8 = 2;
const EXIT_RUN: u8 = 3;

#[derive(Debug, Parser)]
#[command(name = "shortener", version, about = "URL shortener daemon")]
struct Cli {
    /// Path to the TOML config file. Defaults apply when the default path is absent.
    #[arg(short, long, env = "SHORTENER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_or_default(path, true),
        None => load_or_default(Path::new(DEFAULT_CONFIG), false),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("shortener: failed to load config: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let app = match App::new(config).await {
        Ok(app) => app,
        Err(e) => {
            // The logger may not be up yet.
            eprintln!("shortener: {}", e);
            tracing::error!(error = %e, "Boot failed");
            return ExitCode::from(EXIT_BOOT);
        }
    };

    match app.run(CancellationToken::new()).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::from(EXIT_RUN)
        }
    }
}
