use clap::Parser;

use deckcycle_backend::cli::{self, Cli};
use deckcycle_backend::config::Config;
use deckcycle_backend::logging::init_tracing;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = Config::from_env();

    let _log_guard = init_tracing(&config);

    if let Err(err) = cli::run(cli, config).await {
        tracing::error!(error = %err, "deckcycle failed");
        std::process::exit(1);
    }
}
