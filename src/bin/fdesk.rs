use clap::Parser;
use fleetdesk::cli::utils::output_error;
use fleetdesk::cli::{Cli, OutputFormat};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);

    if let Err(e) = fleetdesk::cli::run(cli).await {
        let verbose = matches!(std::env::var("CLI_VERBOSE").as_deref(), Ok("true") | Ok("1"));
        output_error(&output_format, &e, verbose);
        std::process::exit(1);
    }

    Ok(())
}
