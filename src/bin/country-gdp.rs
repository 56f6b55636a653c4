use anyhow::Result;
use clap::{Parser, Subcommand};
use country_gdp::config::Settings;
use country_gdp::server;

#[derive(Parser, Debug)]
#[command(
    name = "country-gdp",
    version,
    about = "Serve merged country and exchange-rate data with a GDP summary image"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Run one refresh against the upstream APIs and print the summary.
    Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real environment variables still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.settings.log_level.as_str()),
    )
    .init();

    match cli.cmd.unwrap_or(Command::Serve) {
        Command::Serve => server::serve(&cli.settings).await,
        Command::Refresh => cmd_refresh(&cli.settings).await,
    }
}

async fn cmd_refresh(settings: &Settings) -> Result<()> {
    let state = server::build_state(settings).await?;
    let summary = state.refresher.refresh().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
