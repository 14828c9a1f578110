use chimp_sync::{
    commands::sync_all, config::Config, startup::HttpServer, utils::state::setup,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::Context;
use dotenvy::dotenv;

#[derive(Parser, Debug)]
#[command(
    name = "chimp-sync",
    about = "Keep user accounts in sync with a MailChimp list",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve,
    /// Sync every active account's subscription status with the list
    Sync,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenv().ok();
    config_tracing();

    let cli = Cli::parse();
    let config = Config::load().wrap_err("Failed to load configuration")?;
    let state = setup(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => HttpServer::new(&config, state).await?.run().await,
        Command::Sync => {
            let mut stdout = std::io::stdout().lock();
            sync_all(&state, &mut stdout).await?;
            Ok(())
        }
    }
}

fn config_tracing() {
    use tracing::Level;
    use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

    let tracing_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let filter = filter::Targets::new()
        .with_target("sqlx::query", Level::WARN)
        .with_target("tower_http::trace", Level::DEBUG)
        .with_default(Level::INFO);

    tracing_subscriber::registry()
        .with(tracing_layer)
        .with(filter)
        .init();
}
