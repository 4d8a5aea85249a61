mod cli;
mod commands;

use api::AppState;
use clap::Parser;
use cli::{Cli, Command};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Optional .env next to the working directory.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    std::process::exit(run(cli).await);
}

async fn run(cli: Cli) -> i32 {
    let config = match rag_config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(target: "rag_server", error = %e, "configuration error");
            return commands::EXIT_CONFIG;
        }
    };

    let state = match AppState::from_config(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!(target: "rag_server", error = %e, "startup failed");
            return commands::exit_code_for(&e);
        }
    };

    let outcome = match &cli.command {
        Command::Index(args) => commands::index(&state, args).await,
        Command::Stats => commands::stats(&state).await,
        Command::Recover(args) => commands::recover(&state, args).await,
        Command::Delete(args) => commands::delete(&state, args).await,
        Command::Clean => commands::clean(&state),
        Command::Setup => commands::setup(&state).await,
        Command::Start => match api::serve_stdio(state.clone()).await {
            Ok(()) => Ok(commands::EXIT_OK),
            Err(e) => {
                error!(target: "rag_server", error = %e, "server error");
                Ok(commands::EXIT_OTHER)
            }
        },
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!(target: "rag_server", error = %e, "command failed");
            commands::exit_code_for(&e)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // MCP uses stdout for the protocol; logs must stay on stderr.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
