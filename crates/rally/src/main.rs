//! `rally-server`: hosts one two-player match and exits when it ends.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use rally::{MatchConfig, RallyServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = rally::DEFAULT_PORT)]
    port: u16,

    /// Simulation and broadcast rate in Hz
    #[arg(short, long, default_value_t = 60)]
    tick_rate: u32,

    /// Score needed to win a game
    #[arg(short, long, default_value_t = 5)]
    win_score: u32,

    /// Seconds both players have to vote for a rematch
    #[arg(short, long, default_value_t = 30)]
    rematch_window: u64,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        match_config: MatchConfig {
            tick_rate: args.tick_rate,
            win_score: args.win_score,
            rematch_window: Duration::from_secs(args.rematch_window),
            ..MatchConfig::default()
        },
        ..ServerConfig::default()
    };

    let server = match RallyServer::builder().server_config(config).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            return ExitCode::FAILURE;
        }
    };

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    match server.run_until(ctrl_c).await {
        Ok(outcome) => {
            tracing::info!(
                reason = %outcome.reason,
                left = outcome.scores.left,
                right = outcome.scores.right,
                games = outcome.games_completed,
                "match over"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}
