//! `rally-client`: a headless player driven from stdin.
//!
//! Commands, one per line: `up`, `down`, `stop`, `vote`, `status`, `quit`.

use std::process::ExitCode;

use clap::Parser;
use rally_client::{ClientError, RallyClient, ShadowEvent, ShadowState};
use rally_protocol::{Direction, RematchOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 12345)]
    port: u16,
}

enum Command {
    Move(Direction),
    Vote,
    Status,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "up" | "w" => Some(Command::Move(Direction::Up)),
        "down" | "s" => Some(Command::Move(Direction::Down)),
        "stop" => Some(Command::Move(Direction::None)),
        "vote" | "y" => Some(Command::Vote),
        "status" => Some(Command::Status),
        "quit" | "q" => Some(Command::Quit),
        _ => None,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_status(shadow: &ShadowState) {
    let scores = shadow.scores();
    match shadow.latest() {
        Some(s) => println!(
            "sync {} | score {}-{} | ball ({:.0}, {:.0}) | paddles {:.0} / {:.0}",
            s.sync, scores.left, scores.right, s.ball.x, s.ball.y, s.paddles.left, s.paddles.right
        ),
        None => println!("waiting for the match to start"),
    }
}

async fn play(addr: &str) -> Result<(), ClientError> {
    let mut client = RallyClient::connect(addr).await?;
    let assignment = client.wait_for_side().await?;
    println!(
        "playing {} side, first to {} wins",
        assignment.side, assignment.win_score
    );

    let mut shadow = ShadowState::new();
    shadow.apply(rally_protocol::ServerMessage::AssignSide {
        side: assignment.side,
        field: assignment.field,
        win_score: assignment.win_score,
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            msg = client.next_message() => {
                let Some(msg) = msg? else {
                    println!("server closed the connection");
                    return Ok(());
                };
                match shadow.apply(msg) {
                    ShadowEvent::ScoreChanged { scorer, scores } => {
                        println!("{scorer} scores: {}-{}", scores.left, scores.right);
                    }
                    ShadowEvent::GameOver { winner } => {
                        let verdict = if Some(winner) == shadow.side() { "you win" } else { "you lose" };
                        println!("game over, {winner} wins ({verdict}). type `vote` for a rematch");
                    }
                    ShadowEvent::RematchResult { outcome: RematchOutcome::Restarting } => {
                        println!("rematch starting");
                    }
                    ShadowEvent::RematchResult { outcome: RematchOutcome::ShuttingDown } => {
                        println!("no rematch, server is shutting down");
                    }
                    ShadowEvent::Closing { reason } => {
                        println!("server closing: {reason:?}");
                    }
                    ShadowEvent::Stale { sync } => tracing::debug!(sync, "stale state dropped"),
                    ShadowEvent::Assigned { .. } | ShadowEvent::Updated => {}
                }
            }
            line = stdin.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                match parse_command(&line) {
                    Some(Command::Move(direction)) => client.send_input(direction).await?,
                    Some(Command::Vote) => client.vote_rematch().await?,
                    Some(Command::Status) => print_status(&shadow),
                    Some(Command::Quit) => {
                        client.close().await?;
                        return Ok(());
                    }
                    None => println!("commands: up, down, stop, vote, status, quit"),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    match play(&addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "client failed");
            ExitCode::FAILURE
        }
    }
}
