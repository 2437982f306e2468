//! Match actor: one Tokio task that owns the world, the phase machine and
//! every seat's outbox.
//!
//! Connection readers talk to it through a [`MatchHandle`]. Nothing else
//! touches the [`MatchState`], so a tick always reads a consistent pair of
//! inputs and votes never race the deadline.

use rally_protocol::{
    CloseReason, Direction, RematchOutcome, Scores, ServerMessage, Side,
};
use rally_tick::TickScheduler;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{
    MatchConfig, MatchError, MatchPhase, MatchState, Outbox, PhaseEvent,
    ShutdownReason,
};

/// Commands sent to the match actor.
enum MatchCommand {
    Join {
        side: Side,
        outbox: Outbox,
        reply: oneshot::Sender<Result<(), MatchError>>,
    },
    Input {
        side: Side,
        direction: Direction,
    },
    Vote {
        side: Side,
    },
    PeerLost {
        side: Side,
    },
    Info {
        reply: oneshot::Sender<MatchInfo>,
    },
    Shutdown,
}

/// A snapshot of match metadata.
#[derive(Debug, Clone)]
pub struct MatchInfo {
    pub phase: MatchPhase,
    pub scores: Scores,
    /// Last sync value broadcast.
    pub sync: u64,
    /// Which seats have a live outbox, by [`Side::index`].
    pub seated: [bool; 2],
    /// Simulation steps taken over the match's lifetime.
    pub ticks: u64,
}

/// How a match ended. Returned from the actor's task.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub reason: ShutdownReason,
    pub scores: Scores,
    pub last_sync: u64,
    /// Number of games played to a win, counting rematches.
    pub games_completed: u32,
}

/// Handle to a running match actor. Cheap to clone.
#[derive(Clone)]
pub struct MatchHandle {
    sender: mpsc::Sender<MatchCommand>,
}

impl MatchHandle {
    /// Seats a connection's outbox on `side`. The actor sends the side
    /// assignment through it, and starts play once both sides are seated.
    pub async fn join(&self, side: Side, outbox: Outbox) -> Result<(), MatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(MatchCommand::Join {
            side,
            outbox,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| MatchError::Unavailable)?
    }

    /// Replaces `side`'s current paddle direction.
    pub async fn input(&self, side: Side, direction: Direction) -> Result<(), MatchError> {
        self.send(MatchCommand::Input { side, direction }).await
    }

    /// Records a rematch vote from `side`.
    pub async fn vote(&self, side: Side) -> Result<(), MatchError> {
        self.send(MatchCommand::Vote { side }).await
    }

    /// Reports that `side`'s connection died.
    pub async fn peer_lost(&self, side: Side) -> Result<(), MatchError> {
        self.send(MatchCommand::PeerLost { side }).await
    }

    pub async fn info(&self) -> Result<MatchInfo, MatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(MatchCommand::Info { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| MatchError::Unavailable)
    }

    /// Stops the match. Seated clients get a `closing` notice.
    pub async fn shutdown(&self) -> Result<(), MatchError> {
        self.send(MatchCommand::Shutdown).await
    }

    async fn send(&self, cmd: MatchCommand) -> Result<(), MatchError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| MatchError::Unavailable)
    }
}

/// Spawns a match actor. The task resolves once the match shuts down.
pub fn spawn_match(config: MatchConfig) -> (MatchHandle, JoinHandle<MatchOutcome>) {
    let config = config.validated();
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let actor = MatchActor {
        state: MatchState::new(config.field, config.win_score),
        phase: MatchPhase::WaitingForPlayers,
        inputs: [Direction::None; 2],
        outboxes: [None, None],
        scheduler: TickScheduler::new_paused(config.tick_config()),
        games_completed: 0,
        receiver: rx,
        config,
    };

    let task = tokio::spawn(actor.run());
    (MatchHandle { sender: tx }, task)
}

struct MatchActor {
    config: MatchConfig,
    state: MatchState,
    phase: MatchPhase,
    /// Latest direction per side. Overwritten, never queued.
    inputs: [Direction; 2],
    outboxes: [Option<Outbox>; 2],
    /// Paused whenever the phase is not `Playing`.
    scheduler: TickScheduler,
    games_completed: u32,
    receiver: mpsc::Receiver<MatchCommand>,
}

impl MatchActor {
    async fn run(mut self) -> MatchOutcome {
        tracing::info!(
            tick_rate = self.scheduler.tick_rate_hz(),
            win_score = self.config.win_score,
            "match actor started"
        );

        let reason = loop {
            let deadline = self.phase.deadline();

            // Commands first: a vote already queued when the deadline
            // fires still counts.
            tokio::select! {
                biased;

                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        tracing::info!("all match handles dropped");
                        self.shut_down(PhaseEvent::Shutdown);
                    }
                },
                _ = wait_until(deadline) => self.handle_deadline(),
                _ = self.scheduler.wait_for_tick() => self.handle_tick(),
            }

            if let MatchPhase::ShuttingDown { reason } = self.phase {
                break reason;
            }
        };

        // Dropping the outboxes lets each writer flush and close its socket.
        self.outboxes = [None, None];

        let outcome = MatchOutcome {
            reason,
            scores: self.state.scores(),
            last_sync: self.state.sync(),
            games_completed: self.games_completed,
        };
        tracing::info!(
            %reason,
            left = outcome.scores.left,
            right = outcome.scores.right,
            sync = outcome.last_sync,
            "match actor stopped"
        );
        outcome
    }

    fn handle_command(&mut self, cmd: MatchCommand) {
        match cmd {
            MatchCommand::Join {
                side,
                outbox,
                reply,
            } => {
                let result = self.handle_join(side, outbox);
                let _ = reply.send(result);
            }
            MatchCommand::Input { side, direction } => {
                if self.phase.is_playing() {
                    self.inputs[side.index()] = direction;
                } else {
                    tracing::trace!(%side, ?direction, phase = %self.phase, "input ignored");
                }
            }
            MatchCommand::Vote { side } => self.handle_vote(side),
            MatchCommand::PeerLost { side } => self.handle_peer_lost(side),
            MatchCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            MatchCommand::Shutdown => {
                tracing::info!("match shutdown requested");
                self.shut_down(PhaseEvent::Shutdown);
            }
        }
    }

    fn handle_join(&mut self, side: Side, outbox: Outbox) -> Result<(), MatchError> {
        if self.phase != MatchPhase::WaitingForPlayers {
            return Err(MatchError::NotAccepting(self.phase.to_string()));
        }
        if self.outboxes[side.index()].is_some() {
            return Err(MatchError::SeatTaken(side));
        }

        outbox.send(ServerMessage::AssignSide {
            side,
            field: self.config.field.spec(),
            win_score: self.config.win_score,
        });
        self.outboxes[side.index()] = Some(outbox);
        tracing::info!(%side, "player seated");

        if self.outboxes.iter().all(Option::is_some) && self.phase.apply(PhaseEvent::BothSeated) {
            tracing::info!("both players seated, match starting");
            self.start_play();
        }
        Ok(())
    }

    fn handle_vote(&mut self, side: Side) {
        if !self.phase.is_voting() {
            tracing::debug!(%side, phase = %self.phase, "vote outside voting window ignored");
            return;
        }
        if !self.phase.apply(PhaseEvent::Vote(side)) {
            tracing::debug!(%side, "duplicate vote ignored");
            return;
        }
        tracing::info!(%side, "rematch vote received");

        if self.phase == MatchPhase::Restarting {
            self.restart();
        }
    }

    fn handle_peer_lost(&mut self, side: Side) {
        self.outboxes[side.index()] = None;
        self.inputs[side.index()] = Direction::None;

        if self.phase == MatchPhase::WaitingForPlayers {
            tracing::info!(%side, "player left before the match started");
            return;
        }

        tracing::warn!(%side, phase = %self.phase, "player disconnected, tearing down match");
        let was_voting = self.phase.is_voting();
        if self.phase.apply(PhaseEvent::PeerLost(side)) {
            let notice = if was_voting {
                ServerMessage::RematchResult {
                    outcome: RematchOutcome::ShuttingDown,
                }
            } else {
                ServerMessage::Closing {
                    reason: CloseReason::PeerDisconnected { side },
                }
            };
            self.broadcast(notice);
            self.scheduler.pause();
        }
    }

    fn handle_deadline(&mut self) {
        if self.phase.apply(PhaseEvent::DeadlineReached(Instant::now())) {
            tracing::info!("rematch window closed without both votes");
            self.broadcast(ServerMessage::RematchResult {
                outcome: RematchOutcome::ShuttingDown,
            });
        }
    }

    fn handle_tick(&mut self) {
        if !self.phase.is_playing() {
            self.scheduler.pause();
            return;
        }

        let events = self.state.step(self.inputs);
        let snapshot = self.state.next_snapshot();
        // The scoring tick's own broadcast carries the new score.
        self.broadcast(ServerMessage::State(snapshot));
        self.scheduler.record_tick_end();

        if let Some(scorer) = events.scored {
            tracing::info!(
                %scorer,
                left = snapshot.scores.left,
                right = snapshot.scores.right,
                "point scored"
            );
        }

        if let Some(winner) = events.winner {
            self.games_completed += 1;
            self.phase.apply(PhaseEvent::WinReached(winner));
            self.broadcast(ServerMessage::GameOver { winner });

            let deadline = Instant::now() + self.config.rematch_window;
            self.phase.apply(PhaseEvent::OpenVoting { deadline });
            self.scheduler.pause();
            self.inputs = [Direction::None; 2];
            tracing::info!(
                %winner,
                window_secs = self.config.rematch_window.as_secs_f64(),
                "game over, rematch voting open"
            );
        }
    }

    fn start_play(&mut self) {
        self.inputs = [Direction::None; 2];
        let snapshot = self.state.next_snapshot();
        self.broadcast(ServerMessage::State(snapshot));
        self.scheduler.resume();
    }

    fn restart(&mut self) {
        tracing::info!(
            serve_toward = %self.state.last_conceded(),
            "both players voted, restarting match"
        );
        self.state.reset_for_rematch();
        self.broadcast(ServerMessage::RematchResult {
            outcome: RematchOutcome::Restarting,
        });
        self.phase.apply(PhaseEvent::Restarted);
        self.start_play();
    }

    /// Moves to `ShuttingDown` and tells everyone still seated why.
    fn shut_down(&mut self, event: PhaseEvent) {
        if self.phase.apply(event) {
            self.broadcast(ServerMessage::Closing {
                reason: CloseReason::ServerShutdown,
            });
            self.scheduler.pause();
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        for outbox in self.outboxes.iter().flatten() {
            if outbox.is_full() {
                tracing::trace!(backlog = outbox.backlog(), "outbox full, oldest message will be dropped");
            }
            if !outbox.send(msg.clone()) {
                tracing::trace!("outbox receiver gone, message dropped");
            }
        }
    }

    fn info(&self) -> MatchInfo {
        MatchInfo {
            phase: self.phase.clone(),
            scores: self.state.scores(),
            sync: self.state.sync(),
            seated: [self.outboxes[0].is_some(), self.outboxes[1].is_some()],
            ticks: self.scheduler.tick_count(),
        }
    }
}

/// Resolves at `deadline`, or never if there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
