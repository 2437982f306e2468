//! Integration tests for the match actor.
//!
//! All tests run on paused Tokio time: ticks and the rematch deadline fire
//! as soon as every task is idle, so a full game takes no wall-clock time.
//! Beware that any idle await while voting is open lets the clock jump
//! straight to the deadline.

use std::time::Duration;

use rally_match::{
    spawn_match, MatchConfig, MatchError, MatchHandle, MatchOutcome, MatchPhase, Outbox,
    OutboxReceiver, ShutdownReason,
};
use rally_protocol::{
    CloseReason, Direction, RematchOutcome, ServerMessage, Side, StateSnapshot,
};
use tokio::task::JoinHandle;
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

fn test_config() -> MatchConfig {
    MatchConfig {
        // Large enough that an undrained receiver never lags during a game.
        outbox_capacity: 4096,
        ..MatchConfig::default()
    }
}

struct Seated {
    handle: MatchHandle,
    task: JoinHandle<MatchOutcome>,
    left: OutboxReceiver,
    right: OutboxReceiver,
}

/// Spawns a match and seats both sides, consuming the side assignments.
async fn seated_match() -> Seated {
    let config = test_config();
    let capacity = config.outbox_capacity;
    let (handle, task) = spawn_match(config);

    let (left_box, mut left) = Outbox::channel(capacity);
    let (right_box, mut right) = Outbox::channel(capacity);
    handle.join(Side::Left, left_box).await.unwrap();
    handle.join(Side::Right, right_box).await.unwrap();

    for (rx, side) in [(&mut left, Side::Left), (&mut right, Side::Right)] {
        match rx.recv().await {
            Some(ServerMessage::AssignSide { side: assigned, .. }) => assert_eq!(assigned, side),
            other => panic!("expected assign_side, got {other:?}"),
        }
    }

    Seated {
        handle,
        task,
        left,
        right,
    }
}

/// Reads messages until one that is not a `State`. Returns it with the
/// last state seen before it.
async fn next_event(rx: &mut OutboxReceiver) -> (Option<ServerMessage>, Option<StateSnapshot>) {
    let mut last_state = None;
    loop {
        match rx.recv().await {
            Some(ServerMessage::State(snapshot)) => last_state = Some(snapshot),
            other => return (other, last_state),
        }
    }
}

async fn next_state(rx: &mut OutboxReceiver) -> StateSnapshot {
    match rx.recv().await {
        Some(ServerMessage::State(snapshot)) => snapshot,
        other => panic!("expected state, got {other:?}"),
    }
}

/// Plays a full game that LEFT wins 5-0 and drains both receivers up to
/// `game_over`. Returns the final state broadcast.
async fn play_left_win(m: &mut Seated) -> StateSnapshot {
    m.handle.input(Side::Right, Direction::Up).await.unwrap();

    let (event, last) = next_event(&mut m.left).await;
    assert_eq!(event, Some(ServerMessage::GameOver { winner: Side::Left }));
    let (event, _) = next_event(&mut m.right).await;
    assert_eq!(event, Some(ServerMessage::GameOver { winner: Side::Left }));

    last.expect("states before game over")
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_join_sends_side_assignment() {
    let (handle, _task) = spawn_match(test_config());
    let (outbox, mut rx) = Outbox::channel(16);

    handle.join(Side::Left, outbox).await.unwrap();

    match rx.recv().await {
        Some(ServerMessage::AssignSide {
            side,
            field,
            win_score,
        }) => {
            assert_eq!(side, Side::Left);
            assert_eq!(field.width, 640.0);
            assert_eq!(win_score, 5);
        }
        other => panic!("expected assign_side, got {other:?}"),
    }

    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, MatchPhase::WaitingForPlayers);
    assert_eq!(info.seated, [true, false]);
    assert_eq!(info.ticks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_join_taken_seat_is_rejected() {
    let (handle, _task) = spawn_match(test_config());
    let (first, _rx1) = Outbox::channel(16);
    let (second, _rx2) = Outbox::channel(16);

    handle.join(Side::Left, first).await.unwrap();
    let result = handle.join(Side::Left, second).await;

    assert!(matches!(result, Err(MatchError::SeatTaken(Side::Left))));
}

#[tokio::test(start_paused = true)]
async fn test_join_after_start_is_rejected() {
    let m = seated_match().await;
    let (late, _rx) = Outbox::channel(16);

    let result = m.handle.join(Side::Left, late).await;

    assert!(matches!(result, Err(MatchError::NotAccepting(_))));
}

#[tokio::test(start_paused = true)]
async fn test_peer_lost_while_waiting_frees_the_seat() {
    let (handle, _task) = spawn_match(test_config());
    let (first, _rx1) = Outbox::channel(16);
    handle.join(Side::Left, first).await.unwrap();

    handle.peer_lost(Side::Left).await.unwrap();

    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, MatchPhase::WaitingForPlayers);
    assert_eq!(info.seated, [false, false]);

    let (again, _rx2) = Outbox::channel(16);
    handle.join(Side::Left, again).await.unwrap();
}

// =========================================================================
// Playing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_sync_increases_by_one_per_broadcast() {
    let mut m = seated_match().await;

    let mut previous = next_state(&mut m.left).await.sync;
    assert_eq!(previous, 1);
    for _ in 0..30 {
        let sync = next_state(&mut m.left).await.sync;
        assert_eq!(sync, previous + 1);
        previous = sync;
    }
}

#[tokio::test(start_paused = true)]
async fn test_both_sides_receive_identical_states() {
    let mut m = seated_match().await;

    for _ in 0..10 {
        let left = next_state(&mut m.left).await;
        let right = next_state(&mut m.right).await;
        assert_eq!(left, right);
    }
}

#[tokio::test(start_paused = true)]
async fn test_input_moves_paddle_on_next_tick() {
    let mut m = seated_match().await;
    let opening = next_state(&mut m.left).await;
    assert_eq!(opening.paddles.left, 215.0);

    m.handle.input(Side::Left, Direction::Up).await.unwrap();
    let after = next_state(&mut m.left).await;

    assert_eq!(after.paddles.left, 210.0);
    assert_eq!(after.paddles.right, 215.0);
}

#[tokio::test(start_paused = true)]
async fn test_short_field_survives_paddle_input() {
    let mut config = test_config();
    config.field.height = 60.0;
    let (handle, task) = spawn_match(config);

    let (left_box, mut left) = Outbox::channel(4096);
    let (right_box, _right) = Outbox::channel(4096);
    handle.join(Side::Left, left_box).await.unwrap();
    handle.join(Side::Right, right_box).await.unwrap();

    match left.recv().await {
        Some(ServerMessage::AssignSide { field, .. }) => assert_eq!(field.paddle_height, 40.0),
        other => panic!("expected assign_side, got {other:?}"),
    }
    next_state(&mut left).await;

    handle.input(Side::Left, Direction::Up).await.unwrap();
    handle.input(Side::Right, Direction::Down).await.unwrap();
    for _ in 0..5 {
        let state = next_state(&mut left).await;
        assert_eq!(state.paddles.left, 10.0);
        assert_eq!(state.paddles.right, 10.0);
    }

    handle.shutdown().await.unwrap();
    let outcome = task.await.unwrap();
    assert_eq!(outcome.reason, ShutdownReason::Requested);
}

#[tokio::test(start_paused = true)]
async fn test_vote_while_playing_is_ignored() {
    let m = seated_match().await;

    m.handle.vote(Side::Left).await.unwrap();

    let info = m.handle.info().await.unwrap();
    assert_eq!(info.phase, MatchPhase::Playing);
}

// =========================================================================
// Winning and voting
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_left_wins_five_nil_and_voting_opens() {
    let mut m = seated_match().await;

    let last = play_left_win(&mut m).await;
    assert_eq!(last.scores.left, 5);
    assert_eq!(last.scores.right, 0);

    let info = m.handle.info().await.unwrap();
    let MatchPhase::Voting { winner, ballot } = &info.phase else {
        panic!("expected voting, got {}", info.phase);
    };
    assert_eq!(*winner, Side::Left);
    assert!(!ballot.has_voted(Side::Left));
    assert!(!ballot.has_voted(Side::Right));

    let remaining = ballot.deadline().duration_since(Instant::now());
    assert!(remaining <= Duration::from_secs(30));
    assert!(remaining > Duration::from_secs(29));
}

#[tokio::test(start_paused = true)]
async fn test_both_votes_restart_with_continuing_sync() {
    let mut m = seated_match().await;
    let last = play_left_win(&mut m).await;

    m.handle.vote(Side::Left).await.unwrap();
    m.handle.vote(Side::Right).await.unwrap();

    for rx in [&mut m.left, &mut m.right] {
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::RematchResult {
                outcome: RematchOutcome::Restarting
            })
        );
        let fresh = next_state(rx).await;
        assert_eq!(fresh.sync, last.sync + 1);
        assert_eq!((fresh.scores.left, fresh.scores.right), (0, 0));
        assert_eq!((fresh.ball.x, fresh.ball.y), (320.0, 240.0));
        // Right conceded last, so it receives the serve.
        assert!(fresh.ball.vx > 0.0);
        assert_eq!(fresh.paddles.left, 215.0);
        assert_eq!(fresh.paddles.right, 215.0);
    }

    let info = m.handle.info().await.unwrap();
    assert_eq!(info.phase, MatchPhase::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_vote_changes_nothing() {
    let mut m = seated_match().await;
    play_left_win(&mut m).await;

    m.handle.vote(Side::Left).await.unwrap();
    m.handle.vote(Side::Left).await.unwrap();

    let info = m.handle.info().await.unwrap();
    let MatchPhase::Voting { ballot, .. } = &info.phase else {
        panic!("expected voting, got {}", info.phase);
    };
    assert!(ballot.has_voted(Side::Left));
    assert!(!ballot.has_voted(Side::Right));
}

#[tokio::test(start_paused = true)]
async fn test_single_vote_shuts_down_at_deadline() {
    let mut m = seated_match().await;
    play_left_win(&mut m).await;
    let voting_opened = Instant::now();

    m.handle.vote(Side::Left).await.unwrap();

    for rx in [&mut m.left, &mut m.right] {
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::RematchResult {
                outcome: RematchOutcome::ShuttingDown
            })
        );
        assert_eq!(rx.recv().await, None, "outbox closes after the notice");
    }
    assert!(voting_opened.elapsed() >= Duration::from_secs(30));

    let outcome = m.task.await.unwrap();
    assert_eq!(outcome.reason, ShutdownReason::RematchDeclined);
    assert_eq!(outcome.games_completed, 1);
    assert_eq!(outcome.scores.left, 5);
}

#[tokio::test(start_paused = true)]
async fn test_vote_after_shutdown_reports_unavailable() {
    let mut m = seated_match().await;
    play_left_win(&mut m).await;

    // Idle until the deadline closes the match.
    let (event, _) = next_event(&mut m.left).await;
    assert!(matches!(event, Some(ServerMessage::RematchResult { .. })));
    let outcome = m.task.await.unwrap();
    assert_eq!(outcome.reason, ShutdownReason::RematchDeclined);

    assert!(matches!(
        m.handle.vote(Side::Right).await,
        Err(MatchError::Unavailable)
    ));
}

// =========================================================================
// Disconnects and shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_peer_lost_while_playing_notifies_survivor() {
    let mut m = seated_match().await;
    next_state(&mut m.left).await;

    m.handle.peer_lost(Side::Right).await.unwrap();

    let (event, _) = next_event(&mut m.left).await;
    assert_eq!(
        event,
        Some(ServerMessage::Closing {
            reason: CloseReason::PeerDisconnected { side: Side::Right }
        })
    );
    assert_eq!(m.left.recv().await, None);

    let outcome = m.task.await.unwrap();
    assert_eq!(outcome.reason, ShutdownReason::PeerDisconnected(Side::Right));
}

#[tokio::test(start_paused = true)]
async fn test_peer_lost_while_voting_reports_shutting_down() {
    let mut m = seated_match().await;
    play_left_win(&mut m).await;
    m.handle.vote(Side::Left).await.unwrap();

    m.handle.peer_lost(Side::Right).await.unwrap();

    assert_eq!(
        m.left.recv().await,
        Some(ServerMessage::RematchResult {
            outcome: RematchOutcome::ShuttingDown
        })
    );
    let outcome = m.task.await.unwrap();
    assert_eq!(outcome.reason, ShutdownReason::PeerDisconnected(Side::Right));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_sends_closing_to_both() {
    let mut m = seated_match().await;

    m.handle.shutdown().await.unwrap();

    for rx in [&mut m.left, &mut m.right] {
        let (event, _) = next_event(rx).await;
        assert_eq!(
            event,
            Some(ServerMessage::Closing {
                reason: CloseReason::ServerShutdown
            })
        );
    }
    let outcome = m.task.await.unwrap();
    assert_eq!(outcome.reason, ShutdownReason::Requested);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_all_handles_stops_the_match() {
    let m = seated_match().await;
    let Seated { handle, task, .. } = m;

    drop(handle);

    let outcome = task.await.unwrap();
    assert_eq!(outcome.reason, ShutdownReason::Requested);
}
