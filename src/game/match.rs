//! Match runtime and authoritative tick loop

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

use crate::util::time::{unix_millis, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};
use crate::ws::protocol::{MatchResult, ServerMsg};

use super::actor::PlayerId;
use super::input::InputBuffer;
use super::snapshot::SnapshotBuilder;
use super::stage::{Stage, StageSettings};
use super::{PlayerInput, PlayerStatusSink};

/// Pause between match creation and the first tick, so clients can load
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(1);

/// Cheap cloneable handle used to talk to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    /// Players still alive in the match
    pub player_count: Arc<AtomicUsize>,
}

impl MatchHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_players(&self) -> usize {
        self.matches.iter().map(|m| m.value().player_count()).sum()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative game match. Owns its stage exclusively; the outside
/// world only reaches it through the channels in [`MatchHandle`].
pub struct GameMatch {
    stage: Stage,
    inputs: InputBuffer,
    input_rx: mpsc::Receiver<PlayerInput>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<AtomicUsize>,
    status: Arc<dyn PlayerStatusSink>,
    start_delay: Duration,
}

impl GameMatch {
    /// Create a new match and generate its world
    pub fn new(
        id: Uuid,
        seed: u64,
        roster: &[PlayerId],
        settings: &StageSettings,
        status: Arc<dyn PlayerStatusSink>,
    ) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);
        let player_count = Arc::new(AtomicUsize::new(roster.len()));

        let handle = MatchHandle {
            id,
            input_tx,
            snapshot_tx: snapshot_tx.clone(),
            player_count: player_count.clone(),
        };

        let stage = Stage::new(id, roster, settings, seed, unix_millis(), status.clone());

        let game_match = Self {
            stage,
            inputs: InputBuffer::new(),
            input_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            player_count,
            status,
            start_delay: DEFAULT_START_DELAY,
        };

        (game_match, handle)
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Run the tick loop until the match is decided, then report and
    /// broadcast the result
    pub async fn run(mut self) -> MatchResult {
        let match_id = self.stage.id();
        info!(
            match_id = %match_id,
            players = self.stage.num_players(),
            "Match starting"
        );

        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        let initial = self.snapshot_builder.build_initial(&self.stage);
        let _ = self.snapshot_tx.send(initial);

        let mut tick_interval = interval(Duration::from_micros(TICK_DURATION_MICROS));
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut ticks: u64 = 0;

        loop {
            tick_interval.tick().await;
            ticks += 1;

            let now = unix_millis();
            self.process_inputs();
            self.inputs.apply(&mut self.stage, now);
            self.stage.advance(now);
            self.player_count
                .store(self.stage.num_alive(), Ordering::Relaxed);

            if self.stage.has_ended() {
                self.snapshot_builder.force_next();
            }
            if self.snapshot_builder.should_send() {
                let update = self.snapshot_builder.build(&self.stage);
                // No receivers is fine; everyone may have left
                let _ = self.snapshot_tx.send(update);
            }

            if self.stage.has_ended() {
                break;
            }
        }

        let result = MatchResult {
            match_id,
            winner: self.stage.winner(),
            num_players: self.stage.num_players(),
            duration_secs: self.stage.elapsed_secs(),
            ended_at: Utc::now(),
        };
        info!(
            match_id = %match_id,
            winner = ?result.winner,
            ticks,
            snapshots = self.snapshot_builder.sent(),
            "Match ended"
        );

        self.status.report_result(&result);
        let _ = self.snapshot_tx.send(ServerMsg::MatchEnd {
            result: result.clone(),
        });
        result
    }

    /// Drain the input channel into the per-tick buffer
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            debug!(player_id = %input.player_id, received_at = input.received_at, "Input received");
            self.inputs.record(input);
        }
    }
}
