//! Snapshot pacing and building

use crate::ws::protocol::ServerMsg;

use super::stage::Stage;

/// Builds per-tick state messages for network transmission
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
    sent: u64,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
            sent: 0,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Number of snapshots built so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// One-off full state sent when the match starts
    pub fn build_initial(&mut self, stage: &Stage) -> ServerMsg {
        self.sent += 1;
        ServerMsg::InitialState {
            match_id: stage.id(),
            state: stage.initial_state(),
        }
    }

    pub fn build(&mut self, stage: &Stage) -> ServerMsg {
        self.sent += 1;
        ServerMsg::StageUpdate {
            state: stage.updated_state(),
        }
    }
}
