//! Lobby status board: what every connected player is doing, plus the most
//! recent match results

use std::collections::VecDeque;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::game::{PlayerId, PlayerStatusSink};
use crate::ws::protocol::{MatchResult, PlayerStatus};

/// Results kept for the lobby
pub const RECENT_RESULTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LobbyEntry {
    pub player_id: PlayerId,
    pub status: PlayerStatus,
}

pub struct LobbyBoard {
    statuses: DashMap<PlayerId, PlayerStatus>,
    results: Mutex<VecDeque<MatchResult>>,
}

impl LobbyBoard {
    pub fn new() -> Self {
        Self {
            statuses: DashMap::new(),
            results: Mutex::new(VecDeque::with_capacity(RECENT_RESULTS)),
        }
    }

    pub fn status(&self, player_id: &PlayerId) -> Option<PlayerStatus> {
        self.statuses.get(player_id).map(|s| *s)
    }

    pub fn remove(&self, player_id: &PlayerId) {
        self.statuses.remove(player_id);
    }

    /// All known players, sorted by id for stable output
    pub fn entries(&self) -> Vec<LobbyEntry> {
        let mut entries: Vec<LobbyEntry> = self
            .statuses
            .iter()
            .map(|e| LobbyEntry {
                player_id: *e.key(),
                status: *e.value(),
            })
            .collect();
        entries.sort_by_key(|e| e.player_id);
        entries
    }

    /// Most recent first
    pub fn recent_results(&self) -> Vec<MatchResult> {
        self.results.lock().iter().cloned().collect()
    }
}

impl Default for LobbyBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerStatusSink for LobbyBoard {
    fn set_player_status(&self, player_id: PlayerId, status: PlayerStatus) {
        debug!(player_id = %player_id, ?status, "Player status changed");
        self.statuses.insert(player_id, status);
    }

    fn report_result(&self, result: &MatchResult) {
        let mut results = self.results.lock();
        results.push_front(result.clone());
        results.truncate(RECENT_RESULTS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn result(winner: Option<PlayerId>) -> MatchResult {
        MatchResult {
            match_id: Uuid::new_v4(),
            winner,
            num_players: 2,
            duration_secs: 42,
            ended_at: Utc::now(),
        }
    }

    #[test]
    fn latest_status_wins() {
        let board = LobbyBoard::new();
        let id = Uuid::new_v4();
        board.set_player_status(id, PlayerStatus::InGame);
        board.set_player_status(id, PlayerStatus::Spectating);
        assert_eq!(board.status(&id), Some(PlayerStatus::Spectating));
        assert_eq!(board.entries().len(), 1);

        board.remove(&id);
        assert!(board.status(&id).is_none());
    }

    #[test]
    fn keeps_bounded_recent_results() {
        let board = LobbyBoard::new();
        for _ in 0..RECENT_RESULTS + 5 {
            board.report_result(&result(None));
        }
        let last = result(Some(Uuid::new_v4()));
        board.report_result(&last);

        let recent = board.recent_results();
        assert_eq!(recent.len(), RECENT_RESULTS);
        assert_eq!(recent[0], last);
    }
}
