//! Matchmaking queue implementation

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::game::PlayerId;

/// Player in the matchmaking queue
#[derive(Debug, Clone)]
pub struct QueuedPlayer {
    pub player_id: PlayerId,
    pub queued_at: Instant,
}

impl QueuedPlayer {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            queued_at: Instant::now(),
        }
    }

    /// How long this player has been waiting
    pub fn wait_time(&self) -> Duration {
        self.queued_at.elapsed()
    }
}

/// The matchmaking queue
pub struct MatchmakingQueue {
    queue: VecDeque<QueuedPlayer>,
    /// Minimum players to start a match
    min_players: usize,
    /// Maximum players per match
    max_players: usize,
    /// Max time to wait before starting with fewer players
    max_wait_time: Duration,
}

impl MatchmakingQueue {
    pub fn new(min_players: usize, max_players: usize, max_wait_secs: u64) -> Self {
        Self {
            queue: VecDeque::new(),
            min_players,
            max_players,
            max_wait_time: Duration::from_secs(max_wait_secs),
        }
    }

    /// Add a player to the queue; returns their 1-based position
    pub fn enqueue(&mut self, player: QueuedPlayer) -> usize {
        // Remove if already in queue (rejoin)
        self.queue.retain(|p| p.player_id != player.player_id);
        self.queue.push_back(player);
        self.queue.len()
    }

    /// Remove a player from the queue
    pub fn dequeue(&mut self, player_id: PlayerId) -> Option<QueuedPlayer> {
        let pos = self.queue.iter().position(|p| p.player_id == player_id)?;
        self.queue.remove(pos)
    }

    /// Check if a player is in the queue
    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.queue.iter().any(|p| &p.player_id == player_id)
    }

    /// Get queue length
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Try to form a match from queued players.
    /// Returns players to be put in a match, or None if not enough
    pub fn try_form_match(&mut self) -> Option<Vec<QueuedPlayer>> {
        if self.queue.len() >= self.min_players {
            // Have enough players, form a full match
            let count = self.queue.len().min(self.max_players);
            return Some(self.queue.drain(..count).collect());
        }

        // Check if anyone has waited too long
        let oldest_wait = self.queue.front().map(QueuedPlayer::wait_time)?;
        if oldest_wait >= self.max_wait_time {
            // Start with whoever we have
            return Some(self.queue.drain(..).collect());
        }

        None
    }

    /// Get min players setting
    pub fn min_players(&self) -> usize {
        self.min_players
    }

    /// Get max players setting
    pub fn max_players(&self) -> usize {
        self.max_players
    }
}

impl Default for MatchmakingQueue {
    fn default() -> Self {
        Self::new(2, 10, 30) // 2-10 players, 30 second max wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn waits_for_min_players() {
        let mut queue = MatchmakingQueue::new(3, 10, 60);
        queue.enqueue(QueuedPlayer::new(Uuid::new_v4()));
        queue.enqueue(QueuedPlayer::new(Uuid::new_v4()));
        assert!(queue.try_form_match().is_none());

        queue.enqueue(QueuedPlayer::new(Uuid::new_v4()));
        let formed = queue.try_form_match().unwrap();
        assert_eq!(formed.len(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn caps_match_size_and_keeps_order() {
        let mut queue = MatchmakingQueue::new(2, 2, 60);
        let ids: Vec<_> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            queue.enqueue(QueuedPlayer::new(*id));
        }
        let formed: Vec<_> = queue.try_form_match().unwrap().into_iter().map(|p| p.player_id).collect();
        assert_eq!(formed, ids[..2].to_vec());
        assert!(queue.contains(&ids[2]));
    }

    #[test]
    fn rejoin_moves_player_to_back() {
        let mut queue = MatchmakingQueue::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(queue.enqueue(QueuedPlayer::new(a)), 1);
        assert_eq!(queue.enqueue(QueuedPlayer::new(b)), 2);
        assert_eq!(queue.enqueue(QueuedPlayer::new(a)), 2);
        assert_eq!(queue.len(), 2);
        assert!(queue.dequeue(a).is_some());
        assert!(queue.dequeue(a).is_none());
    }

    #[test]
    fn long_wait_starts_short_match() {
        let mut queue = MatchmakingQueue::new(2, 10, 0);
        queue.enqueue(QueuedPlayer::new(Uuid::new_v4()));
        assert_eq!(queue.try_form_match().map(|p| p.len()), Some(1));
        assert!(queue.try_form_match().is_none());
    }
}
