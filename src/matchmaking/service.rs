//! Matchmaking service - manages queue, connections and match creation

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::game::r#match::DEFAULT_START_DELAY;
use crate::game::{GameMatch, InputEvent, MatchRegistry, PlayerId, PlayerInput, PlayerStatusSink, StageSettings};
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, PlayerStatus, ServerMsg};

use super::queue::{MatchmakingQueue, QueuedPlayer};
use super::status::LobbyBoard;

/// Interval between queue checks
const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Player connection handle for routing messages
#[derive(Clone)]
pub struct PlayerConnection {
    pub player_id: PlayerId,
    /// Inputs from the socket, routed to the player's current match
    pub input_tx: mpsc::Sender<PlayerInput>,
    /// Everything the socket should send to the client
    pub outbound: broadcast::Sender<ServerMsg>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MatchmakingError {
    #[error("Already in a match")]
    AlreadyInMatch,

    #[error("Player is not connected")]
    NotConnected,
}

/// Matchmaking service
pub struct MatchmakingService {
    queue: Arc<Mutex<MatchmakingQueue>>,
    registry: Arc<MatchRegistry>,
    lobby: Arc<LobbyBoard>,
    settings: StageSettings,
    start_delay: Duration,
    /// Connected players
    players: Arc<DashMap<PlayerId, PlayerConnection>>,
    /// Map of player -> current match
    player_matches: Arc<DashMap<PlayerId, Uuid>>,
}

impl MatchmakingService {
    pub fn new(registry: Arc<MatchRegistry>, lobby: Arc<LobbyBoard>, config: &Config) -> Self {
        Self {
            queue: Arc::new(Mutex::new(MatchmakingQueue::new(
                config.min_players,
                config.max_players,
                config.queue_max_wait_secs,
            ))),
            registry,
            lobby,
            settings: config.stage.clone(),
            start_delay: DEFAULT_START_DELAY,
            players: Arc::new(DashMap::new()),
            player_matches: Arc::new(DashMap::new()),
        }
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Register a player connection (called when WebSocket connects).
    /// Returns the input sender and the outbound channel for the socket.
    pub fn register_player(
        &self,
        player_id: PlayerId,
    ) -> (mpsc::Sender<PlayerInput>, broadcast::Sender<ServerMsg>) {
        let (input_tx, mut input_rx) = mpsc::channel::<PlayerInput>(64);
        let (outbound, _) = broadcast::channel::<ServerMsg>(64);

        self.players.insert(
            player_id,
            PlayerConnection {
                player_id,
                input_tx: input_tx.clone(),
                outbound: outbound.clone(),
            },
        );
        self.lobby.set_player_status(player_id, PlayerStatus::InLobby);

        // Route inputs from the personal channel to the current match
        let registry = self.registry.clone();
        let player_matches = self.player_matches.clone();
        tokio::spawn(async move {
            while let Some(input) = input_rx.recv().await {
                let leaving = matches!(input.event, InputEvent::Client(ClientMsg::LeaveMatch));
                let Some(match_id) = player_matches.get(&player_id).map(|m| *m) else {
                    debug!(player_id = %player_id, "Input outside of a match, dropping");
                    continue;
                };

                if let Some(match_handle) = registry.get(&match_id) {
                    if match_handle.input_tx.send(input).await.is_err() {
                        warn!(player_id = %player_id, "Failed to send input to match");
                    }
                }
                if leaving {
                    player_matches.remove_if(&player_id, |_, m| *m == match_id);
                }
            }
        });

        (input_tx, outbound)
    }

    /// Unregister a player (called when WebSocket disconnects)
    pub async fn unregister_player(&self, player_id: PlayerId) {
        self.players.remove(&player_id);
        self.lobby.remove(&player_id);
        self.queue.lock().await.dequeue(player_id);

        if let Some((_, match_id)) = self.player_matches.remove(&player_id) {
            if let Some(handle) = self.registry.get(&match_id) {
                let input = PlayerInput {
                    player_id,
                    event: InputEvent::Disconnected,
                    received_at: unix_millis(),
                };
                if handle.input_tx.send(input).await.is_err() {
                    debug!(player_id = %player_id, match_id = %match_id, "Match already gone");
                }
            }
        }

        info!(player_id = %player_id, "Player unregistered from matchmaking");
    }

    /// Join matchmaking queue; returns the queue position
    pub async fn join_queue(&self, player_id: PlayerId) -> Result<usize, MatchmakingError> {
        if !self.players.contains_key(&player_id) {
            return Err(MatchmakingError::NotConnected);
        }
        if self.player_matches.contains_key(&player_id) {
            return Err(MatchmakingError::AlreadyInMatch);
        }

        let mut queue = self.queue.lock().await;
        let position = queue.enqueue(QueuedPlayer::new(player_id));
        self.lobby.set_player_status(player_id, PlayerStatus::InQueue);

        info!(player_id = %player_id, queue_size = queue.len(), "Player joined matchmaking queue");
        Ok(position)
    }

    /// Leave matchmaking queue
    pub async fn leave_queue(&self, player_id: PlayerId) {
        if self.queue.lock().await.dequeue(player_id).is_some() {
            self.lobby.set_player_status(player_id, PlayerStatus::InLobby);
        }
    }

    /// Start a match if the queue allows one; returns its id
    pub async fn form_match(&self) -> Option<Uuid> {
        let players = self.queue.lock().await.try_form_match()?;
        if players.is_empty() {
            return None;
        }
        Some(self.create_match(players))
    }

    /// Create a match with the given players and spawn its task
    fn create_match(&self, players: Vec<QueuedPlayer>) -> Uuid {
        let match_id = Uuid::new_v4();
        let seed = rand::random::<u64>();
        let roster: Vec<PlayerId> = players.iter().map(|p| p.player_id).collect();

        let (game_match, handle) =
            GameMatch::new(match_id, seed, &roster, &self.settings, self.lobby.clone());
        let game_match = game_match.with_start_delay(self.start_delay);

        // Register match
        self.registry.insert(handle.clone());

        for &player_id in &roster {
            self.player_matches.insert(player_id, match_id);
            self.lobby.set_player_status(player_id, PlayerStatus::InGame);

            if let Some(conn) = self.players.get(&player_id) {
                let _ = conn.outbound.send(ServerMsg::MatchFound {
                    match_id,
                    num_players: roster.len(),
                });
                forward_match_messages(
                    player_id,
                    match_id,
                    handle.snapshot_tx.subscribe(),
                    conn.outbound.clone(),
                    self.player_matches.clone(),
                );
            }
        }

        info!(
            match_id = %match_id,
            player_count = roster.len(),
            seed,
            "Created new match"
        );

        // Spawn match task
        let registry = self.registry.clone();
        let player_matches = self.player_matches.clone();
        tokio::spawn(async move {
            let result = game_match.run().await;

            // Cleanup after match ends
            registry.remove(&match_id);
            for player_id in roster {
                player_matches.remove_if(&player_id, |_, m| *m == match_id);
            }

            info!(match_id = %match_id, winner = ?result.winner, "Match removed from registry");
        });

        match_id
    }

    /// Run the matchmaking service (periodic queue processing)
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(QUEUE_POLL_INTERVAL);

        loop {
            interval.tick().await;
            while self.form_match().await.is_some() {}
        }
    }

    /// Get current queue size
    pub async fn queue_size(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Check if player is in queue
    pub async fn is_in_queue(&self, player_id: &PlayerId) -> bool {
        self.queue.lock().await.contains(player_id)
    }

    /// Get player's current match ID
    pub fn get_player_match(&self, player_id: &PlayerId) -> Option<Uuid> {
        self.player_matches.get(player_id).map(|r| *r)
    }

    pub fn connected_players(&self) -> usize {
        self.players.len()
    }
}

/// Relay a match's broadcasts to one player's socket while they are in it.
/// The final `MatchEnd` always gets through.
fn forward_match_messages(
    player_id: PlayerId,
    match_id: Uuid,
    mut match_rx: broadcast::Receiver<ServerMsg>,
    outbound: broadcast::Sender<ServerMsg>,
    player_matches: Arc<DashMap<PlayerId, Uuid>>,
) {
    tokio::spawn(async move {
        loop {
            match match_rx.recv().await {
                Ok(msg) => {
                    let is_end = matches!(msg, ServerMsg::MatchEnd { .. });
                    let in_match = player_matches
                        .get(&player_id)
                        .is_some_and(|m| *m == match_id);
                    if !is_end && !in_match {
                        break;
                    }
                    if outbound.send(msg).is_err() || is_end {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(player_id = %player_id, lagged = n, "Match receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!(player_id = %player_id, match_id = %match_id, "Stopped relaying match");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> MatchmakingService {
        let config = Config::from_lookup(|key| match key {
            "NUM_CRATES" | "NUM_BUSHES" => Some("0".to_string()),
            _ => None,
        })
        .unwrap();
        MatchmakingService::new(Arc::new(MatchRegistry::new()), Arc::new(LobbyBoard::new()), &config)
            .with_start_delay(Duration::ZERO)
    }

    #[test]
    fn joining_requires_a_connection() {
        let service = service();
        let joined = tokio_test::block_on(service.join_queue(Uuid::new_v4()));
        assert_eq!(joined, Err(MatchmakingError::NotConnected));
        assert!(tokio_test::block_on(service.form_match()).is_none());
    }

    #[tokio::test]
    async fn queued_players_are_matched_and_notified() {
        let service = service();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (_input_a, out_a) = service.register_player(a);
        let (_input_b, out_b) = service.register_player(b);
        let mut rx_a = out_a.subscribe();
        let _rx_b = out_b.subscribe();

        assert_eq!(service.join_queue(a).await, Ok(1));
        assert!(service.form_match().await.is_none());
        assert_eq!(service.join_queue(b).await, Ok(2));

        let match_id = service.form_match().await.expect("two players form a match");
        assert_eq!(service.get_player_match(&a), Some(match_id));
        assert_eq!(service.queue_size().await, 0);
        assert_eq!(service.lobby.status(&b), Some(PlayerStatus::InGame));
        assert_eq!(service.join_queue(a).await, Err(MatchmakingError::AlreadyInMatch));

        match rx_a.recv().await {
            Ok(ServerMsg::MatchFound { match_id: found, num_players }) => {
                assert_eq!(found, match_id);
                assert_eq!(num_players, 2);
            }
            other => panic!("expected match_found, got {other:?}"),
        }

        // B dropping out hands A the win
        service.unregister_player(b).await;

        let result = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx_a.recv().await {
                    Ok(ServerMsg::MatchEnd { result }) => return result,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("outbound closed"),
                }
            }
        })
        .await
        .expect("match ends in time");

        assert_eq!(result.match_id, match_id);
        assert_eq!(result.winner, Some(a));
        assert_eq!(service.lobby.status(&a), Some(PlayerStatus::Winner));
        assert!(service.lobby.status(&b).is_none());
    }
}
