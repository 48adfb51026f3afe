//! Game simulation modules

pub mod actor;
pub mod bullet;
pub mod collision;
pub mod environment;
pub mod geometry;
pub mod input;
pub mod r#match;
pub mod player;
pub mod snapshot;
pub mod stage;
pub mod weapon;

pub use actor::{Actor, ActorId, ActorRef, PlayerId};
pub use r#match::{GameMatch, MatchHandle, MatchRegistry};
pub use stage::{RemovalReason, Stage, StageSettings};

use crate::ws::protocol::{ClientMsg, MatchResult, PlayerStatus};

/// Lobby-side collaborator notified when a player's status changes
pub trait PlayerStatusSink: Send + Sync {
    fn set_player_status(&self, player_id: PlayerId, status: PlayerStatus);

    /// Called once when a match finishes
    fn report_result(&self, _result: &MatchResult) {}
}

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub player_id: PlayerId,
    pub event: InputEvent,
    pub received_at: u64,
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Client(ClientMsg),
    /// Socket closed without an explicit leave
    Disconnected,
}
