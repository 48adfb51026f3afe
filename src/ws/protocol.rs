//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the matchmaking queue
    JoinQueue,

    /// Movement direction; normalized server-side
    Move { dx: f32, dy: f32 },

    /// Cursor position in viewport coordinates
    Aim { cursor_x: f32, cursor_y: f32 },

    /// Pull the trigger towards a cursor position
    Fire { cursor_x: f32, cursor_y: f32 },

    /// Client canvas size, used to anchor cursor coordinates
    Viewport { width: f32, height: f32 },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Quit the current match and return to the lobby
    LeaveMatch,
}

impl ClientMsg {
    /// High-frequency gameplay input, subject to the per-connection input
    /// rate limit
    pub fn is_gameplay(&self) -> bool {
        matches!(
            self,
            ClientMsg::Move { .. } | ClientMsg::Aim { .. } | ClientMsg::Fire { .. }
        )
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        player_id: Uuid,
        server_time: u64,
    },

    /// Queued for a match
    Queued { position: usize },

    /// Placed into a match; initial state follows once it starts
    MatchFound { match_id: Uuid, num_players: usize },

    /// Full world state, sent once at match start
    InitialState {
        match_id: Uuid,
        #[serde(flatten)]
        state: InitialState,
    },

    /// Per-tick world state
    StageUpdate {
        #[serde(flatten)]
        state: UpdatedState,
    },

    /// Match has ended
    MatchEnd { result: MatchResult },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Lobby-facing status of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    #[serde(rename = "In Lobby")]
    InLobby,
    #[serde(rename = "In Queue")]
    InQueue,
    #[serde(rename = "In Game")]
    InGame,
    #[serde(rename = "Spectating")]
    Spectating,
    #[serde(rename = "Winner!")]
    Winner,
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: Uuid,
    pub x: f32,
    pub y: f32,
    /// Facing unit vector
    pub facing_x: f32,
    pub facing_y: f32,
    pub color: String,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub ammo: u32,
    pub ammo_capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub x: f32,
    pub y: f32,
    pub facing_x: f32,
    pub facing_y: f32,
    pub radius: f32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrateSnapshot {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleSnapshot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    pub width: f32,
    pub color: String,
}

/// Environment record, tagged with the renderer that draws it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnvironmentSnapshot {
    #[serde(rename = "LineEnv")]
    Line(LineSnapshot),
    #[serde(rename = "AmmoEnv")]
    Ammo(CircleSnapshot),
    #[serde(rename = "HealthPotEnv")]
    HealthPot(CircleSnapshot),
    #[serde(rename = "BushEnv")]
    Bush(CircleSnapshot),
    #[serde(rename = "ScopeEnv")]
    Scope(CircleSnapshot),
    #[serde(rename = "SpeedBoostEnv")]
    SpeedBoost(CircleSnapshot),
    #[serde(rename = "SmallGunEnv")]
    SmallGun(CircleSnapshot),
    #[serde(rename = "BigGunEnv")]
    BigGun(CircleSnapshot),
}

/// Everything a client needs to draw the world, crates included
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialState {
    pub width: f32,
    pub height: f32,
    pub players: Vec<PlayerSnapshot>,
    pub bullets: Vec<BulletSnapshot>,
    pub crates: Vec<CrateSnapshot>,
    pub environment: Vec<EnvironmentSnapshot>,
    /// Unix millis
    pub game_start_time: u64,
    pub num_alive: usize,
    pub num_players: usize,
}

/// Per-tick state; crates never change so they are left out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatedState {
    pub players: Vec<PlayerSnapshot>,
    pub bullets: Vec<BulletSnapshot>,
    pub environment: Vec<EnvironmentSnapshot>,
    pub num_alive: usize,
    pub has_ended: bool,
    pub elapsed_secs: u64,
}

/// Outcome reported to the lobby when a match ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: Uuid,
    pub winner: Option<Uuid>,
    pub num_players: usize,
    pub duration_secs: u64,
    pub ended_at: DateTime<Utc>,
}
