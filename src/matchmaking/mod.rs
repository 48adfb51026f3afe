//! Lobby: matchmaking queue, match creation and player status board

pub mod queue;
pub mod service;
pub mod status;

pub use service::MatchmakingService;
pub use status::LobbyBoard;
