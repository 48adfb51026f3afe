//! Per-tick input buffering.
//!
//! Input arrives asynchronously from sockets. It is collected here between
//! ticks and applied to the stage in one batch at the start of the next
//! tick, last write wins per player and input kind.

use std::collections::BTreeMap;

use tracing::debug;

use crate::ws::protocol::ClientMsg;

use super::actor::PlayerId;
use super::stage::{RemovalReason, Stage};
use super::{InputEvent, PlayerInput};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PendingInput {
    movement: Option<(f32, f32)>,
    cursor: Option<(f32, f32)>,
    fire: Option<(f32, f32)>,
    viewport: Option<(f32, f32)>,
}

/// Inputs waiting for the next tick
#[derive(Debug, Default)]
pub struct InputBuffer {
    pending: BTreeMap<PlayerId, PendingInput>,
    removals: Vec<(PlayerId, RemovalReason)>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.removals.is_empty()
    }

    /// Buffer one input. Messages with no effect on the stage are ignored.
    pub fn record(&mut self, input: PlayerInput) {
        let player_id = input.player_id;
        let msg = match input.event {
            InputEvent::Disconnected => {
                self.push_removal(player_id, RemovalReason::Disconnect);
                return;
            }
            InputEvent::Client(msg) => msg,
        };

        match msg {
            ClientMsg::Move { dx, dy } => self.entry(player_id).movement = Some((dx, dy)),
            ClientMsg::Aim { cursor_x, cursor_y } => {
                self.entry(player_id).cursor = Some((cursor_x, cursor_y))
            }
            ClientMsg::Fire { cursor_x, cursor_y } => {
                let entry = self.entry(player_id);
                entry.cursor = Some((cursor_x, cursor_y));
                entry.fire = Some((cursor_x, cursor_y));
            }
            ClientMsg::Viewport { width, height } => {
                self.entry(player_id).viewport = Some((width, height))
            }
            ClientMsg::LeaveMatch => self.push_removal(player_id, RemovalReason::Quit),
            ClientMsg::JoinQueue | ClientMsg::Ping { .. } => {
                debug!(player_id = %player_id, "Ignoring non-gameplay input");
            }
        }
    }

    /// Apply everything buffered to `stage` and clear the buffer. Removals
    /// go first so a departing player's last inputs are dropped.
    pub fn apply(&mut self, stage: &mut Stage, now_ms: u64) {
        for (player_id, reason) in self.removals.drain(..) {
            self.pending.remove(&player_id);
            stage.remove_player(player_id, reason);
        }

        for (player_id, input) in std::mem::take(&mut self.pending) {
            if let Some((w, h)) = input.viewport {
                stage.set_viewport(player_id, w, h);
            }
            if let Some((dx, dy)) = input.movement {
                stage.apply_movement(player_id, dx, dy);
            }
            if let Some((x, y)) = input.cursor {
                stage.apply_cursor(player_id, x, y);
            }
            if let Some((x, y)) = input.fire {
                stage.fire(player_id, x, y, now_ms);
            }
        }
    }

    fn entry(&mut self, player_id: PlayerId) -> &mut PendingInput {
        self.pending.entry(player_id).or_default()
    }

    fn push_removal(&mut self, player_id: PlayerId, reason: RemovalReason) {
        if !self.removals.iter().any(|(id, _)| *id == player_id) {
            self.removals.push((player_id, reason));
        }
    }
}
