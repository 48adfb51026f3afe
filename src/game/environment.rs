//! Static world content: crates, bushes, pickup buffs and scope sight lines

use crate::ws::protocol::{CircleSnapshot, CrateSnapshot, EnvironmentSnapshot, LineSnapshot};

use super::actor::{ActorId, PlayerId};
use super::geometry::{Rect, Vec2};

/// Crate side length
pub const CRATE_SIZE: f32 = 220.0;
pub const CRATE_COLOR: &str = "rgb(128,128,128,1)";

pub const BUSH_RADIUS: f32 = 80.0;
pub const BUSH_COLOR: &str = "rgba(0,61,17,0.95)";

pub const BUFF_RADIUS: f32 = 20.0;

/// Extra distance a player must close before a buff is picked up
pub const BUFF_REACH_SLACK: f32 = 10.0;

pub const SIGHT_LINE_WIDTH: f32 = 2.0;
pub const SIGHT_LINE_COLOR: &str = "rgba(255,0,0,0.7)";

/// Solid rectangular obstacle; blocks players and bullets
#[derive(Debug, Clone, PartialEq)]
pub struct Crate {
    pub id: ActorId,
    pub rect: Rect,
    pub color: String,
}

impl Crate {
    pub fn new(id: ActorId, origin: Vec2) -> Self {
        Self {
            id,
            rect: Rect::new(origin.x, origin.y, CRATE_SIZE, CRATE_SIZE),
            color: CRATE_COLOR.to_string(),
        }
    }

    pub fn snapshot(&self) -> CrateSnapshot {
        CrateSnapshot {
            x: self.rect.origin.x,
            y: self.rect.origin.y,
            width: self.rect.width,
            height: self.rect.height,
            color: self.color.clone(),
        }
    }
}

/// Effect granted by a pickup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffKind {
    Ammo,
    HealthPot,
    SpeedBoost,
    Scope,
    SmallGun,
    BigGun,
}

impl BuffKind {
    pub fn color(self) -> &'static str {
        match self {
            BuffKind::Ammo => "rgba(0,0,0,1)",
            BuffKind::HealthPot => "rgba(255,0,0,1)",
            BuffKind::SpeedBoost => "rgba(0,0,255,1)",
            BuffKind::Scope | BuffKind::SmallGun | BuffKind::BigGun => "rgba(255,255,0,1)",
        }
    }
}

/// Circle footprint of a bush or buff
#[derive(Debug, Clone, PartialEq)]
pub struct CircleBody {
    pub position: Vec2,
    pub radius: f32,
    pub color: String,
}

impl CircleBody {
    fn snapshot(&self) -> CircleSnapshot {
        CircleSnapshot {
            x: self.position.x,
            y: self.position.y,
            radius: self.radius,
            color: self.color.clone(),
        }
    }
}

/// Line from a scoped player's hand to the cursor target
#[derive(Debug, Clone, PartialEq)]
pub struct SightLine {
    pub owner: PlayerId,
    pub start: Vec2,
    pub end: Vec2,
}

/// Non-blocking actors: concealment, pickups and sight lines
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Bush { id: ActorId, body: CircleBody },
    Buff { id: ActorId, kind: BuffKind, body: CircleBody },
    SightLine { id: ActorId, line: SightLine },
}

impl Environment {
    pub fn bush(id: ActorId, position: Vec2) -> Self {
        Environment::Bush {
            id,
            body: CircleBody {
                position,
                radius: BUSH_RADIUS,
                color: BUSH_COLOR.to_string(),
            },
        }
    }

    pub fn buff(id: ActorId, kind: BuffKind, position: Vec2) -> Self {
        Environment::Buff {
            id,
            kind,
            body: CircleBody {
                position,
                radius: BUFF_RADIUS,
                color: kind.color().to_string(),
            },
        }
    }

    pub fn id(&self) -> ActorId {
        match self {
            Environment::Bush { id, .. }
            | Environment::Buff { id, .. }
            | Environment::SightLine { id, .. } => *id,
        }
    }

    /// Physical footprint; sight lines have none
    pub fn body(&self) -> Option<&CircleBody> {
        match self {
            Environment::Bush { body, .. } | Environment::Buff { body, .. } => Some(body),
            Environment::SightLine { .. } => None,
        }
    }

    /// Whether a player of `player_radius` probing at `probe` is close enough to
    /// interact. Bushes need the player almost fully inside their footprint.
    pub fn reaches(&self, probe: Vec2, player_radius: f32) -> bool {
        match self {
            Environment::Bush { body, .. } => {
                probe.distance(body.position) < player_radius / 4.0 + body.radius / 2.0
            }
            Environment::Buff { body, .. } => {
                probe.distance(body.position) + BUFF_REACH_SLACK < player_radius + body.radius
            }
            Environment::SightLine { .. } => false,
        }
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        match self {
            Environment::Bush { body, .. } => EnvironmentSnapshot::Bush(body.snapshot()),
            Environment::Buff { kind, body, .. } => {
                let circle = body.snapshot();
                match kind {
                    BuffKind::Ammo => EnvironmentSnapshot::Ammo(circle),
                    BuffKind::HealthPot => EnvironmentSnapshot::HealthPot(circle),
                    BuffKind::SpeedBoost => EnvironmentSnapshot::SpeedBoost(circle),
                    BuffKind::Scope => EnvironmentSnapshot::Scope(circle),
                    BuffKind::SmallGun => EnvironmentSnapshot::SmallGun(circle),
                    BuffKind::BigGun => EnvironmentSnapshot::BigGun(circle),
                }
            }
            Environment::SightLine { line, .. } => EnvironmentSnapshot::Line(LineSnapshot {
                start_x: line.start.x,
                start_y: line.start.y,
                end_x: line.end.x,
                end_y: line.end.y,
                width: SIGHT_LINE_WIDTH,
                color: SIGHT_LINE_COLOR.to_string(),
            }),
        }
    }
}
