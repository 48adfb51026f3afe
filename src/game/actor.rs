//! Actor identities and the closed set of actor kinds owned by a stage

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bullet::Bullet;
use super::environment::{Crate, Environment};
use super::player::Player;

/// Players are identified by their account/connection id
pub type PlayerId = Uuid;

/// Stage-local identity for non-player actors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

/// Any actor that can be added to a stage
#[derive(Debug, Clone)]
pub enum Actor {
    Player(Player),
    Bullet(Bullet),
    Crate(Crate),
    Environment(Environment),
}

impl Actor {
    pub fn actor_ref(&self) -> ActorRef {
        match self {
            Actor::Player(p) => ActorRef::Player(p.id),
            Actor::Bullet(b) => ActorRef::Bullet(b.id),
            Actor::Crate(c) => ActorRef::Crate(c.id),
            Actor::Environment(e) => ActorRef::Environment(e.id()),
        }
    }
}

/// Identity of an actor, tagged with the collection that holds it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorRef {
    Player(PlayerId),
    Bullet(ActorId),
    Crate(ActorId),
    Environment(ActorId),
}
