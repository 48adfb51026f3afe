//! Bullets in flight

use crate::ws::protocol::BulletSnapshot;

use super::actor::{ActorId, PlayerId};
use super::geometry::Vec2;
use super::weapon::Shot;

#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub id: ActorId,
    /// Shooter; only used to skip self-hits and attribute damage
    pub owner: PlayerId,
    pub position: Vec2,
    /// Shooter facing at the time of the shot (drawn offset)
    pub facing: Vec2,
    /// Unit direction of travel
    pub aim: Vec2,
    pub color: String,
    pub radius: f32,
    pub range: f32,
    pub speed: f32,
    pub damage: f32,
    pub traveled: f32,
}

impl Bullet {
    pub fn from_shot(id: ActorId, shot: Shot) -> Self {
        Self {
            id,
            owner: shot.owner,
            position: shot.position,
            facing: shot.facing,
            aim: shot.aim,
            color: shot.color,
            radius: shot.radius,
            range: shot.range,
            speed: shot.speed,
            damage: shot.damage,
            traveled: 0.0,
        }
    }

    /// Move one tick along the firing direction
    pub fn step(&mut self) {
        self.position += self.aim * self.speed;
        self.traveled += self.speed;
    }

    pub fn out_of_range(&self) -> bool {
        self.traveled >= self.range
    }

    pub fn snapshot(&self) -> BulletSnapshot {
        BulletSnapshot {
            x: self.position.x,
            y: self.position.y,
            facing_x: self.facing.x,
            facing_y: self.facing.y,
            radius: self.radius,
            color: self.color.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn bullet(range: f32, speed: f32) -> Bullet {
        Bullet::from_shot(
            ActorId(7),
            Shot {
                owner: Uuid::new_v4(),
                position: Vec2::new(0.0, 0.0),
                facing: Vec2::new(0.0, 1.0),
                aim: Vec2::new(0.0, 1.0),
                color: "rgba(0,0,0,1)".to_string(),
                radius: 4.0,
                range,
                speed,
                damage: 15.0,
            },
        )
    }

    #[test]
    fn travels_along_aim() {
        let mut b = bullet(1600.0, 40.0);
        b.step();
        b.step();
        assert_eq!(b.position, Vec2::new(0.0, 80.0));
        assert_eq!(b.traveled, 80.0);
        assert!(!b.out_of_range());
    }

    #[test]
    fn expires_at_range() {
        let mut b = bullet(100.0, 50.0);
        b.step();
        assert!(!b.out_of_range());
        b.step();
        assert!(b.out_of_range());
    }
}
