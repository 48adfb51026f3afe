//! Player state and per-tick movement resolution

use crate::ws::protocol::PlayerSnapshot;

use super::actor::{ActorId, PlayerId};
use super::collision::{BorderHit, CollisionEngine, Corner};
use super::environment::{BuffKind, Crate, SightLine};
use super::geometry::{direction, Vec2};
use super::weapon::{Shot, Weapon, WeaponConfig, WeaponKind};

pub const PLAYER_RADIUS: f32 = 30.0;
pub const PLAYER_HP: f32 = 100.0;
/// Hard ceiling for overloaded healing
pub const OVERLOAD_HP_CAP: f32 = 110.0;
pub const DEFAULT_SPEED: f32 = 8.0;
pub const BOOSTED_SPEED: f32 = 12.0;

pub const HEALTH_POT_HEAL: f32 = 5.0;
/// Most ammo a single ammo pickup restores
pub const AMMO_REFILL: u32 = 10;

/// Collision probe offset applied to the candidate destination on both axes
pub const APPROACH_TOLERANCE: f32 = 10.0;
/// Players may overlap by this much before blocking each other
pub const PLAYER_COLLISION_SLACK: f32 = 10.0;
/// Fraction of the velocity undone when bumping into another player
pub const PLAYER_PUSHBACK_DIVISOR: f32 = 10.0;
/// Fixed correction applied when walking into a crate
pub const CRATE_NUDGE: f32 = 5.0;

pub const BULLET_COLOR: &str = "rgba(0,0,0,1)";

/// What stopped a player's move this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Blocker {
    Player,
    Crate { corner: Corner, hit: BorderHit },
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub position: Vec2,
    pub radius: f32,
    pub color: String,
    pub hp: f32,
    pub max_hp: f32,
    pub movement_speed: f32,
    /// Unit movement direction requested by the client
    pub move_direction: Vec2,
    pub velocity: Vec2,
    /// Last cursor position in viewport coordinates
    pub cursor: Vec2,
    /// Unit facing vector
    pub facing: Vec2,
    pub hand: Vec2,
    /// Client canvas size; the player is drawn at its centre
    pub viewport: Vec2,
    pub weapon: Weapon,
    pub hidden: bool,
    pub using_scope: bool,
    /// Sight line currently in the stage's environment collection
    pub sight_line: Option<ActorId>,
}

impl Player {
    pub fn new(id: PlayerId, position: Vec2, color: String, viewport: Vec2) -> Self {
        let facing = Vec2::new(0.0, 1.0);
        Self {
            id,
            position,
            radius: PLAYER_RADIUS,
            color,
            hp: PLAYER_HP,
            max_hp: PLAYER_HP,
            movement_speed: DEFAULT_SPEED,
            move_direction: Vec2::ZERO,
            velocity: Vec2::ZERO,
            cursor: viewport / 2.0 + facing,
            facing,
            hand: position + facing * PLAYER_RADIUS,
            viewport,
            weapon: Weapon::new(WeaponKind::Unarmed, id),
            hidden: false,
            using_scope: false,
            sight_line: None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.hp -= amount;
    }

    /// Heal up to max HP, or up to the overload cap when `allow_overload` is set
    pub fn heal(&mut self, amount: f32, allow_overload: bool) {
        let cap = if allow_overload {
            OVERLOAD_HP_CAP
        } else {
            self.max_hp
        };
        if self.hp < cap {
            self.hp = (self.hp + amount).min(cap);
        }
    }

    /// Set the movement direction; takes effect on the next advance
    pub fn apply_movement_intent(&mut self, dx: f32, dy: f32) {
        self.hidden = false;
        self.move_direction = direction(Vec2::new(dx, dy));
        self.velocity = self.move_direction * self.movement_speed;
        self.hand = self.position + self.facing * self.radius;
    }

    /// Point the player at a cursor given in viewport coordinates
    pub fn apply_cursor_direction(&mut self, cursor_x: f32, cursor_y: f32) {
        self.cursor = Vec2::new(cursor_x, cursor_y);
        self.facing = self.aim_vector(self.cursor);
        self.hand = self.position + self.facing * self.radius;
    }

    pub fn set_movement_speed(&mut self, speed: f32) {
        self.movement_speed = speed;
        self.velocity = self.move_direction * speed;
    }

    /// Unit vector from the player (drawn at the viewport centre) to `cursor`
    pub fn aim_vector(&self, cursor: Vec2) -> Vec2 {
        direction(cursor - self.viewport / 2.0)
    }

    /// World position under the cursor
    pub fn cursor_target(&self) -> Vec2 {
        self.cursor - (self.viewport / 2.0 - self.position)
    }

    /// Sight line geometry, present only while alive with a scope
    pub fn sight_line_geometry(&self) -> Option<SightLine> {
        if self.is_dead() || !self.using_scope {
            return None;
        }
        Some(SightLine {
            owner: self.id,
            start: self.hand,
            end: self.cursor_target(),
        })
    }

    /// Pull the trigger towards `cursor`. Dead players never fire.
    pub fn fire(&mut self, cursor: Vec2, now_ms: u64, out: &mut Vec<Shot>) -> bool {
        if self.is_dead() {
            return false;
        }
        let aim = self.aim_vector(cursor);
        self.weapon
            .shoot(now_ms, self.position, self.facing, aim, BULLET_COLOR, out)
    }

    /// Replace the held weapon; the old one and its ammo are discarded
    pub fn upgrade_weapon(&mut self, kind: WeaponKind) {
        self.weapon = Weapon::new(kind, self.id);
    }

    /// Apply a pickup's effect. Returns whether the pickup was consumed.
    pub fn apply_buff(&mut self, kind: BuffKind) -> bool {
        match kind {
            BuffKind::Ammo => {
                let deficit = self.weapon.capacity() - self.weapon.remaining();
                if deficit == 0 {
                    return false;
                }
                self.weapon.reload(deficit.min(AMMO_REFILL));
                true
            }
            BuffKind::HealthPot => {
                if self.hp >= self.max_hp {
                    return false;
                }
                self.heal(HEALTH_POT_HEAL, false);
                true
            }
            BuffKind::SpeedBoost => {
                self.set_movement_speed(BOOSTED_SPEED);
                true
            }
            BuffKind::SmallGun => self.upgrade_if_better(WeaponKind::Pistol),
            BuffKind::BigGun => self.upgrade_if_better(WeaponKind::BurstRifle),
            BuffKind::Scope => {
                if self.weapon.capacity() == 0 {
                    return false;
                }
                self.using_scope = true;
                true
            }
        }
    }

    fn upgrade_if_better(&mut self, kind: WeaponKind) -> bool {
        if self.weapon.capacity() >= WeaponConfig::for_kind(kind).capacity {
            return false;
        }
        self.upgrade_weapon(kind);
        true
    }

    /// Where the player would end up this tick with no obstacles
    pub fn candidate_destination(&self) -> Vec2 {
        self.position + self.velocity
    }

    /// Candidate destination shifted by the approach tolerance; all proximity
    /// checks for a move are made against this point
    pub fn probe(&self) -> Vec2 {
        self.candidate_destination() + Vec2::splat(APPROACH_TOLERANCE)
    }

    /// First obstacle hit at `probe`: other live players win over crates
    pub fn detect_blocker<'a>(
        &self,
        probe: Vec2,
        players: impl IntoIterator<Item = &'a Player>,
        crates: &[Crate],
    ) -> Option<Blocker> {
        let hits_player = players.into_iter().any(|other| {
            other.id != self.id
                && !other.is_dead()
                && CollisionEngine::circles_overlap(
                    probe,
                    self.radius - PLAYER_COLLISION_SLACK,
                    other.position,
                    other.radius,
                )
        });
        if hits_player {
            return Some(Blocker::Player);
        }

        crates.iter().find_map(|c| {
            CollisionEngine::circle_vs_rect_border_side(probe, self.radius, &c.rect).map(|hit| {
                Blocker::Crate {
                    corner: CollisionEngine::nearest_corner(probe, &c.rect),
                    hit,
                }
            })
        })
    }

    /// Position to commit this tick given the detected obstacle
    pub fn resolve_destination(&self, blocker: Option<Blocker>, world_width: f32, world_height: f32) -> Vec2 {
        match blocker {
            Some(Blocker::Player) => self.position - self.velocity / PLAYER_PUSHBACK_DIVISOR,
            Some(Blocker::Crate { corner: Corner::TopLeft, .. }) => {
                self.position - Vec2::splat(CRATE_NUDGE)
            }
            Some(Blocker::Crate { corner: Corner::BottomRight, .. }) => {
                self.position + Vec2::splat(CRATE_NUDGE)
            }
            None => {
                let mut dest = self.candidate_destination();
                let tolerance = self.radius;
                if CollisionEngine::point_near_world_border(dest, tolerance, world_width, world_height) {
                    if dest.x < tolerance || dest.x > world_width - tolerance {
                        dest.x = self.position.x - self.velocity.x;
                    }
                    if dest.y < tolerance || dest.y > world_height - tolerance {
                        dest.y = self.position.y - self.velocity.y;
                    }
                }
                dest
            }
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            player_id: self.id,
            x: self.position.x,
            y: self.position.y,
            facing_x: self.facing.x,
            facing_y: self.facing.y,
            color: self.color.clone(),
            radius: self.radius,
            hp: self.hp,
            max_hp: self.max_hp,
            ammo: self.weapon.remaining(),
            ammo_capacity: self.weapon.capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::collision::Side;
    use uuid::Uuid;

    const VIEWPORT: Vec2 = Vec2::new(1000.0, 800.0);

    fn player_at(x: f32, y: f32) -> Player {
        Player::new(Uuid::new_v4(), Vec2::new(x, y), "rgb(1, 2, 3)".to_string(), VIEWPORT)
    }

    #[test]
    fn movement_intent_sets_velocity_and_reveals() {
        let mut p = player_at(500.0, 500.0);
        p.hidden = true;
        p.apply_movement_intent(1.0, 0.0);
        assert!(!p.hidden);
        assert_eq!(p.velocity, Vec2::new(8.0, 0.0));

        p.apply_movement_intent(0.0, 0.0);
        assert_eq!(p.velocity, Vec2::ZERO);
    }

    #[test]
    fn cursor_is_relative_to_viewport_centre() {
        let mut p = player_at(1200.0, 300.0);
        p.apply_cursor_direction(600.0, 400.0);
        assert_eq!(p.facing, Vec2::new(1.0, 0.0));
        assert_eq!(p.hand, Vec2::new(1230.0, 300.0));
        assert_eq!(p.cursor_target(), Vec2::new(1300.0, 300.0));
    }

    #[test]
    fn heal_respects_caps() {
        let mut p = player_at(0.0, 0.0);
        p.hp = 98.0;
        p.heal(5.0, false);
        assert_eq!(p.hp, 100.0);
        p.heal(50.0, true);
        assert_eq!(p.hp, OVERLOAD_HP_CAP);
    }

    #[test]
    fn ammo_pickup_refills_deficit_up_to_ten() {
        let mut p = player_at(0.0, 0.0);
        assert!(!p.apply_buff(BuffKind::Ammo), "unarmed players cannot use ammo");

        p.upgrade_weapon(WeaponKind::Pistol);
        assert!(p.apply_buff(BuffKind::Ammo));
        assert_eq!(p.weapon.remaining(), 30);
        p.weapon.reload(7);
        assert!(p.apply_buff(BuffKind::Ammo));
        assert_eq!(p.weapon.remaining(), 40);
        assert!(!p.apply_buff(BuffKind::Ammo));
    }

    #[test]
    fn gun_pickups_only_upgrade() {
        let mut p = player_at(0.0, 0.0);
        assert!(!p.apply_buff(BuffKind::Scope));
        assert!(p.apply_buff(BuffKind::SmallGun));
        assert_eq!(p.weapon.kind(), WeaponKind::Pistol);
        assert!(!p.apply_buff(BuffKind::SmallGun));
        p.weapon.reload(15);
        assert_eq!(p.weapon.remaining(), 35);

        // Old ammo is dropped with the old gun
        assert!(p.apply_buff(BuffKind::BigGun));
        assert_eq!(p.weapon.kind(), WeaponKind::BurstRifle);
        assert_eq!(p.weapon.remaining(), 50);
        assert_eq!(p.weapon.capacity(), 200);
        assert!(!p.apply_buff(BuffKind::SmallGun));
        assert!(!p.apply_buff(BuffKind::BigGun));
        assert!(p.apply_buff(BuffKind::Scope));
        assert!(p.using_scope);
    }

    #[test]
    fn speed_boost_applies_to_current_direction() {
        let mut p = player_at(0.0, 0.0);
        p.apply_movement_intent(0.0, -1.0);
        assert!(p.apply_buff(BuffKind::SpeedBoost));
        assert_eq!(p.velocity, Vec2::new(0.0, -BOOSTED_SPEED));
    }

    #[test]
    fn dead_players_do_not_fire() {
        let mut p = player_at(500.0, 500.0);
        p.upgrade_weapon(WeaponKind::Pistol);
        p.take_damage(200.0);
        let mut shots = Vec::new();
        assert!(!p.fire(Vec2::new(600.0, 400.0), 0, &mut shots));
        assert!(shots.is_empty());
        assert_eq!(p.weapon.remaining(), 20);
    }

    #[test]
    fn players_block_each_other() {
        let mut p = player_at(500.0, 500.0);
        p.apply_movement_intent(1.0, 0.0);
        let other = player_at(555.0, 510.0);
        let probe = p.probe();
        let others = vec![p.clone(), other];
        assert_eq!(p.detect_blocker(probe, &others, &[]), Some(Blocker::Player));
        assert_eq!(
            p.resolve_destination(Some(Blocker::Player), 2000.0, 2000.0),
            Vec2::new(499.2, 500.0)
        );
    }

    #[test]
    fn crate_contact_nudges_away_from_corner() {
        let mut p = player_at(175.0, 300.0);
        p.apply_movement_intent(1.0, 0.0);
        let crates = vec![Crate::new(ActorId(1), Vec2::new(200.0, 200.0))];
        let probe = p.probe();
        let blocker = p.detect_blocker(probe, std::iter::empty(), &crates);
        match blocker {
            Some(Blocker::Crate { corner, hit }) => {
                assert_eq!(corner, Corner::TopLeft);
                assert_eq!(hit.side, Side::Left);
            }
            other => panic!("expected crate contact, got {other:?}"),
        }
        assert_eq!(
            p.resolve_destination(blocker, 2000.0, 2000.0),
            Vec2::new(170.0, 295.0)
        );
    }

    #[test]
    fn world_border_reverts_offending_axis() {
        let mut p = player_at(35.0, 500.0);
        p.apply_movement_intent(-1.0, 0.0);
        let dest = p.resolve_destination(None, 2000.0, 2000.0);
        assert_eq!(dest, Vec2::new(43.0, 500.0));

        let mut q = player_at(500.0, 500.0);
        q.apply_movement_intent(1.0, 0.0);
        assert_eq!(q.resolve_destination(None, 2000.0, 2000.0), Vec2::new(508.0, 500.0));
    }
}
