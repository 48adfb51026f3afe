//! Weapons - ammo pool, cooldown and burst timing, bullet spawning

use std::collections::VecDeque;

use super::actor::PlayerId;
use super::geometry::{direction, Vec2};

/// Weapon variants available in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponKind {
    /// Empty starting weapon, cannot fire
    Unarmed,
    /// Single shot, picked up from a small gun buff
    Pistol,
    /// Three-round burst, picked up from a big gun buff
    BurstRifle,
    /// Slow-cycling burst rifle carried by bots
    BotRifle,
}

/// Weapon stats per weapon kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponConfig {
    /// Ammo loaded when the weapon is created
    pub starting_ammo: u32,
    /// Maximum ammo the weapon can hold
    pub capacity: u32,
    /// Distance a bullet travels per tick
    pub bullet_speed: f32,
    /// Damage per hit
    pub bullet_damage: f32,
    /// Bullet hitbox radius
    pub bullet_radius: f32,
    /// Distance a bullet travels before it is removed
    pub range: f32,
    /// Minimum time between trigger pulls (ms)
    pub cooldown_ms: u64,
    /// Bullets fired per trigger pull
    pub burst_count: u32,
    /// Delay between bullets of one burst (ms)
    pub burst_delay_ms: u64,
}

impl WeaponConfig {
    pub fn for_kind(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::Unarmed => Self {
                starting_ammo: 0,
                capacity: 0,
                bullet_speed: 30.0,
                bullet_damage: 5.0,
                bullet_radius: 5.0,
                range: 400.0,
                cooldown_ms: 0,
                burst_count: 1,
                burst_delay_ms: 0,
            },
            WeaponKind::Pistol => Self {
                starting_ammo: 20,
                capacity: 40,
                bullet_speed: 40.0,
                bullet_damage: 15.0,
                bullet_radius: 4.0,
                range: 1600.0,
                cooldown_ms: 0,
                burst_count: 1,
                burst_delay_ms: 0,
            },
            WeaponKind::BurstRifle => Self {
                starting_ammo: 50,
                capacity: 200,
                bullet_speed: 45.0,
                bullet_damage: 6.0,
                bullet_radius: 3.0,
                range: 2000.0,
                cooldown_ms: 0,
                burst_count: 3,
                burst_delay_ms: 50,
            },
            WeaponKind::BotRifle => Self {
                starting_ammo: 60,
                capacity: 60,
                bullet_speed: 40.0,
                bullet_damage: 5.0,
                bullet_radius: 3.0,
                range: 1600.0,
                cooldown_ms: 2000,
                burst_count: 3,
                burst_delay_ms: 50,
            },
        }
    }
}

/// A bullet ready to be spawned into the stage
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub owner: PlayerId,
    pub position: Vec2,
    pub facing: Vec2,
    pub aim: Vec2,
    pub color: String,
    pub radius: f32,
    pub range: f32,
    pub speed: f32,
    pub damage: f32,
}

/// Remaining bullet of a burst, fired once `due_ms` is reached
#[derive(Debug, Clone)]
struct PendingShot {
    due_ms: u64,
    facing: Vec2,
    aim: Vec2,
    color: String,
}

/// Weapon held by exactly one player
#[derive(Debug, Clone)]
pub struct Weapon {
    kind: WeaponKind,
    config: WeaponConfig,
    owner: PlayerId,
    ammo: u32,
    last_fire_ms: Option<u64>,
    pending: VecDeque<PendingShot>,
}

impl Weapon {
    pub fn new(kind: WeaponKind, owner: PlayerId) -> Self {
        let config = WeaponConfig::for_kind(kind);
        Self {
            kind,
            config,
            owner,
            ammo: config.starting_ammo.min(config.capacity),
            last_fire_ms: None,
            pending: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> WeaponKind {
        self.kind
    }

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }

    pub fn remaining(&self) -> u32 {
        self.ammo
    }

    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    pub fn last_fire_ms(&self) -> Option<u64> {
        self.last_fire_ms
    }

    /// Bullets of the current burst still waiting to be fired
    pub fn pending_shots(&self) -> usize {
        self.pending.len()
    }

    /// Check if the weapon can fire at `now_ms` (ammo and cooldown)
    pub fn can_fire(&self, now_ms: u64) -> bool {
        if self.ammo == 0 {
            return false;
        }
        match self.last_fire_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.config.cooldown_ms,
            None => true,
        }
    }

    /// Pull the trigger.
    ///
    /// Returns false without touching any state when the weapon is empty or
    /// cooling down. On success the first bullet is pushed to `out` and the
    /// rest of the burst is queued behind it, `burst_delay_ms` apart.
    pub fn shoot(
        &mut self,
        now_ms: u64,
        position: Vec2,
        facing: Vec2,
        aim: Vec2,
        color: &str,
        out: &mut Vec<Shot>,
    ) -> bool {
        if !self.can_fire(now_ms) {
            return false;
        }

        let aim = direction(aim);
        self.last_fire_ms = Some(now_ms);
        out.push(self.spawn(position, facing, aim, color));

        if self.ammo > 0 {
            for n in 1..self.config.burst_count {
                self.schedule(PendingShot {
                    due_ms: now_ms + self.config.burst_delay_ms * u64::from(n),
                    facing,
                    aim,
                    color: color.to_string(),
                });
            }
        }
        true
    }

    /// Fire every queued burst bullet that is due by `now_ms` from `position`.
    /// The rest of the burst is dropped once the weapon runs dry.
    pub fn fire_due(&mut self, now_ms: u64, position: Vec2, out: &mut Vec<Shot>) {
        while self.pending.front().is_some_and(|shot| shot.due_ms <= now_ms) {
            if self.ammo == 0 {
                self.pending.clear();
                break;
            }
            if let Some(shot) = self.pending.pop_front() {
                out.push(self.spawn(position, shot.facing, shot.aim, &shot.color));
            }
        }
        if self.ammo == 0 {
            self.pending.clear();
        }
    }

    /// Queue a burst bullet, keeping the queue ordered by due time so
    /// overlapping bursts interleave
    fn schedule(&mut self, shot: PendingShot) {
        let idx = self.pending.partition_point(|p| p.due_ms <= shot.due_ms);
        self.pending.insert(idx, shot);
    }

    /// Add ammo, clamped to capacity
    pub fn reload(&mut self, amount: u32) {
        self.ammo = self.ammo.saturating_add(amount).min(self.config.capacity);
    }

    fn spawn(&mut self, position: Vec2, facing: Vec2, aim: Vec2, color: &str) -> Shot {
        self.ammo -= 1;
        Shot {
            owner: self.owner,
            position,
            facing,
            aim,
            color: color.to_string(),
            radius: self.config.bullet_radius,
            range: self.config.range,
            speed: self.config.bullet_speed,
            damage: self.config.bullet_damage,
        }
    }
}
