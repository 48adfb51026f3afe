//! Stage - the authoritative world of one match.
//!
//! Owns every actor collection, generates the world, runs one simulation
//! tick at a time and detects the win condition. All randomness comes from a
//! per-match seeded RNG so a stage can be replayed from its seed.

use std::collections::HashSet;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::protocol::{InitialState, PlayerStatus, UpdatedState};

use super::actor::{Actor, ActorId, ActorRef, PlayerId};
use super::bullet::Bullet;
use super::collision::CollisionEngine;
use super::environment::{BuffKind, Crate, Environment, BUFF_RADIUS, BUSH_RADIUS, CRATE_SIZE};
use super::geometry::Vec2;
use super::player::{Player, PLAYER_RADIUS};
use super::weapon::Shot;
use super::PlayerStatusSink;

/// Random spawn retries before falling back to a grid scan
const PLAYER_SPAWN_ATTEMPTS: u32 = 3;
/// Placement attempts per generated item
const ITEM_ATTEMPTS: u32 = 5;
/// Generated items are placed with their origin inside [0, size - margin]
const ITEM_PLACEMENT_MARGIN: f32 = 250.0;
/// Crates must keep a player-sized gap from the world border
const CRATE_BORDER_TOLERANCE: f32 = CRATE_SIZE + PLAYER_RADIUS;

/// World size and content counts for a new stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageSettings {
    pub width: f32,
    pub height: f32,
    pub num_crates: usize,
    pub num_bushes: usize,
    pub num_ammo: usize,
    pub num_hp_pots: usize,
    pub num_speed_boost: usize,
    pub num_scope: usize,
    pub num_small_gun: usize,
    pub num_big_gun: usize,
    /// Viewport assumed for players until their client reports one
    pub viewport: Vec2,
}

impl StageSettings {
    /// A world with no crates, bushes or pickups
    pub fn empty(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            num_crates: 0,
            num_bushes: 0,
            num_ammo: 0,
            num_hp_pots: 0,
            num_speed_boost: 0,
            num_scope: 0,
            num_small_gun: 0,
            num_big_gun: 0,
            viewport: Vec2::new(1920.0, 1080.0),
        }
    }
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            num_crates: 6,
            num_bushes: 8,
            num_ammo: 10,
            num_hp_pots: 8,
            num_speed_boost: 4,
            num_scope: 4,
            num_small_gun: 6,
            num_big_gun: 3,
            ..Self::empty(2500.0, 2500.0)
        }
    }
}

/// Why a player left the stage before dying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Left the match but stays in the lobby
    Quit,
    Disconnect,
}

pub struct Stage {
    id: Uuid,
    width: f32,
    height: f32,
    players: Vec<Player>,
    bullets: Vec<Bullet>,
    crates: Vec<Crate>,
    environment: Vec<Environment>,
    num_players: usize,
    num_alive: usize,
    has_ended: bool,
    winner: Option<PlayerId>,
    start_time_ms: u64,
    elapsed_secs: u64,
    next_actor_id: u64,
    rng: ChaCha8Rng,
    status: Arc<dyn PlayerStatusSink>,
}

impl Stage {
    /// Build a stage and generate its world: players first, then crates,
    /// bushes and buffs
    pub fn new(
        id: Uuid,
        roster: &[PlayerId],
        settings: &StageSettings,
        seed: u64,
        started_at_ms: u64,
        status: Arc<dyn PlayerStatusSink>,
    ) -> Self {
        let mut stage = Self {
            id,
            width: settings.width,
            height: settings.height,
            players: Vec::with_capacity(roster.len()),
            bullets: Vec::new(),
            crates: Vec::with_capacity(settings.num_crates),
            environment: Vec::new(),
            num_players: roster.len(),
            num_alive: roster.len(),
            has_ended: false,
            winner: None,
            start_time_ms: started_at_ms,
            elapsed_secs: 0,
            next_actor_id: 1,
            rng: ChaCha8Rng::seed_from_u64(seed),
            status,
        };

        for &player_id in roster {
            let position = stage.spawn_position();
            let color = stage.random_color();
            stage
                .players
                .push(Player::new(player_id, position, color, settings.viewport));
        }

        let crates = stage.generate_crates(settings.num_crates);
        let bushes = stage.generate_bushes(settings.num_bushes);
        let buffs = stage.generate_buffs(settings);

        info!(
            match_id = %id,
            players = stage.players.len(),
            crates,
            bushes,
            buffs,
            "Stage generated"
        );
        stage
    }

    // ---- accessors ----

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn crates(&self) -> &[Crate] {
        &self.crates
    }

    pub fn environment(&self) -> &[Environment] {
        &self.environment
    }

    pub fn num_players(&self) -> usize {
        self.num_players
    }

    pub fn num_alive(&self) -> usize {
        self.num_alive
    }

    pub fn has_ended(&self) -> bool {
        self.has_ended
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn start_time_ms(&self) -> u64 {
        self.start_time_ms
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Reserve an identity for a new non-player actor
    pub fn allocate_id(&mut self) -> ActorId {
        let id = ActorId(self.next_actor_id);
        self.next_actor_id += 1;
        id
    }

    // ---- actor collections ----

    pub fn add_actor(&mut self, actor: Actor) -> ActorRef {
        let actor_ref = actor.actor_ref();
        match actor {
            Actor::Player(p) => self.players.push(p),
            Actor::Bullet(b) => self.bullets.push(b),
            Actor::Crate(c) => self.crates.push(c),
            Actor::Environment(e) => self.environment.push(e),
        }
        actor_ref
    }

    /// Remove an actor by identity. Order of the remaining actors is kept.
    pub fn remove_actor(&mut self, actor: ActorRef) -> Option<Actor> {
        match actor {
            ActorRef::Player(id) => {
                let idx = self.players.iter().position(|p| p.id == id)?;
                Some(Actor::Player(self.players.remove(idx)))
            }
            ActorRef::Bullet(id) => {
                let idx = self.bullets.iter().position(|b| b.id == id)?;
                Some(Actor::Bullet(self.bullets.remove(idx)))
            }
            ActorRef::Crate(id) => {
                let idx = self.crates.iter().position(|c| c.id == id)?;
                Some(Actor::Crate(self.crates.remove(idx)))
            }
            ActorRef::Environment(id) => {
                let idx = self.environment.iter().position(|e| e.id() == id)?;
                Some(Actor::Environment(self.environment.remove(idx)))
            }
        }
    }

    // ---- player input ----

    pub fn apply_movement(&mut self, player_id: PlayerId, dx: f32, dy: f32) -> bool {
        let Some(idx) = self.player_index(player_id) else {
            return false;
        };
        self.players[idx].apply_movement_intent(dx, dy);
        true
    }

    pub fn apply_cursor(&mut self, player_id: PlayerId, cursor_x: f32, cursor_y: f32) -> bool {
        let Some(idx) = self.player_index(player_id) else {
            return false;
        };
        self.players[idx].apply_cursor_direction(cursor_x, cursor_y);
        self.refresh_sight_line(idx);
        true
    }

    pub fn set_viewport(&mut self, player_id: PlayerId, width: f32, height: f32) -> bool {
        let Some(idx) = self.player_index(player_id) else {
            return false;
        };
        if !(width > 0.0 && height > 0.0) {
            return false;
        }
        self.players[idx].viewport = Vec2::new(width, height);
        self.refresh_sight_line(idx);
        true
    }

    /// Fire the player's weapon towards a viewport cursor position.
    /// Returns whether a shot was taken.
    pub fn fire(&mut self, player_id: PlayerId, cursor_x: f32, cursor_y: f32, now_ms: u64) -> bool {
        let Some(idx) = self.player_index(player_id) else {
            return false;
        };
        let mut shots = Vec::new();
        let fired = self.players[idx].fire(Vec2::new(cursor_x, cursor_y), now_ms, &mut shots);
        self.spawn_bullets(shots);
        fired
    }

    /// Remove a player who left or disconnected. Returns `None` for an
    /// unknown player.
    pub fn remove_player(&mut self, player_id: PlayerId, reason: RemovalReason) -> Option<Player> {
        let idx = self.player_index(player_id)?;
        let player = self.players.remove(idx);
        if let Some(line) = player.sight_line {
            self.remove_actor(ActorRef::Environment(line));
        }
        self.num_alive = self.num_alive.saturating_sub(1);

        if reason == RemovalReason::Quit {
            self.status.set_player_status(player_id, PlayerStatus::InLobby);
        }
        info!(match_id = %self.id, player_id = %player_id, ?reason, "Player removed from stage");

        self.check_win_condition();
        Some(player)
    }

    // ---- simulation ----

    /// Advance the whole stage by one tick using `now_ms` as the single time
    /// source for weapon timing. A decided match is frozen.
    pub fn advance(&mut self, now_ms: u64) {
        if self.has_ended {
            return;
        }
        self.fire_pending_bursts(now_ms);
        self.advance_players();
        self.advance_bullets();
        self.sweep_dead_players();
        self.check_win_condition();
        self.elapsed_secs = now_ms.saturating_sub(self.start_time_ms) / 1000;
    }

    fn fire_pending_bursts(&mut self, now_ms: u64) {
        let mut shots = Vec::new();
        for player in self.players.iter_mut().filter(|p| !p.is_dead()) {
            player.weapon.fire_due(now_ms, player.position, &mut shots);
        }
        self.spawn_bullets(shots);
    }

    fn advance_players(&mut self) {
        for idx in 0..self.players.len() {
            if self.players[idx].is_dead() {
                continue;
            }
            self.refresh_sight_line(idx);

            let probe = self.players[idx].probe();
            self.collect_pickups(idx, probe);

            let player = &self.players[idx];
            let blocker = player.detect_blocker(probe, &self.players, &self.crates);
            let destination = player.resolve_destination(blocker, self.width, self.height);

            let player = &mut self.players[idx];
            player.position = destination;
            player.hand = destination + player.facing * player.radius;
        }
    }

    /// Apply every bush and buff within reach of `probe`. Consumed buffs are
    /// gone before the next player is processed.
    fn collect_pickups(&mut self, idx: usize, probe: Vec2) {
        let player = &mut self.players[idx];
        let mut consumed = Vec::new();

        for env in &self.environment {
            if !env.reaches(probe, player.radius) {
                continue;
            }
            match env {
                Environment::Bush { .. } => player.hidden = true,
                Environment::Buff { id, kind, .. } => {
                    if player.apply_buff(*kind) {
                        debug!(player_id = %player.id, ?kind, "Buff collected");
                        consumed.push(*id);
                    }
                }
                Environment::SightLine { .. } => {}
            }
        }

        if !consumed.is_empty() {
            self.environment.retain(|e| !consumed.contains(&e.id()));
        }
        if self.players[idx].using_scope {
            self.refresh_sight_line(idx);
        }
    }

    fn advance_bullets(&mut self) {
        let mut spent = HashSet::new();

        for bullet in &mut self.bullets {
            bullet.step();

            if CollisionEngine::point_outside_world(bullet.position, self.width, self.height) {
                spent.insert(bullet.id);
                continue;
            }

            let target = self.players.iter_mut().find(|p| {
                p.id != bullet.owner
                    && !p.is_dead()
                    && CollisionEngine::circles_overlap(
                        bullet.position,
                        bullet.radius,
                        p.position,
                        p.radius,
                    )
            });
            if let Some(target) = target {
                target.take_damage(bullet.damage);
                spent.insert(bullet.id);
                continue;
            }

            // Range runs out after the hit test: the last step still lands
            if bullet.out_of_range() {
                spent.insert(bullet.id);
                continue;
            }

            if self
                .crates
                .iter()
                .any(|c| CollisionEngine::circle_intersects_rect(bullet.position, bullet.radius, &c.rect))
            {
                spent.insert(bullet.id);
            }
        }

        if !spent.is_empty() {
            self.bullets.retain(|b| !spent.contains(&b.id));
        }
    }

    /// Remove players who died this tick, keeping survivors in order
    fn sweep_dead_players(&mut self) {
        let mut fallen = Vec::new();
        self.players.retain(|p| {
            if p.is_dead() {
                fallen.push((p.id, p.sight_line));
                false
            } else {
                true
            }
        });

        for (player_id, line) in fallen {
            if let Some(line) = line {
                self.remove_actor(ActorRef::Environment(line));
            }
            self.num_alive = self.num_alive.saturating_sub(1);
            self.status.set_player_status(player_id, PlayerStatus::Spectating);
            info!(match_id = %self.id, player_id = %player_id, alive = self.num_alive, "Player eliminated");
        }
    }

    fn check_win_condition(&mut self) {
        if self.has_ended || self.num_alive > 1 {
            return;
        }
        self.has_ended = true;
        self.winner = self.players.first().map(|p| p.id);

        if let Some(winner) = self.winner {
            self.status.set_player_status(winner, PlayerStatus::Winner);
        }
        info!(match_id = %self.id, winner = ?self.winner, "Match decided");
    }

    fn spawn_bullets(&mut self, shots: Vec<Shot>) {
        for shot in shots {
            let id = self.allocate_id();
            self.bullets.push(Bullet::from_shot(id, shot));
        }
    }

    /// Keep the player's sight line in the environment in step with their
    /// scope and aim
    fn refresh_sight_line(&mut self, idx: usize) {
        let geometry = self.players[idx].sight_line_geometry();
        let existing = self.players[idx].sight_line;

        match (existing, geometry) {
            (Some(id), Some(line)) => {
                let slot = self.environment.iter_mut().find(|e| e.id() == id);
                match slot {
                    Some(Environment::SightLine { line: current, .. }) => *current = line,
                    _ => {
                        let id = self.allocate_id();
                        self.environment.push(Environment::SightLine { id, line });
                        self.players[idx].sight_line = Some(id);
                    }
                }
            }
            (None, Some(line)) => {
                let id = self.allocate_id();
                self.environment.push(Environment::SightLine { id, line });
                self.players[idx].sight_line = Some(id);
            }
            (Some(id), None) => {
                self.remove_actor(ActorRef::Environment(id));
                self.players[idx].sight_line = None;
            }
            (None, None) => {}
        }
    }

    fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    // ---- snapshots ----

    pub fn initial_state(&self) -> InitialState {
        InitialState {
            width: self.width,
            height: self.height,
            players: self.players.iter().map(Player::snapshot).collect(),
            bullets: self.bullets.iter().map(Bullet::snapshot).collect(),
            crates: self.crates.iter().map(Crate::snapshot).collect(),
            environment: self.environment.iter().map(Environment::snapshot).collect(),
            game_start_time: self.start_time_ms,
            num_alive: self.num_alive,
            num_players: self.num_players,
        }
    }

    pub fn updated_state(&self) -> UpdatedState {
        UpdatedState {
            players: self.players.iter().map(Player::snapshot).collect(),
            bullets: self.bullets.iter().map(Bullet::snapshot).collect(),
            environment: self.environment.iter().map(Environment::snapshot).collect(),
            num_alive: self.num_alive,
            has_ended: self.has_ended,
            elapsed_secs: self.elapsed_secs,
        }
    }

    // ---- world generation ----

    /// Whether a new body at `position` would come within `clearance` of
    /// anything already placed
    fn generation_collides(&self, position: Vec2, clearance: f32) -> bool {
        let hits_player = self
            .players
            .iter()
            .any(|p| position.distance(p.position) < p.radius + clearance);
        let hits_crate = self
            .crates
            .iter()
            .any(|c| position.distance(c.rect.center()) < c.rect.width + clearance);
        let hits_env = self
            .environment
            .iter()
            .filter_map(Environment::body)
            .any(|body| position.distance(body.position) < body.radius + clearance);

        hits_player || hits_crate || hits_env
    }

    /// Near the world centre, jittered by up to a quarter of the world size
    fn random_spawn_point(&mut self) -> Vec2 {
        let (w, h) = (self.width, self.height);
        let x = w / 2.0 - self.rand_coord(w / 4.0) + self.rand_coord(w / 4.0);
        let y = h / 2.0 - self.rand_coord(h / 4.0) + self.rand_coord(h / 4.0);
        Vec2::new(x, y)
    }

    fn spawn_position(&mut self) -> Vec2 {
        let clearance = PLAYER_RADIUS * 2.0;
        let mut spawn = self.random_spawn_point();
        let mut attempts = PLAYER_SPAWN_ATTEMPTS;
        while self.generation_collides(spawn, clearance) && attempts > 0 {
            spawn = self.random_spawn_point();
            attempts -= 1;
        }
        if !self.generation_collides(spawn, clearance) {
            return spawn;
        }

        match self.scan_for_spawn(clearance) {
            Some(found) => found,
            None => {
                warn!(match_id = %self.id, "No free spawn point, placing player on top of another");
                spawn
            }
        }
    }

    /// Deterministic fallback: walk a grid outwards from the world centre
    fn scan_for_spawn(&self, clearance: f32) -> Option<Vec2> {
        let center = Vec2::new(self.width / 2.0, self.height / 2.0);
        let step = clearance;
        let mut candidates = Vec::new();
        let mut y = PLAYER_RADIUS;
        while y <= self.height - PLAYER_RADIUS {
            let mut x = PLAYER_RADIUS;
            while x <= self.width - PLAYER_RADIUS {
                candidates.push(Vec2::new(x, y));
                x += step;
            }
            y += step;
        }
        candidates.sort_by(|a, b| a.distance_squared(center).total_cmp(&b.distance_squared(center)));
        candidates
            .into_iter()
            .find(|&c| !self.generation_collides(c, clearance))
    }

    /// Find a free spot for an item whose origin lies in
    /// [0, size - extent] and away from the border
    fn place_item(&mut self, extent: f32, border_tolerance: f32, clearance: f32) -> Option<Vec2> {
        for _ in 0..ITEM_ATTEMPTS {
            let position = Vec2::new(
                self.rand_coord(self.width - extent),
                self.rand_coord(self.height - extent),
            );
            if CollisionEngine::point_near_world_border(position, border_tolerance, self.width, self.height) {
                continue;
            }
            if !self.generation_collides(position, clearance) {
                return Some(position);
            }
        }
        None
    }

    fn generate_crates(&mut self, count: usize) -> usize {
        let mut placed = 0;
        for _ in 0..count {
            match self.place_item(CRATE_SIZE, CRATE_BORDER_TOLERANCE, CRATE_SIZE * 2.0) {
                Some(origin) => {
                    let id = self.allocate_id();
                    self.crates.push(Crate::new(id, origin));
                    placed += 1;
                }
                None => debug!(match_id = %self.id, "Crate omitted after {ITEM_ATTEMPTS} attempts"),
            }
        }
        placed
    }

    fn generate_bushes(&mut self, count: usize) -> usize {
        let mut placed = 0;
        for _ in 0..count {
            match self.place_item(ITEM_PLACEMENT_MARGIN, BUSH_RADIUS, BUSH_RADIUS * 2.0) {
                Some(position) => {
                    let id = self.allocate_id();
                    self.environment.push(Environment::bush(id, position));
                    placed += 1;
                }
                None => debug!(match_id = %self.id, "Bush omitted after {ITEM_ATTEMPTS} attempts"),
            }
        }
        placed
    }

    fn generate_buffs(&mut self, settings: &StageSettings) -> usize {
        let plan = [
            (BuffKind::Scope, settings.num_scope),
            (BuffKind::SpeedBoost, settings.num_speed_boost),
            (BuffKind::SmallGun, settings.num_small_gun),
            (BuffKind::BigGun, settings.num_big_gun),
            (BuffKind::Ammo, settings.num_ammo),
            (BuffKind::HealthPot, settings.num_hp_pots),
        ];

        let mut placed = 0;
        for (kind, count) in plan {
            for _ in 0..count {
                match self.place_item(ITEM_PLACEMENT_MARGIN, BUFF_RADIUS, BUFF_RADIUS) {
                    Some(position) => {
                        let id = self.allocate_id();
                        self.environment.push(Environment::buff(id, kind, position));
                        placed += 1;
                    }
                    None => debug!(match_id = %self.id, ?kind, "Buff omitted after {ITEM_ATTEMPTS} attempts"),
                }
            }
        }
        placed
    }

    /// Whole-number coordinate in [0, max]
    fn rand_coord(&mut self, max: f32) -> f32 {
        if max <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(0.0..=max).round()
    }

    fn random_color(&mut self) -> String {
        let r: u8 = self.rng.gen_range(0..255);
        let g: u8 = self.rng.gen_range(0..255);
        let b: u8 = self.rng.gen_range(0..255);
        format!("rgb({r}, {g}, {b})")
    }
}
