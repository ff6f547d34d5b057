use std::time::{Duration, SystemTime};

use apollo_protocol::{Color, EntityId, EntityState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::{Board, Entity};

/// Tuning for a [`Simulation`].
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Lifetime of every spawned entity.
    pub entity_ttl: Duration,
    /// Minimum time between two spawn attempts.
    pub spawn_interval: Duration,
    /// Exclusive upper bound on entities spawned per attempt.
    pub max_spawn_per_step: u32,
    /// Colors new entities are drawn from.
    pub palette: Vec<Color>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            entity_ttl: Duration::from_secs(7),
            spawn_interval: Duration::from_secs(1),
            max_spawn_per_step: 5,
            palette: Color::PALETTE.to_vec(),
        }
    }
}

/// Advances one board by one tick.
///
/// Holds only the id counter, the spawn clock, and a scratch buffer; the
/// board itself is passed in on every call. Randomness comes from `R` so
/// tests can seed it.
#[derive(Debug)]
pub struct Simulation<R: Rng = StdRng> {
    config: SimulationConfig,
    rng: R,
    next_id: u64,
    last_spawn: Option<SystemTime>,
    expired: Vec<EntityId>,
}

impl Simulation<StdRng> {
    /// A simulation seeded from the operating system.
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// A simulation whose every draw is reproducible from `seed`.
    pub fn seeded(config: SimulationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Simulation<R> {
    pub fn with_rng(config: SimulationConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            next_id: 0,
            last_spawn: None,
            expired: Vec::new(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs one tick at `now` and returns every entity that changed.
    ///
    /// 1. Entities added last tick settle to `Present` (not reported).
    /// 2. Expired entities are removed and reported as `Removed`.
    /// 3. Once per spawn interval, up to `max_spawn_per_step - 1` new
    ///    entities are placed on free cells and reported as `Added`.
    ///
    /// An empty result means nothing changed.
    pub fn step(&mut self, board: &mut Board, now: SystemTime) -> Vec<Entity> {
        let mut changed = Vec::new();

        for entity in board.iter_mut() {
            if entity.state == EntityState::Added {
                entity.state = EntityState::Present;
            }
        }

        self.expired.clear();
        self.expired
            .extend(board.iter().filter(|e| e.is_expired(now)).map(|e| e.id));
        for &id in &self.expired {
            if let Some(mut entity) = board.remove_by_id(id) {
                entity.updated_at = now;
                changed.push(entity);
            }
        }

        let due = self.last_spawn.is_none_or(|last| {
            now.duration_since(last)
                .is_ok_and(|since| since >= self.config.spawn_interval)
        });
        if due {
            self.spawn_batch(board, now, &mut changed);
            self.last_spawn = Some(now);
        }

        if !changed.is_empty() {
            trace!(
                changed = changed.len(),
                expired = self.expired.len(),
                "simulation step"
            );
        }
        changed
    }

    /// Places one entity at `(x, y)` unless the cell is taken.
    pub fn spawn(
        &mut self,
        board: &mut Board,
        x: i32,
        y: i32,
        color: Color,
        now: SystemTime,
    ) -> Option<Entity> {
        if board.entity_at(x, y) {
            return None;
        }
        let entity = Entity::block(
            EntityId(self.next_id),
            x,
            y,
            color,
            self.config.entity_ttl,
            now,
        );
        self.next_id += 1;
        board.add(entity.clone());
        Some(entity)
    }

    fn spawn_batch(&mut self, board: &mut Board, now: SystemTime, changed: &mut Vec<Entity>) {
        if self.config.max_spawn_per_step == 0
            || self.config.palette.is_empty()
            || board.rows() == 0
            || board.cols() == 0
        {
            return;
        }

        // Cells past i32::MAX cannot be addressed on the wire.
        let cols = i32::try_from(board.cols()).unwrap_or(i32::MAX);
        let rows = i32::try_from(board.rows()).unwrap_or(i32::MAX);

        let attempts = self.rng.random_range(0..self.config.max_spawn_per_step);
        for _ in 0..attempts {
            let x = self.rng.random_range(0..cols);
            let y = self.rng.random_range(0..rows);
            let color = self.config.palette[self.rng.random_range(0..self.config.palette.len())];
            match self.spawn(board, x, y, color, now) {
                Some(entity) => changed.push(entity),
                None => debug!(x, y, "spawn skipped, cell occupied"),
            }
        }
    }
}
