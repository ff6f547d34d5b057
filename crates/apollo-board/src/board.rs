use std::collections::HashMap;

use apollo_protocol::{EntityId, EntityState};
use rand::Rng;
use tracing::trace;

use crate::Entity;

/// The entities of one game, keyed by id, inside a rows × cols grid.
///
/// No two entities on a board share a cell. [`Board::add`] does not check
/// this itself; callers test [`Board::entity_at`] first.
#[derive(Debug, Clone)]
pub struct Board {
    rows: u32,
    cols: u32,
    entities: HashMap<EntityId, Entity>,
}

impl Board {
    /// Most cells allocated up front; bigger boards grow on demand.
    const PREALLOCATED_CELLS: usize = 1024;

    pub fn new(rows: u32, cols: u32) -> Self {
        let cells = (rows as usize).saturating_mul(cols as usize);
        Self {
            rows,
            cols,
            entities: HashMap::with_capacity(cells.min(Self::PREALLOCATED_CELLS)),
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Places an entity on the board, replacing any entity with the same id.
    pub fn add(&mut self, entity: Entity) {
        trace!(entity_id = %entity.id, x = entity.x, y = entity.y, "entity added");
        self.entities.insert(entity.id, entity);
    }

    /// Whether any entity occupies `(x, y)`. Linear in the entity count,
    /// which never exceeds the number of cells.
    pub fn entity_at(&self, x: i32, y: i32) -> bool {
        self.entities.values().any(|e| e.occupies(x, y))
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Takes an entity off the board, returning it in the `Removed` state.
    pub fn remove_by_id(&mut self, id: EntityId) -> Option<Entity> {
        let mut entity = self.entities.remove(&id)?;
        entity.state = EntityState::Removed;
        trace!(entity_id = %id, "entity removed");
        Some(entity)
    }

    /// A snapshot of every entity, ordered by id.
    pub fn all(&self) -> Vec<Entity> {
        let mut all: Vec<Entity> = self.entities.values().cloned().collect();
        all.sort_by_key(|e| e.id);
        all
    }

    /// An entity chosen uniformly at random, or `None` when the board is
    /// empty.
    pub fn get_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Entity> {
        if self.entities.is_empty() {
            return None;
        }
        let pick = rng.random_range(0..self.entities.len());
        self.entities.values().nth(pick)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }
}
