use std::time::{Duration, SystemTime, UNIX_EPOCH};

use apollo_protocol::{Color, EntityId, EntityKind, EntityState, EntityView, PlayerId};

/// A positioned, colored, time-limited object on a board.
///
/// While the entity is on a board, `owner` is `Some` exactly when `state`
/// is [`EntityState::Selected`]. A removed entity keeps its last owner so
/// the game can credit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub state: EntityState,
    pub x: i32,
    pub y: i32,
    pub color: Color,
    pub ttl: Duration,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub owner: Option<PlayerId>,
}

impl Entity {
    /// A freshly spawned block in the `Added` state.
    pub fn block(id: EntityId, x: i32, y: i32, color: Color, ttl: Duration, now: SystemTime) -> Self {
        Self {
            id,
            kind: EntityKind::Block,
            state: EntityState::Added,
            x,
            y,
            color,
            ttl,
            created_at: now,
            updated_at: now,
            owner: None,
        }
    }

    /// Whether the entity's lifetime has run out at `now`.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now.duration_since(self.updated_at)
            .is_ok_and(|age| age >= self.ttl)
    }

    /// Whether the entity sits on `(x, y)`.
    pub fn occupies(&self, x: i32, y: i32) -> bool {
        self.x == x && self.y == y
    }

    /// Marks the entity selected by `owner`.
    pub fn select(&mut self, owner: PlayerId) {
        self.state = EntityState::Selected;
        self.owner = Some(owner);
    }

    /// Puts the entity back on the board unowned.
    pub fn release(&mut self) {
        self.state = EntityState::Present;
        self.owner = None;
    }

    /// The client-facing projection. Blocks always cover one cell.
    pub fn view(&self) -> EntityView {
        EntityView {
            id: self.id,
            kind: self.kind,
            state: self.state,
            x: self.x,
            y: self.y,
            width: 1,
            height: 1,
            color: self.color,
            ttl_ms: i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX),
            created_at: unix_secs(self.created_at),
            updated_at: unix_secs(self.updated_at),
        }
    }
}

fn unix_secs(at: SystemTime) -> i64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
