//! Inbound and outbound message envelopes.
//!
//! Field names are the short capitalized keys the browser client speaks
//! (`ReqId`, `Act`, `GU`, `Ps`, `Es`, ...). Rust-side names stay
//! descriptive; `#[serde(rename)]` maps between the two.
//!
//! ```text
//! client → server   { "ReqId": "7", "Act": { "W": null, "G": { "C": 0, "E": 12 } } }
//! server → client   { "GU": true, "Ps": [ ... ], "Es": [ ... ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::{Color, EntityId, EntityKind, EntityState, GameCommand, PlayerId, PlayerState};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// One message from a client. Exactly one per transport frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageIn {
    /// Client-chosen request id, echoed in logs.
    #[serde(rename = "ReqId", default)]
    pub req_id: String,

    /// The action carried by this message, if any.
    #[serde(rename = "Act", default)]
    pub act: Option<ActionIn>,
}

/// The action part of an inbound message. Either half may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionIn {
    /// World-scoped action.
    #[serde(rename = "W", default)]
    pub world: Option<WorldActionIn>,

    /// Game-scoped action.
    #[serde(rename = "G", default)]
    pub game: Option<GameActionIn>,
}

/// A world-scoped action. Reserved; no fields are defined yet and any
/// fields a client sends are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldActionIn {}

/// A game-scoped action: a command applied to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameActionIn {
    #[serde(rename = "C")]
    pub command: GameCommand,

    #[serde(rename = "E")]
    pub entity: EntityId,
}

// ---------------------------------------------------------------------------
// Outbound projections
// ---------------------------------------------------------------------------

/// Board dimensions and player capacity, sent once in the initial sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTypeView {
    #[serde(rename = "R")]
    pub rows: u32,
    #[serde(rename = "C")]
    pub cols: u32,
    #[serde(rename = "P")]
    pub players: u32,
}

/// What clients see of a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    #[serde(rename = "Id")]
    pub id: PlayerId,
    #[serde(rename = "St")]
    pub state: PlayerState,
    #[serde(rename = "N")]
    pub name: String,
    #[serde(rename = "Sc")]
    pub score: u32,
}

/// What clients see of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    #[serde(rename = "Id")]
    pub id: EntityId,
    #[serde(rename = "T")]
    pub kind: EntityKind,
    #[serde(rename = "St")]
    pub state: EntityState,
    #[serde(rename = "X")]
    pub x: i32,
    #[serde(rename = "Y")]
    pub y: i32,
    #[serde(rename = "W")]
    pub width: i32,
    #[serde(rename = "H")]
    pub height: i32,
    #[serde(rename = "C")]
    pub color: Color,
    /// Time to live, in milliseconds.
    #[serde(rename = "Ttl")]
    pub ttl_ms: i64,
    /// Creation time, unix seconds.
    #[serde(rename = "CAt")]
    pub created_at: i64,
    /// Last update time, unix seconds.
    #[serde(rename = "UAt")]
    pub updated_at: i64,
}

// ---------------------------------------------------------------------------
// GameUpdate
// ---------------------------------------------------------------------------

/// The one outbound message type: a full or partial view of a game.
///
/// Clients apply both lists as upserts keyed by `Id`, so the same type
/// serves the initial sync (everything) and per-tick deltas (only what
/// changed). Items are placed with append-or-overwrite-by-index, which lets
/// a handler fold several changes to one object into a single slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdate {
    /// Always `true`; tells the client which message this is.
    #[serde(rename = "GU")]
    pub game_update: bool,

    #[serde(rename = "Gt", default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<GameTypeView>,

    #[serde(rename = "Ps", default)]
    pub players: Vec<PlayerView>,

    #[serde(rename = "Es", default)]
    pub entities: Vec<EntityView>,
}

impl GameUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self {
            game_update: true,
            game_type: None,
            players: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Attaches the game-type descriptor.
    pub fn set_game_type(&mut self, game_type: GameTypeView) {
        self.game_type = Some(game_type);
    }

    /// Places a player view at `index` if that slot exists, otherwise
    /// appends it. Returns the slot used.
    pub fn put_player(&mut self, view: PlayerView, index: Option<usize>) -> usize {
        put(&mut self.players, view, index)
    }

    /// Places an entity view at `index` if that slot exists, otherwise
    /// appends it. Returns the slot used.
    pub fn put_entity(&mut self, view: EntityView, index: Option<usize>) -> usize {
        put(&mut self.entities, view, index)
    }

    /// Appends every player view.
    pub fn extend_players(&mut self, views: impl IntoIterator<Item = PlayerView>) {
        self.players.extend(views);
    }

    /// Appends every entity view.
    pub fn extend_entities(&mut self, views: impl IntoIterator<Item = EntityView>) {
        self.entities.extend(views);
    }

    /// `true` when the update carries nothing worth sending.
    pub fn is_empty(&self) -> bool {
        self.game_type.is_none() && self.players.is_empty() && self.entities.is_empty()
    }
}

impl Default for GameUpdate {
    fn default() -> Self {
        Self::new()
    }
}

fn put<T>(items: &mut Vec<T>, item: T, index: Option<usize>) -> usize {
    match index {
        Some(i) if i < items.len() => {
            items[i] = item;
            i
        }
        _ => {
            items.push(item);
            items.len() - 1
        }
    }
}
