//! Identifier newtypes and the integer-coded enums that appear on the wire.
//!
//! The browser client matches on small integers (`St`, `T`, `C`), so every
//! enum here serializes as a plain `i32` through `TryFrom<i32>` /
//! `Into<i32>`. An integer the server does not know is a decode error
//! rather than a silently defaulted value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::UnknownCode;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected player.
///
/// Newtype over `u64` so a `PlayerId` can't be passed where an `EntityId`
/// is expected. `#[serde(transparent)]` keeps it a bare number on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

/// Identifier of an entity on a board. Assigned monotonically per game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Integer-coded enums
// ---------------------------------------------------------------------------

/// Declares an enum whose wire form is a fixed `i32` code per variant.
macro_rules! wire_code {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i32", into = "i32")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> i32 {
                match value {
                    $( $name::$variant => $code, )+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = UnknownCode;

            fn try_from(code: i32) -> Result<Self, UnknownCode> {
                match code {
                    $( $code => Ok($name::$variant), )+
                    _ => Err(UnknownCode { kind: $kind, code }),
                }
            }
        }
    };
}

wire_code! {
    /// Lifecycle of an entity: `Added → Present → Selected → Removed`.
    ///
    /// `Selected` can fall back to `Present`; `Removed` is terminal.
    EntityState ("entity state") {
        /// Just spawned, not yet settled.
        Added = 0,
        /// On the board, unowned.
        Present = 1,
        /// Held by a player.
        Selected = 2,
        /// Gone from the board.
        Removed = 3,
    }
}

wire_code! {
    /// The kind of an entity. Blocks are the only kind today.
    EntityKind ("entity kind") {
        Block = 0,
    }
}

wire_code! {
    /// Entity color, or the absence of one.
    ///
    /// `None` is what a player is committed to before selecting anything.
    Color ("color") {
        None = -1,
        Red = 0,
        Blue = 1,
        Green = 2,
        Gray = 3,
        Orange = 4,
    }
}

impl Color {
    /// The colors entities are spawned with.
    pub const PALETTE: [Color; 5] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Gray,
        Color::Orange,
    ];

    /// Returns `true` for [`Color::None`].
    pub fn is_none(self) -> bool {
        self == Color::None
    }
}

wire_code! {
    /// Lifecycle of a player within one game, as reported to clients.
    PlayerState ("player state") {
        /// First announcement after joining.
        Added = 0,
        /// Steady state.
        Present = 1,
        /// Score, color or selection changed in this update.
        Updated = 2,
        /// Left the game.
        Removed = 3,
    }
}

wire_code! {
    /// Game-scoped command codes sent by clients in `Act.G.C`.
    GameCommand ("game command") {
        /// Toggle selection of the entity in `Act.G.E`.
        SelectEntity = 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&EntityId(7)).unwrap(), "7");
        let gid: GameId = serde_json::from_str("3").unwrap();
        assert_eq!(gid, GameId(3));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
        assert_eq!(GameId(2).to_string(), "G-2");
        assert_eq!(EntityId(9).to_string(), "E-9");
    }

    #[test]
    fn test_enums_serialize_as_codes() {
        assert_eq!(serde_json::to_string(&EntityState::Selected).unwrap(), "2");
        assert_eq!(serde_json::to_string(&Color::None).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Color::Orange).unwrap(), "4");
        assert_eq!(serde_json::to_string(&PlayerState::Removed).unwrap(), "3");
        assert_eq!(serde_json::to_string(&EntityKind::Block).unwrap(), "0");
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        let err = Color::try_from(9).unwrap_err();
        assert_eq!(err.to_string(), "unknown color code 9");
        assert!(serde_json::from_str::<GameCommand>("5").is_err());
        assert!(serde_json::from_str::<EntityState>("-1").is_err());
    }

    #[test]
    fn test_palette_excludes_none() {
        assert_eq!(Color::PALETTE.len(), 5);
        assert!(Color::PALETTE.iter().all(|c| !c.is_none()));
    }
}
