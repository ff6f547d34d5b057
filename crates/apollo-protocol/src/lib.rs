//! Wire protocol for Apollo.
//!
//! - **Types** ([`PlayerId`], [`EntityId`], [`Color`], ...): identifiers
//!   and the integer-coded enums clients match on.
//! - **Messages** ([`MessageIn`], [`GameUpdate`]): what travels in each
//!   direction, independent of how the server represents entities.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes ⇄ messages.
//! - **Errors** ([`ProtocolError`], [`UnknownCode`]).
//!
//! ```text
//! Transport (frames) → Protocol (MessageIn / GameUpdate) → Game actors
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{ProtocolError, UnknownCode};
pub use message::{
    ActionIn, EntityView, GameActionIn, GameTypeView, GameUpdate, MessageIn, PlayerView,
    WorldActionIn,
};
pub use types::{
    Color, EntityId, EntityKind, EntityState, GameCommand, GameId, PlayerId, PlayerState,
};
