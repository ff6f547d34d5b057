//! Per-match player record.

use apollo_protocol::{Color, EntityId, PlayerId, PlayerState, PlayerView};

/// A player's standing in one game: score, committed color, and current
/// selection.
///
/// `color` is [`Color::None`] exactly when `selected` is empty; every
/// method here keeps that true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePlayerInfo {
    pub player_id: PlayerId,
    pub state: PlayerState,
    pub name: String,
    pub score: u32,
    color: Color,
    selected: Vec<EntityId>,
}

impl GamePlayerInfo {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            state: PlayerState::Added,
            name: format!("Player {}", player_id.0),
            score: 0,
            color: Color::None,
            selected: Vec::new(),
        }
    }

    /// The color the player is committed to.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Selected entities, oldest first.
    pub fn selected(&self) -> &[EntityId] {
        &self.selected
    }

    /// Whether an entity of `color` may join the selection.
    pub fn accepts(&self, color: Color) -> bool {
        self.color.is_none() || self.color == color
    }

    /// Adds an entity to the selection and commits to its color.
    pub fn select(&mut self, entity: EntityId, color: Color) {
        debug_assert!(self.accepts(color));
        self.color = color;
        if !self.selected.contains(&entity) {
            self.selected.push(entity);
        }
    }

    /// Drops an entity from the selection. Returns whether it was there.
    pub fn deselect(&mut self, entity: EntityId) -> bool {
        let before = self.selected.len();
        self.selected.retain(|&id| id != entity);
        if self.selected.is_empty() {
            self.color = Color::None;
        }
        self.selected.len() != before
    }

    /// Empties the selection, returning what it held.
    pub fn clear_selection(&mut self) -> Vec<EntityId> {
        self.color = Color::None;
        std::mem::take(&mut self.selected)
    }

    /// Credits a completed match of `matched` entities: one point per
    /// entity beyond the first.
    pub fn credit(&mut self, matched: usize) {
        let points = u32::try_from(matched.saturating_sub(1)).unwrap_or(u32::MAX);
        self.score = self.score.saturating_add(points);
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.player_id,
            state: self.state,
            name: self.name.clone(),
            score: self.score,
        }
    }
}
