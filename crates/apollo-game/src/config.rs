//! Game, world, and player configuration.

use std::fmt;
use std::time::Duration;

use apollo_board::SimulationConfig;
use apollo_protocol::GameTypeView;

// ---------------------------------------------------------------------------
// GameType
// ---------------------------------------------------------------------------

/// Board size and player capacity of a kind of game.
///
/// Players are only ever placed in a game of the type they asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameType {
    pub rows: u32,
    pub cols: u32,
    /// Maximum members at once.
    pub players: u32,
}

impl GameType {
    /// Seven rows by five columns, five players. Sized for phones.
    pub const MOBILE_SMALL: GameType = GameType {
        rows: 7,
        cols: 5,
        players: 5,
    };

    /// The `Gt` descriptor sent in the initial sync.
    pub fn view(&self) -> GameTypeView {
        GameTypeView {
            rows: self.rows,
            cols: self.cols,
            players: self.players,
        }
    }
}

impl Default for GameType {
    fn default() -> Self {
        Self::MOBILE_SMALL
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}/{}", self.rows, self.cols, self.players)
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// Whether a game currently has a live board.
///
/// ```text
/// Stopped ──first join──▶ Running ──last leave──▶ Stopped
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GameState {
    /// No board or simulation allocated. Ticks are consumed and ignored.
    #[default]
    Stopped,
    /// Board live, simulation stepping every tick.
    Running,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Running => write!(f, "Running"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configs
// ---------------------------------------------------------------------------

/// Settings shared by every game the world starts.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Time between simulation steps.
    pub tick_period: Duration,
    /// Bound of the game actor's command inbox.
    pub inbox_capacity: usize,
    /// Spawn and expiry tuning.
    pub simulation: SimulationConfig,
    /// Fixed RNG seed for the simulation. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(250),
            inbox_capacity: 64,
            simulation: SimulationConfig::default(),
            seed: None,
        }
    }
}

/// Settings for the world actor.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Game type used when a player doesn't ask for one.
    pub default_game_type: GameType,
    /// Settings handed to every game the world starts.
    pub game: GameConfig,
    /// Bound of the world actor's command inbox.
    pub inbox_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            default_game_type: GameType::MOBILE_SMALL,
            game: GameConfig::default(),
            inbox_capacity: 64,
        }
    }
}

/// Queue sizes for each player actor.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Decoded frames waiting for the player loop.
    pub inbound_capacity: usize,
    /// Game updates waiting to be written. A game that finds this queue
    /// full drops the player.
    pub outbound_capacity: usize,
    /// Pending bind/disconnect controls.
    pub control_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: 16,
            outbound_capacity: 10,
            control_capacity: 4,
        }
    }
}
