//! Building a new game: configuration first, then the roster.

use thiserror::Error;
use types::{palette_color, Game, GameStatus, GameType, Player, PlayerUpdate};
use uuid::Uuid;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 10;
pub const DEFAULT_MAX_ROUNDS: u32 = 10;
pub const DEFAULT_GAME_NAME: &str = "New Game";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SetupError {
    #[error("A game needs at least 2 named players, found {0}")]
    NotEnoughPlayers(usize),

    #[error("Round count must be at least 1")]
    InvalidRoundCount,

    #[error("The roster is full (10 players)")]
    RosterFull,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameConfig {
    pub name: String,
    pub max_rounds: u32,
    pub collect_proposed_scores: bool,
    pub game_type: GameType,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_GAME_NAME.to_string(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            collect_proposed_scores: false,
            game_type: GameType::Standard,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameSetup {
    config: GameConfig,
    players: Vec<Player>,
}

impl GameSetup {
    /// Starts with two unnamed players.
    pub fn new(config: GameConfig) -> Self {
        let players = (0..MIN_PLAYERS)
            .map(|idx| Player::new("", palette_color(idx)))
            .collect();
        Self { config, players }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn add_player(&mut self, name: &str) -> Result<Uuid, SetupError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(SetupError::RosterFull);
        }
        let player = Player::new(name, palette_color(self.players.len()));
        let id = player.id;
        self.players.push(player);
        Ok(id)
    }

    /// Refuses to go below the minimum roster. Returns whether a player was
    /// removed.
    pub fn remove_player(&mut self, id: Uuid) -> bool {
        if self.players.len() <= MIN_PLAYERS {
            return false;
        }
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        self.players.len() != before
    }

    pub fn update_player(&mut self, id: Uuid, update: PlayerUpdate) -> bool {
        match self.players.iter_mut().find(|p| p.id == id) {
            Some(player) => {
                player.apply(update);
                true
            }
            None => false,
        }
    }

    pub fn named_players(&self) -> Vec<Player> {
        self.players
            .iter()
            .filter(|p| !p.name.trim().is_empty())
            .cloned()
            .collect()
    }

    /// The game as configured so far, still in `setup`.
    pub fn draft(&self) -> Game {
        let mut game = Game::new(&self.config.name, self.players.clone(), self.config.max_rounds);
        game.collect_proposed_scores = self.config.collect_proposed_scores;
        game.game_type = self.config.game_type;
        game
    }

    /// Finalizes the roster and produces a game ready to play.
    pub fn start(&self) -> Result<Game, SetupError> {
        if self.config.max_rounds < 1 {
            return Err(SetupError::InvalidRoundCount);
        }
        let players = self.named_players();
        if players.len() < MIN_PLAYERS {
            return Err(SetupError::NotEnoughPlayers(players.len()));
        }

        let mut game = self.draft();
        game.players = players;
        game.status = GameStatus::InProgress;
        log::info!(
            "Starting {} with {} players over {} rounds",
            game.name,
            game.players.len(),
            game.max_rounds
        );
        Ok(game)
    }
}

impl Default for GameSetup {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
