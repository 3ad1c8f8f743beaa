pub mod action;
pub mod game;
pub mod history;
pub mod player;

pub use action::Action;
pub use game::{Game, GameStatus, GameType, Round};
pub use history::HistoryEntry;
pub use player::{
    derive_avatar, palette_color, recompute_total, Player, PlayerUpdate, PLAYER_COLORS,
};
