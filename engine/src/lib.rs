pub mod engine;
pub mod history;
pub mod persistence;
pub mod setup;

pub use engine::GameEngine;
pub use history::{HistoryLog, HISTORY_LIMIT};
pub use persistence::PersistenceQueue;
pub use setup::{GameConfig, GameSetup, SetupError};

use types::Action;

/// Finalizes `setup` and makes the new game current.
pub fn start_game(engine: &mut GameEngine, setup: &GameSetup) -> Result<(), SetupError> {
    let game = setup.start()?;
    engine.set_game(game, Action::StartGame);
    Ok(())
}
