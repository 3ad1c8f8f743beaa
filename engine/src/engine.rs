use std::sync::Arc;

use chrono::Utc;
use database::Storage;
use itertools::Itertools;
use types::{Action, Game, GameStatus, HistoryEntry, Player, PlayerUpdate};
use uuid::Uuid;

use crate::history::HistoryLog;
use crate::persistence::PersistenceQueue;

/// Owns the game being edited and its undo history.
///
/// Every mutation updates the in-memory game before returning and queues the
/// new snapshot and history for saving in the background. Operations that
/// need a game are no-ops while none is loaded.
pub struct GameEngine {
    game: Option<Game>,
    history: HistoryLog,
    storage: Arc<Storage>,
    queue: PersistenceQueue,
}

impl GameEngine {
    /// Must be called from within a tokio runtime.
    pub fn new(storage: Arc<Storage>) -> Self {
        let queue = PersistenceQueue::spawn(storage.clone());
        Self {
            game: None,
            history: HistoryLog::new(),
            storage,
            queue,
        }
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Waits for every queued save to finish.
    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    /// Makes a stored game and its stored history current without recording
    /// an undo step. Returns false when no such game exists.
    pub async fn load_game(&mut self, id: Uuid) -> bool {
        self.flush().await;
        let Some(game) = self.storage.get_game(id).await else {
            log::info!("No saved game with id {id}");
            return false;
        };
        let entries = self.storage.get_game_history(Some(id)).await;
        log::info!(
            "Loaded {} with {} undo step(s)",
            game.name,
            entries.len()
        );
        self.history = HistoryLog::from_entries(entries);
        self.game = Some(game);
        true
    }

    /// Forgets the in-memory session. Stored copies are untouched.
    pub fn close(&mut self) {
        self.game = None;
        self.history.clear();
    }

    pub fn set_game(&mut self, game: Game, action: impl Into<String>) {
        self.commit(game, action.into());
    }

    pub fn add_player(&mut self, player: Player) {
        self.mutate(Action::AddPlayer, |game| {
            game.players.push(player);
            true
        });
    }

    pub fn remove_player(&mut self, player_id: Uuid) {
        self.mutate(Action::RemovePlayer, |game| {
            let before = game.players.len();
            game.players.retain(|p| p.id != player_id);
            game.players.len() != before
        });
    }

    pub fn update_player(&mut self, player_id: Uuid, update: PlayerUpdate) {
        self.mutate(Action::UpdatePlayer, |game| match game.get_player_mut(player_id) {
            Some(player) => {
                player.apply(update);
                true
            }
            None => false,
        });
    }

    /// `round_index` is 0-based and must fall inside the game's rounds.
    pub fn update_score(&mut self, player_id: Uuid, round_index: usize, score: i64) {
        self.mutate(Action::UpdateScore, |game| {
            let rounds = usize::try_from(game.max_rounds).unwrap_or(usize::MAX);
            if round_index >= rounds {
                log::debug!("Round index {round_index} is outside {rounds} rounds");
                return false;
            }
            match game.get_player_mut(player_id) {
                Some(player) => player.set_round_score(round_index, score),
                None => false,
            }
        });
    }

    pub fn update_proposed_score(&mut self, player_id: Uuid, score: i64) {
        self.mutate(Action::UpdateProposedScore, |game| {
            match game.get_player_mut(player_id) {
                Some(player) => {
                    player.proposed_score = Some(score);
                    true
                }
                None => false,
            }
        });
    }

    /// Values below one are raised to one. Scores beyond the new limit are
    /// dropped and the current round is pulled back inside it.
    pub fn set_max_rounds(&mut self, new_max: i64) {
        let safe_max = u32::try_from(new_max.max(1)).unwrap_or(u32::MAX);
        self.mutate(Action::SetMaxRounds, |game| {
            let keep = usize::try_from(safe_max).unwrap_or(usize::MAX);
            for player in game.players.iter_mut() {
                player.truncate_rounds(keep);
            }
            game.max_rounds = safe_max;
            game.current_round = game.current_round.min(safe_max);
            true
        });
    }

    pub fn next_round(&mut self) {
        self.mutate(Action::NextRound, |game| {
            if game.is_final_round() {
                return false;
            }
            game.current_round += 1;
            true
        });
    }

    /// Jumps to `round_number`, clamped into the game's rounds.
    pub fn go_to_round(&mut self, round_number: u32) {
        let Some(current) = &self.game else {
            log::debug!("{}: no game loaded", Action::GoToRound);
            return;
        };
        let mut next = current.clone();
        next.current_round = round_number.clamp(1, next.max_rounds.max(1));
        self.set_game(next, Action::GoToRound);
    }

    pub fn complete_game(&mut self) {
        self.mutate(Action::CompleteGame, |game| {
            game.status = GameStatus::Completed;
            true
        });
    }

    /// Restores the snapshot taken before the most recent change.
    pub fn undo(&mut self) {
        let Some(entry) = self.history.pop_most_recent() else {
            log::debug!("Nothing to undo");
            return;
        };
        log::info!("Undo {}", entry.action);
        let restored = entry.game_state;
        self.persist(&restored);
        self.game = Some(restored);
    }

    fn mutate<F>(&mut self, action: Action, change: F)
    where
        F: FnOnce(&mut Game) -> bool,
    {
        let Some(current) = &self.game else {
            log::debug!("{action}: no game loaded");
            return;
        };
        let mut next = current.clone();
        if !change(&mut next) {
            log::debug!("{action}: nothing changed");
            return;
        }
        self.commit(next, action.into());
    }

    fn commit(&mut self, mut next: Game, action: String) {
        if let Some(previous) = self.game.take() {
            if previous.id == next.id {
                next.updated_at = Utc::now();
            }
            self.history.push(HistoryEntry {
                action: action.clone(),
                game_state: previous,
                timestamp: Utc::now(),
            });
        }
        log::info!("{action}: {} round {}/{}", next.name, next.current_round, next.max_rounds);
        self.persist(&next);
        self.game = Some(next);
    }

    /// Queues the game and the log. Each entry is stored under the game its
    /// snapshot belongs to, and the current game's stored log is always
    /// rewritten, even when it has no entries left.
    fn persist(&self, game: &Game) {
        self.queue.save_game(game.clone());
        let mut by_game = self
            .history
            .iter()
            .cloned()
            .into_group_map_by(|entry| entry.game_state.id);
        by_game.entry(game.id).or_default();
        for (game_id, entries) in by_game {
            self.queue.save_history(game_id, entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::PLAYER_COLORS;

    fn engine() -> GameEngine {
        GameEngine::new(Arc::new(Storage::in_memory()))
    }

    fn started(engine: &mut GameEngine, max_rounds: u32) -> (Uuid, Uuid) {
        let alice = Player::new("Alice", PLAYER_COLORS[0]);
        let bob = Player::new("Bob", PLAYER_COLORS[1]);
        let ids = (alice.id, bob.id);
        let mut game = Game::new("Test", vec![alice, bob], max_rounds);
        game.status = GameStatus::InProgress;
        engine.set_game(game, Action::StartGame);
        ids
    }

    fn player(engine: &GameEngine, id: Uuid) -> &Player {
        engine.game().unwrap().get_player(id).unwrap()
    }

    #[tokio::test]
    async fn operations_without_game_are_noops() {
        let mut engine = engine();
        let id = Uuid::new_v4();
        engine.add_player(Player::new("Ghost", PLAYER_COLORS[0]));
        engine.update_score(id, 0, 10);
        engine.set_max_rounds(3);
        engine.next_round();
        engine.go_to_round(2);
        engine.complete_game();
        engine.undo();

        assert!(engine.game().is_none());
        assert!(!engine.can_undo());
    }

    #[tokio::test]
    async fn first_set_game_records_no_history() {
        let mut engine = engine();
        started(&mut engine, 3);
        assert!(engine.game().is_some());
        assert!(!engine.can_undo());
    }

    #[tokio::test]
    async fn update_score_keeps_total_in_sync() {
        let mut engine = engine();
        let (alice, _) = started(&mut engine, 5);

        engine.update_score(alice, 2, 8);
        assert_eq!(player(&engine, alice).round_scores, vec![0, 0, 8]);
        assert_eq!(player(&engine, alice).total_score, 8);

        engine.update_score(alice, 0, 4);
        engine.update_score(alice, 2, 1);
        let p = player(&engine, alice);
        assert_eq!(p.total_score, p.round_scores.iter().sum::<i64>());
        assert_eq!(p.total_score, 5);
    }

    #[tokio::test]
    async fn update_score_outside_rounds_is_a_noop() {
        let mut engine = engine();
        let (alice, _) = started(&mut engine, 3);
        let before = engine.game().cloned();

        engine.update_score(alice, 3, 10);
        engine.update_score(alice, usize::MAX, 1);

        assert_eq!(engine.game().cloned(), before);
        assert!(!engine.can_undo());

        engine.update_score(alice, 2, 10);
        assert_eq!(player(&engine, alice).round_scores, vec![0, 0, 10]);
    }

    #[tokio::test]
    async fn edits_refresh_updated_at() {
        let mut engine = engine();
        let alice = Player::new("Alice", PLAYER_COLORS[0]);
        let alice_id = alice.id;
        let mut game = Game::new("Test", vec![alice], 3);
        let stale = Utc::now() - chrono::Duration::hours(1);
        game.created_at = stale;
        game.updated_at = stale;
        engine.set_game(game, Action::StartGame);
        assert_eq!(engine.game().unwrap().updated_at, stale);

        engine.update_score(alice_id, 0, 5);
        let game = engine.game().unwrap();
        assert!(game.updated_at > stale);
        assert_eq!(game.created_at, stale);

        engine.undo();
        assert_eq!(engine.game().unwrap().updated_at, stale);
    }

    #[tokio::test]
    async fn history_is_stored_under_the_snapshot_owner() {
        let mut engine = engine();
        let (alice, _) = started(&mut engine, 3);
        let first_id = engine.game().unwrap().id;
        engine.update_score(alice, 0, 7);

        let carol = Player::new("Carol", PLAYER_COLORS[2]);
        let carol_id = carol.id;
        let second = Game::new("Second", vec![carol], 3);
        let second_id = second.id;
        engine.set_game(second, Action::StartGame);
        engine.flush().await;

        let storage = engine.storage().clone();
        assert!(storage.get_game_history(Some(second_id)).await.is_empty());
        let first_history = storage.get_game_history(Some(first_id)).await;
        assert_eq!(first_history.len(), 2);
        assert!(first_history.iter().all(|e| e.game_state.id == first_id));

        engine.update_score(carol_id, 0, 3);
        engine.flush().await;
        let second_history = storage.get_game_history(Some(second_id)).await;
        assert_eq!(second_history.len(), 1);
        assert_eq!(second_history[0].game_state.id, second_id);

        assert!(engine.load_game(second_id).await);
        assert!(engine.history().iter().all(|e| e.game_state.id == second_id));
        engine.undo();
        assert_eq!(engine.game().unwrap().id, second_id);
        assert!(!engine.can_undo());
    }

    #[tokio::test]
    async fn unknown_player_is_a_noop() {
        let mut engine = engine();
        started(&mut engine, 3);
        let before = engine.game().cloned();

        engine.update_score(Uuid::new_v4(), 0, 10);
        engine.update_proposed_score(Uuid::new_v4(), 2);
        engine.remove_player(Uuid::new_v4());
        engine.update_player(Uuid::new_v4(), PlayerUpdate::default());

        assert_eq!(engine.game().cloned(), before);
        assert!(!engine.can_undo());
    }

    #[tokio::test]
    async fn proposed_score_leaves_total_alone() {
        let mut engine = engine();
        let (alice, _) = started(&mut engine, 3);
        engine.update_score(alice, 0, 6);
        engine.update_proposed_score(alice, 2);

        let p = player(&engine, alice);
        assert_eq!(p.proposed_score, Some(2));
        assert_eq!(p.total_score, 6);
    }

    #[tokio::test]
    async fn update_player_rename_refreshes_avatar() {
        let mut engine = engine();
        let (alice, _) = started(&mut engine, 3);
        engine.update_player(
            alice,
            PlayerUpdate {
                name: Some("Alice Cooper".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(player(&engine, alice).avatar, "AC");
    }

    #[tokio::test]
    async fn add_and_remove_players_without_floor() {
        let mut engine = engine();
        let (alice, bob) = started(&mut engine, 3);
        let carol = Player::new("Carol", PLAYER_COLORS[2]);
        let carol_id = carol.id;
        engine.add_player(carol);
        assert_eq!(engine.game().unwrap().players.last().map(|p| p.id), Some(carol_id));

        engine.remove_player(carol_id);
        engine.remove_player(bob);
        let game = engine.game().unwrap();
        assert_eq!(game.players.len(), 1);
        assert_eq!(game.players[0].id, alice);
        assert!(!game.is_valid_to_play());
    }

    #[tokio::test]
    async fn set_max_rounds_trims_scores_and_clamps_round() {
        let mut engine = engine();
        let (alice, bob) = started(&mut engine, 5);
        for round in 0..5 {
            engine.update_score(alice, round, 10);
            engine.update_score(bob, round, 1);
        }
        for _ in 0..4 {
            engine.next_round();
        }
        assert_eq!(engine.game().unwrap().current_round, 5);

        engine.set_max_rounds(2);
        let game = engine.game().unwrap();
        assert_eq!(game.max_rounds, 2);
        assert_eq!(game.current_round, 2);
        assert_eq!(player(&engine, alice).round_scores, vec![10, 10]);
        assert_eq!(player(&engine, alice).total_score, 20);
        assert_eq!(player(&engine, bob).total_score, 2);
    }

    #[tokio::test]
    async fn set_max_rounds_clamps_to_one() {
        let mut engine = engine();
        let (alice, _) = started(&mut engine, 3);
        engine.update_score(alice, 1, 5);

        engine.set_max_rounds(0);
        assert_eq!(engine.game().unwrap().max_rounds, 1);
        engine.set_max_rounds(-7);
        let game = engine.game().unwrap();
        assert_eq!(game.max_rounds, 1);
        assert_eq!(game.current_round, 1);
        assert!(player(&engine, alice).round_scores.len() <= 1);
    }

    #[tokio::test]
    async fn set_max_rounds_can_grow() {
        let mut engine = engine();
        started(&mut engine, 2);
        engine.next_round();
        engine.set_max_rounds(6);
        let game = engine.game().unwrap();
        assert_eq!(game.max_rounds, 6);
        assert_eq!(game.current_round, 2);
    }

    #[tokio::test]
    async fn next_round_stops_at_final_round() {
        let mut engine = engine();
        started(&mut engine, 2);
        engine.next_round();
        let steps = engine.history().len();
        engine.next_round();

        assert_eq!(engine.game().unwrap().current_round, 2);
        assert_eq!(engine.history().len(), steps);
    }

    #[tokio::test]
    async fn go_to_round_clamps() {
        let mut engine = engine();
        started(&mut engine, 4);
        engine.go_to_round(3);
        assert_eq!(engine.game().unwrap().current_round, 3);
        engine.go_to_round(40);
        assert_eq!(engine.game().unwrap().current_round, 4);
        engine.go_to_round(0);
        assert_eq!(engine.game().unwrap().current_round, 1);
        assert_eq!(
            engine.history().most_recent().map(|e| e.action.as_str()),
            Some("go_to_round")
        );
    }

    #[tokio::test]
    async fn complete_game_allows_later_corrections() {
        let mut engine = engine();
        let (alice, _) = started(&mut engine, 2);
        engine.complete_game();
        assert_eq!(engine.game().unwrap().status, GameStatus::Completed);

        engine.update_score(alice, 0, 3);
        engine.set_max_rounds(4);
        let game = engine.game().unwrap();
        assert_eq!(game.status, GameStatus::Completed);
        assert_eq!(game.max_rounds, 4);
    }

    #[tokio::test]
    async fn undo_restores_exact_prior_state() {
        let mut engine = engine();
        let (alice, bob) = started(&mut engine, 3);
        engine.update_score(alice, 0, 4);

        let operations: Vec<Box<dyn Fn(&mut GameEngine)>> = vec![
            Box::new(move |e: &mut GameEngine| e.update_score(bob, 1, 9)),
            Box::new(move |e: &mut GameEngine| e.update_proposed_score(alice, 3)),
            Box::new(|e: &mut GameEngine| e.add_player(Player::new("Carol", PLAYER_COLORS[2]))),
            Box::new(move |e: &mut GameEngine| e.remove_player(bob)),
            Box::new(|e: &mut GameEngine| e.set_max_rounds(1)),
            Box::new(|e: &mut GameEngine| e.next_round()),
            Box::new(|e: &mut GameEngine| e.go_to_round(3)),
            Box::new(|e: &mut GameEngine| e.complete_game()),
        ];
        for op in operations {
            let before = engine.game().cloned();
            op(&mut engine);
            engine.undo();
            assert_eq!(engine.game().cloned(), before);
        }
    }

    #[tokio::test]
    async fn undo_with_empty_history_is_noop() {
        let mut engine = engine();
        started(&mut engine, 3);
        let before = engine.game().cloned();
        engine.undo();
        assert_eq!(engine.game().cloned(), before);
    }

    #[tokio::test]
    async fn history_is_capped() {
        let mut engine = engine();
        let (alice, _) = started(&mut engine, 3);
        for score in 0..120 {
            engine.update_score(alice, 0, score);
        }
        assert_eq!(engine.history().len(), crate::HISTORY_LIMIT);
        assert_eq!(
            engine.history().most_recent().unwrap().game_state.players[0].total_score,
            118
        );
    }

    #[tokio::test]
    async fn close_forgets_session() {
        let mut engine = engine();
        let (alice, _) = started(&mut engine, 3);
        engine.update_score(alice, 0, 1);
        engine.close();
        assert!(engine.game().is_none());
        assert!(!engine.can_undo());
    }
}
