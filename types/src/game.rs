use std::{collections::HashMap, fmt::Display};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::player::Player;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameStatus {
    #[default]
    Setup,
    InProgress,
    Completed,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Setup => "setup",
            GameStatus::InProgress => "in-progress",
            GameStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "setup" => Some(GameStatus::Setup),
            "in-progress" => Some(GameStatus::InProgress),
            "completed" => Some(GameStatus::Completed),
            _ => None,
        }
    }
}

impl Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    #[default]
    Standard,
    Custom,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Standard => "standard",
            GameType::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(GameType::Standard),
            "custom" => Some(GameType::Custom),
            _ => None,
        }
    }
}

/// One scoring cycle. Games keep scores inline on each player, so rounds are
/// usually derived with [`Game::round_view`] rather than stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub round_number: u32,
    pub scores: HashMap<Uuid, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_scores: Option<HashMap<Uuid, i64>>,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub name: String,
    /// Seating order, not ranking.
    pub players: Vec<Player>,
    #[serde(default)]
    pub rounds: Vec<Round>,
    /// 1-based, never above `max_rounds`.
    pub current_round: u32,
    pub max_rounds: u32,
    pub collect_proposed_scores: bool,
    pub game_type: GameType,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    pub fn new(name: &str, players: Vec<Player>, max_rounds: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            players,
            rounds: Vec::new(),
            current_round: 1,
            max_rounds: max_rounds.max(1),
            collect_proposed_scores: false,
            game_type: GameType::default(),
            status: GameStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_player(&self, id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_player_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn is_valid_to_play(&self) -> bool {
        self.players.len() >= 2
    }

    pub fn is_final_round(&self) -> bool {
        self.current_round >= self.max_rounds
    }

    /// Players ordered by total score, highest first. Ties keep seating order.
    pub fn standings(&self) -> Vec<&Player> {
        self.players
            .iter()
            .sorted_by(|a, b| b.total_score.cmp(&a.total_score))
            .collect()
    }

    pub fn leader(&self) -> Option<&Player> {
        self.standings().into_iter().next()
    }

    pub fn round_view(&self, round_number: u32) -> Round {
        let scores = self
            .players
            .iter()
            .filter_map(|p| p.round_score(round_number).map(|score| (p.id, score)))
            .collect();
        let proposed_scores = self.collect_proposed_scores.then(|| {
            self.players
                .iter()
                .filter_map(|p| p.proposed_score.map(|score| (p.id, score)))
                .collect()
        });
        Round {
            round_number,
            scores,
            proposed_scores,
            completed: round_number < self.current_round,
        }
    }
}

impl Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let players_str = self
            .standings()
            .iter()
            .enumerate()
            .map(|(idx, player)| format!("{}. {player}", idx + 1))
            .join("\n");
        write!(
            f,
            "{} ({}) round {}/{}\n{}",
            self.name, self.status, self.current_round, self.max_rounds, players_str
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PLAYER_COLORS;

    fn two_player_game() -> Game {
        Game::new(
            "Test",
            vec![
                Player::new("Alice", PLAYER_COLORS[0]),
                Player::new("Bob", PLAYER_COLORS[1]),
            ],
            3,
        )
    }

    #[test]
    fn new_game_starts_at_round_one_in_setup() {
        let game = two_player_game();
        assert_eq!(game.current_round, 1);
        assert_eq!(game.status, GameStatus::Setup);
        assert_eq!(game.created_at, game.updated_at);
        assert!(game.is_valid_to_play());
    }

    #[test]
    fn new_game_clamps_zero_rounds() {
        let game = Game::new("Test", vec![], 0);
        assert_eq!(game.max_rounds, 1);
        assert!(!game.is_valid_to_play());
    }

    #[test]
    fn standings_sort_by_total_and_keep_ties_stable() {
        let mut game = two_player_game();
        game.players.push(Player::new("Carol", PLAYER_COLORS[2]));
        game.players[0].set_round_score(0, 5);
        game.players[1].set_round_score(0, 9);
        game.players[2].set_round_score(0, 5);

        let names: Vec<_> = game.standings().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Alice", "Carol"]);
        assert_eq!(game.leader().map(|p| p.name.as_str()), Some("Bob"));
    }

    #[test]
    fn round_view_derives_from_inline_scores() {
        let mut game = two_player_game();
        game.players[0].set_round_score(0, 10);
        game.players[1].set_round_score(1, 4);
        game.current_round = 2;

        let first = game.round_view(1);
        assert_eq!(first.scores.len(), 2);
        assert_eq!(first.scores[&game.players[0].id], 10);
        assert_eq!(first.scores[&game.players[1].id], 0);
        assert!(first.completed);
        assert!(first.proposed_scores.is_none());

        let second = game.round_view(2);
        assert_eq!(second.scores.len(), 1);
        assert!(!second.completed);
    }

    #[test]
    fn round_view_includes_bids_when_collected() {
        let mut game = two_player_game();
        game.collect_proposed_scores = true;
        game.players[0].proposed_score = Some(3);

        let round = game.round_view(1);
        let bids = round.proposed_scores.expect("bids are collected");
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[&game.players[0].id], 3);
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&GameStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!(GameStatus::parse("completed"), Some(GameStatus::Completed));
        assert_eq!(GameType::parse("custom"), Some(GameType::Custom));
        assert_eq!(GameType::parse("other"), None);
    }
}
