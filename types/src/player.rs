use std::fmt::Display;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Colors offered to players during setup, handed out in order.
pub const PLAYER_COLORS: [&str; 10] = [
    "#EF4444", "#F97316", "#F59E0B", "#84CC16", "#22C55E", "#06B6D4", "#3B82F6", "#8B5CF6",
    "#EC4899", "#F43F5E",
];

pub const AVATAR_PLACEHOLDER: &str = "?";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub avatar: String,
    pub total_score: i64,
    /// Index is the round number minus one.
    pub round_scores: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_score: Option<i64>,
}

/// Fields of a [`Player`] that may be changed after creation. `None` leaves
/// the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub round_scores: Option<Vec<i64>>,
    pub proposed_score: Option<Option<i64>>,
}

/// Initials of each whitespace separated word, uppercased, at most two.
pub fn derive_avatar(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect();
    if initials.is_empty() {
        AVATAR_PLACEHOLDER.to_string()
    } else {
        initials
    }
}

pub fn recompute_total(round_scores: &[i64]) -> i64 {
    round_scores.iter().sum()
}

pub fn palette_color(index: usize) -> &'static str {
    PLAYER_COLORS[index % PLAYER_COLORS.len()]
}

impl Player {
    pub fn new(name: &str, color: &str) -> Self {
        Self::new_with_id(Uuid::new_v4(), name, color)
    }

    pub fn new_with_id(id: Uuid, name: &str, color: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            color: color.to_string(),
            avatar: derive_avatar(name),
            total_score: 0,
            round_scores: Vec::new(),
            proposed_score: None,
        }
    }

    pub fn apply(&mut self, update: PlayerUpdate) {
        if let Some(name) = update.name {
            self.avatar = derive_avatar(&name);
            self.name = name;
        }
        if let Some(color) = update.color {
            self.color = color;
        }
        if let Some(round_scores) = update.round_scores {
            self.round_scores = round_scores;
            self.total_score = recompute_total(&self.round_scores);
        }
        if let Some(proposed_score) = update.proposed_score {
            self.proposed_score = proposed_score;
        }
    }

    /// Writes `score` at the 0-based `round_index`, padding skipped rounds
    /// with zero, and refreshes the total. Returns false when the index
    /// cannot be addressed.
    pub fn set_round_score(&mut self, round_index: usize, score: i64) -> bool {
        let Some(len) = round_index.checked_add(1) else {
            log::warn!("Round index {round_index} is out of range for {}", self.name);
            return false;
        };
        if self.round_scores.len() < len {
            self.round_scores.resize(len, 0);
        }
        self.round_scores[round_index] = score;
        self.total_score = recompute_total(&self.round_scores);
        true
    }

    pub fn truncate_rounds(&mut self, max_rounds: usize) {
        self.round_scores.truncate(max_rounds);
        self.total_score = recompute_total(&self.round_scores);
    }

    pub fn round_score(&self, round_number: u32) -> Option<i64> {
        let index = usize::try_from(round_number).ok()?.checked_sub(1)?;
        self.round_scores.get(index).copied()
    }
}

impl Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} pts ({})",
            self.name,
            self.avatar,
            self.total_score,
            self.round_scores.iter().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_uses_initials() {
        assert_eq!(derive_avatar("Ryan Parag"), "RP");
        assert_eq!(derive_avatar("X"), "X");
        assert_eq!(derive_avatar("ada lovelace byron"), "AL");
        assert_eq!(derive_avatar("  spaced   out "), "SO");
    }

    #[test]
    fn avatar_placeholder_for_blank_names() {
        assert_eq!(derive_avatar(""), "?");
        assert_eq!(derive_avatar("  "), "?");
    }

    #[test]
    fn set_round_score_pads_and_totals() {
        let mut player = Player::new("Alice", PLAYER_COLORS[0]);
        player.set_round_score(2, 7);
        assert_eq!(player.round_scores, vec![0, 0, 7]);
        assert_eq!(player.total_score, 7);

        player.set_round_score(0, 10);
        player.set_round_score(2, -3);
        assert_eq!(player.round_scores, vec![10, 0, -3]);
        assert_eq!(player.total_score, 7);
    }

    #[test]
    fn set_round_score_rejects_unaddressable_index() {
        let mut player = Player::new("Alice", PLAYER_COLORS[0]);
        assert!(player.set_round_score(1, 3));
        assert!(!player.set_round_score(usize::MAX, 5));
        assert_eq!(player.round_scores, vec![0, 3]);
        assert_eq!(player.total_score, 3);
    }

    #[test]
    fn apply_rename_refreshes_avatar() {
        let mut player = Player::new("Alice", PLAYER_COLORS[0]);
        player.apply(PlayerUpdate {
            name: Some("Bob Marley".to_string()),
            ..Default::default()
        });
        assert_eq!(player.avatar, "BM");

        player.apply(PlayerUpdate {
            color: Some(PLAYER_COLORS[3].to_string()),
            ..Default::default()
        });
        assert_eq!(player.name, "Bob Marley");
        assert_eq!(player.color, PLAYER_COLORS[3]);
    }

    #[test]
    fn apply_round_scores_keeps_total_consistent() {
        let mut player = Player::new("Alice", PLAYER_COLORS[0]);
        player.apply(PlayerUpdate {
            round_scores: Some(vec![4, 5, 6]),
            ..Default::default()
        });
        assert_eq!(player.total_score, 15);
    }

    #[test]
    fn palette_wraps() {
        assert_eq!(palette_color(0), "#EF4444");
        assert_eq!(palette_color(11), "#F97316");
    }

    #[test]
    fn serializes_camel_case() {
        let player = Player::new("Alice", PLAYER_COLORS[0]);
        let json = serde_json::to_value(&player).unwrap();
        assert!(json.get("roundScores").is_some());
        assert!(json.get("totalScore").is_some());
        assert!(json.get("proposedScore").is_none());
    }
}
