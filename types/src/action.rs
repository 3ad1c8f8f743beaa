use std::fmt::Display;

/// Labels recorded in the history log for each kind of mutation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    StartGame,
    ContinueGame,
    GoToRound,
    AddPlayer,
    RemovePlayer,
    UpdatePlayer,
    UpdateScore,
    UpdateProposedScore,
    SetMaxRounds,
    NextRound,
    CompleteGame,
    Update,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::StartGame => "start_game",
            Action::ContinueGame => "continue_game",
            Action::GoToRound => "go_to_round",
            Action::AddPlayer => "add_player",
            Action::RemovePlayer => "remove_player",
            Action::UpdatePlayer => "update_player",
            Action::UpdateScore => "update_score",
            Action::UpdateProposedScore => "update_proposed_score",
            Action::SetMaxRounds => "set_max_rounds",
            Action::NextRound => "next_round",
            Action::CompleteGame => "complete_game",
            Action::Update => "update",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}
