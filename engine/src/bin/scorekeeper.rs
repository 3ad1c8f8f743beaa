use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand, ValueEnum};
use database::{FileConfig, Settings, Storage, StorageConfig, Theme};
use engine::{start_game, GameConfig, GameEngine, GameSetup};
use itertools::Itertools;
use types::{Game, GameType, PlayerUpdate};
use uuid::Uuid;

const DEFAULT_CACHE_DIR: &str = ".scorekeeper";

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "scorekeeper", version, about = "Keep score for card games")]
struct Params {
    /// Durable store, e.g. sqlite://scores.db
    #[arg(long)]
    database_url: Option<String>,

    /// Directory for the local cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// YAML file with storage settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print games as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new game
    New {
        #[arg(long, default_value = engine::setup::DEFAULT_GAME_NAME)]
        name: String,
        #[arg(long, default_value_t = engine::setup::DEFAULT_MAX_ROUNDS)]
        rounds: u32,
        /// Collect a bid from every player before each round
        #[arg(long, default_value_t = false)]
        bids: bool,
        #[arg(long, value_enum, default_value_t = Kind::Standard)]
        kind: Kind,
        #[arg(short, long, required = true)]
        player: Vec<String>,
    },
    /// List saved games, most recent first
    List,
    /// Show standings and round scores
    Show { game: String },
    /// Show the undo history of a game
    History { game: String },
    /// Record a player's score for a round (1-based)
    Score {
        game: String,
        player: String,
        round: usize,
        #[arg(allow_hyphen_values = true)]
        score: i64,
    },
    /// Record a player's bid for the current round
    Bid {
        game: String,
        player: String,
        #[arg(allow_hyphen_values = true)]
        score: i64,
    },
    /// Rename a player
    Rename {
        game: String,
        player: String,
        name: String,
    },
    /// Advance to the next round
    NextRound { game: String },
    /// Jump to a round
    GoTo { game: String, round: u32 },
    /// Change the number of rounds
    Rounds {
        game: String,
        #[arg(allow_hyphen_values = true)]
        max: i64,
    },
    /// Mark a game as finished
    Complete { game: String },
    /// Revert the last change to a game
    Undo { game: String },
    /// Delete one saved game
    Delete { game: String },
    /// Delete every saved game
    Clear,
    /// Show or change the theme preference
    Theme { theme: Option<String> },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Kind {
    Standard,
    Custom,
}

impl From<Kind> for GameType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Standard => GameType::Standard,
            Kind::Custom => GameType::Custom,
        }
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    env_logger::init();
    let args = Params::parse();
    log::info!("args: {args:?}");

    let yaml = args.config.as_deref().map(FileConfig::load).transpose()?;
    let mut config =
        StorageConfig::from_cli_or_env_or_yaml(args.database_url.clone(), args.cache_dir.clone(), yaml);
    if config.cache_dir.is_none() {
        config.cache_dir = Some(PathBuf::from(DEFAULT_CACHE_DIR));
    }

    let storage = Arc::new(Storage::from_config(&config).await);
    let mut engine = GameEngine::new(storage.clone());
    let result = run(&mut engine, &storage, args.command, args.json).await;
    engine.flush().await;
    result
}

async fn run(
    engine: &mut GameEngine,
    storage: &Storage,
    command: Command,
    json: bool,
) -> CliResult<()> {
    match command {
        Command::New {
            name,
            rounds,
            bids,
            kind,
            player,
        } => {
            let mut setup = GameSetup::new(GameConfig {
                name,
                max_rounds: rounds,
                collect_proposed_scores: bids,
                game_type: kind.into(),
            });
            for (idx, player_name) in player.iter().enumerate() {
                match setup.players().get(idx).map(|p| p.id) {
                    Some(id) => {
                        setup.update_player(
                            id,
                            PlayerUpdate {
                                name: Some(player_name.clone()),
                                ..Default::default()
                            },
                        );
                    }
                    None => {
                        setup.add_player(player_name)?;
                    }
                }
            }
            start_game(engine, &setup)?;
            print_game(current(engine)?, json)?;
        }
        Command::List => {
            let games = storage.get_games().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&games)?);
            } else if games.is_empty() {
                println!("No saved games");
            } else {
                for game in &games {
                    println!(
                        "{}  {:<20} {:<11} round {}/{}  {}",
                        game.id,
                        game.name,
                        game.status,
                        game.current_round,
                        game.max_rounds,
                        game.players.iter().map(|p| p.avatar.as_str()).join(" ")
                    );
                }
            }
        }
        Command::Show { game } => {
            open(engine, storage, &game).await?;
            print_game(current(engine)?, json)?;
        }
        Command::History { game } => {
            open(engine, storage, &game).await?;
            if engine.history().is_empty() {
                println!("No history");
            }
            for (idx, entry) in engine.history().iter().enumerate() {
                println!(
                    "{:>2}. {} {:<22} round {}/{}",
                    idx + 1,
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.action,
                    entry.game_state.current_round,
                    entry.game_state.max_rounds
                );
            }
        }
        Command::Score {
            game,
            player,
            round,
            score,
        } => {
            open(engine, storage, &game).await?;
            let current_game = current(engine)?;
            let player_id = find_player(current_game, &player)?;
            let max_rounds = usize::try_from(current_game.max_rounds)?;
            if round == 0 || round > max_rounds {
                return Err(format!("round must be between 1 and {max_rounds}").into());
            }
            let round_index = round - 1;
            engine.update_score(player_id, round_index, score);
            print_game(current(engine)?, json)?;
        }
        Command::Bid {
            game,
            player,
            score,
        } => {
            open(engine, storage, &game).await?;
            let player_id = find_player(current(engine)?, &player)?;
            engine.update_proposed_score(player_id, score);
            print_game(current(engine)?, json)?;
        }
        Command::Rename { game, player, name } => {
            open(engine, storage, &game).await?;
            let player_id = find_player(current(engine)?, &player)?;
            engine.update_player(
                player_id,
                PlayerUpdate {
                    name: Some(name),
                    ..Default::default()
                },
            );
            print_game(current(engine)?, json)?;
        }
        Command::NextRound { game } => {
            open(engine, storage, &game).await?;
            engine.next_round();
            print_game(current(engine)?, json)?;
        }
        Command::GoTo { game, round } => {
            open(engine, storage, &game).await?;
            engine.go_to_round(round);
            print_game(current(engine)?, json)?;
        }
        Command::Rounds { game, max } => {
            open(engine, storage, &game).await?;
            engine.set_max_rounds(max);
            print_game(current(engine)?, json)?;
        }
        Command::Complete { game } => {
            open(engine, storage, &game).await?;
            engine.complete_game();
            let game = current(engine)?;
            if let Some(winner) = game.leader() {
                println!("{} wins with {} points!", winner.name, winner.total_score);
            }
            print_game(game, json)?;
        }
        Command::Undo { game } => {
            open(engine, storage, &game).await?;
            if !engine.can_undo() {
                println!("Nothing to undo");
            }
            engine.undo();
            print_game(current(engine)?, json)?;
        }
        Command::Delete { game } => {
            let id = resolve_game_id(storage, &game).await?;
            storage.delete_game(id).await;
            println!("Deleted {id}");
        }
        Command::Clear => {
            storage.clear_all_games().await;
            println!("Cleared all games");
        }
        Command::Theme { theme } => {
            let mut settings = storage.get_settings();
            if let Some(theme) = theme {
                settings.theme = theme.parse::<Theme>()?;
                if !storage.save_settings(&settings).is_stored() {
                    return Err("could not save settings".into());
                }
            }
            let Settings { theme } = settings;
            println!("Theme: {theme}");
        }
    }
    Ok(())
}

fn current(engine: &GameEngine) -> CliResult<&Game> {
    engine.game().ok_or_else(|| "no game loaded".into())
}

/// Accepts a full id or a unique prefix of one.
async fn resolve_game_id(storage: &Storage, query: &str) -> CliResult<Uuid> {
    if let Ok(id) = Uuid::parse_str(query) {
        return Ok(id);
    }
    let matches: Vec<_> = storage
        .get_games()
        .await
        .into_iter()
        .filter(|g| g.id.to_string().starts_with(query))
        .map(|g| g.id)
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(format!("no game matches {query}").into()),
        _ => Err(format!("{query} matches {} games", matches.len()).into()),
    }
}

async fn open(engine: &mut GameEngine, storage: &Storage, query: &str) -> CliResult<()> {
    let id = resolve_game_id(storage, query).await?;
    if engine.load_game(id).await {
        Ok(())
    } else {
        Err(format!("no game with id {id}").into())
    }
}

/// Matches a player by name (case-insensitive) or avatar.
fn find_player(game: &Game, query: &str) -> CliResult<Uuid> {
    game.players
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(query) || p.avatar.eq_ignore_ascii_case(query))
        .map(|p| p.id)
        .ok_or_else(|| format!("no player {query} in {}", game.name).into())
}

fn print_game(game: &Game, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(game)?);
        return Ok(());
    }
    println!("{} [{}] {}", game.name, game.id, game.status);
    println!("Round {}/{}", game.current_round, game.max_rounds);
    for (place, player) in game.standings().iter().enumerate() {
        let bid = player
            .proposed_score
            .filter(|_| game.collect_proposed_scores)
            .map(|b| format!(" bid {b}"))
            .unwrap_or_default();
        println!(
            "{:>2}. {:<3} {:<16} {:>6}{}  | {}",
            place + 1,
            player.avatar,
            player.name,
            player.total_score,
            bid,
            player.round_scores.iter().join(" ")
        );
    }
    Ok(())
}
