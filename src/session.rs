use crate::board::{Board, MapData, RouteId};
use crate::card::{CardDealer, DeckService, TransportMode};
use crate::config::RulesConfig;
use crate::error::{RulesError, RulesResult};
use crate::interaction::{choose_integer_in, Interaction};
use crate::player::{Player, PlayerColor, PlayerSnapshot};
use crate::tokens::TokenPools;
use crate::turn::{select_destinations, TurnEngine, TurnOutcome};

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 5;

/// Phases of the games, which act as states in the game's finite-state machine.
///
/// # JSON
/// Phases are serialized in snake_case.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Players, one after the other, receive their first cards, select their initial
    /// destinations, and split their tokens between wagons and boats.
    Setup,
    /// The main phase of the game: the turn-based game, up until a player runs low on tokens.
    Playing,
    /// When a player is left with few tokens, every player has one turn left.
    ///
    /// This last turn is denoted by this special phase.
    LastTurn,
    /// When each player has played their last turn.
    ///
    /// No actions can be taken at this point, only scores can be computed.
    Done,
}

/// Where the setup stopped, if it was interrupted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SetupStep {
    DealCards,
    SelectDestinations,
    AllocateTokens,
}

/// Who joins the game, and with which color.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerSetup {
    pub name: String,
    pub color: PlayerColor,
}

impl PlayerSetup {
    pub fn new(name: impl Into<String>, color: PlayerColor) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// All the information about a game's current state, returned by [`GameSession::snapshot`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    /// Initially, this is `None`, during the setup. Once the turn-based game starts,
    /// `turn` is set to 0, and increments after each turn.
    pub turn: Option<usize>,
    /// Whose turn it is, which maps to an index in [`GameSnapshot::players`].
    pub current_player: usize,
    pub destinations_left: usize,
    pub free_routes: Vec<RouteId>,
    /// Information about all the players in the game.
    ///
    /// This only contains public information about them, except for the viewer,
    /// whose hand is also visible.
    pub players: Vec<PlayerSnapshot>,
}

/// In charge of holding all the state of the game, running the setup, handing each turn
/// to a [`TurnEngine`], and deciding when the game is over.
///
/// This overall acts as a finite-state machine. Nothing else owns the board, the deck,
/// or the players: every turn borrows them from the session.
#[derive(Debug)]
pub struct GameSession<D: DeckService = CardDealer> {
    /// The current phase of the game, which marks nodes (states) in this finite-state machine.
    phase: GamePhase,
    /// Incremented every time a player finishes their turn.
    turn: usize,
    /// Index of the player whose turn it is.
    current: usize,
    board: Board,
    deck: D,
    config: RulesConfig,
    /// List of all players, in turn order. A player's id is their index in this list.
    players: SmallVec<[Player; MAX_PLAYERS]>,
    /// Only relevant in [`GamePhase::Setup`]: the next player to set up, and their next step.
    setup_progress: (usize, SetupStep),
    /// Only relevant in [`GamePhase::LastTurn`]: how many turns are left to play.
    last_turns_left: usize,
    /// Turns in a row where nobody could do anything.
    consecutive_no_ops: usize,
}

impl GameSession<CardDealer> {
    /// Creates a session over the given map, with a shuffled [`CardDealer`].
    ///
    /// # Example
    /// ```
    /// use rails_and_sails::board::MapData;
    /// use rails_and_sails::config::RulesConfig;
    /// use rails_and_sails::player::PlayerColor;
    /// use rails_and_sails::session::{GamePhase, GameSession, PlayerSetup};
    /// use rand::SeedableRng;
    ///
    /// let map = MapData::from_json(r#"{"routes": [
    ///     {"id": 1, "cities": ["Lima", "Dakar"], "length": 3, "color": "blue", "mode": "boat"}
    /// ]}"#).unwrap();
    /// let players = vec![
    ///     PlayerSetup::new("Ada", PlayerColor::Blue),
    ///     PlayerSetup::new("Grace", PlayerColor::Red),
    /// ];
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    ///
    /// let session = GameSession::standard(players, &map, RulesConfig::default(), &mut rng).unwrap();
    /// assert_eq!(session.phase(), GamePhase::Setup);
    /// assert_eq!(session.num_players(), 2);
    /// ```
    pub fn standard(
        players: Vec<PlayerSetup>,
        map: &MapData,
        config: RulesConfig,
        rng: &mut impl Rng,
    ) -> RulesResult<Self> {
        let board = Board::new(map)?;
        let deck = CardDealer::new(map.destinations.clone(), rng);
        Self::new(players, board, deck, config)
    }
}

impl<D: DeckService> GameSession<D> {
    /// Creates a new [`GameSession`] in the [`GamePhase::Setup`].
    ///
    /// Returns an `Err` if either:
    ///   * The configuration is invalid.
    ///   * There are fewer than [`MIN_PLAYERS`] or more than [`MAX_PLAYERS`] players.
    ///   * Two players share the same color.
    pub fn new(
        players: Vec<PlayerSetup>,
        board: Board,
        deck: D,
        config: RulesConfig,
    ) -> RulesResult<Self> {
        config.validate()?;

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players.len()) {
            return Err(RulesError::InvalidPlayerCount(players.len()));
        }

        let mut used_player_colors = HashSet::new();
        for player in &players {
            if !used_player_colors.insert(player.color) {
                return Err(RulesError::DuplicatePlayerColor(player.color.to_string()));
            }
        }

        let players = players
            .into_iter()
            .enumerate()
            .map(|(id, player)| Player::new(id, player.color, player.name, &config))
            .collect();

        Ok(Self {
            phase: GamePhase::Setup,
            turn: 0,
            current: 0,
            board,
            deck,
            config,
            players,
            setup_progress: (0, SetupStep::DealCards),
            last_turns_left: 0,
            consecutive_no_ops: 0,
        })
    }

    #[inline]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// `None` until the turn-based game has started.
    #[inline]
    pub fn turn(&self) -> Option<usize> {
        (self.phase != GamePhase::Setup).then(|| self.turn)
    }

    #[inline]
    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[inline]
    pub fn player(&self, player_id: usize) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// The player whose turn it is.
    #[inline]
    pub fn current_player(&self) -> &Player {
        &self.players[self.current]
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn deck(&self) -> &D {
        &self.deck
    }

    #[inline]
    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    #[inline]
    fn turn_based_game_started(&self) -> bool {
        self.phase == GamePhase::Playing || self.phase == GamePhase::LastTurn
    }

    /// Runs the whole setup, one player after the other:
    ///   * Deals the initial transport cards (fewer if a deck runs short).
    ///   * Lets the player select their initial destinations.
    ///   * Asks for the split of tokens between wagons and boats, until it is valid.
    ///
    /// Then transitions to [`GamePhase::Playing`], with the first player to play.
    ///
    /// If the interaction fails, calling this again resumes from the step that failed:
    /// nobody is dealt twice.
    ///
    /// Returns an `Err` if we are not in [`GamePhase::Setup`], or if the interaction fails.
    pub fn setup(&mut self, interaction: &mut dyn Interaction) -> RulesResult<()> {
        if self.phase != GamePhase::Setup {
            return Err(RulesError::WrongPhase("run the setup"));
        }

        while self.setup_progress.0 < self.players.len() {
            let (index, step) = self.setup_progress;
            match step {
                SetupStep::DealCards => {
                    self.deal_initial_cards(index);
                    self.setup_progress.1 = SetupStep::SelectDestinations;
                }
                SetupStep::SelectDestinations => {
                    let player = &mut self.players[index];
                    player.draw_destination_cards(
                        self.config.initial_destinations.draw,
                        &mut self.deck,
                    )?;
                    select_destinations(
                        player,
                        &mut self.deck,
                        &self.config.initial_destinations,
                        None,
                        interaction,
                    )?;
                    self.setup_progress.1 = SetupStep::AllocateTokens;
                }
                SetupStep::AllocateTokens => {
                    self.allocate_tokens(index, interaction)?;
                    self.setup_progress = (index + 1, SetupStep::DealCards);
                }
            }
        }

        self.phase = GamePhase::Playing;
        self.turn = 0;
        self.current = 0;
        log::info!(
            "Setup is over, {} starts playing.",
            self.current_player().name()
        );
        Ok(())
    }

    fn deal_initial_cards(&mut self, index: usize) {
        let mut dealt = Vec::with_capacity(
            self.config.initial_wagon_cards + self.config.initial_boat_cards,
        );
        for (mode, count) in [
            (TransportMode::Wagon, self.config.initial_wagon_cards),
            (TransportMode::Boat, self.config.initial_boat_cards),
        ] {
            dealt.extend((0..count).map_while(|_| self.deck.draw_card(mode)));
        }

        let player = &mut self.players[index];
        for card in &dealt {
            player.receive_transport_card(*card);
        }
        player.drew_transport_cards(None, &dealt);
    }

    fn allocate_tokens(
        &mut self,
        index: usize,
        interaction: &mut dyn Interaction,
    ) -> RulesResult<()> {
        let (wagon_bounds, boat_bounds) = TokenPools::allocation_bounds(&self.config);
        let player = &mut self.players[index];

        loop {
            let prompt = format!(
                "{}, how many wagons do you start with? Wagons and boats must add up to {}.",
                player.name(),
                self.config.max_tokens
            );
            let wagons = choose_integer_in(
                interaction,
                &prompt,
                *wagon_bounds.start() as i32,
                *wagon_bounds.end() as i32,
            )?;

            let prompt = format!("{}, how many boats do you start with?", player.name());
            let boats = choose_integer_in(
                interaction,
                &prompt,
                *boat_bounds.start() as i32,
                *boat_bounds.end() as i32,
            )?;

            match player.allocate_tokens(wagons as u8, boats as u8, &self.config) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_recoverable() => log::debug!("{}", e),
                Err(e) => return Err(e),
            }
        }
    }

    /// Lets the current player play their turn, then hands over to the next player.
    ///
    /// Returns an `Err` if either:
    ///   * We are not in [`GamePhase::Playing`], nor [`GamePhase::LastTurn`].
    ///   * The turn failed in a way the player cannot recover from.
    ///
    /// After the turn:
    ///   * If the player is left with at most [`RulesConfig::end_game_token_threshold`] active
    ///     tokens, we transition to [`GamePhase::LastTurn`]: everyone, the player included,
    ///     plays one more turn.
    ///   * Once the last turns are played, or if a whole round went by without anyone being
    ///     able to do anything, we transition to [`GamePhase::Done`].
    pub fn play_turn(&mut self, interaction: &mut dyn Interaction) -> RulesResult<TurnOutcome> {
        if !self.turn_based_game_started() {
            return Err(RulesError::WrongPhase("play a turn"));
        }

        let player = &mut self.players[self.current];
        let outcome = TurnEngine::new(
            player,
            &mut self.board,
            &mut self.deck,
            &self.config,
            self.turn,
        )
        .play_turn(interaction)?;
        player.tokens().check_invariants()?;

        self.end_turn(outcome);
        Ok(outcome)
    }

    fn end_turn(&mut self, outcome: TurnOutcome) {
        match outcome {
            TurnOutcome::Committed(_) => self.consecutive_no_ops = 0,
            TurnOutcome::NoOp => self.consecutive_no_ops += 1,
        }

        let player = &self.players[self.current];
        match self.phase {
            GamePhase::Playing => {
                let tokens_left = player.tokens().total_active();
                if tokens_left <= self.config.end_game_token_threshold as u16 {
                    log::info!(
                        "{} has only {} tokens left: everyone plays one last turn.",
                        player.name(),
                        tokens_left
                    );
                    self.phase = GamePhase::LastTurn;
                    self.last_turns_left = self.players.len();
                }
            }
            GamePhase::LastTurn => {
                self.last_turns_left = self.last_turns_left.saturating_sub(1);
                if self.last_turns_left == 0 {
                    log::info!("Every player has played their last turn.");
                    self.phase = GamePhase::Done;
                }
            }
            GamePhase::Setup | GamePhase::Done => {}
        }

        if self.phase != GamePhase::Done && self.consecutive_no_ops >= self.players.len() {
            log::info!("Nobody can do anything anymore.");
            self.phase = GamePhase::Done;
        }

        if self.phase != GamePhase::Done {
            self.turn += 1;
            self.current = (self.current + 1) % self.players.len();
        }
    }

    /// Plays the whole game: the setup if needed, then turns until it is over.
    ///
    /// Returns the final scores, see [`GameSession::final_scores`].
    pub fn run(&mut self, interaction: &mut dyn Interaction) -> RulesResult<Vec<(usize, i32)>> {
        if self.phase == GamePhase::Setup {
            self.setup(interaction)?;
        }

        while self.phase != GamePhase::Done {
            self.play_turn(interaction)?;
        }

        self.final_scores()
    }

    /// `(player id, final score)` for every player, in turn order.
    ///
    /// Returns an `Err` if the game is not [`GamePhase::Done`].
    pub fn final_scores(&self) -> RulesResult<Vec<(usize, i32)>> {
        if self.phase != GamePhase::Done {
            return Err(RulesError::WrongPhase("compute final scores"));
        }

        Ok(self
            .players
            .iter()
            .map(|player| (player.id(), player.final_score(&self.board, &self.config)))
            .collect())
    }

    /// Returns the game's state, from the perspective of a given player.
    ///
    /// This said perspective is important, because a given player should only be
    /// able to know about the public information of other players, but should know
    /// private information about themselves (e.g. which transport cards they have).
    ///
    /// Cards are only staged while an action is being paid for, inside a [`TurnEngine`].
    /// Between turns nothing is staged, so the viewer's `staged` is always empty here.
    pub fn snapshot(&self, viewer_id: usize) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            turn: self.turn(),
            current_player: self.current,
            destinations_left: self.deck.destinations_left(),
            free_routes: self
                .board
                .free_routes()
                .iter()
                .map(|route| route.id)
                .collect(),
            players: self
                .players
                .iter()
                .map(|player| player.get_player_snapshot(viewer_id, &self.board, None))
                .collect(),
        }
    }
}
