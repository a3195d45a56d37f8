use crate::board::Board;
use crate::card::{DeckService, TransportCard, TransportMode};
use crate::city::City;
use crate::config::{DestinationDraw, RulesConfig};
use crate::error::{RulesError, RulesResult};
use crate::hand::Staging;
use crate::interaction::{choose_from, choose_integer_in, choose_option, Interaction};
use crate::player::Player;

use serde::Serialize;
use smallvec::SmallVec;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// States of a single turn.
///
/// Every turn starts in [`TurnPhase::ChoosingAction`]. Picking an action moves to its own
/// state, from which it either commits ([`TurnPhase::TurnComplete`]) or goes back to
/// [`TurnPhase::ChoosingAction`] with nothing changed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    ChoosingAction,
    DrawingCards,
    ExchangingTokens,
    DrawingDestinations,
    CapturingRoute,
    BuildingPort,
    TurnComplete,
}

/// The actions a player can pick from, at the start of their turn.
///
/// # JSON
/// Actions are serialized in kebab-case, which is also how they are offered to players.
#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TurnAction {
    DrawCards,
    ExchangeTokens,
    DrawDestinations,
    CaptureRoute,
    BuildPort,
}

impl TurnAction {
    fn phase(self) -> TurnPhase {
        match self {
            TurnAction::DrawCards => TurnPhase::DrawingCards,
            TurnAction::ExchangeTokens => TurnPhase::ExchangingTokens,
            TurnAction::DrawDestinations => TurnPhase::DrawingDestinations,
            TurnAction::CaptureRoute => TurnPhase::CapturingRoute,
            TurnAction::BuildPort => TurnPhase::BuildingPort,
        }
    }
}

/// How a turn ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Exactly this action was committed.
    Committed(TurnAction),
    /// Nothing was legal: the turn passed without any change.
    NoOp,
}

/// Runs one player's turn.
///
/// Borrows everything the turn may touch for its duration, so that the
/// [`crate::session::GameSession`] stays the single owner of the game state.
pub struct TurnEngine<'a, D: DeckService> {
    player: &'a mut Player,
    board: &'a mut Board,
    deck: &'a mut D,
    config: &'a RulesConfig,
    turn: usize,
    phase: TurnPhase,
}

impl<'a, D: DeckService> TurnEngine<'a, D> {
    pub fn new(
        player: &'a mut Player,
        board: &'a mut Board,
        deck: &'a mut D,
        config: &'a RulesConfig,
        turn: usize,
    ) -> Self {
        Self {
            player,
            board,
            deck,
            config,
            turn,
            phase: TurnPhase::ChoosingAction,
        }
    }

    #[inline]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Actions the player may pick right now.
    pub fn legal_actions(&self) -> Vec<TurnAction> {
        TurnAction::iter()
            .filter(|action| self.is_legal(*action))
            .collect()
    }

    fn is_legal(&self, action: TurnAction) -> bool {
        match action {
            TurnAction::DrawCards => TransportMode::iter().any(|mode| self.deck.has_cards(mode)),
            TurnAction::ExchangeTokens => TransportMode::iter()
                .any(|mode| self.player.tokens().max_exchange(mode) > 0),
            TurnAction::DrawDestinations => self.deck.destinations_left() > 0,
            TurnAction::CaptureRoute => !self.board.capturable_routes(&*self.player).is_empty(),
            TurnAction::BuildPort => self.player.can_build_port(&*self.board, self.config),
        }
    }

    /// Plays the whole turn: offers the legal actions, runs the picked one, and starts over
    /// if it was abandoned or refused. Returns once exactly one action is committed.
    ///
    /// Only errors the player cannot recover from are returned: see [`RulesError::is_recoverable`].
    pub fn play_turn(&mut self, interaction: &mut dyn Interaction) -> RulesResult<TurnOutcome> {
        let name = self.player.name().to_string();

        loop {
            self.phase = TurnPhase::ChoosingAction;

            let legal_actions = self.legal_actions();
            if legal_actions.is_empty() {
                log::info!("{} cannot do anything, and passes.", name);
                self.phase = TurnPhase::TurnComplete;
                return Ok(TurnOutcome::NoOp);
            }

            let prompt = format!("{}, what do you want to do?", name);
            let action = match choose_from(interaction, &prompt, &legal_actions, false)? {
                Some(action) => *action,
                None => continue,
            };

            self.phase = action.phase();
            match self.run_action(action, interaction) {
                Ok(true) => {
                    self.phase = TurnPhase::TurnComplete;
                    return Ok(TurnOutcome::Committed(action));
                }
                Ok(false) => log::debug!("{} went back from {}.", name, action),
                Err(e) if e.is_recoverable() => log::debug!("{}", e),
                Err(e) => return Err(e),
            }
        }
    }

    /// Returns whether the action was committed.
    fn run_action(
        &mut self,
        action: TurnAction,
        interaction: &mut dyn Interaction,
    ) -> RulesResult<bool> {
        match action {
            TurnAction::DrawCards => self.draw_cards(interaction),
            TurnAction::ExchangeTokens => self.exchange_tokens(interaction),
            TurnAction::DrawDestinations => self.draw_destinations(interaction),
            TurnAction::CaptureRoute => self.capture_route(interaction),
            TurnAction::BuildPort => self.build_port(interaction),
        }
    }

    /// Draws up to [`RulesConfig::cards_per_draw`] cards, picking a deck for each.
    ///
    /// Passing on the first card abandons the action; passing later keeps what was drawn.
    /// Cards already in hand are never taken back, so an interaction failing after the first
    /// card commits the action as well.
    fn draw_cards(&mut self, interaction: &mut dyn Interaction) -> RulesResult<bool> {
        let cards_per_draw = self.config.cards_per_draw;
        let mut drawn: SmallVec<[TransportCard; 4]> = SmallVec::new();

        for i in 0..cards_per_draw {
            let modes: SmallVec<[TransportMode; 2]> = TransportMode::iter()
                .filter(|mode| self.deck.has_cards(*mode))
                .collect();
            if modes.is_empty() {
                break;
            }

            let prompt = format!(
                "{}, which deck do you draw from? (card {} of {})",
                self.player.name(),
                i + 1,
                cards_per_draw
            );
            let mode = match choose_from(interaction, &prompt, &modes, true) {
                Ok(Some(mode)) => *mode,
                Ok(None) if drawn.is_empty() => return Ok(false),
                Ok(None) => break,
                Err(e) if drawn.is_empty() => return Err(e),
                Err(e) => {
                    log::debug!("{} keeps the cards drawn so far: {}", self.player.name(), e);
                    break;
                }
            };

            if let Some(card) = self.deck.draw_card(mode) {
                self.player.receive_transport_card(card);
                drawn.push(card);
            }
        }

        if drawn.is_empty() {
            return Err(RulesError::Invariant(String::from(
                "the decks had cards, but none could be drawn",
            )));
        }

        self.player.drew_transport_cards(Some(self.turn), &drawn);
        Ok(true)
    }

    /// Picks which tokens to gain, then how many. Zero abandons the action.
    fn exchange_tokens(&mut self, interaction: &mut dyn Interaction) -> RulesResult<bool> {
        let modes: SmallVec<[TransportMode; 2]> = TransportMode::iter()
            .filter(|mode| self.player.tokens().max_exchange(*mode) > 0)
            .collect();

        let prompt = format!(
            "{}, which tokens do you want to gain? Each one costs {} points.",
            self.player.name(),
            self.config.exchange_penalty
        );
        let gain = match choose_from(interaction, &prompt, &modes, true)? {
            Some(mode) => *mode,
            None => return Ok(false),
        };

        let max_exchange = self.player.tokens().max_exchange(gain);
        let prompt = format!(
            "{}, how many {} tokens? 0 to go back.",
            self.player.name(),
            gain
        );
        let amount = choose_integer_in(interaction, &prompt, 0, max_exchange as i32)?;
        if amount == 0 {
            return Ok(false);
        }

        self.player
            .exchange_tokens(gain, amount as u8, self.turn, self.config)?;
        Ok(true)
    }

    /// Once cards are drawn they have been seen, so this action cannot be abandoned.
    fn draw_destinations(&mut self, interaction: &mut dyn Interaction) -> RulesResult<bool> {
        let draw = self.config.later_destinations;
        self.player
            .draw_destination_cards(draw.draw, &mut *self.deck)?;
        select_destinations(
            &mut *self.player,
            &mut *self.deck,
            &draw,
            Some(self.turn),
            interaction,
        )?;
        Ok(true)
    }

    fn capture_route(&mut self, interaction: &mut dyn Interaction) -> RulesResult<bool> {
        let (route_ids, options): (Vec<_>, Vec<_>) = self
            .board
            .capturable_routes(&*self.player)
            .iter()
            .map(|route| (route.id, route.to_string()))
            .unzip();

        let prompt = format!("{}, which route do you want to capture?", self.player.name());
        let index = match choose_option(interaction, &prompt, &options, true)? {
            Some(index) => index,
            None => return Ok(false),
        };

        let route_id = route_ids[index];
        let route = self
            .board
            .route(route_id)
            .ok_or(RulesError::UnknownRoute(route_id))?;
        let mut staging = Staging::for_route(route);

        let prompt = format!("{}, pay for {} card by card.", self.player.name(), options[index]);
        if !self.pay(interaction, &mut staging, &prompt)? {
            self.player.abort_staging(staging);
            return Ok(false);
        }

        self.player
            .capture_route(route_id, staging, self.turn, &mut *self.board, self.config)?;
        Ok(true)
    }

    fn build_port(&mut self, interaction: &mut dyn Interaction) -> RulesResult<bool> {
        let cities: Vec<City> = self
            .board
            .free_ports_for(self.player.id())
            .into_iter()
            .cloned()
            .collect();

        let prompt = format!("{}, where do you want to build a port?", self.player.name());
        let city = match choose_from(interaction, &prompt, &cities, true)? {
            Some(city) => city.clone(),
            None => return Ok(false),
        };

        let mut staging = self.player.port_staging(self.config).ok_or_else(|| {
            RulesError::Invariant(format!("{} cannot pay for a port", self.player.name()))
        })?;

        let prompt = format!(
            "{}, pay for the port in {} card by card: {} wagon and {} boat cards of one color.",
            self.player.name(),
            city,
            self.config.port_wagon_cards,
            self.config.port_boat_cards
        );
        if !self.pay(interaction, &mut staging, &prompt)? {
            self.player.abort_staging(staging);
            return Ok(false);
        }

        self.player
            .build_port(&city, staging, self.turn, &mut *self.board, self.config)?;
        Ok(true)
    }

    /// Stages cards one at a time until the payment is complete.
    ///
    /// Returns `false` if the player passes. A refused card is reported, and the player picks
    /// again. On `false` or `Err`, the caller still owns the staged cards.
    fn pay_once(
        &mut self,
        interaction: &mut dyn Interaction,
        staging: &mut Staging,
        prompt: &str,
    ) -> RulesResult<bool> {
        while !staging.is_complete() {
            let kinds = self.player.hand().kinds();
            let card = match choose_from(interaction, prompt, &kinds, true)? {
                Some(card) => *card,
                None => return Ok(false),
            };

            if let Err(e) = self.player.stage_card(staging, card) {
                if !e.is_recoverable() {
                    return Err(e);
                }
                log::debug!("{}", e);
            }
        }

        Ok(true)
    }

    /// Same as [`TurnEngine::pay_once`], giving staged cards back if an error bubbles up.
    fn pay(
        &mut self,
        interaction: &mut dyn Interaction,
        staging: &mut Staging,
        prompt: &str,
    ) -> RulesResult<bool> {
        self.pay_once(interaction, staging, prompt).map_err(|e| {
            let requirement = staging.requirement().clone();
            let staged = std::mem::replace(staging, Staging::new(requirement));
            self.player.abort_staging(staged);
            e
        })
    }
}

/// Lets the player pick which of their pending destination cards to keep, then commits the
/// selection. Used both during setup and mid-game.
///
/// The player returns cards one at a time. They may stop once they keep no more than the
/// maximum, and cannot return more than allowed by the minimum.
pub fn select_destinations(
    player: &mut Player,
    deck: &mut impl DeckService,
    draw: &DestinationDraw,
    turn: Option<usize>,
    interaction: &mut dyn Interaction,
) -> RulesResult<usize> {
    let offered = player.pending_destination_cards().to_vec();
    let (min, max) = draw.bounds_for(offered.len());

    let mut decisions = vec![true; offered.len()];
    let mut kept = offered.len();

    while kept > min {
        let kept_indices: Vec<usize> = (0..offered.len()).filter(|i| decisions[*i]).collect();
        let options: Vec<String> = kept_indices
            .iter()
            .map(|i| offered[*i].to_string())
            .collect();

        let must_return = kept > max;
        let prompt = if must_return {
            format!(
                "{}, return a destination: you may keep at most {}.",
                player.name(),
                max
            )
        } else {
            format!(
                "{}, return a destination, or pass to keep the {} left.",
                player.name(),
                kept
            )
        };

        match choose_option(interaction, &prompt, &options, !must_return) {
            Ok(Some(index)) => {
                decisions[kept_indices[index]] = false;
                kept -= 1;
            }
            Ok(None) => break,
            Err(e) => {
                player.return_pending_destination_cards(deck);
                return Err(e);
            }
        }
    }

    player.select_destination_cards(&decisions, draw, turn, deck)
}
