use crate::board::{Board, ClaimedRoute, Route, RouteId};
use crate::card::{DeckService, DestinationCard, TransportCard, TransportMode};
use crate::city::City;
use crate::config::{DestinationDraw, RulesConfig};
use crate::error::{RulesError, RulesResult};
use crate::hand::{Hand, PaymentRequirement, Staging};
use crate::tokens::{TokenPool, TokenPools};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum_macros::{Display, EnumIter};

/// Every player has their own color.
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlayerColor {
    Yellow,
    Red,
    Blue,
    Green,
    Pink,
}

/// Represents all the actions that a player can commit.
///
/// # JSON
/// Actions are serialized in kebab-case.
#[derive(Clone, Copy, Debug, Display, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PlayerAction {
    DrewTransportCards,
    ExchangedTokens,
    /// Happens once during setup, then every time destination cards are drawn.
    SelectedDestinationCards,
    CapturedRoute,
    BuiltPort,
    /// Only happens during setup.
    AllocatedTokens,
}

/// Keeps track of actions taken at a given turn.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnActions {
    /// Initially, `turn` is None. This denotes the setup, before turns have started.
    /// Once the turn-based game starts, actions are coupled to a turn, which is monotonically increasing.
    pub turn: Option<usize>,
    /// During setup, a player selects destinations then allocates tokens.
    /// Afterwards, there is a single action per turn.
    pub actions: SmallVec<[PlayerAction; 2]>,
    /// Human-readable description of the corresponding action that was taken by the player.
    /// This is used to share updates with other players, so no private information is shared in it.
    pub description: SmallVec<[String; 2]>,
}

impl TurnActions {
    fn new() -> Self {
        Self {
            turn: None,
            actions: SmallVec::new(),
            description: SmallVec::new(),
        }
    }
}

/// Information about a player's state that is visible to all players.
#[derive(Debug)]
pub struct PublicPlayerState {
    /// Unique to each player in the game. Also their position in the turn order.
    pub id: usize,
    pub name: String,
    /// Unique to each player in the game.
    pub color: PlayerColor,
    /// Points accrued so far: captures, minus exchange penalties.
    /// Destinations and ports are only accounted for by [`Player::final_score`].
    pub score: i32,
    pub tokens: TokenPools,
    /// Actions taken by the player during the last turn they have participated in.
    pub turn_actions: TurnActions,
    pub claimed_routes: Vec<ClaimedRoute>,
    pub ports: Vec<City>,
    /// Destination cards the player has kept.
    pub destination_cards: Vec<DestinationCard>,
}

impl PublicPlayerState {
    fn new(id: usize, color: PlayerColor, name: String, config: &RulesConfig) -> Self {
        Self {
            id,
            name,
            color,
            score: 0,
            tokens: TokenPools::new(config),
            turn_actions: TurnActions::new(),
            claimed_routes: Vec::new(),
            ports: Vec::new(),
            destination_cards: Vec::new(),
        }
    }
}

/// Information about a player's state that is only visible to that player.
#[derive(Debug, Default)]
pub struct PrivatePlayerState {
    pub hand: Hand,
    /// After having drawn destination cards, we place them in this "pending" state.
    /// The player will subsequently have to select which ones they want to keep, which are then
    /// moved to [`PublicPlayerState::destination_cards`].
    pub pending_destination_cards: SmallVec<[DestinationCard; 5]>,
}

/// Read-only view over a player, from the perspective of another player (or themselves).
///
/// `hand` and `staged` are only populated for the player themselves.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub id: usize,
    pub name: String,
    pub color: PlayerColor,
    pub score: i32,
    pub wagons: TokenPool,
    pub boats: TokenPool,
    pub complete_destinations: Vec<DestinationCard>,
    pub incomplete_destinations: Vec<DestinationCard>,
    pub num_transport_cards: usize,
    pub hand: Option<Vec<TransportCard>>,
    pub staged: Option<Vec<TransportCard>>,
    pub ports: Vec<City>,
    pub captured_routes: Vec<RouteId>,
    pub turn_actions: TurnActions,
}

/// Encapsulates all the player information and actions.
///
/// The [`Player`] assumes, if called to do an action, that this is their turn.
/// Which actions are legal, and in which order, is decided by the [`crate::turn::TurnEngine`].
///
/// A [`Player`] is not aware of other players in this game: inter-player concerns
/// (unique colors, end of the game) are taken care of by the [`crate::session::GameSession`].
#[derive(Debug)]
pub struct Player {
    public: PublicPlayerState,
    private: PrivatePlayerState,
}

impl Player {
    /// Creates a new player, with all their tokens in the reserve and an empty hand.
    pub fn new(id: usize, color: PlayerColor, name: String, config: &RulesConfig) -> Self {
        Self {
            public: PublicPlayerState::new(id, color, name, config),
            private: PrivatePlayerState::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.public.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.public.name
    }

    #[inline]
    pub fn color(&self) -> PlayerColor {
        self.public.color
    }

    #[inline]
    pub fn score(&self) -> i32 {
        self.public.score
    }

    #[inline]
    pub fn tokens(&self) -> &TokenPools {
        &self.public.tokens
    }

    #[inline]
    pub fn hand(&self) -> &Hand {
        &self.private.hand
    }

    #[inline]
    pub fn destination_cards(&self) -> &[DestinationCard] {
        &self.public.destination_cards
    }

    #[inline]
    pub fn pending_destination_cards(&self) -> &[DestinationCard] {
        &self.private.pending_destination_cards
    }

    #[inline]
    pub fn claimed_routes(&self) -> &[ClaimedRoute] {
        &self.public.claimed_routes
    }

    #[inline]
    pub fn ports(&self) -> &[City] {
        &self.public.ports
    }

    #[inline]
    pub fn turn_actions(&self) -> &TurnActions {
        &self.public.turn_actions
    }

    /// Records an action: appended if it belongs to the same turn as the previous one,
    /// otherwise replaces the previous turn's actions.
    fn record_action(&mut self, turn: Option<usize>, action: PlayerAction, description: String) {
        log::info!("{}", description);

        let turn_actions = &mut self.public.turn_actions;
        if turn_actions.turn != turn || turn_actions.actions.is_empty() {
            turn_actions.turn = turn;
            turn_actions.actions.clear();
            turn_actions.description.clear();
        }

        turn_actions.actions.push(action);
        turn_actions.description.push(description);
    }

    /// Adds a freshly drawn card to the hand.
    pub fn receive_transport_card(&mut self, card: TransportCard) {
        self.private.hand.add(card);
    }

    /// Records that the player drew these cards this turn.
    ///
    /// Others learn from which decks the cards came, not their colors.
    pub fn drew_transport_cards(&mut self, turn: Option<usize>, cards: &[TransportCard]) {
        let num_wagons = cards
            .iter()
            .filter(|card| card.mode == TransportMode::Wagon)
            .count();
        let description = format!(
            "{} drew {} wagon cards and {} boat cards.",
            self.public.name,
            num_wagons,
            cards.len() - num_wagons
        );

        self.record_action(turn, PlayerAction::DrewTransportCards, description);
    }

    /// Splits the tokens between wagons and boats, once, before the first turn.
    ///
    /// See [`TokenPools::allocate`] for when this fails.
    pub fn allocate_tokens(&mut self, wagons: u8, boats: u8, config: &RulesConfig) -> RulesResult<()> {
        self.public.tokens.allocate(wagons, boats, config)?;

        let description = format!(
            "{} starts with {} wagons and {} boats.",
            self.public.name, wagons, boats
        );
        self.record_action(None, PlayerAction::AllocatedTokens, description);
        Ok(())
    }

    /// Brings `amount` tokens of mode `gain` from the reserve, sending back as many tokens of
    /// the other mode. Each traded token costs [`RulesConfig::exchange_penalty`] points.
    pub fn exchange_tokens(
        &mut self,
        gain: TransportMode,
        amount: u8,
        turn: usize,
        config: &RulesConfig,
    ) -> RulesResult<()> {
        self.public.tokens.exchange(gain, amount)?;

        let penalty = config.exchange_penalty * amount as i32;
        self.public.score -= penalty;

        let description = format!(
            "{} exchanged {} {} tokens for {} tokens (-{} points).",
            self.public.name,
            amount,
            gain.other(),
            gain,
            penalty
        );
        self.record_action(Some(turn), PlayerAction::ExchangedTokens, description);
        Ok(())
    }

    /// Draws up to `count` destination cards, and stores them as *pending*.
    ///
    /// Returns how many cards were drawn: fewer than `count` if the deck runs short.
    /// The player is expected to follow up with [`Player::select_destination_cards`].
    pub fn draw_destination_cards(
        &mut self,
        count: usize,
        deck: &mut impl DeckService,
    ) -> RulesResult<usize> {
        if !self.private.pending_destination_cards.is_empty() {
            return Err(RulesError::Invariant(format!(
                "{} drew destination cards before selecting the pending ones",
                self.public.name
            )));
        }

        for _ in 0..count {
            match deck.draw_destination() {
                Some(destination_card) => self.private.pending_destination_cards.push(destination_card),
                None => break,
            }
        }

        Ok(self.private.pending_destination_cards.len())
    }

    /// Selects which of the *pending* destination cards to keep.
    ///
    /// Returns an `Err`, leaving the pending cards untouched, if either:
    ///   * The given `decisions` don't have the same length as the pending set.
    ///   * The number of kept cards is out of the `draw` bounds for this many offered cards.
    ///
    /// Otherwise, moves kept cards to the player's destinations, returns the others to the
    /// bottom of the deck, and returns how many were kept.
    ///
    /// Both lists are ordered, so they map 1:1 based on their indices: if
    /// `decisions[i] == true`, then `pending[i]` is kept.
    pub fn select_destination_cards(
        &mut self,
        decisions: &[bool],
        draw: &DestinationDraw,
        turn: Option<usize>,
        deck: &mut impl DeckService,
    ) -> RulesResult<usize> {
        let num_offered = self.private.pending_destination_cards.len();
        if decisions.len() != num_offered {
            return Err(RulesError::DestinationDecisionsMismatch {
                submitted: decisions.len(),
                drawn: num_offered,
            });
        }

        let (min, max) = draw.bounds_for(num_offered);
        let kept = decisions.iter().filter(|decision| **decision).count();
        if kept < min || kept > max {
            return Err(RulesError::InvalidDestinationSelection { kept, min, max });
        }

        for (destination_card, keep) in self.private.pending_destination_cards.iter().zip(decisions) {
            if *keep && self.public.destination_cards.contains(destination_card) {
                return Err(RulesError::Invariant(format!(
                    "{} already holds destination {}",
                    self.public.name, destination_card
                )));
            }
        }

        let pending = std::mem::take(&mut self.private.pending_destination_cards);
        for (destination_card, keep) in pending.into_iter().zip(decisions) {
            if *keep {
                self.public.destination_cards.push(destination_card);
            } else {
                deck.return_destination(destination_card);
            }
        }

        let description = format!(
            "{} kept {} destination cards out of {}.",
            self.public.name, kept, num_offered
        );
        self.record_action(turn, PlayerAction::SelectedDestinationCards, description);
        Ok(kept)
    }

    /// Puts every pending destination card back at the bottom of the deck, unselected.
    pub fn return_pending_destination_cards(&mut self, deck: &mut impl DeckService) {
        for destination_card in self.private.pending_destination_cards.drain(..) {
            deck.return_destination(destination_card);
        }
    }

    /// How many cards in hand could pay for this route.
    #[inline]
    fn matching_cards(&self, route: &Route) -> u8 {
        self.private
            .hand
            .count(TransportCard::new(route.color, route.mode))
    }

    /// Whether the player could capture this route right now.
    #[inline]
    pub fn can_capture(&self, route: &Route) -> bool {
        self.check_capture(route).is_ok()
    }

    /// Returns an `Err` if either:
    ///   * The route is already owned.
    ///   * There are not enough active tokens of the route's mode.
    ///   * The hand holds fewer matching cards than the route's length.
    pub fn check_capture(&self, route: &Route) -> RulesResult<()> {
        if !route.is_free() {
            return Err(RulesError::AlreadyOwned(route.id));
        }

        let available = self.public.tokens.active(route.mode);
        if available < route.length {
            return Err(RulesError::NotEnoughTokens {
                route: route.id,
                mode: route.mode,
                needed: route.length,
                available,
            });
        }

        let available = self.matching_cards(route);
        if available < route.length {
            return Err(RulesError::NotEnoughCards {
                route: route.id,
                needed: route.length,
                available,
            });
        }

        Ok(())
    }

    /// Moves a card from the hand to the payment in progress.
    /// See [`Hand::stage`].
    pub fn stage_card(&mut self, staging: &mut Staging, card: TransportCard) -> RulesResult<()> {
        self.private.hand.stage(staging, card)
    }

    /// Abandons a payment in progress: staged cards go back to the hand.
    pub fn abort_staging(&mut self, staging: Staging) {
        self.private.hand.unstage(staging);
    }

    /// Try to capture a route, paying with the staged cards.
    ///
    /// Returns an `Err` if either:
    ///   * The route does not exist, or is already owned.
    ///   * The staged cards are not exactly a full payment for this route.
    ///   * There are not enough active tokens of the route's mode.
    ///
    /// On failure, the staged cards go back to the hand and nothing else changes.
    /// Otherwise, all at once: the route is owned, the tokens are placed, the staged cards
    /// leave play, and the route's points are added to the score.
    pub fn capture_route(
        &mut self,
        id: RouteId,
        staging: Staging,
        turn: usize,
        board: &mut Board,
        config: &RulesConfig,
    ) -> RulesResult<ClaimedRoute> {
        let claimed_route = match self.claim_and_place_tokens(id, &staging, board) {
            Ok(claimed_route) => claimed_route,
            Err(e) => {
                self.abort_staging(staging);
                return Err(e);
            }
        };

        let points = config.points_for_route(claimed_route.length);
        self.public.score += points;

        let (start, end) = &claimed_route.route;
        let description = format!(
            "{} has captured the {} route between {} and {} of length {} ({} points).",
            self.public.name, claimed_route.mode, start, end, claimed_route.length, points
        );
        self.record_action(Some(turn), PlayerAction::CapturedRoute, description);
        log::debug!("Discarded {} cards for {}.", staging.cards().len(), id);

        self.public.claimed_routes.push(claimed_route.clone());
        Ok(claimed_route)
    }

    fn claim_and_place_tokens(
        &mut self,
        id: RouteId,
        staging: &Staging,
        board: &mut Board,
    ) -> RulesResult<ClaimedRoute> {
        let route = board.check_claimable(id)?;

        let expected_payment = PaymentRequirement::Route {
            color: route.color,
            mode: route.mode,
            length: route.length,
        };
        if *staging.requirement() != expected_payment || !staging.is_complete() {
            return Err(RulesError::NotEnoughCards {
                route: id,
                needed: route.length,
                available: staging.cards().len() as u8,
            });
        }

        let available = self.public.tokens.active(route.mode);
        if available < route.length {
            return Err(RulesError::NotEnoughTokens {
                route: id,
                mode: route.mode,
                needed: route.length,
                available,
            });
        }

        let claimed_route = board.claim_route_for_player(id, self.public.id)?;
        if let Err(e) = self
            .public
            .tokens
            .spend(claimed_route.mode, claimed_route.length)
        {
            board.release_route(id);
            return Err(e);
        }

        Ok(claimed_route)
    }

    /// A payment for a port, if the hand can afford one.
    pub fn port_staging(&self, config: &RulesConfig) -> Option<Staging> {
        let colors = self
            .private
            .hand
            .colors_covering(config.port_wagon_cards, config.port_boat_cards);
        if colors.is_empty() {
            return None;
        }

        Some(Staging::new(PaymentRequirement::Port {
            wagons: config.port_wagon_cards,
            boats: config.port_boat_cards,
            colors,
        }))
    }

    /// Whether building a port is possible this turn, somewhere.
    pub fn can_build_port(&self, board: &Board, config: &RulesConfig) -> bool {
        self.public.ports.len() < config.max_ports
            && !board.free_ports_for(self.public.id).is_empty()
            && self.port_staging(config).is_some()
    }

    /// Try to build a port in `city`, paying with the staged cards.
    ///
    /// Returns an `Err` if either:
    ///   * The player already has [`RulesConfig::max_ports`] ports.
    ///   * The staged cards are not exactly a full payment for a port.
    ///   * The underlying [`Board::build_port`] disallows it.
    ///
    /// On failure, the staged cards go back to the hand and nothing else changes.
    pub fn build_port(
        &mut self,
        city: &City,
        staging: Staging,
        turn: usize,
        board: &mut Board,
        config: &RulesConfig,
    ) -> RulesResult<()> {
        let result = if self.public.ports.len() >= config.max_ports {
            Err(RulesError::TooManyPorts(config.max_ports))
        } else if !matches!(staging.requirement(), PaymentRequirement::Port { .. })
            || !staging.is_complete()
        {
            Err(RulesError::Invariant(format!(
                "a port in {} was paid with {} cards",
                city,
                staging.cards().len()
            )))
        } else {
            board.build_port(city, self.public.id)
        };

        if let Err(e) = result {
            self.abort_staging(staging);
            return Err(e);
        }

        self.public.ports.push(city.clone());
        let description = format!("{} has built a port in {}.", self.public.name, city);
        self.record_action(Some(turn), PlayerAction::BuiltPort, description);
        Ok(())
    }

    /// Destination cards, split between complete and incomplete ones.
    pub fn destinations_by_completion(
        &self,
        board: &Board,
    ) -> (Vec<&DestinationCard>, Vec<&DestinationCard>) {
        self.public
            .destination_cards
            .iter()
            .partition(|destination_card| board.is_complete(self.public.id, destination_card))
    }

    /// The score once the game is over.
    ///
    /// Adds to the accrued score:
    ///   * destination points, as a bonus if complete or a penalty otherwise;
    ///   * points for every port built, and a penalty for every port left unbuilt.
    ///
    /// Nothing is mutated: this can be called any number of times.
    pub fn final_score(&self, board: &Board, config: &RulesConfig) -> i32 {
        let (complete, incomplete) = self.destinations_by_completion(board);
        let bonus: i32 = complete
            .iter()
            .map(|destination_card| destination_card.points as i32 * config.destination_bonus_factor)
            .sum();
        let penalty: i32 = incomplete
            .iter()
            .map(|destination_card| {
                destination_card.points as i32 * config.destination_penalty_factor
            })
            .sum();

        let built_ports = self.public.ports.len();
        let unbuilt_ports = config.max_ports.saturating_sub(built_ports);

        self.public.score + bonus - penalty + built_ports as i32 * config.port_points
            - unbuilt_ports as i32 * config.unbuilt_port_penalty
    }

    /// Retrieve the player's state, from the perspective of player `viewer_id`.
    ///
    /// If `viewer_id` is not this player, the hand and the staged cards are left to `None`.
    /// `staging` is the payment in progress, if this is taken in the middle of one.
    pub fn get_player_snapshot(
        &self,
        viewer_id: usize,
        board: &Board,
        staging: Option<&Staging>,
    ) -> PlayerSnapshot {
        let is_viewer = viewer_id == self.public.id;
        let (complete, incomplete) = self.destinations_by_completion(board);

        PlayerSnapshot {
            id: self.public.id,
            name: self.public.name.clone(),
            color: self.public.color,
            score: self.public.score,
            wagons: *self.public.tokens.pool(TransportMode::Wagon),
            boats: *self.public.tokens.pool(TransportMode::Boat),
            complete_destinations: complete.into_iter().cloned().collect(),
            incomplete_destinations: incomplete.into_iter().cloned().collect(),
            num_transport_cards: self.private.hand.len(),
            hand: is_viewer.then(|| self.private.hand.sorted_cards()),
            staged: is_viewer.then(|| {
                let mut staged: Vec<_> = staging
                    .map(|staging| staging.cards().to_vec())
                    .unwrap_or_default();
                staged.sort();
                staged
            }),
            ports: self.public.ports.clone(),
            captured_routes: self.public.claimed_routes.iter().map(|route| route.id).collect(),
            turn_actions: self.public.turn_actions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::sample_map_data;
    use crate::card::{CardColor, CardDealer};
    use crate::destination_card;
    use pretty_assertions::assert_eq;

    const BLUE_WAGON: TransportCard = TransportCard::new(CardColor::Blue, TransportMode::Wagon);
    const BLUE_BOAT: TransportCard = TransportCard::new(CardColor::Blue, TransportMode::Boat);
    const RED_WAGON: TransportCard = TransportCard::new(CardColor::Red, TransportMode::Wagon);
    const RED_BOAT: TransportCard = TransportCard::new(CardColor::Red, TransportMode::Boat);

    struct Fixture {
        player: Player,
        board: Board,
        config: RulesConfig,
    }

    impl Fixture {
        fn new(wagons: u8, boats: u8, cards: &[TransportCard]) -> Self {
            let config = RulesConfig::default();
            let mut player = Player::new(0, PlayerColor::Green, String::from("Ada"), &config);
            player.allocate_tokens(wagons, boats, &config).unwrap();
            for card in cards {
                player.receive_transport_card(*card);
            }

            Self {
                player,
                board: Board::new(&sample_map_data()).unwrap(),
                config,
            }
        }

        fn stage_all(&mut self, route_id: u16) -> Staging {
            let route = self.board.route(RouteId(route_id)).unwrap();
            let card = TransportCard::new(route.color, route.mode);
            let mut staging = Staging::for_route(route);
            while !staging.is_complete() {
                self.player.stage_card(&mut staging, card).unwrap();
            }
            staging
        }

        fn capture(&mut self, route_id: u16) -> RulesResult<ClaimedRoute> {
            let staging = self.stage_all(route_id);
            self.player.capture_route(
                RouteId(route_id),
                staging,
                1,
                &mut self.board,
                &self.config,
            )
        }
    }

    // Tests for `PlayerColor` and `PlayerAction`.

    #[test]
    fn player_color_to_json() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&PlayerColor::Pink)?, r#""pink""#);
        assert_eq!(
            serde_json::from_str::<PlayerColor>(r#""yellow""#)?,
            PlayerColor::Yellow
        );
        Ok(())
    }

    #[test]
    fn player_action_to_json() -> serde_json::Result<()> {
        assert_eq!(
            serde_json::to_string(&PlayerAction::DrewTransportCards)?,
            r#""drew-transport-cards""#
        );
        assert_eq!(PlayerAction::BuiltPort.to_string(), "built-port");
        Ok(())
    }

    // Tests for `Player::allocate_tokens`.

    #[test]
    fn allocate_tokens_records_setup_action() {
        let fixture = Fixture::new(10, 50, &[]);
        let turn_actions = fixture.player.turn_actions();

        assert_eq!(turn_actions.turn, None);
        assert_eq!(
            turn_actions.actions.as_slice(),
            &[PlayerAction::AllocatedTokens]
        );
        assert_eq!(
            turn_actions.description[0],
            "Ada starts with 10 wagons and 50 boats."
        );
    }

    // Tests for `Player::capture_route`.

    #[test]
    fn capture_route() {
        let mut fixture = Fixture::new(20, 40, &[RED_WAGON, RED_WAGON, BLUE_BOAT]);

        let claimed_route = fixture.capture(2).unwrap();

        assert_eq!(claimed_route.id, RouteId(2));
        assert_eq!(fixture.board.route(RouteId(2)).unwrap().claimer(), Some(0));
        assert_eq!(fixture.player.tokens().active(TransportMode::Wagon), 18);
        assert_eq!(fixture.player.tokens().active(TransportMode::Boat), 40);
        assert_eq!(fixture.player.hand().sorted_cards(), vec![BLUE_BOAT]);
        assert_eq!(fixture.player.score(), 2);
        assert_eq!(fixture.player.claimed_routes(), &[claimed_route]);
        assert_eq!(
            fixture.player.turn_actions().description[0],
            "Ada has captured the wagon route between Dakar and Lagos of length 2 (2 points)."
        );
    }

    #[test]
    fn capture_route_uses_route_points_table() {
        let mut fixture = Fixture::new(20, 40, &[RED_WAGON, RED_WAGON]);
        fixture.config.route_points.insert(2, 5);

        fixture.capture(2).unwrap();
        assert_eq!(fixture.player.score(), 5);
    }

    #[test]
    fn capture_route_already_owned_restores_hand() {
        let mut fixture = Fixture::new(20, 40, &[RED_WAGON, RED_WAGON]);
        fixture.board.claim_route_for_player(RouteId(2), 1).unwrap();

        let route = fixture.board.route(RouteId(2)).unwrap();
        assert_eq!(
            fixture.player.check_capture(route),
            Err(RulesError::AlreadyOwned(RouteId(2)))
        );

        assert_eq!(
            fixture.capture(2),
            Err(RulesError::AlreadyOwned(RouteId(2)))
        );
        assert_eq!(fixture.player.hand().count(RED_WAGON), 2);
        assert_eq!(fixture.player.tokens().active(TransportMode::Wagon), 20);
        assert_eq!(fixture.player.score(), 0);
        assert_eq!(fixture.board.route(RouteId(2)).unwrap().claimer(), Some(1));
    }

    #[test]
    fn capture_route_with_partial_payment() {
        let mut fixture = Fixture::new(20, 40, &[RED_WAGON, RED_WAGON]);

        let route = fixture.board.route(RouteId(2)).unwrap();
        let mut staging = Staging::for_route(route);
        fixture.player.stage_card(&mut staging, RED_WAGON).unwrap();

        assert_eq!(
            fixture
                .player
                .capture_route(RouteId(2), staging, 1, &mut fixture.board, &fixture.config),
            Err(RulesError::NotEnoughCards {
                route: RouteId(2),
                needed: 2,
                available: 1
            })
        );
        assert_eq!(fixture.player.hand().count(RED_WAGON), 2);
        assert!(fixture.board.route(RouteId(2)).unwrap().is_free());
    }

    #[test]
    fn check_capture_not_enough_tokens() {
        let cards = [BLUE_WAGON; 3];
        let mut fixture = Fixture::new(10, 50, &cards);
        fixture.player.public.tokens.spend(TransportMode::Wagon, 8).unwrap();

        let route = fixture.board.route(RouteId(4)).unwrap();
        assert_eq!(
            fixture.player.check_capture(route),
            Err(RulesError::NotEnoughTokens {
                route: RouteId(4),
                mode: TransportMode::Wagon,
                needed: 3,
                available: 2,
            })
        );
        assert!(!fixture.player.can_capture(route));
    }

    #[test]
    fn check_capture_not_enough_cards() {
        let fixture = Fixture::new(10, 50, &[BLUE_BOAT, BLUE_BOAT, BLUE_WAGON]);

        let route = fixture.board.route(RouteId(1)).unwrap();
        assert_eq!(
            fixture.player.check_capture(route),
            Err(RulesError::NotEnoughCards {
                route: RouteId(1),
                needed: 3,
                available: 2,
            })
        );
    }

    #[test]
    fn capturable_routes_follow_hand_and_tokens() {
        let fixture = Fixture::new(10, 50, &[BLUE_BOAT, BLUE_BOAT, BLUE_BOAT, RED_WAGON]);

        let capturable: Vec<RouteId> = fixture
            .board
            .capturable_routes(&fixture.player)
            .iter()
            .map(|route| route.id)
            .collect();
        assert_eq!(capturable, vec![RouteId(1)]);
    }

    // Tests for `Player::exchange_tokens`.

    #[test]
    fn exchange_tokens_costs_points() {
        let mut fixture = Fixture::new(20, 40, &[]);

        assert_eq!(
            fixture
                .player
                .exchange_tokens(TransportMode::Wagon, 3, 4, &fixture.config),
            Ok(())
        );
        assert_eq!(fixture.player.tokens().active(TransportMode::Wagon), 23);
        assert_eq!(fixture.player.tokens().active(TransportMode::Boat), 37);
        assert_eq!(fixture.player.score(), -3);
        assert_eq!(fixture.player.turn_actions().turn, Some(4));
    }

    #[test]
    fn exchange_tokens_invalid_is_free() {
        let mut fixture = Fixture::new(10, 50, &[]);

        assert!(fixture
            .player
            .exchange_tokens(TransportMode::Boat, 1, 4, &fixture.config)
            .is_err());
        assert_eq!(fixture.player.score(), 0);
        assert_eq!(fixture.player.turn_actions().turn, None);
    }

    // Tests for destination cards.

    fn destination_deck() -> CardDealer {
        CardDealer::from_decks(
            vec![],
            vec![],
            vec![
                destination_card!("Lima", "Lagos", 8),
                destination_card!("Dakar", "Marseille", 5),
                destination_card!("Tokyo", "Lagos", 12),
                destination_card!("Sydney", "Marseille", 10),
                destination_card!("Lima", "Sydney", 11),
                destination_card!("Lagos", "Tokyo", 9),
            ],
        )
    }

    #[test]
    fn draw_and_select_destination_cards() {
        let mut fixture = Fixture::new(10, 50, &[]);
        let mut deck = destination_deck();
        let draw = fixture.config.initial_destinations;

        assert_eq!(fixture.player.draw_destination_cards(5, &mut deck), Ok(5));
        assert_eq!(deck.destinations_left(), 1);

        assert_eq!(
            fixture.player.select_destination_cards(
                &[true, false, true, false, true],
                &draw,
                None,
                &mut deck
            ),
            Ok(3)
        );

        // Two were returned: the deck shrank by exactly three.
        assert_eq!(deck.destinations_left(), 3);
        assert!(fixture.player.pending_destination_cards().is_empty());
        assert_eq!(
            fixture.player.destination_cards(),
            &[
                destination_card!("Lagos", "Tokyo", 9),
                destination_card!("Sydney", "Marseille", 10),
                destination_card!("Dakar", "Marseille", 5),
            ]
        );
    }

    #[test]
    fn select_wrong_number_of_destination_cards() {
        let mut fixture = Fixture::new(10, 50, &[]);
        let mut deck = destination_deck();
        let draw = fixture.config.initial_destinations;
        fixture.player.draw_destination_cards(5, &mut deck).unwrap();

        assert_eq!(
            fixture.player.select_destination_cards(
                &[true, true, true, true, false],
                &draw,
                None,
                &mut deck
            ),
            Err(RulesError::InvalidDestinationSelection {
                kept: 4,
                min: 3,
                max: 3
            })
        );
        assert_eq!(
            fixture
                .player
                .select_destination_cards(&[true, true], &draw, None, &mut deck),
            Err(RulesError::DestinationDecisionsMismatch {
                submitted: 2,
                drawn: 5
            })
        );

        assert_eq!(fixture.player.pending_destination_cards().len(), 5);
        assert_eq!(deck.destinations_left(), 1);
    }

    #[test]
    fn select_destination_cards_from_short_deck() {
        let mut fixture = Fixture::new(10, 50, &[]);
        let mut deck = CardDealer::from_decks(
            vec![],
            vec![],
            vec![destination_card!("Lima", "Lagos", 8)],
        );
        let draw = fixture.config.later_destinations;

        assert_eq!(fixture.player.draw_destination_cards(4, &mut deck), Ok(1));
        assert_eq!(
            fixture
                .player
                .select_destination_cards(&[true], &draw, Some(2), &mut deck),
            Ok(1)
        );
        assert_eq!(deck.destinations_left(), 0);
    }

    // Tests for ports.

    #[test]
    fn build_port() {
        let cards = [
            BLUE_BOAT, BLUE_BOAT, BLUE_BOAT, RED_WAGON, RED_WAGON, RED_BOAT, RED_BOAT,
        ];
        let mut fixture = Fixture::new(10, 50, &cards);
        fixture.capture(1).unwrap();
        assert!(fixture.player.can_build_port(&fixture.board, &fixture.config));

        let mut staging = fixture.player.port_staging(&fixture.config).unwrap();
        for card in [RED_WAGON, RED_BOAT, RED_WAGON, RED_BOAT] {
            fixture.player.stage_card(&mut staging, card).unwrap();
        }

        let dakar = City::from("Dakar");
        assert_eq!(
            fixture
                .player
                .build_port(&dakar, staging, 2, &mut fixture.board, &fixture.config),
            Ok(())
        );
        assert_eq!(fixture.player.ports(), &[dakar.clone()]);
        assert_eq!(fixture.board.port_owner(&dakar), Some(0));
        assert!(fixture.player.hand().is_empty());
        assert!(!fixture.player.can_build_port(&fixture.board, &fixture.config));
    }

    #[test]
    fn build_port_not_connected_restores_hand() {
        let cards = [RED_WAGON, RED_WAGON, RED_BOAT, RED_BOAT];
        let mut fixture = Fixture::new(10, 50, &cards);
        assert!(!fixture.player.can_build_port(&fixture.board, &fixture.config));

        let mut staging = fixture.player.port_staging(&fixture.config).unwrap();
        for card in cards {
            fixture.player.stage_card(&mut staging, card).unwrap();
        }

        let tokyo = City::from("Tokyo");
        assert_eq!(
            fixture
                .player
                .build_port(&tokyo, staging, 2, &mut fixture.board, &fixture.config),
            Err(RulesError::PortNotConnected(tokyo))
        );
        assert_eq!(fixture.player.hand().len(), 4);
        assert!(fixture.player.ports().is_empty());
    }

    #[test]
    fn port_staging_needs_one_color() {
        let fixture = Fixture::new(10, 50, &[RED_WAGON, RED_WAGON, BLUE_BOAT, BLUE_BOAT]);
        assert!(fixture.player.port_staging(&fixture.config).is_none());
    }

    // Tests for scoring.

    #[test]
    fn final_score() {
        let mut fixture = Fixture::new(20, 40, &[RED_WAGON, RED_WAGON]);
        fixture.player.public.destination_cards = vec![
            destination_card!("Dakar", "Lagos", 6),
            destination_card!("Lima", "Sydney", 11),
        ];
        fixture.capture(2).unwrap();

        // 2 for the route, +6 and -11 for destinations, -3 * 4 for unbuilt ports.
        assert_eq!(fixture.player.final_score(&fixture.board, &fixture.config), -15);
        // Idempotent.
        assert_eq!(fixture.player.final_score(&fixture.board, &fixture.config), -15);
        assert_eq!(fixture.player.score(), 2);
    }

    #[test]
    fn final_score_with_factors_and_ports() {
        let mut fixture = Fixture::new(20, 40, &[]);
        fixture.config.destination_bonus_factor = 2;
        fixture.config.destination_penalty_factor = 3;
        fixture.player.public.destination_cards = vec![destination_card!("Lima", "Sydney", 11)];
        fixture.player.public.ports = vec![City::from("Lima"), City::from("Tokyo")];

        // -33 for the destination, +20 for two ports, -4 for the unbuilt one.
        assert_eq!(fixture.player.final_score(&fixture.board, &fixture.config), -17);
    }

    // Tests for `Player::get_player_snapshot`.

    #[test]
    fn snapshot_hides_private_state_from_others() {
        let mut fixture = Fixture::new(20, 40, &[RED_WAGON, RED_WAGON, BLUE_BOAT]);
        fixture.player.public.destination_cards = vec![destination_card!("Dakar", "Lagos", 6)];
        fixture.capture(2).unwrap();

        let own = fixture.player.get_player_snapshot(0, &fixture.board, None);
        assert_eq!(own.hand, Some(vec![BLUE_BOAT]));
        assert_eq!(own.staged, Some(vec![]));
        assert_eq!(own.num_transport_cards, 1);
        assert_eq!(own.captured_routes, vec![RouteId(2)]);
        assert_eq!(
            own.complete_destinations,
            vec![destination_card!("Dakar", "Lagos", 6)]
        );
        assert_eq!(own.wagons.active, 18);
        assert_eq!(own.wagons.placed, 2);

        let other = fixture.player.get_player_snapshot(1, &fixture.board, None);
        assert_eq!(other.hand, None);
        assert_eq!(other.staged, None);
        assert_eq!(other.num_transport_cards, 1);
        assert_eq!(other.score, own.score);
    }

    #[test]
    fn snapshot_during_a_payment() {
        let mut fixture = Fixture::new(20, 40, &[RED_WAGON, RED_WAGON, BLUE_BOAT]);
        let mut staging = Staging::for_route(fixture.board.route(RouteId(2)).unwrap());
        fixture.player.stage_card(&mut staging, RED_WAGON).unwrap();

        let own = fixture.player.get_player_snapshot(0, &fixture.board, Some(&staging));
        assert_eq!(own.hand, Some(vec![BLUE_BOAT, RED_WAGON]));
        assert_eq!(own.staged, Some(vec![RED_WAGON]));
        assert_eq!(own.num_transport_cards, 2);

        let other = fixture.player.get_player_snapshot(1, &fixture.board, Some(&staging));
        assert_eq!(other.staged, None);

        fixture.player.abort_staging(staging);
        assert_eq!(fixture.player.hand().len(), 3);
    }
}
