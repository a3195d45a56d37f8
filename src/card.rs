use crate::city::CityToCity;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::iter::repeat;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

const NUM_WAGON_CARDS_PER_COLOR: usize = 10;
const NUM_BOAT_CARDS_PER_COLOR: usize = 12;

/// Colors of transport cards and routes.
///
/// A card pays for a route only if both colors are strictly equal: there is no wild card.
#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CardColor {
    Black,
    Blue,
    Green,
    Purple,
    Red,
    White,
    Yellow,
}

/// Whether a card, route or token travels on land or at sea.
#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportMode {
    /// Land routes, paid with wagon cards and wagon tokens.
    Wagon,
    /// Sea routes, paid with boat cards and boat tokens.
    Boat,
}

impl TransportMode {
    /// The other mode.
    ///
    /// # Examples:
    /// ```
    /// use rails_and_sails::card::TransportMode;
    ///
    /// assert_eq!(TransportMode::Wagon.other(), TransportMode::Boat);
    /// assert_eq!(TransportMode::Boat.other(), TransportMode::Wagon);
    /// ```
    #[inline]
    pub fn other(self) -> Self {
        match self {
            TransportMode::Wagon => TransportMode::Boat,
            TransportMode::Boat => TransportMode::Wagon,
        }
    }
}

/// A transport card: what players spend to capture routes and build ports.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct TransportCard {
    pub color: CardColor,
    pub mode: TransportMode,
}

impl TransportCard {
    #[inline]
    pub const fn new(color: CardColor, mode: TransportMode) -> Self {
        Self { color, mode }
    }

    /// Every kind of card that exists, in a stable order.
    pub fn all_kinds() -> impl Iterator<Item = TransportCard> {
        TransportMode::iter()
            .flat_map(|mode| CardColor::iter().map(move |color| TransportCard::new(color, mode)))
    }
}

impl fmt::Display for TransportCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.mode)
    }
}

/// Encapsulates information about a destination card.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct DestinationCard {
    /// The two cities that must be connected to fulfill the destination card.
    pub destination: CityToCity,
    /// How many points are granted once this card is fulfilled.
    /// If not fulfilled, points are rather substracted.
    pub points: u8,
}

impl fmt::Display for DestinationCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({})",
            self.destination.0, self.destination.1, self.points
        )
    }
}

/// Convenience macro to generate a destination card.
#[macro_export]
macro_rules! destination_card {
    ($start:expr, $end:expr, $points:literal) => {
        $crate::card::DestinationCard {
            destination: (
                $crate::city::City::from($start),
                $crate::city::City::from($end),
            ),
            points: $points,
        }
    };
}

/// Where transport and destination cards come from.
///
/// The engine only needs "draw the next card" semantics; shuffling and refilling are
/// the implementor's business. Running out of cards is not an error: draws simply
/// return `None`.
pub trait DeckService {
    fn draw_card(&mut self, mode: TransportMode) -> Option<TransportCard>;

    fn has_cards(&self, mode: TransportMode) -> bool;

    fn draw_destination(&mut self) -> Option<DestinationCard>;

    /// Puts a destination back, such that it can be drawn again later.
    fn return_destination(&mut self, destination: DestinationCard);

    fn destinations_left(&self) -> usize;
}

/// Public information about the decks.
#[derive(Debug, PartialEq, Serialize)]
pub struct CardDealerState {
    pub wagon_card_deck_size: usize,
    pub boat_card_deck_size: usize,
    pub destination_card_deck_size: usize,
}

/// Default [`DeckService`]: shuffled decks held in memory.
///
/// Cards spent on routes and ports leave play, so decks only ever shrink,
/// except for destinations that players put back.
#[derive(Debug)]
pub struct CardDealer {
    wagon_card_deck: Vec<TransportCard>,
    boat_card_deck: Vec<TransportCard>,
    destination_card_deck: VecDeque<DestinationCard>,
}

impl CardDealer {
    /// Creates a new `CardDealer` with the standard composition of transport cards,
    /// and the given destinations, all shuffled.
    ///
    /// # Example
    /// ```
    /// use rails_and_sails::card::{CardDealer, DeckService, TransportMode};
    /// use rails_and_sails::destination_card;
    /// use rand::SeedableRng;
    ///
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    /// let mut card_dealer = CardDealer::new(vec![destination_card!("Lima", "Dakar", 9)], &mut rng);
    ///
    /// assert!(card_dealer.draw_card(TransportMode::Boat).is_some());
    /// assert_eq!(card_dealer.destinations_left(), 1);
    /// ```
    pub fn new(mut destinations: Vec<DestinationCard>, rng: &mut impl Rng) -> Self {
        let mut wagon_card_deck = Self::generate_cards(TransportMode::Wagon, NUM_WAGON_CARDS_PER_COLOR);
        let mut boat_card_deck = Self::generate_cards(TransportMode::Boat, NUM_BOAT_CARDS_PER_COLOR);

        wagon_card_deck.shuffle(rng);
        boat_card_deck.shuffle(rng);
        destinations.shuffle(rng);

        Self::from_decks(wagon_card_deck, boat_card_deck, destinations)
    }

    /// Creates a `CardDealer` with decks in the given order.
    /// The last element of each vector is the top of its deck.
    pub fn from_decks(
        wagon_card_deck: Vec<TransportCard>,
        boat_card_deck: Vec<TransportCard>,
        destinations: Vec<DestinationCard>,
    ) -> Self {
        Self {
            wagon_card_deck,
            boat_card_deck,
            destination_card_deck: VecDeque::from(destinations),
        }
    }

    fn generate_cards(mode: TransportMode, per_color: usize) -> Vec<TransportCard> {
        let mut cards = Vec::with_capacity(per_color * CardColor::iter().count());
        for color in CardColor::iter() {
            cards.extend(repeat(TransportCard::new(color, mode)).take(per_color));
        }
        cards
    }

    #[inline]
    fn deck(&self, mode: TransportMode) -> &Vec<TransportCard> {
        match mode {
            TransportMode::Wagon => &self.wagon_card_deck,
            TransportMode::Boat => &self.boat_card_deck,
        }
    }

    #[inline]
    fn deck_mut(&mut self, mode: TransportMode) -> &mut Vec<TransportCard> {
        match mode {
            TransportMode::Wagon => &mut self.wagon_card_deck,
            TransportMode::Boat => &mut self.boat_card_deck,
        }
    }

    /// Accessor to a transport card deck.
    ///
    /// Should only be used for testing!
    pub fn get_card_deck(&self, mode: TransportMode) -> &Vec<TransportCard> {
        self.deck(mode)
    }

    /// Accessor to the destination card deck.
    ///
    /// Should only be used for testing!
    pub fn get_destination_card_deck(&self) -> &VecDeque<DestinationCard> {
        &self.destination_card_deck
    }

    pub fn get_state(&self) -> CardDealerState {
        CardDealerState {
            wagon_card_deck_size: self.wagon_card_deck.len(),
            boat_card_deck_size: self.boat_card_deck.len(),
            destination_card_deck_size: self.destination_card_deck.len(),
        }
    }
}

impl DeckService for CardDealer {
    fn draw_card(&mut self, mode: TransportMode) -> Option<TransportCard> {
        self.deck_mut(mode).pop()
    }

    fn has_cards(&self, mode: TransportMode) -> bool {
        !self.deck(mode).is_empty()
    }

    /// Draws from the top of the destination cards deck.
    fn draw_destination(&mut self) -> Option<DestinationCard> {
        self.destination_card_deck.pop_back()
    }

    /// Returned destinations go to the bottom of the deck.
    ///
    /// If players go through all the other destination cards, they will cycle through
    /// the returned ones.
    fn return_destination(&mut self, destination: DestinationCard) {
        self.destination_card_deck.push_front(destination);
    }

    fn destinations_left(&self) -> usize {
        self.destination_card_deck.len()
    }
}
