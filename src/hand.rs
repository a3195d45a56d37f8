use crate::board::Route;
use crate::card::{CardColor, TransportCard, TransportMode};
use crate::error::{RulesError, RulesResult};

use smallvec::SmallVec;
use std::collections::HashMap;
use strum::IntoEnumIterator;

/// The transport cards a player holds.
///
/// Maps each kind of card to how many of it the player has.
/// It is guaranteed that the map has at all times entries for all kinds of cards.
#[derive(Clone, Debug, PartialEq)]
pub struct Hand {
    cards: HashMap<TransportCard, u8>,
}

impl Default for Hand {
    fn default() -> Self {
        Self::new()
    }
}

impl Hand {
    pub fn new() -> Self {
        Self {
            cards: HashMap::from_iter(TransportCard::all_kinds().map(|card| (card, 0))),
        }
    }

    pub fn add(&mut self, card: TransportCard) {
        self.cards
            .entry(card)
            .and_modify(|count| *count = count.saturating_add(1));
    }

    #[inline]
    pub fn count(&self, card: TransportCard) -> u8 {
        self.cards.get(&card).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.cards.values().map(|count| *count as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The kinds of cards held at least once, in a stable order.
    pub fn kinds(&self) -> Vec<TransportCard> {
        TransportCard::all_kinds()
            .filter(|card| self.count(*card) > 0)
            .collect()
    }

    /// Every card held, sorted.
    pub fn sorted_cards(&self) -> Vec<TransportCard> {
        let mut cards = Vec::with_capacity(self.len());
        for card in self.kinds() {
            cards.extend(std::iter::repeat(card).take(self.count(card) as usize));
        }
        cards.sort();
        cards
    }

    /// Colors for which the hand holds at least `wagons` wagon cards and `boats` boat cards.
    pub fn colors_covering(&self, wagons: usize, boats: usize) -> SmallVec<[CardColor; 7]> {
        CardColor::iter()
            .filter(|color| {
                self.count(TransportCard::new(*color, TransportMode::Wagon)) as usize >= wagons
                    && self.count(TransportCard::new(*color, TransportMode::Boat)) as usize >= boats
            })
            .collect()
    }

    /// Moves one card from the hand into the staging area.
    ///
    /// Returns an `Err`, without touching either the hand or the staging area, if either:
    ///   * The staging area refuses this card (see [`Staging::check`]).
    ///   * The hand holds no such card.
    pub fn stage(&mut self, staging: &mut Staging, card: TransportCard) -> RulesResult<()> {
        staging.check(card)?;

        match self.cards.get_mut(&card) {
            Some(count) if *count > 0 => {
                *count -= 1;
                staging.cards.push(card);
                Ok(())
            }
            _ => Err(RulesError::CardNotInHand(card.to_string())),
        }
    }

    /// Gives staged cards back to the hand, when a payment is abandoned.
    pub fn unstage(&mut self, staging: Staging) {
        for card in staging.cards {
            self.add(card);
        }
    }
}

/// What a payment must consist of.
#[derive(Clone, Debug, PartialEq)]
pub enum PaymentRequirement {
    /// `length` cards of exactly this color and mode.
    Route {
        color: CardColor,
        mode: TransportMode,
        length: u8,
    },
    /// `wagons` wagon cards and `boats` boat cards, all of one of the `colors`.
    Port {
        wagons: usize,
        boats: usize,
        colors: SmallVec<[CardColor; 7]>,
    },
}

/// Cards set aside to pay for the action in progress.
///
/// Owned by that action only: on commit the cards leave play, on abort they go back to
/// the hand through [`Hand::unstage`].
#[derive(Clone, Debug, PartialEq)]
pub struct Staging {
    requirement: PaymentRequirement,
    cards: SmallVec<[TransportCard; 8]>,
}

impl Staging {
    pub fn new(requirement: PaymentRequirement) -> Self {
        Self {
            requirement,
            cards: SmallVec::new(),
        }
    }

    pub fn for_route(route: &Route) -> Self {
        Self::new(PaymentRequirement::Route {
            color: route.color,
            mode: route.mode,
            length: route.length,
        })
    }

    #[inline]
    pub fn requirement(&self) -> &PaymentRequirement {
        &self.requirement
    }

    #[inline]
    pub fn cards(&self) -> &[TransportCard] {
        &self.cards
    }

    /// Consumes the staging area once the payment is committed.
    pub fn into_cards(self) -> SmallVec<[TransportCard; 8]> {
        self.cards
    }

    fn staged_of_mode(&self, mode: TransportMode) -> usize {
        self.cards.iter().filter(|card| card.mode == mode).count()
    }

    /// Whether this card may be added to the payment right now.
    pub fn check(&self, card: TransportCard) -> RulesResult<()> {
        let mismatch = |reason: String| RulesError::MismatchedCard {
            card: card.to_string(),
            reason,
        };

        match &self.requirement {
            PaymentRequirement::Route {
                color,
                mode,
                length,
            } => {
                if card.mode != *mode || card.color != *color {
                    return Err(mismatch(format!("the route needs {} {} cards", color, mode)));
                }
                if self.cards.len() >= *length as usize {
                    return Err(mismatch(String::from("the route is already paid")));
                }
            }
            PaymentRequirement::Port {
                wagons,
                boats,
                colors,
            } => {
                if let Some(first) = self.cards.first() {
                    if first.color != card.color {
                        return Err(mismatch(format!(
                            "the port is being paid with {} cards",
                            first.color
                        )));
                    }
                } else if !colors.contains(&card.color) {
                    return Err(mismatch(format!(
                        "there are not enough {} cards to pay for a port",
                        card.color
                    )));
                }

                let quota = match card.mode {
                    TransportMode::Wagon => *wagons,
                    TransportMode::Boat => *boats,
                };
                if self.staged_of_mode(card.mode) >= quota {
                    return Err(mismatch(format!(
                        "the port needs only {} {} cards",
                        quota, card.mode
                    )));
                }
            }
        }

        Ok(())
    }

    /// Whether the payment is complete.
    pub fn is_complete(&self) -> bool {
        match &self.requirement {
            PaymentRequirement::Route { length, .. } => self.cards.len() == *length as usize,
            PaymentRequirement::Port { wagons, boats, .. } => {
                self.staged_of_mode(TransportMode::Wagon) == *wagons
                    && self.staged_of_mode(TransportMode::Boat) == *boats
            }
        }
    }
}
