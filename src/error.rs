use crate::board::RouteId;
use crate::card::TransportMode;
use crate::city::City;

use thiserror::Error;

/// All fallible engine operations share this `Result`.
pub type RulesResult<T> = Result<T, RulesError>;

/// Why an operation was refused.
///
/// Most variants are *illegal action attempts*: each is reported synchronously, nothing has been
/// mutated, and the player keeps their turn.
///
/// [`RulesError::InteractionClosed`] is reported by the interaction collaborator when it can no
/// longer answer. Any payment in progress is rolled back before it bubbles up.
///
/// [`RulesError::Invariant`] means the engine itself is inconsistent, and should never be
/// reachable from player input alone.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RulesError {
    #[error("No route exists with id {0}.")]
    UnknownRoute(RouteId),
    #[error("The route {0} is already owned.")]
    AlreadyOwned(RouteId),
    #[error("Cannot capture route {route} with {needed} {mode} tokens, whilst having only {available} left.")]
    NotEnoughTokens {
        route: RouteId,
        mode: TransportMode,
        needed: u8,
        available: u8,
    },
    #[error("Cannot capture route {route}: it needs {needed} matching cards, but only {available} are in hand.")]
    NotEnoughCards {
        route: RouteId,
        needed: u8,
        available: u8,
    },
    #[error("Cannot pay with a {card}: {reason}.")]
    MismatchedCard { card: String, reason: String },
    #[error("There is no {0} card left in hand.")]
    CardNotInHand(String),
    #[error("{0} is not a port city.")]
    NotAPortCity(City),
    #[error("A port was already built in {0}.")]
    PortAlreadyBuilt(City),
    #[error("Cannot build a port in {0} without owning a route that reaches it.")]
    PortNotConnected(City),
    #[error("Cannot build more than {0} ports.")]
    TooManyPorts(usize),
    #[error("Cannot exchange {amount} tokens: {reason}.")]
    InvalidExchange { amount: u8, reason: String },
    #[error("Cannot allocate {wagons} wagons and {boats} boats: {reason}.")]
    InvalidAllocation { wagons: u8, boats: u8, reason: String },
    #[error("Submitted {submitted} destination cards decisions, but {drawn} were drawn.")]
    DestinationDecisionsMismatch { submitted: usize, drawn: usize },
    #[error("Cannot keep {kept} destinations: between {min} and {max} must be kept.")]
    InvalidDestinationSelection { kept: usize, min: usize, max: usize },
    #[error("Invalid map: {0}")]
    InvalidMap(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Cannot create a game with {0} players: one must have at least two, and at most five players.")]
    InvalidPlayerCount(usize),
    #[error("Cannot use color `{0}` for two players.")]
    DuplicatePlayerColor(String),
    #[error("Cannot {0} in the current game phase.")]
    WrongPhase(&'static str),
    #[error("The player interaction was closed before an answer was given.")]
    InteractionClosed,
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

impl RulesError {
    /// Whether this error reveals an engine bug rather than an illegal attempt.
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(self, RulesError::Invariant(_))
    }

    /// Whether the player can simply be asked again after this error.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RulesError::Invariant(_) | RulesError::InteractionClosed)
    }
}
