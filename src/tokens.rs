use crate::card::TransportMode;
use crate::config::RulesConfig;
use crate::error::{RulesError, RulesResult};

use serde::Serialize;
use std::ops::RangeInclusive;

/// A player's tokens of a single mode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct TokenPool {
    /// Tokens that can still be placed on the board.
    pub active: u8,
    /// Tokens left in the box.
    pub reserve: u8,
    /// Tokens sitting on captured routes. They never come back.
    pub placed: u8,
}

impl TokenPool {
    #[inline]
    fn total(&self) -> u16 {
        self.active as u16 + self.reserve as u16 + self.placed as u16
    }
}

/// Wagon and boat tokens of one player.
///
/// For each mode, `active + reserve + placed` stays equal to the amount the player was
/// given at the start of the game. Every mutation re-checks this and reports a
/// [`RulesError::Invariant`] rather than leaving a drifted state behind.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TokenPools {
    wagons: TokenPool,
    boats: TokenPool,
    #[serde(skip)]
    wagon_total: u8,
    #[serde(skip)]
    boat_total: u8,
}

impl TokenPools {
    /// All tokens start in the reserve; nothing is active until [`TokenPools::allocate`].
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            wagons: TokenPool {
                reserve: config.max_wagon_reserve,
                ..TokenPool::default()
            },
            boats: TokenPool {
                reserve: config.max_boat_reserve,
                ..TokenPool::default()
            },
            wagon_total: config.max_wagon_reserve,
            boat_total: config.max_boat_reserve,
        }
    }

    #[inline]
    pub fn pool(&self, mode: TransportMode) -> &TokenPool {
        match mode {
            TransportMode::Wagon => &self.wagons,
            TransportMode::Boat => &self.boats,
        }
    }

    #[inline]
    fn pool_mut(&mut self, mode: TransportMode) -> &mut TokenPool {
        match mode {
            TransportMode::Wagon => &mut self.wagons,
            TransportMode::Boat => &mut self.boats,
        }
    }

    #[inline]
    fn total(&self, mode: TransportMode) -> u8 {
        match mode {
            TransportMode::Wagon => self.wagon_total,
            TransportMode::Boat => self.boat_total,
        }
    }

    #[inline]
    pub fn active(&self, mode: TransportMode) -> u8 {
        self.pool(mode).active
    }

    #[inline]
    pub fn reserve(&self, mode: TransportMode) -> u8 {
        self.pool(mode).reserve
    }

    /// Active wagons and boats together.
    #[inline]
    pub fn total_active(&self) -> u16 {
        self.wagons.active as u16 + self.boats.active as u16
    }

    /// Whether the initial allocation has happened.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.total_active() > 0 || self.wagons.placed > 0 || self.boats.placed > 0
    }

    /// Acceptable amounts of active wagons and boats for the initial allocation.
    ///
    /// # Example
    /// ```
    /// use rails_and_sails::config::RulesConfig;
    /// use rails_and_sails::tokens::TokenPools;
    ///
    /// let (wagons, boats) = TokenPools::allocation_bounds(&RulesConfig::default());
    /// assert_eq!(wagons, 10..=25);
    /// assert_eq!(boats, 35..=50);
    /// ```
    pub fn allocation_bounds(config: &RulesConfig) -> (RangeInclusive<u8>, RangeInclusive<u8>) {
        (
            config.max_tokens.saturating_sub(config.max_boat_reserve)..=config.max_wagon_reserve,
            config.max_tokens.saturating_sub(config.max_wagon_reserve)..=config.max_boat_reserve,
        )
    }

    /// Moves the chosen amounts of wagons and boats from the reserve to the active pools.
    ///
    /// Returns an `Err` if either:
    ///   * The allocation already happened.
    ///   * One of the amounts is out of [`TokenPools::allocation_bounds`].
    ///   * Both amounts do not add up to the configured maximum.
    pub fn allocate(&mut self, wagons: u8, boats: u8, config: &RulesConfig) -> RulesResult<()> {
        let invalid = |reason: String| RulesError::InvalidAllocation {
            wagons,
            boats,
            reason,
        };

        if self.is_allocated() {
            return Err(RulesError::Invariant(String::from(
                "tokens were already allocated",
            )));
        }

        let (wagon_bounds, boat_bounds) = Self::allocation_bounds(config);
        if !wagon_bounds.contains(&wagons) || !boat_bounds.contains(&boats) {
            return Err(invalid(format!(
                "wagons must be within {:?} and boats within {:?}",
                wagon_bounds, boat_bounds
            )));
        }

        if wagons as u16 + boats as u16 != config.max_tokens as u16 {
            return Err(invalid(format!(
                "the total must be exactly {}",
                config.max_tokens
            )));
        }

        self.wagons.active = wagons;
        self.wagons.reserve -= wagons;
        self.boats.active = boats;
        self.boats.reserve -= boats;

        self.check_invariants()
    }

    /// Whether `amount` tokens of this mode can be placed on the board.
    #[inline]
    pub fn can_spend(&self, mode: TransportMode, amount: u8) -> bool {
        self.active(mode) >= amount
    }

    /// Places `amount` active tokens on the board.
    ///
    /// Callers must check [`TokenPools::can_spend`] beforehand: failing here is an engine bug.
    pub fn spend(&mut self, mode: TransportMode, amount: u8) -> RulesResult<()> {
        if !self.can_spend(mode, amount) {
            return Err(RulesError::Invariant(format!(
                "spending {} {} tokens with only {} active",
                amount,
                mode,
                self.active(mode)
            )));
        }

        let pool = self.pool_mut(mode);
        pool.active -= amount;
        pool.placed += amount;

        self.check_invariants()
    }

    /// The largest exchange that brings `gain` tokens from the reserve,
    /// sending back as many active tokens of the other mode.
    #[inline]
    pub fn max_exchange(&self, gain: TransportMode) -> u8 {
        self.reserve(gain).min(self.active(gain.other()))
    }

    /// Takes `amount` tokens of mode `gain` out of the reserve, and puts back as many
    /// active tokens of the other mode into the reserve.
    ///
    /// Scoring the exchange is up to the caller.
    pub fn exchange(&mut self, gain: TransportMode, amount: u8) -> RulesResult<()> {
        let max_exchange = self.max_exchange(gain);
        if amount == 0 || amount > max_exchange {
            return Err(RulesError::InvalidExchange {
                amount,
                reason: format!(
                    "at most {} {} tokens can be exchanged right now",
                    max_exchange, gain
                ),
            });
        }

        let gained = self.pool_mut(gain);
        gained.reserve -= amount;
        gained.active += amount;

        let given = self.pool_mut(gain.other());
        given.active -= amount;
        given.reserve += amount;

        self.check_invariants()
    }

    /// Verifies that no tokens were created or lost, for both modes.
    pub fn check_invariants(&self) -> RulesResult<()> {
        for mode in [TransportMode::Wagon, TransportMode::Boat] {
            let pool = self.pool(mode);
            if pool.total() != self.total(mode) as u16 {
                return Err(RulesError::Invariant(format!(
                    "{} tokens add up to {} instead of {}",
                    mode,
                    pool.total(),
                    self.total(mode)
                )));
            }
        }

        Ok(())
    }
}
