use crate::error::{RulesError, RulesResult};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many destination cards are offered, and how many of them must be kept.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct DestinationDraw {
    pub draw: usize,
    pub keep_min: usize,
    pub keep_max: usize,
}

impl DestinationDraw {
    /// Keep bounds once we know how many cards were actually offered.
    /// The deck may run short, in which case the minimum shrinks to what is available.
    pub fn bounds_for(&self, offered: usize) -> (usize, usize) {
        let keep_max = self.keep_max.min(offered);
        (self.keep_min.min(keep_max), keep_max)
    }
}

/// All the tunables of the rules.
///
/// Defaults reproduce the standard game. Any subset can be overridden from JSON, e.g.
///
/// ```
/// use rails_and_sails::config::RulesConfig;
///
/// let config = RulesConfig::from_json(r#"{"exchange_penalty": 2, "max_ports": 2}"#).unwrap();
/// assert_eq!(config.exchange_penalty, 2);
/// assert_eq!(config.max_tokens, 60);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Total of active tokens a player starts with, summed over wagons and boats.
    pub max_tokens: u8,
    /// Wagons each player has in the box before the initial allocation.
    pub max_wagon_reserve: u8,
    /// Boats each player has in the box before the initial allocation.
    pub max_boat_reserve: u8,
    pub initial_wagon_cards: usize,
    pub initial_boat_cards: usize,
    pub initial_destinations: DestinationDraw,
    pub later_destinations: DestinationDraw,
    pub cards_per_draw: usize,
    /// Points lost per token traded between wagons and boats.
    pub exchange_penalty: i32,
    /// Points rewarded for a captured route, by length. Missing lengths reward their length.
    pub route_points: BTreeMap<u8, i32>,
    pub destination_bonus_factor: i32,
    pub destination_penalty_factor: i32,
    pub max_ports: usize,
    pub port_wagon_cards: usize,
    pub port_boat_cards: usize,
    pub port_points: i32,
    pub unbuilt_port_penalty: i32,
    /// Once a player's active tokens fall to this total, everyone plays one last turn.
    pub end_game_token_threshold: u8,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            max_tokens: 60,
            max_wagon_reserve: 25,
            max_boat_reserve: 50,
            initial_wagon_cards: 3,
            initial_boat_cards: 7,
            initial_destinations: DestinationDraw {
                draw: 5,
                keep_min: 3,
                keep_max: 3,
            },
            later_destinations: DestinationDraw {
                draw: 4,
                keep_min: 1,
                keep_max: 4,
            },
            cards_per_draw: 2,
            exchange_penalty: 1,
            route_points: BTreeMap::new(),
            destination_bonus_factor: 1,
            destination_penalty_factor: 1,
            max_ports: 3,
            port_wagon_cards: 2,
            port_boat_cards: 2,
            port_points: 10,
            unbuilt_port_penalty: 4,
            end_game_token_threshold: 6,
        }
    }
}

impl RulesConfig {
    /// Parses a (partial) configuration and validates it.
    pub fn from_json(json: &str) -> RulesResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RulesError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Points rewarded for capturing a route of the given length.
    #[inline]
    pub fn points_for_route(&self, length: u8) -> i32 {
        self.route_points
            .get(&length)
            .copied()
            .unwrap_or(length as i32)
    }

    pub fn validate(&self) -> RulesResult<()> {
        let reachable = self.max_wagon_reserve as u16 + self.max_boat_reserve as u16;
        if reachable < self.max_tokens as u16 {
            return Err(RulesError::InvalidConfig(format!(
                "reserves of {} wagons and {} boats cannot cover {} tokens",
                self.max_wagon_reserve, self.max_boat_reserve, self.max_tokens
            )));
        }

        for (length, points) in &self.route_points {
            if *points < *length as i32 {
                return Err(RulesError::InvalidConfig(format!(
                    "a route of length {} must reward at least {} points, not {}",
                    length, length, points
                )));
            }
        }

        for (name, draw) in [
            ("initial", &self.initial_destinations),
            ("later", &self.later_destinations),
        ] {
            if draw.keep_min > draw.keep_max || draw.keep_max > draw.draw || draw.draw == 0 {
                return Err(RulesError::InvalidConfig(format!(
                    "{} destinations must keep between {} and {} out of {}",
                    name, draw.keep_min, draw.keep_max, draw.draw
                )));
            }
        }

        if self.cards_per_draw == 0 {
            return Err(RulesError::InvalidConfig(String::from(
                "a draw must yield at least one card",
            )));
        }

        if self.exchange_penalty < 0 {
            return Err(RulesError::InvalidConfig(String::from(
                "the exchange penalty cannot be negative",
            )));
        }

        Ok(())
    }
}
