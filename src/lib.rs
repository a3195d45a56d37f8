pub mod board;
pub mod card;
pub mod city;
pub mod config;
pub mod error;
pub mod hand;
pub mod interaction;
pub mod player;
pub mod session;
pub mod tokens;
pub mod turn;

#[cfg(test)]
mod scenario_tests;

#[macro_use]
extern crate smallvec;
