use serde::{Deserialize, Serialize};
use std::fmt;

/// A city on the map.
///
/// The map itself is supplied as data (see [`crate::board::MapData`]), so cities are
/// identified by their display name rather than by a fixed enumeration.
///
/// # JSON
/// Cities are serialized as a plain string.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct City(String);

impl City {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for City {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Top-level representation of a connection between two cities.
pub type CityToCity = (City, City);
