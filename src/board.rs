use crate::card::{CardColor, DestinationCard, TransportMode};
use crate::city::{City, CityToCity};
use crate::error::{RulesError, RulesResult};
use crate::player::Player;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

/// Identifies a route on the board.
///
/// # JSON
/// Serialized as its bare number, and displayed as `R<number>`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RouteId(pub u16);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A route, as described in the map data.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RouteData {
    pub id: RouteId,
    pub cities: [City; 2],
    pub length: u8,
    pub color: CardColor,
    pub mode: TransportMode,
}

/// Static description of a map: its routes, port cities and destination cards.
///
/// # JSON
/// ```
/// use rails_and_sails::board::MapData;
///
/// let map = MapData::from_json(r#"{
///     "routes": [
///         {"id": 1, "cities": ["Lima", "Dakar"], "length": 3, "color": "blue", "mode": "boat"}
///     ],
///     "ports": ["Dakar"],
///     "destinations": [{"destination": ["Lima", "Dakar"], "points": 6}]
/// }"#).unwrap();
///
/// assert_eq!(map.routes.len(), 1);
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MapData {
    pub routes: Vec<RouteData>,
    #[serde(default)]
    pub ports: Vec<City>,
    #[serde(default)]
    pub destinations: Vec<DestinationCard>,
}

impl MapData {
    pub fn from_json(json: &str) -> RulesResult<Self> {
        serde_json::from_str(json).map_err(|e| RulesError::InvalidMap(e.to_string()))
    }
}

/// An edge of the board between two cities, travelled either on land or at sea.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Route {
    pub id: RouteId,
    pub cities: CityToCity,
    /// Number of matching cards, and of tokens, needed to capture the route.
    pub length: u8,
    pub color: CardColor,
    pub mode: TransportMode,
    /// By whom this route is captured, if any. Set at most once.
    claimer: Option<usize>,
}

impl Route {
    fn new(data: RouteData) -> Self {
        let [start, end] = data.cities;
        Self {
            id: data.id,
            cities: (start, end),
            length: data.length,
            color: data.color,
            mode: data.mode,
            claimer: None,
        }
    }

    /// The player ID capturing this route, if any.
    #[inline]
    pub fn claimer(&self) -> Option<usize> {
        self.claimer
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.claimer.is_none()
    }

    #[inline]
    pub fn touches(&self, city: &City) -> bool {
        self.cities.0 == *city || self.cities.1 == *city
    }

    /// The city at the other end of the route, if the route touches `city`.
    pub fn other_end(&self, city: &City) -> Option<&City> {
        if self.cities.0 == *city {
            Some(&self.cities.1)
        } else if self.cities.1 == *city {
            Some(&self.cities.0)
        } else {
            None
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} - {} ({} {} {})",
            self.id, self.cities.0, self.cities.1, self.length, self.color, self.mode
        )
    }
}

/// Holds the information about a route successfully captured by a player.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClaimedRoute {
    pub id: RouteId,
    pub route: CityToCity,
    pub mode: TransportMode,
    pub length: u8,
}

/// The authoritative state of the board, per game.
/// This is mutated as players capture routes and build ports throughout the game.
#[derive(Debug)]
pub struct Board {
    routes: BTreeMap<RouteId, Route>,
    /// Maps each city to the routes touching it.
    routes_by_city: BTreeMap<City, SmallVec<[RouteId; 8]>>,
    /// Maps each port city to the player who built a port there, if any.
    ports: BTreeMap<City, Option<usize>>,
}

impl Board {
    /// Builds a `Board` from map data, with every route free and no port built.
    ///
    /// Returns an `Err` if either:
    ///   * Two routes share the same id.
    ///   * A route has a length of zero.
    ///   * A route starts and ends in the same city.
    ///   * A port city, or a destination city, is not reached by any route.
    ///   * A destination card appears twice.
    ///
    /// # Example
    /// ```
    /// use rails_and_sails::board::{Board, MapData, RouteId};
    ///
    /// let map = MapData::from_json(r#"{"routes": [
    ///     {"id": 1, "cities": ["Lima", "Dakar"], "length": 3, "color": "blue", "mode": "boat"}
    /// ]}"#).unwrap();
    /// let board = Board::new(&map).unwrap();
    ///
    /// assert_eq!(board.free_routes().len(), 1);
    /// assert!(board.route(RouteId(1)).is_some());
    /// ```
    pub fn new(map: &MapData) -> RulesResult<Self> {
        let mut routes = BTreeMap::new();
        let mut routes_by_city: BTreeMap<City, SmallVec<[RouteId; 8]>> = BTreeMap::new();

        for data in &map.routes {
            if data.length == 0 {
                return Err(RulesError::InvalidMap(format!(
                    "route {} has a length of zero",
                    data.id
                )));
            }

            if data.cities[0] == data.cities[1] {
                return Err(RulesError::InvalidMap(format!(
                    "route {} loops on {}",
                    data.id, data.cities[0]
                )));
            }

            if routes.contains_key(&data.id) {
                return Err(RulesError::InvalidMap(format!(
                    "route id {} is used more than once",
                    data.id
                )));
            }

            for city in &data.cities {
                routes_by_city.entry(city.clone()).or_default().push(data.id);
            }
            routes.insert(data.id, Route::new(data.clone()));
        }

        let mut ports = BTreeMap::new();
        for city in &map.ports {
            if !routes_by_city.contains_key(city) {
                return Err(RulesError::InvalidMap(format!(
                    "port {} is not reached by any route",
                    city
                )));
            }
            ports.insert(city.clone(), None);
        }

        let mut destinations = HashSet::with_capacity(map.destinations.len());
        for destination in &map.destinations {
            let (start, end) = &destination.destination;
            if !routes_by_city.contains_key(start) || !routes_by_city.contains_key(end) {
                return Err(RulesError::InvalidMap(format!(
                    "destination {} is not reached by any route",
                    destination
                )));
            }

            if !destinations.insert(destination) {
                return Err(RulesError::InvalidMap(format!(
                    "destination {} appears twice",
                    destination
                )));
            }
        }

        Ok(Self {
            routes,
            routes_by_city,
            ports,
        })
    }

    #[inline]
    pub fn route(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(&id)
    }

    /// Every route, ordered by id.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Routes nobody has captured yet.
    pub fn free_routes(&self) -> Vec<&Route> {
        self.routes.values().filter(|route| route.is_free()).collect()
    }

    /// Free routes the player could capture right now, given their tokens and hand.
    pub fn capturable_routes(&self, player: &Player) -> Vec<&Route> {
        self.routes
            .values()
            .filter(|route| player.can_capture(route))
            .collect()
    }

    /// Verifies that a route exists and is free.
    pub fn check_claimable(&self, id: RouteId) -> RulesResult<&Route> {
        let route = self.route(id).ok_or(RulesError::UnknownRoute(id))?;
        if !route.is_free() {
            return Err(RulesError::AlreadyOwned(id));
        }

        Ok(route)
    }

    /// Request from a player `player_id` to capture a specific route.
    ///
    /// Returns an `Err` if the route does not exist, or is already owned.
    /// Otherwise, marks the route as captured, and returns information about it.
    ///
    /// Paying for the route is up to the caller: see [`Player::capture_route`].
    ///
    /// # Example
    /// ```
    /// use rails_and_sails::board::{Board, MapData, RouteId};
    /// use rails_and_sails::error::RulesError;
    ///
    /// let map = MapData::from_json(r#"{"routes": [
    ///     {"id": 4, "cities": ["Lima", "Dakar"], "length": 3, "color": "blue", "mode": "boat"}
    /// ]}"#).unwrap();
    /// let mut board = Board::new(&map).unwrap();
    ///
    /// assert!(board.claim_route_for_player(RouteId(4), 0).is_ok());
    /// assert_eq!(
    ///     board.claim_route_for_player(RouteId(4), 1),
    ///     Err(RulesError::AlreadyOwned(RouteId(4)))
    /// );
    /// ```
    pub fn claim_route_for_player(
        &mut self,
        id: RouteId,
        player_id: usize,
    ) -> RulesResult<ClaimedRoute> {
        self.check_claimable(id)?;

        let route = self
            .routes
            .get_mut(&id)
            .ok_or(RulesError::UnknownRoute(id))?;
        route.claimer = Some(player_id);

        Ok(ClaimedRoute {
            id,
            route: route.cities.clone(),
            mode: route.mode,
            length: route.length,
        })
    }

    /// Undoes a capture that could not be paid for.
    pub(crate) fn release_route(&mut self, id: RouteId) {
        if let Some(route) = self.routes.get_mut(&id) {
            route.claimer = None;
        }
    }

    /// Predicate that assesses whether a given player has connected the two cities of a
    /// destination, based on their captured routes, whatever their mode.
    ///
    /// This is recomputed on every call.
    pub fn is_complete(&self, player_id: usize, destination: &DestinationCard) -> bool {
        let (start, end) = &destination.destination;
        if start == end {
            return true;
        }

        let mut cities_visited = HashSet::new();
        let mut cities_to_visit = VecDeque::new();

        cities_visited.insert(start);
        cities_to_visit.push_back(start);

        while let Some(city) = cities_to_visit.pop_front() {
            for neighbor in self.neighbors_claimed_by_player(city, player_id) {
                if neighbor == end {
                    return true;
                }

                if cities_visited.insert(neighbor) {
                    cities_to_visit.push_back(neighbor);
                }
            }
        }

        false
    }

    fn neighbors_claimed_by_player<'a>(
        &'a self,
        city: &'a City,
        player_id: usize,
    ) -> impl Iterator<Item = &'a City> + 'a {
        self.routes_by_city
            .get(city)
            .into_iter()
            .flatten()
            .filter_map(move |id| {
                let route = self.routes.get(id)?;
                if route.claimer() == Some(player_id) {
                    route.other_end(city)
                } else {
                    None
                }
            })
    }

    #[inline]
    pub fn is_port_city(&self, city: &City) -> bool {
        self.ports.contains_key(city)
    }

    /// Who built a port in this city, if anyone.
    pub fn port_owner(&self, city: &City) -> Option<usize> {
        self.ports.get(city).copied().flatten()
    }

    /// Whether the player owns a route touching this city.
    pub fn is_connected_to(&self, player_id: usize, city: &City) -> bool {
        self.routes_by_city
            .get(city)
            .into_iter()
            .flatten()
            .filter_map(|id| self.routes.get(id))
            .any(|route| route.claimer() == Some(player_id))
    }

    /// Port cities where the player could build a port: no port there yet, and the player
    /// owns a route reaching the city.
    pub fn free_ports_for(&self, player_id: usize) -> Vec<&City> {
        self.ports
            .iter()
            .filter(|(city, owner)| owner.is_none() && self.is_connected_to(player_id, city))
            .map(|(city, _)| city)
            .collect()
    }

    /// Ports built by the given player.
    pub fn ports_of(&self, player_id: usize) -> Vec<&City> {
        self.ports
            .iter()
            .filter(|(_, owner)| **owner == Some(player_id))
            .map(|(city, _)| city)
            .collect()
    }

    /// Marks a port as built by the player.
    ///
    /// Returns an `Err` if either:
    ///   * The city is not a port city.
    ///   * Someone already built a port there.
    ///   * The player owns no route reaching the city.
    pub fn build_port(&mut self, city: &City, player_id: usize) -> RulesResult<()> {
        match self.ports.get(city) {
            None => return Err(RulesError::NotAPortCity(city.clone())),
            Some(Some(_)) => return Err(RulesError::PortAlreadyBuilt(city.clone())),
            Some(None) => {}
        }

        if !self.is_connected_to(player_id, city) {
            return Err(RulesError::PortNotConnected(city.clone()));
        }

        self.ports.insert(city.clone(), Some(player_id));
        Ok(())
    }
}

/// A small map shared by tests across modules.
///
/// Dakar and Lagos are linked twice: by land (R2) and by sea (R7).
#[cfg(test)]
pub(crate) fn sample_map_data() -> MapData {
    MapData::from_json(
        r#"{
        "routes": [
            {"id": 1, "cities": ["Lima", "Dakar"], "length": 3, "color": "blue", "mode": "boat"},
            {"id": 2, "cities": ["Dakar", "Lagos"], "length": 2, "color": "red", "mode": "wagon"},
            {"id": 3, "cities": ["Lagos", "Marseille"], "length": 4, "color": "green", "mode": "boat"},
            {"id": 4, "cities": ["Marseille", "Dakar"], "length": 3, "color": "blue", "mode": "wagon"},
            {"id": 5, "cities": ["Tokyo", "Sydney"], "length": 5, "color": "yellow", "mode": "boat"},
            {"id": 6, "cities": ["Lima", "Tokyo"], "length": 6, "color": "black", "mode": "boat"},
            {"id": 7, "cities": ["Dakar", "Lagos"], "length": 1, "color": "white", "mode": "boat"}
        ],
        "ports": ["Dakar", "Marseille", "Tokyo", "Lima"],
        "destinations": [
            {"destination": ["Lima", "Lagos"], "points": 8},
            {"destination": ["Dakar", "Marseille"], "points": 5},
            {"destination": ["Tokyo", "Lagos"], "points": 12},
            {"destination": ["Sydney", "Marseille"], "points": 10},
            {"destination": ["Lima", "Sydney"], "points": 11},
            {"destination": ["Lagos", "Tokyo"], "points": 9},
            {"destination": ["Marseille", "Lima"], "points": 7}
        ]
    }"#,
    )
    .expect("the sample map is valid JSON")
}
