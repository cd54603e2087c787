//! Territory, nation, and coast identifiers.
//!
//! Territories are small integer handles into the canonical map loaded by
//! [`super::map::MAP`]. Their index order matches the case-insensitive
//! alphabetical order of their names, so sorting territories sorts names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::map::MAP;

/// A named region of the map.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Territory(u8);

/// Classifies a territory by the graphs it appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerritoryKind {
    Land,
    Coastal,
    Sea,
}

/// Coast qualifier for split-coast territories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Coast {
    North,
    South,
    East,
}

/// One of the seven fixed nations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Nation {
    Austria,
    England,
    France,
    Germany,
    Italy,
    Russia,
    Turkey,
}

/// All nations in standard order.
pub const ALL_NATIONS: [Nation; 7] = [
    Nation::Austria,
    Nation::England,
    Nation::France,
    Nation::Germany,
    Nation::Italy,
    Nation::Russia,
    Nation::Turkey,
];

/// A territory together with an optional coast, as used by the sea graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub territory: Territory,
    pub coast: Option<Coast>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("unknown territory '{0}'")]
    UnknownTerritory(String),

    #[error("unknown coast '{0}'")]
    UnknownCoast(String),

    #[error("unknown nation '{0}'")]
    UnknownNation(String),
}

impl Territory {
    pub(crate) const fn from_index(index: usize) -> Territory {
        Territory(index as u8)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Canonical abbreviation, e.g. `StP`.
    pub fn name(self) -> &'static str {
        &MAP.names[self.index()]
    }

    /// Long display name, e.g. `St. Petersburg`.
    pub fn full_name(self) -> &'static str {
        MAP.full_names[self.index()]
            .as_deref()
            .unwrap_or_else(|| self.name())
    }

    pub fn kind(self) -> TerritoryKind {
        MAP.kinds[self.index()]
    }

    /// Coasts of a split-coast territory; empty for every other territory.
    pub fn coasts(self) -> &'static [Coast] {
        &MAP.coasts[self.index()]
    }

    pub fn is_split(self) -> bool {
        !self.coasts().is_empty()
    }

    pub fn is_sea(self) -> bool {
        self.kind() == TerritoryKind::Sea
    }

    pub fn is_coastal(self) -> bool {
        self.kind() == TerritoryKind::Coastal
    }

    pub fn is_supply_center(self) -> bool {
        MAP.supply_centers.contains(&self)
    }

    /// The nation this territory is a home center of, if any.
    pub fn home_nation(self) -> Option<Nation> {
        ALL_NATIONS
            .into_iter()
            .find(|n| MAP.home_centers(*n).contains(&self))
    }

    /// Every territory on the map in name order.
    pub fn all() -> impl Iterator<Item = Territory> {
        (0..MAP.names.len()).map(Territory::from_index)
    }

    /// Case-insensitive lookup by abbreviation or full name.
    pub fn parse(s: &str) -> Option<Territory> {
        MAP.lookup(s)
    }

    pub fn with_coast(self, coast: Option<Coast>) -> Location {
        Location {
            territory: self,
            coast,
        }
    }
}

impl fmt::Display for Territory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Territory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Territory {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Territory::parse(s).ok_or_else(|| NameError::UnknownTerritory(s.trim().to_string()))
    }
}

impl TryFrom<String> for Territory {
    type Error = NameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Territory> for String {
    fn from(t: Territory) -> String {
        t.name().to_string()
    }
}

impl Coast {
    /// Returns the parenthesised suffix used in order text, e.g. `(NC)`.
    pub const fn suffix(self) -> &'static str {
        match self {
            Coast::North => "(NC)",
            Coast::South => "(SC)",
            Coast::East => "(EC)",
        }
    }

    /// Parses the many ways players spell a coast: `n`, `nc`, `(nc)`,
    /// `/nc`, `north`, `north coast`.
    pub fn parse(s: &str) -> Option<Coast> {
        let s = s.trim().to_ascii_uppercase();
        let s = s.trim_start_matches('/');
        let s = s.strip_prefix('(').and_then(|s| s.strip_suffix(')')).unwrap_or(s);
        match s {
            "N" | "NC" | "NORTH" | "NORTH COAST" => Some(Coast::North),
            "S" | "SC" | "SOUTH" | "SOUTH COAST" => Some(Coast::South),
            "E" | "EC" | "EAST" | "EAST COAST" => Some(Coast::East),
            _ => None,
        }
    }
}

impl fmt::Display for Coast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl Nation {
    pub const fn name(self) -> &'static str {
        match self {
            Nation::Austria => "Austria",
            Nation::England => "England",
            Nation::France => "France",
            Nation::Germany => "Germany",
            Nation::Italy => "Italy",
            Nation::Russia => "Russia",
            Nation::Turkey => "Turkey",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Case-insensitive lookup by name.
    pub fn parse(s: &str) -> Option<Nation> {
        let s = s.trim();
        ALL_NATIONS
            .into_iter()
            .find(|n| n.name().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Nation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Nation {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Nation::parse(s).ok_or_else(|| NameError::UnknownNation(s.trim().to_string()))
    }
}

impl Location {
    pub fn new(territory: Territory) -> Self {
        Location {
            territory,
            coast: None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.coast {
            Some(c) => write!(f, "{}{}", self.territory, c),
            None => write!(f, "{}", self.territory),
        }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Location {
    type Err = NameError;

    /// Accepts `Spa`, `Spa(NC)`, `spa/nc`, and `Spa NC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(territory) = Territory::parse(s) {
            return Ok(Location::new(territory));
        }
        let split = s
            .find(|c: char| c == '(' || c == '/' || c.is_whitespace())
            .map(|i| s.split_at(i));
        match split {
            Some((terr, coast)) => {
                let territory: Territory = terr.parse()?;
                let coast = Coast::parse(coast)
                    .ok_or_else(|| NameError::UnknownCoast(coast.trim().to_string()))?;
                Ok(territory.with_coast(Some(coast)))
            }
            None => Ok(Location::new(s.parse()?)),
        }
    }
}
