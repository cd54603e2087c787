//! Unit kinds and ownership.
//!
//! Units have no identity of their own: a unit is whatever occupies a
//! territory on the [`Board`](super::state::Board).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::territory::{Coast, Nation};

/// The kind of a military unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    Army,
    Fleet,
}

impl UnitKind {
    /// Returns the single-letter abbreviation used in board text.
    pub const fn letter(self) -> char {
        match self {
            UnitKind::Army => 'A',
            UnitKind::Fleet => 'F',
        }
    }

    /// Parses `A`/`F` or the full word, case-insensitively.
    pub fn parse(s: &str) -> Option<UnitKind> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" | "ARMY" => Some(UnitKind::Army),
            "F" | "FLEET" => Some(UnitKind::Fleet),
            _ => None,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Army => f.write_str("Army"),
            UnitKind::Fleet => f.write_str("Fleet"),
        }
    }
}

/// The occupant of a territory.
///
/// `coast` is set iff the unit is a fleet in a split-coast territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub nation: Nation,
    pub kind: UnitKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coast: Option<Coast>,
}

impl Unit {
    pub const fn army(nation: Nation) -> Unit {
        Unit {
            nation,
            kind: UnitKind::Army,
            coast: None,
        }
    }

    pub const fn fleet(nation: Nation, coast: Option<Coast>) -> Unit {
        Unit {
            nation,
            kind: UnitKind::Fleet,
            coast,
        }
    }

    pub fn is_army(&self) -> bool {
        self.kind == UnitKind::Army
    }

    pub fn is_fleet(&self) -> bool {
        self.kind == UnitKind::Fleet
    }
}
