//! Per-player session state.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::board::{Board, NameError, Nation, Order, Territory};
use crate::builder::OrderBuilder;
use crate::resolve::{Adjustment, Entitlement};

/// How a player identifies in the chat transport.
pub type PlayerId = String;

/// A player's answer while nations are being handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NationPick {
    Nation(Nation),
    Random,
}

impl FromStr for NationPick {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("random") {
            return Ok(NationPick::Random);
        }
        s.parse().map(NationPick::Nation)
    }
}

impl fmt::Display for NationPick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NationPick::Nation(n) => write!(f, "{n}"),
            NationPick::Random => f.write_str("Random"),
        }
    }
}

/// Adjustments a player still owes or may make in the build phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjusting {
    pub entitlement: Entitlement,
    pub chosen: Vec<Adjustment>,
}

impl Adjusting {
    pub fn remaining(&self) -> usize {
        self.entitlement.count().saturating_sub(self.chosen.len())
    }

    pub fn is_disbanding(&self) -> bool {
        matches!(self.entitlement, Entitlement::Disband { .. })
    }

    fn chosen_territories(&self) -> BTreeSet<Territory> {
        self.chosen.iter().map(|a| a.territory()).collect()
    }

    /// Territories still open for the next adjustment.
    pub fn open(&self) -> BTreeSet<Territory> {
        let all = match &self.entitlement {
            Entitlement::Disband { from, .. } => from,
            Entitlement::Build { sites, .. } => sites,
            Entitlement::Nothing => return BTreeSet::new(),
        };
        all - &self.chosen_territories()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub pick: Option<NationPick>,
    /// Set once nations are assigned. Eliminated players leave the game.
    pub nation: Option<Nation>,
    pub ready: bool,
    /// Submitted orders, kept sorted.
    pub orders: Vec<Order>,
    pub builder: Option<OrderBuilder>,
    pub deleting: bool,
    pub adjusting: Option<Adjusting>,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>) -> Self {
        Player {
            id: id.into(),
            pick: None,
            nation: None,
            ready: false,
            orders: Vec::new(),
            builder: None,
            deleting: false,
            adjusting: None,
        }
    }

    /// Clears everything scoped to a single phase.
    pub fn reset(&mut self) {
        self.ready = false;
        self.orders.clear();
        self.builder = None;
        self.deleting = false;
        self.adjusting = None;
    }

    pub fn add_orders(&mut self, orders: impl IntoIterator<Item = Order>) {
        self.orders.extend(orders);
        self.orders.sort();
    }

    /// Own units that have no order yet.
    pub fn unordered(&self, board: &Board) -> BTreeSet<Territory> {
        let Some(nation) = self.nation else {
            return BTreeSet::new();
        };
        let ordered: BTreeSet<Territory> = self.orders.iter().map(|o| o.subject()).collect();
        &board.occupied_by(nation) - &ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nation_picks() {
        assert_eq!("random".parse::<NationPick>(), Ok(NationPick::Random));
        assert_eq!("ITALY".parse::<NationPick>(), Ok(NationPick::Nation(Nation::Italy)));
        assert!("Prussia".parse::<NationPick>().is_err());
    }

    #[test]
    fn orders_stay_sorted() {
        let mut p = Player::new("alice");
        p.nation = Some(Nation::England);
        p.add_orders(["Lon-Nth".parse().unwrap()]);
        p.add_orders(["Edi H".parse().unwrap()]);
        assert_eq!(p.orders[0].to_string(), "Edi H");
        let board = Board::standard();
        let left: Vec<String> = p.unordered(&board).iter().map(|t| t.to_string()).collect();
        assert_eq!(left, vec!["Lvp"]);
    }

    #[test]
    fn adjusting_tracks_remaining_choices() {
        let t = |s: &str| s.parse::<Territory>().unwrap();
        let mut a = Adjusting {
            entitlement: Entitlement::Disband {
                count: 2,
                from: [t("Mos"), t("War"), t("Sev")].into(),
            },
            chosen: Vec::new(),
        };
        assert!(a.is_disbanding());
        a.chosen.push(Adjustment::Disband { terr: t("War") });
        assert_eq!(a.remaining(), 1);
        assert_eq!(a.open(), BTreeSet::from([t("Mos"), t("Sev")]));
    }
}
