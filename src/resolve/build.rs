//! Adjustment-phase bookkeeping.
//!
//! After the autumn retreats every nation's unit count is brought in line
//! with the supply centers it owns: surplus units are disbanded, missing
//! ones may be built on free home centers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Coast, Nation, Territory, TerritoryKind, Unit, UnitKind, MAP};

/// What a nation has to do this adjustment phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entitlement {
    /// Exactly `count` of the units in `from` must go.
    Disband { count: usize, from: BTreeSet<Territory> },
    /// Up to `count` units may be placed in `sites`.
    Build { count: usize, sites: BTreeSet<Territory> },
    Nothing,
}

impl Entitlement {
    pub fn count(&self) -> usize {
        match self {
            Entitlement::Disband { count, .. } | Entitlement::Build { count, .. } => *count,
            Entitlement::Nothing => 0,
        }
    }
}

/// One adjustment chosen by a player or by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Adjustment {
    Build { terr: Territory, unit: Unit },
    Disband { terr: Territory },
}

impl Adjustment {
    pub fn territory(&self) -> Territory {
        match *self {
            Adjustment::Build { terr, .. } | Adjustment::Disband { terr } => terr,
        }
    }
}

/// Compares units with owned centers for `nation`.
///
/// Builds are capped by the home centers that are still owned and empty.
pub fn entitlement(board: &Board, nation: Nation) -> Entitlement {
    let units = board.occupied_by(nation);
    let centers = board.center_count(nation);
    if units.len() > centers {
        return Entitlement::Disband {
            count: units.len() - centers,
            from: units,
        };
    }
    let sites: BTreeSet<Territory> = MAP
        .home_centers(nation)
        .iter()
        .copied()
        .filter(|t| board.owner(*t) == Some(nation) && !board.is_occupied(*t))
        .collect();
    let count = (centers - units.len()).min(sites.len());
    if count == 0 {
        return Entitlement::Nothing;
    }
    Entitlement::Build { count, sites }
}

/// Unit kinds that can stand in `t`.
pub fn buildable_kinds(t: Territory) -> &'static [UnitKind] {
    match t.kind() {
        TerritoryKind::Land => &[UnitKind::Army],
        TerritoryKind::Coastal => &[UnitKind::Army, UnitKind::Fleet],
        TerritoryKind::Sea => &[UnitKind::Fleet],
    }
}

/// Coasts a fleet built in `t` must choose between.
pub fn build_coasts(t: Territory) -> &'static [Coast] {
    t.coasts()
}

/// Picks the units an orphaned nation loses: closest to home first, fleets
/// before armies, then by name.
pub fn auto_disband(board: &Board, nation: Nation, count: usize) -> Vec<Territory> {
    let mut ranked: Vec<(u32, u8, Territory)> = board
        .units()
        .filter(|(_, u)| u.nation == nation)
        .map(|(t, u)| {
            let fleet_first = match u.kind {
                UnitKind::Fleet => 0,
                UnitKind::Army => 1,
            };
            (MAP.distance_from_home(nation, t), fleet_first, t)
        })
        .collect();
    ranked.sort();
    ranked.into_iter().take(count).map(|(_, _, t)| t).collect()
}

/// Applies a nation's adjustments.
pub fn apply_adjustments(board: &mut Board, nation: Nation, adjustments: &[Adjustment]) {
    for adj in adjustments {
        match *adj {
            Adjustment::Build { terr, unit } => {
                debug_assert_eq!(unit.nation, nation);
                if !board.place(terr, unit) {
                    log::warn!("{nation}: cannot build in occupied {terr}");
                }
            }
            Adjustment::Disband { terr } => match board.remove(terr) {
                Some(u) if u.nation != nation => {
                    log::warn!("{nation}: refusing to disband {}'s unit in {terr}", u.nation);
                    board.place(terr, u);
                }
                Some(_) => {}
                None => log::warn!("{nation}: no unit to disband in {terr}"),
            },
        }
    }
}

/// The winner, if any: the last nation standing or the first to reach
/// `victory_centers`.
pub fn victor(board: &Board, survivors: &[Nation], victory_centers: usize) -> Option<Nation> {
    if let [only] = survivors {
        return Some(*only);
    }
    survivors
        .iter()
        .copied()
        .find(|n| board.center_count(*n) >= victory_centers)
}
