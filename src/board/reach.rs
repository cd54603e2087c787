//! Occupancy-aware movement queries.
//!
//! These combine the static graphs of [`MAP`] with what currently stands on
//! a [`Board`]: where a unit can go directly, where an army can be convoyed,
//! and which fleets form a chain.

use std::collections::{BTreeSet, VecDeque};

use super::map::MAP;
use super::state::Board;
use super::territory::{Location, Territory};
use super::unit::UnitKind;

impl Board {
    /// Territories the unit in `t` can move to without a convoy.
    ///
    /// Armies use the land graph, fleets the sea graph from the coast they
    /// occupy. Empty when `t` is unoccupied.
    pub fn valid_dests(&self, t: Territory) -> BTreeSet<Territory> {
        let Some(unit) = self.unit(t) else {
            return BTreeSet::new();
        };
        match unit.kind {
            UnitKind::Army => MAP.land.neighbors([t]),
            UnitKind::Fleet => {
                let from: Vec<Location> = match unit.coast {
                    Some(c) => vec![t.with_coast(Some(c))],
                    None => MAP.sea_locations(t),
                };
                MAP.sea
                    .neighbors(from)
                    .into_iter()
                    .map(|l| l.territory)
                    .filter(|d| *d != t)
                    .collect()
            }
        }
    }

    /// Territories reachable from `origin` through chains of fleet-occupied
    /// sea territories not in `excluded`.
    ///
    /// Connectivity only: the nation of the fleets is not considered, and
    /// neither is whether anything in `origin` could actually be convoyed.
    pub fn convoy_reachable(&self, origin: Territory, excluded: &BTreeSet<Territory>) -> BTreeSet<Territory> {
        let mut queue: VecDeque<Territory> = MAP
            .bare
            .neighbors([origin])
            .into_iter()
            .filter(|t| t.is_sea())
            .collect();
        let mut seen: BTreeSet<Territory> = queue.iter().copied().collect();
        let mut out = BTreeSet::new();

        while let Some(sea) = queue.pop_front() {
            let carries = self.unit(sea).is_some_and(|u| u.kind == UnitKind::Fleet);
            if !carries || excluded.contains(&sea) {
                continue;
            }
            for next in MAP.bare.neighbors([sea]) {
                if !next.is_sea() {
                    out.insert(next);
                } else if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        out.remove(&origin);
        out
    }

    /// Where the army in `t` could be convoyed; empty for anything that is
    /// not an army on a coast.
    pub fn convoy_dests(&self, t: Territory, excluded: &BTreeSet<Territory>) -> BTreeSet<Territory> {
        match self.unit(t) {
            Some(u) if u.kind == UnitKind::Army && t.is_coastal() => self.convoy_reachable(t, excluded),
            _ => BTreeSet::new(),
        }
    }

    /// Maximal connected chain of fleet-occupied sea territories grown from
    /// `seeds`, whoever owns the fleets. Seeds are always included.
    pub fn contiguous_fleets(&self, seeds: &BTreeSet<Territory>) -> BTreeSet<Territory> {
        let mut out = seeds.clone();
        let mut queue: VecDeque<Territory> = seeds.iter().copied().collect();

        while let Some(cur) = queue.pop_front() {
            for next in MAP.bare.neighbors([cur]) {
                let fleet_at_sea = next.is_sea() && self.unit(next).is_some_and(|u| u.kind == UnitKind::Fleet);
                if fleet_at_sea && out.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        out
    }

    /// Whether an army's move to `to` could go either overland or by sea,
    /// so the player has to say which.
    pub fn convoy_ambiguous(&self, from: Territory, to: Territory) -> bool {
        match self.unit(from) {
            Some(u) if u.kind == UnitKind::Army => {
                MAP.land.neighbors([from]).contains(&to) && MAP.share_coastal_cluster(from, to)
            }
            _ => false,
        }
    }
}
