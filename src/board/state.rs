//! Board state.
//!
//! Holds every unit on the map and the owner of every supply center. The
//! board is owned by a single game and only changes when adjudicated results
//! are applied to it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::map::MAP;
use super::territory::{Coast, Location, Nation, Territory};
use super::unit::{Unit, UnitKind};

/// Complete board state.
///
/// Indexed by `Territory::index()`. At most one unit per territory is
/// guaranteed by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BoardRepr", into = "BoardRepr")]
pub struct Board {
    units: Vec<Option<Unit>>,
    owners: Vec<Option<Nation>>,
}

/// Sparse form used for persistence.
#[derive(Serialize, Deserialize)]
struct BoardRepr {
    units: BTreeMap<Territory, Unit>,
    owners: BTreeMap<Territory, Nation>,
}

impl From<BoardRepr> for Board {
    fn from(repr: BoardRepr) -> Board {
        let mut board = Board::empty();
        for (t, unit) in repr.units {
            board.units[t.index()] = Some(unit);
        }
        for (t, nation) in repr.owners {
            board.owners[t.index()] = Some(nation);
        }
        board
    }
}

impl From<Board> for BoardRepr {
    fn from(board: Board) -> BoardRepr {
        BoardRepr {
            units: board.units().collect(),
            owners: Territory::all()
                .filter_map(|t| board.owner(t).map(|n| (t, n)))
                .collect(),
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::empty()
    }
}

impl Board {
    /// A board with no units and no owned centers.
    pub fn empty() -> Board {
        Board {
            units: vec![None; MAP.len()],
            owners: vec![None; MAP.len()],
        }
    }

    /// The opening position: every home center owned and occupied.
    pub fn standard() -> Board {
        let mut board = Board::empty();
        for (nation, homes) in MAP.homes() {
            for t in homes {
                board.owners[t.index()] = Some(nation);
            }
        }
        for start in MAP.starting_units() {
            let nation = start
                .territory
                .home_nation()
                .unwrap_or_else(|| panic!("starting unit outside home centers: {}", start.territory));
            board.units[start.territory.index()] = Some(Unit {
                nation,
                kind: start.kind,
                coast: start.coast,
            });
        }
        board
    }

    /// Returns the unit in `t`, if any.
    pub fn unit(&self, t: Territory) -> Option<&Unit> {
        self.units[t.index()].as_ref()
    }

    /// Returns true if any unit sits in `t`.
    pub fn is_occupied(&self, t: Territory) -> bool {
        self.units[t.index()].is_some()
    }

    /// Returns the nation owning supply center `t`. Always `None` for
    /// territories that are not centers.
    pub fn owner(&self, t: Territory) -> Option<Nation> {
        self.owners[t.index()]
    }

    pub fn set_owner(&mut self, t: Territory, owner: Option<Nation>) {
        debug_assert!(t.is_supply_center() || owner.is_none());
        self.owners[t.index()] = owner;
    }

    /// Places a unit. Returns false if the territory is already occupied.
    ///
    /// The coast is dropped for armies and for territories without split
    /// coasts.
    pub fn place(&mut self, t: Territory, mut unit: Unit) -> bool {
        if self.is_occupied(t) {
            return false;
        }
        if unit.is_army() || !t.is_split() {
            unit.coast = None;
        }
        debug_assert!(unit.is_army() || !t.is_split() || unit.coast.is_some());
        self.units[t.index()] = Some(unit);
        true
    }

    pub fn remove(&mut self, t: Territory) -> Option<Unit> {
        self.units[t.index()].take()
    }

    /// Every unit on the board in territory order.
    pub fn units(&self) -> impl Iterator<Item = (Territory, Unit)> + '_ {
        Territory::all().filter_map(|t| self.unit(t).map(|u| (t, *u)))
    }

    /// Where a unit sits, including its coast.
    pub fn location(&self, t: Territory) -> Option<Location> {
        self.unit(t).map(|u| t.with_coast(u.coast))
    }

    /// Territories occupied by `nation`.
    pub fn occupied_by(&self, nation: Nation) -> BTreeSet<Territory> {
        self.units()
            .filter(|(_, u)| u.nation == nation)
            .map(|(t, _)| t)
            .collect()
    }

    /// Supply centers owned by `nation`.
    pub fn owned_by(&self, nation: Nation) -> BTreeSet<Territory> {
        MAP.supply_centers()
            .iter()
            .copied()
            .filter(|t| self.owner(*t) == Some(nation))
            .collect()
    }

    pub fn unit_count(&self, nation: Nation) -> usize {
        self.units().filter(|(_, u)| u.nation == nation).count()
    }

    pub fn center_count(&self, nation: Nation) -> usize {
        self.owned_by(nation).len()
    }

    /// Relocates units in bulk.
    ///
    /// Every source is cleared before any destination is populated, so swaps
    /// and rotations never overwrite a unit in transit. A fleet moving to a
    /// split-coast territory without a coast lands on the only coast it can
    /// reach, or the first coast when that is ambiguous.
    pub fn apply_moves(&mut self, moves: &[(Territory, Location)]) {
        let mut moving = Vec::with_capacity(moves.len());
        for (from, to) in moves {
            let Some(mut unit) = self.remove(*from) else {
                log::warn!("no unit in {from} to move to {to}");
                continue;
            };
            unit.coast = match unit.kind {
                UnitKind::Army => None,
                UnitKind::Fleet if !to.territory.is_split() => None,
                UnitKind::Fleet => to.coast.or_else(|| {
                    let reachable = self.coasts_reachable_from(from.with_coast(unit.coast), to.territory);
                    match reachable.as_slice() {
                        [only] => Some(*only),
                        _ => to.territory.coasts().first().copied(),
                    }
                }),
            };
            moving.push((to.territory, unit));
        }
        for (to, unit) in moving {
            if let Some(clobbered) = self.units[to.index()].replace(unit) {
                log::warn!("{to}: {:?} {} overwritten by an incoming unit", clobbered.nation, clobbered.kind);
            }
        }
    }

    /// Every occupied supply center becomes owned by its occupier.
    ///
    /// Returns the centers that changed hands.
    pub fn update_centers(&mut self) -> Vec<(Territory, Nation)> {
        let mut changed = Vec::new();
        for t in MAP.supply_centers().iter().copied() {
            if let Some(unit) = self.unit(t) {
                if self.owner(t) != Some(unit.nation) {
                    changed.push((t, unit.nation));
                    self.owners[t.index()] = Some(unit.nation);
                }
            }
        }
        changed
    }

    /// Removes every unit of `nation`, returning where they stood.
    pub fn remove_nation(&mut self, nation: Nation) -> Vec<Territory> {
        let gone: Vec<Territory> = self.occupied_by(nation).into_iter().collect();
        for t in &gone {
            self.units[t.index()] = None;
        }
        gone
    }

    /// Coasts of `target` whose sea vertex touches `from`.
    pub fn coasts_reachable_from(&self, from: Location, target: Territory) -> Vec<Coast> {
        if !MAP.sea.contains(from) {
            return Vec::new();
        }
        let neighbors = MAP.sea.neighbors([from]);
        target
            .coasts()
            .iter()
            .copied()
            .filter(|c| neighbors.contains(&target.with_coast(Some(*c))))
            .collect()
    }
}
