//! Retreat-phase resolution.
//!
//! Each dislodged unit either retreats to one of the destinations the solver
//! offered or is disbanded. If two or more units retreat to the same
//! territory, all of them are disbanded.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::board::{Board, Coast, Location, Territory, Unit, UnitKind};

/// A unit driven out of its territory, waiting for a retreat decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dislodged {
    pub from: Territory,
    pub unit: Unit,
}

/// A dislodged unit and the territories it may retreat to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetreatOptions {
    pub dislodged: Dislodged,
    pub options: BTreeSet<Territory>,
}

impl RetreatOptions {
    /// A unit with nowhere to go is disbanded without asking.
    pub fn is_forced(&self) -> bool {
        self.options.is_empty()
    }

    /// Coasts a retreating fleet could land on at `to`.
    pub fn coasts_at(&self, board: &Board, to: Territory) -> Vec<Coast> {
        let Dislodged { from, unit } = self.dislodged;
        if unit.kind != UnitKind::Fleet || !to.is_split() {
            return Vec::new();
        }
        board.coasts_reachable_from(from.with_coast(unit.coast), to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetreatChoice {
    To(Location),
    Disband,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RetreatOutcome {
    Retreated { from: Territory, to: Location },
    Disbanded { from: Territory },
    /// Another unit retreated to the same place; both are gone.
    Bounced { from: Territory, to: Territory },
}

/// Applies every retreat decision to the board.
///
/// Dislodged units are no longer on the board at this point; only the
/// survivors are placed back.
pub fn resolve_retreats(board: &mut Board, decisions: &[(Dislodged, RetreatChoice)]) -> Vec<RetreatOutcome> {
    let mut contenders: BTreeMap<Territory, usize> = BTreeMap::new();
    for (_, choice) in decisions {
        if let RetreatChoice::To(loc) = choice {
            *contenders.entry(loc.territory).or_default() += 1;
        }
    }

    let mut outcomes = Vec::with_capacity(decisions.len());
    for (d, choice) in decisions {
        let outcome = match *choice {
            RetreatChoice::Disband => RetreatOutcome::Disbanded { from: d.from },
            RetreatChoice::To(to) if contenders[&to.territory] > 1 => RetreatOutcome::Bounced {
                from: d.from,
                to: to.territory,
            },
            RetreatChoice::To(to) => {
                let unit = Unit {
                    coast: to.coast,
                    ..d.unit
                };
                if board.place(to.territory, unit) {
                    RetreatOutcome::Retreated { from: d.from, to }
                } else {
                    log::warn!("{} cannot retreat to occupied {to}", d.from);
                    RetreatOutcome::Disbanded { from: d.from }
                }
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Nation;

    fn t(s: &str) -> Territory {
        s.parse().unwrap()
    }

    fn loc(s: &str) -> Location {
        s.parse().unwrap()
    }

    fn army(from: &str, nation: Nation) -> Dislodged {
        Dislodged {
            from: t(from),
            unit: Unit::army(nation),
        }
    }

    #[test]
    fn unopposed_retreat_moves_the_unit() {
        let mut board = Board::empty();
        let out = resolve_retreats(&mut board, &[(army("Vie", Nation::Austria), RetreatChoice::To(loc("Boh")))]);
        assert_eq!(
            out,
            vec![RetreatOutcome::Retreated {
                from: t("Vie"),
                to: loc("Boh")
            }]
        );
        assert_eq!(board.unit(t("Boh")).unwrap().nation, Nation::Austria);
    }

    #[test]
    fn three_way_conflict_disbands_everyone() {
        let mut board = Board::empty();
        let decisions = [
            (army("Mun", Nation::Germany), RetreatChoice::To(loc("Boh"))),
            (army("Vie", Nation::Austria), RetreatChoice::To(loc("Boh"))),
            (army("Gal", Nation::Russia), RetreatChoice::To(loc("Boh"))),
        ];
        let out = resolve_retreats(&mut board, &decisions);
        assert!(out.iter().all(|o| matches!(o, RetreatOutcome::Bounced { .. })));
        assert!(!board.is_occupied(t("Boh")));
        assert_eq!(board.units().count(), 0);
    }

    #[test]
    fn conflicts_do_not_affect_other_retreats() {
        let mut board = Board::empty();
        let decisions = [
            (army("Mun", Nation::Germany), RetreatChoice::To(loc("Boh"))),
            (army("Vie", Nation::Austria), RetreatChoice::To(loc("Boh"))),
            (army("War", Nation::Russia), RetreatChoice::To(loc("Lvn"))),
            (army("Ser", Nation::Turkey), RetreatChoice::Disband),
        ];
        let out = resolve_retreats(&mut board, &decisions);
        assert_eq!(out[3], RetreatOutcome::Disbanded { from: t("Ser") });
        assert!(board.is_occupied(t("Lvn")));
        assert_eq!(board.units().count(), 1);
    }

    #[test]
    fn fleets_keep_their_chosen_coast() {
        let mut board = Board::empty();
        let fleet = Dislodged {
            from: t("Gol"),
            unit: Unit::fleet(Nation::France, None),
        };
        resolve_retreats(&mut board, &[(fleet, RetreatChoice::To(loc("Spa(SC)")))]);
        assert_eq!(board.unit(t("Spa")).unwrap().coast, Some(Coast::South));
    }

    #[test]
    fn retreat_coasts_follow_the_sea_graph() {
        let board = Board::empty();
        let from_mao = RetreatOptions {
            dislodged: Dislodged {
                from: t("Mao"),
                unit: Unit::fleet(Nation::France, None),
            },
            options: BTreeSet::from([t("Spa")]),
        };
        assert_eq!(from_mao.coasts_at(&board, t("Spa")), vec![Coast::North, Coast::South]);

        let from_wes = RetreatOptions {
            dislodged: Dislodged {
                from: t("Wes"),
                unit: Unit::fleet(Nation::France, None),
            },
            options: BTreeSet::from([t("Spa")]),
        };
        assert_eq!(from_wes.coasts_at(&board, t("Spa")), vec![Coast::South]);
        assert!(!from_wes.is_forced());
    }
}
