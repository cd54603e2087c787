//! Text encoding for the external solver.
//!
//! Input is one line per unit (`StP(SC) F Russia`), a blank line, one line
//! per non-hold order in compact form, and a trailing blank line. Output is
//! one `N: SUCCEEDS` or `N: FAILS` line per submitted order, a blank line,
//! then `Terr: dest dest ...` for every dislodged unit.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use thiserror::Error;

use crate::board::{Board, Order, OrderKind, Territory};

/// Errors found in the solver's output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolverOutputError {
    #[error("expected {expected} verdicts, got {found}")]
    MissingVerdict { expected: usize, found: usize },

    #[error("malformed verdict line '{0}'")]
    BadVerdict(String),

    #[error("expected a blank line after the verdicts, got '{0}'")]
    MissingSeparator(String),

    #[error("malformed retreat line '{0}'")]
    BadRetreat(String),

    #[error("unknown territory '{0}' in solver output")]
    UnknownTerritory(String),

    #[error("{0} is dislodged more than once")]
    DuplicateRetreat(Territory),

    #[error("{0} is dislodged but holds no unit")]
    EmptyRetreat(Territory),
}

/// What the solver decided for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdicts {
    /// One entry per order of the batch, holds included.
    pub succeeded: Vec<bool>,
    /// Dislodged units and where each may retreat. An empty set means the
    /// unit has nowhere to go.
    pub retreats: BTreeMap<Territory, BTreeSet<Territory>>,
}

/// Orders actually sent to the solver; holds are implied.
fn submitted(orders: &[Order]) -> impl Iterator<Item = &Order> {
    orders.iter().filter(|o| o.kind() != OrderKind::Hold)
}

/// Encodes a board and an order batch as solver input.
pub fn encode(board: &Board, orders: &[Order]) -> String {
    let mut out = String::new();
    for (t, unit) in board.units() {
        let _ = writeln!(out, "{} {} {}", t.with_coast(unit.coast), unit.kind.letter(), unit.nation);
    }
    out.push('\n');
    for order in submitted(orders) {
        let _ = writeln!(out, "{order}");
    }
    out.push('\n');
    out
}

fn territory(name: &str) -> Result<Territory, SolverOutputError> {
    Territory::parse(name).ok_or_else(|| SolverOutputError::UnknownTerritory(name.to_string()))
}

/// Parses the verdict for the `position`th submitted order, counting from 1.
fn parse_verdict(line: &str, position: usize) -> Result<bool, SolverOutputError> {
    let bad = || SolverOutputError::BadVerdict(line.to_string());
    let (index, verdict) = line.split_once(':').ok_or_else(bad)?;
    if index.trim().parse::<usize>().ok() != Some(position) {
        return Err(bad());
    }
    match verdict.trim() {
        "SUCCEEDS" => Ok(true),
        "FAILS" => Ok(false),
        _ => Err(bad()),
    }
}

fn parse_retreat(line: &str) -> Result<(Territory, BTreeSet<Territory>), SolverOutputError> {
    let (from, dests) = line
        .split_once(':')
        .ok_or_else(|| SolverOutputError::BadRetreat(line.to_string()))?;
    let from = territory(from.trim())?;
    let dests = dests
        .split_whitespace()
        .map(territory)
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok((from, dests))
}

/// Decodes solver output for the batch it was given.
///
/// Holds are not sent, so a hold succeeds exactly when its unit was not
/// dislodged.
pub fn decode(output: &str, orders: &[Order]) -> Result<Verdicts, SolverOutputError> {
    let expected = submitted(orders).count();
    let mut lines = output.lines();

    let mut verdicts = Vec::with_capacity(expected);
    for found in 0..expected {
        let line = lines
            .next()
            .ok_or(SolverOutputError::MissingVerdict { expected, found })?;
        verdicts.push(parse_verdict(line, found + 1)?);
    }

    match lines.next() {
        Some(line) if !line.trim().is_empty() => {
            return Err(SolverOutputError::MissingSeparator(line.to_string()));
        }
        _ => {}
    }

    let mut retreats = BTreeMap::new();
    for line in lines.filter(|l| !l.trim().is_empty()) {
        let (from, dests) = parse_retreat(line)?;
        if retreats.insert(from, dests).is_some() {
            return Err(SolverOutputError::DuplicateRetreat(from));
        }
    }

    let mut verdicts = verdicts.into_iter();
    let succeeded = orders
        .iter()
        .map(|o| match o {
            Order::Hold { terr } => !retreats.contains_key(terr),
            _ => verdicts.next().unwrap_or(false),
        })
        .collect();

    Ok(Verdicts { succeeded, retreats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Nation, Unit};

    fn t(s: &str) -> Territory {
        s.parse().unwrap()
    }

    fn orders(texts: &[&str]) -> Vec<Order> {
        texts.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn encodes_units_then_non_hold_orders() {
        let mut board = Board::empty();
        board.place(t("StP"), Unit::fleet(Nation::Russia, Some(crate::board::Coast::South)));
        board.place(t("Mos"), Unit::army(Nation::Russia));
        let text = encode(&board, &orders(&["Mos H", "StP-Bot"]));
        assert_eq!(text, "Mos A Russia\nStP(SC) F Russia\n\nStP-Bot\n\n");
    }

    #[test]
    fn decodes_verdicts_and_retreats() {
        let batch = orders(&["Vie H", "Bud-Ser", "Gal-Vie", "Boh S Gal-Vie"]);
        let output = "1: SUCCEEDS\n2: SUCCEEDS\n3: SUCCEEDS\n\nVie: Tri Tyr\n";
        let v = decode(output, &batch).unwrap();
        assert_eq!(v.succeeded, vec![false, true, true, true]);
        assert_eq!(v.retreats[&t("Vie")], BTreeSet::from([t("Tri"), t("Tyr")]));
    }

    #[test]
    fn empty_retreat_list_means_disband() {
        let batch = orders(&["Vie H"]);
        let v = decode("\nVie:\n", &batch).unwrap();
        assert!(v.retreats[&t("Vie")].is_empty());
        assert_eq!(v.succeeded, vec![false]);
    }

    #[test]
    fn malformed_output_is_an_error() {
        let batch = orders(&["Bud-Ser"]);
        assert_eq!(
            decode("", &batch),
            Err(SolverOutputError::MissingVerdict { expected: 1, found: 0 })
        );
        assert!(matches!(decode("1: MAYBE\n", &batch), Err(SolverOutputError::BadVerdict(_))));
        assert!(matches!(
            decode("1: FAILS\nVie: Tri\n", &batch),
            Err(SolverOutputError::MissingSeparator(_))
        ));
        assert!(matches!(
            decode("1: FAILS\n\nAtlantis: Tri\n", &batch),
            Err(SolverOutputError::UnknownTerritory(_))
        ));
        assert!(matches!(
            decode("1: FAILS\n\nVie Tri\n", &batch),
            Err(SolverOutputError::BadRetreat(_))
        ));
    }

    #[test]
    fn verdicts_must_come_in_submission_order() {
        let batch = orders(&["Par-Bur", "Mar-Spa"]);
        assert!(decode("1: SUCCEEDS\n2: FAILS\n\n", &batch).is_ok());
        assert_eq!(
            decode("2: SUCCEEDS\n1: FAILS\n\n", &batch),
            Err(SolverOutputError::BadVerdict("2: SUCCEEDS".into()))
        );
        assert_eq!(
            decode("1: SUCCEEDS\n7: FAILS\n\n", &batch),
            Err(SolverOutputError::BadVerdict("7: FAILS".into()))
        );
    }

    #[test]
    fn a_territory_is_dislodged_at_most_once() {
        let batch = orders(&["Gal-Vie"]);
        assert_eq!(
            decode("1: SUCCEEDS\n\nVie: Tri\nVie: Tyr\n", &batch),
            Err(SolverOutputError::DuplicateRetreat(t("Vie")))
        );
    }

    #[test]
    fn all_holds_need_no_verdict_lines() {
        let batch = orders(&["Vie H", "Bud H"]);
        let v = decode("", &batch).unwrap();
        assert_eq!(v.succeeded, vec![true, true]);
    }
}
