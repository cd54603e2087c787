//! Movement-phase adjudication.
//!
//! The batch is handed to the solver as text; its verdicts are then applied
//! to the board in one step.

use std::time::Instant;

use super::adjudicator::{AdjudicationError, Adjudicator};
use super::retreat::{Dislodged, RetreatOptions};
use crate::board::{Board, Order};
use crate::protocol::solver::{self, SolverOutputError, Verdicts};

/// Sends the board and the batch to the solver and decodes its answer.
///
/// Nothing is changed on failure; the caller decides whether to try again.
pub fn adjudicate(adjudicator: &dyn Adjudicator, board: &Board, orders: &[Order]) -> Result<Verdicts, AdjudicationError> {
    let start = Instant::now();
    let input = solver::encode(board, orders);
    log::debug!("solver input:\n{input}");
    let output = adjudicator.run(&input)?;
    let verdicts = solver::decode(&output, orders)?;
    if let Some(from) = verdicts.retreats.keys().find(|t| !board.is_occupied(**t)) {
        return Err(SolverOutputError::EmptyRetreat(*from).into());
    }
    log::info!(
        "adjudicated {} orders in {:?}, {} dislodged",
        orders.len(),
        start.elapsed(),
        verdicts.retreats.len()
    );
    Ok(verdicts)
}

/// Applies the verdicts to the board.
///
/// Dislodged units are lifted off the board first, then every successful
/// move is applied as a bulk relocation. Returns the dislodged units with
/// their retreat options.
pub fn apply_verdicts(board: &mut Board, orders: &[Order], verdicts: &Verdicts) -> Vec<RetreatOptions> {
    let mut dislodged = Vec::with_capacity(verdicts.retreats.len());
    for (from, options) in &verdicts.retreats {
        let Some(unit) = board.remove(*from) else {
            log::warn!("solver dislodged a unit from empty {from}");
            continue;
        };
        dislodged.push(RetreatOptions {
            dislodged: Dislodged { from: *from, unit },
            options: options.clone(),
        });
    }

    let moves: Vec<_> = orders
        .iter()
        .zip(&verdicts.succeeded)
        .filter_map(|(order, ok)| match *order {
            Order::Move {
                terr, targ, coast, ..
            } if *ok => Some((terr, targ.with_coast(coast))),
            _ => None,
        })
        .collect();
    board.apply_moves(&moves);
    dislodged
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::board::{Nation, Territory, Unit};

    fn t(s: &str) -> Territory {
        s.parse().unwrap()
    }

    fn orders(texts: &[&str]) -> Vec<Order> {
        texts.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn solver_sees_the_encoded_batch() {
        let board = Board::standard();
        let batch = orders(&["Par-Bur", "Mar H"]);
        let solver = |input: &str| -> Result<String, AdjudicationError> {
            assert!(input.contains("Par A France\n"));
            assert!(input.ends_with("\nPar-Bur\n\n"));
            Ok("1: SUCCEEDS\n\n".to_string())
        };
        let v = adjudicate(&solver, &board, &batch).unwrap();
        assert_eq!(v.succeeded, vec![true, true]);
    }

    #[test]
    fn garbage_output_is_an_error() {
        let board = Board::standard();
        let batch = orders(&["Par-Bur"]);
        let solver = |_: &str| -> Result<String, AdjudicationError> { Ok("what?\n".to_string()) };
        assert!(matches!(
            adjudicate(&solver, &board, &batch),
            Err(AdjudicationError::Output(_))
        ));
    }

    #[test]
    fn dislodging_an_empty_territory_is_an_error() {
        let board = Board::standard();
        let solver = |_: &str| -> Result<String, AdjudicationError> { Ok("\nBoh: Tyr\n".to_string()) };
        assert!(matches!(
            adjudicate(&solver, &board, &[]),
            Err(AdjudicationError::Output(SolverOutputError::EmptyRetreat(from))) if from == t("Boh")
        ));
    }

    #[test]
    fn swap_under_faulty_verdict_keeps_both_units() {
        let mut board = Board::empty();
        board.place(t("Ber"), Unit::army(Nation::Germany));
        board.place(t("Pru"), Unit::army(Nation::Russia));
        let batch = orders(&["Ber-Pru", "Pru-Ber"]);
        let verdicts = Verdicts {
            succeeded: vec![true, true],
            ..Verdicts::default()
        };
        let dislodged = apply_verdicts(&mut board, &batch, &verdicts);
        assert!(dislodged.is_empty());
        assert_eq!(board.unit(t("Pru")).unwrap().nation, Nation::Germany);
        assert_eq!(board.unit(t("Ber")).unwrap().nation, Nation::Russia);
    }

    #[test]
    fn dislodged_units_leave_before_attackers_arrive() {
        let mut board = Board::standard();
        board.place(t("Gal"), Unit::army(Nation::Russia));
        board.place(t("Boh"), Unit::army(Nation::Germany));
        let batch = orders(&["Gal-Vie", "Boh S Gal-Vie", "Vie H"]);
        let verdicts = Verdicts {
            succeeded: vec![true, true, false],
            retreats: [(t("Vie"), BTreeSet::from([t("Tyr")]))].into(),
        };
        let dislodged = apply_verdicts(&mut board, &batch, &verdicts);
        assert_eq!(dislodged.len(), 1);
        assert_eq!(dislodged[0].dislodged.from, t("Vie"));
        assert_eq!(dislodged[0].dislodged.unit.nation, Nation::Austria);
        assert_eq!(board.unit(t("Vie")).unwrap().nation, Nation::Russia);
        assert!(!board.is_occupied(t("Gal")));
    }
}
