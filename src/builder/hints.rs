//! Suggested answers for the field a builder is waiting on.
//!
//! Hints are advisory: they feed menus in the transport and are never used
//! to accept or refuse input.

use std::collections::BTreeSet;

use serde::Serialize;

use super::{BuildContext, Field, OrderBuilder};
use crate::board::map::MAP;
use crate::board::order::{OrderKind, ALL_ORDER_KINDS};
use crate::board::state::Board;
use crate::board::territory::{Coast, Territory};
use crate::board::unit::UnitKind;

/// Legal-looking answers for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Hint {
    Kinds(Vec<OrderKind>),
    Territories(BTreeSet<Territory>),
    YesNo,
    Coasts(Vec<Coast>),
    Nothing,
}

/// Territories every unit in `terrs` could move to directly.
fn common_dests(board: &Board, terrs: &BTreeSet<Territory>) -> BTreeSet<Territory> {
    let mut iter = terrs.iter();
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    iter.fold(board.valid_dests(*first), |acc, t| &acc & &board.valid_dests(*t))
}

impl OrderBuilder {
    pub fn hints(&self, ctx: &BuildContext<'_>) -> Hint {
        match self.next_field() {
            Field::Kind => Hint::Kinds(ALL_ORDER_KINDS.to_vec()),
            Field::Terr => Hint::Territories(self.terr_hints(ctx)),
            Field::Orig => Hint::Territories(self.orig_hints(ctx.board)),
            Field::Targ => Hint::Territories(self.targ_hints(ctx.board)),
            Field::ViaConvoy => Hint::YesNo,
            Field::Coast => match (self.terrs().first(), self.targ()) {
                (Some(mover), Some(targ)) => Hint::Coasts(
                    ctx.board
                        .location(*mover)
                        .map(|from| ctx.board.coasts_reachable_from(from, targ))
                        .unwrap_or_default(),
                ),
                _ => Hint::Nothing,
            },
            Field::Done => Hint::Nothing,
        }
    }

    /// Own units without an order yet, or the chosen ones when removing.
    fn terr_hints(&self, ctx: &BuildContext<'_>) -> BTreeSet<Territory> {
        if self.is_removing() {
            return self.terrs().clone();
        }
        let ordered: BTreeSet<Territory> = ctx.pending.iter().map(|o| o.subject()).collect();
        let mut out = &(&ctx.board.occupied_by(self.nation()) - &ordered) - self.terrs();
        if self.kind() == Some(OrderKind::Convoy) {
            out.retain(|t| t.is_sea() && ctx.board.unit(*t).is_some_and(|u| u.kind == UnitKind::Fleet));
        }
        out
    }

    fn orig_hints(&self, board: &Board) -> BTreeSet<Territory> {
        let terrs = self.terrs();
        match self.kind() {
            Some(OrderKind::SupportMove) => {
                let common = common_dests(board, terrs);
                board
                    .units()
                    .map(|(t, _)| t)
                    .filter(|t| !terrs.contains(t))
                    .filter(|t| {
                        !board.valid_dests(*t).is_disjoint(&common)
                            || !board.convoy_dests(*t, terrs).is_disjoint(&common)
                    })
                    .collect()
            }
            Some(OrderKind::Convoy) => MAP
                .bare
                .neighbors(board.contiguous_fleets(terrs))
                .into_iter()
                .filter(|t| board.unit(*t).is_some_and(|u| u.kind == UnitKind::Army))
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    fn targ_hints(&self, board: &Board) -> BTreeSet<Territory> {
        let terrs = self.terrs();
        match self.kind() {
            Some(OrderKind::Move) => match terrs.first() {
                Some(t) => &board.valid_dests(*t) | &board.convoy_dests(*t, &BTreeSet::new()),
                None => BTreeSet::new(),
            },
            Some(OrderKind::SupportHold) => {
                let mut out = common_dests(board, terrs);
                out.retain(|t| board.is_occupied(*t));
                out
            }
            Some(OrderKind::SupportMove) => match self.orig() {
                Some(orig) => {
                    let reach = &board.valid_dests(orig) | &board.convoy_dests(orig, terrs);
                    &common_dests(board, terrs) & &reach
                }
                None => BTreeSet::new(),
            },
            Some(OrderKind::Convoy) => match self.orig() {
                Some(orig) => board.convoy_dests(orig, &BTreeSet::new()),
                None => BTreeSet::new(),
            },
            _ => BTreeSet::new(),
        }
    }
}
