//! Interactive order construction.
//!
//! An [`OrderBuilder`] collects one order field at a time from free text,
//! validating each answer against the board before moving on. Fields are
//! filled in a fixed precedence:
//!
//! ```text
//! Kind -> Terr -> [Orig] -> Targ -> [ViaConvoy] -> [Coast] -> Done
//! ```
//!
//! Every committed field is pushed onto a history stack, so stepping back is
//! a pop. Finishing a support or convoy that covers several units yields one
//! order per unit.

pub mod hints;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::order::{Order, OrderKind};
use crate::board::state::Board;
use crate::board::territory::{Coast, Nation, Territory};
use crate::board::unit::UnitKind;

pub use hints::Hint;

/// The field the builder expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Kind,
    Terr,
    Orig,
    Targ,
    ViaConvoy,
    Coast,
    Done,
}

impl Field {
    /// The question put to the player for this field.
    pub fn prompt(self, kind: Option<OrderKind>) -> &'static str {
        match (self, kind) {
            (Field::Kind, _) => "What kind of order?",
            (Field::Terr, Some(k)) if k.takes_many() => {
                "Which units? Add as many as you like, then say DONE"
            }
            (Field::Terr, _) => "Which unit?",
            (Field::Orig, Some(OrderKind::Convoy)) => "Which army is being convoyed?",
            (Field::Orig, _) => "Which unit is being supported?",
            (Field::Targ, Some(OrderKind::Move)) => "Where to?",
            (Field::Targ, Some(OrderKind::SupportHold)) => "Which unit is being supported?",
            (Field::Targ, _) => "Where is it moving?",
            (Field::ViaConvoy, _) => "Should the move go by convoy?",
            (Field::Coast, _) => "Which coast?",
            (Field::Done, _) => "The order is complete",
        }
    }
}

/// Why a well-formed answer was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("There's no unit in {0}")]
    NoUnit(Territory),

    #[error("You can't order someone else's unit")]
    NotYours,

    #[error("Only fleets can convoy")]
    OnlyFleetsConvoy,

    #[error("A fleet needs to be in open sea to convoy")]
    ConvoyNeedsOpenSea,

    #[error("There's already another order for {terr} ({order})")]
    AlreadyOrdered { terr: Territory, order: Order },

    #[error("You must specify at least one territory")]
    NoTerritory,

    #[error("{0} is already part of the order")]
    AlreadyInOrder(Territory),

    #[error("Can't move onto itself")]
    SelfTarget,

    #[error("{terr}{coast} doesn't exist")]
    NoSuchCoast { terr: Territory, coast: Coast },

    #[error("{targ}{coast} can't be reached from {from}")]
    CoastUnreachable {
        from: Territory,
        targ: Territory,
        coast: Coast,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuilderError {
    /// The text does not parse as an answer for the current field.
    #[error("invalid input '{0}'")]
    Invalid(String),

    #[error("{0}")]
    Rejected(#[from] Rejection),

    /// Backed up past the first field.
    #[error("nothing left to undo")]
    AtStart,

    #[error("the order is already complete")]
    Complete,

    #[error("the order is not complete, {0:?} is still missing")]
    Incomplete(Field),
}

/// What the builder needs to know about the game while validating.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub board: &'a Board,
    /// Orders the player has already submitted this phase.
    pub pending: &'a [Order],
}

/// One committed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum Step {
    Kind(OrderKind),
    Terrs(BTreeSet<Territory>),
    Orig(Territory),
    Targ {
        targ: Territory,
        ask_via: bool,
        ask_coast: bool,
        coast: Option<Coast>,
    },
    ViaConvoy(bool),
    Coast(Coast),
}

/// Builds one order, or one order per unit for supports and convoys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBuilder {
    nation: Nation,
    steps: Vec<Step>,
    /// Units chosen so far while the Terr field is open.
    terrs: BTreeSet<Territory>,
    removing: bool,
}

impl OrderBuilder {
    pub fn new(nation: Nation) -> Self {
        OrderBuilder {
            nation,
            steps: Vec::new(),
            terrs: BTreeSet::new(),
            removing: false,
        }
    }

    pub fn nation(&self) -> Nation {
        self.nation
    }

    /// Number of committed fields.
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    pub fn kind(&self) -> Option<OrderKind> {
        self.steps.iter().find_map(|s| match s {
            Step::Kind(k) => Some(*k),
            _ => None,
        })
    }

    /// The chosen units: the committed set, or the partial one while the
    /// Terr field is still open.
    pub fn terrs(&self) -> &BTreeSet<Territory> {
        self.steps
            .iter()
            .find_map(|s| match s {
                Step::Terrs(ts) => Some(ts),
                _ => None,
            })
            .unwrap_or(&self.terrs)
    }

    pub fn is_removing(&self) -> bool {
        self.removing
    }

    pub fn orig(&self) -> Option<Territory> {
        self.steps.iter().find_map(|s| match s {
            Step::Orig(t) => Some(*t),
            _ => None,
        })
    }

    pub fn targ(&self) -> Option<Territory> {
        self.steps.iter().find_map(|s| match s {
            Step::Targ { targ, .. } => Some(*targ),
            _ => None,
        })
    }

    fn via_convoy(&self) -> Option<bool> {
        self.steps.iter().find_map(|s| match s {
            Step::ViaConvoy(v) => Some(*v),
            _ => None,
        })
    }

    /// The destination coast, whether chosen or inferred.
    pub fn coast(&self) -> Option<Coast> {
        self.steps.iter().rev().find_map(|s| match s {
            Step::Coast(c) => Some(*c),
            Step::Targ { coast, .. } => *coast,
            _ => None,
        })
    }

    /// The single subject of a Hold or Move.
    fn subject(&self) -> Option<Territory> {
        self.terrs().first().copied()
    }

    pub fn next_field(&self) -> Field {
        let Some(kind) = self.kind() else {
            return Field::Kind;
        };
        if !self.steps.iter().any(|s| matches!(s, Step::Terrs(_))) {
            return Field::Terr;
        }
        if kind == OrderKind::Hold {
            return Field::Done;
        }
        if kind.has_origin() && self.orig().is_none() {
            return Field::Orig;
        }
        let Some(Step::Targ {
            ask_via, ask_coast, ..
        }) = self.steps.iter().find(|s| matches!(s, Step::Targ { .. }))
        else {
            return Field::Targ;
        };
        if *ask_via && self.via_convoy().is_none() {
            return Field::ViaConvoy;
        }
        if *ask_coast && !self.steps.iter().any(|s| matches!(s, Step::Coast(_))) {
            return Field::Coast;
        }
        Field::Done
    }

    pub fn is_done(&self) -> bool {
        self.next_field() == Field::Done
    }

    /// Feeds one answer to the current field and returns the field expected
    /// next. `BACK` steps back instead.
    pub fn push(&mut self, input: &str, ctx: &BuildContext<'_>) -> Result<Field, BuilderError> {
        let text = input.split_whitespace().collect::<Vec<_>>().join(" ");
        let upper = text.to_ascii_uppercase();

        if upper == "BACK" {
            self.back()?;
            return Ok(self.next_field());
        }

        let invalid = || BuilderError::Invalid(text.clone());
        match self.next_field() {
            Field::Done => return Err(BuilderError::Complete),
            Field::Kind => {
                let kind = OrderKind::parse(&upper).ok_or_else(invalid)?;
                self.steps.push(Step::Kind(kind));
            }
            Field::Terr => self.push_terr(&text, &upper, ctx)?,
            Field::Orig => {
                let t = Territory::parse(&text).ok_or_else(invalid)?;
                if self.terrs().contains(&t) {
                    return Err(Rejection::AlreadyInOrder(t).into());
                }
                self.steps.push(Step::Orig(t));
            }
            Field::Targ => {
                let t = Territory::parse(&text).ok_or_else(invalid)?;
                self.push_targ(t, ctx)?;
            }
            Field::ViaConvoy => {
                let via = match upper.as_str() {
                    "YES" | "Y" => true,
                    "NO" | "N" => false,
                    _ => return Err(invalid()),
                };
                self.steps.push(Step::ViaConvoy(via));
            }
            Field::Coast => {
                let coast = Coast::parse(&upper).ok_or_else(invalid)?;
                self.push_coast(coast, ctx)?;
            }
        }
        Ok(self.next_field())
    }

    fn push_terr(&mut self, text: &str, upper: &str, ctx: &BuildContext<'_>) -> Result<(), BuilderError> {
        let kind = self.kind().ok_or(BuilderError::Incomplete(Field::Kind))?;
        match upper {
            "DONE" => {
                if self.terrs.is_empty() {
                    return Err(Rejection::NoTerritory.into());
                }
                let terrs = std::mem::take(&mut self.terrs);
                self.removing = false;
                self.steps.push(Step::Terrs(terrs));
                return Ok(());
            }
            "REMOVE" => {
                if self.terrs.is_empty() {
                    return Err(BuilderError::Invalid(text.to_string()));
                }
                self.removing = true;
                return Ok(());
            }
            "ADD" => {
                self.removing = false;
                return Ok(());
            }
            _ => {}
        }

        let t = Territory::parse(text).ok_or_else(|| BuilderError::Invalid(text.to_string()))?;
        if self.removing {
            if !self.terrs.remove(&t) {
                return Err(BuilderError::Invalid(text.to_string()));
            }
            if self.terrs.is_empty() {
                self.removing = false;
            }
            return Ok(());
        }

        self.validate_subject(kind, t, ctx)?;
        self.terrs.insert(t);
        if !kind.takes_many() {
            let terrs = std::mem::take(&mut self.terrs);
            self.steps.push(Step::Terrs(terrs));
        }
        Ok(())
    }

    fn validate_subject(&self, kind: OrderKind, t: Territory, ctx: &BuildContext<'_>) -> Result<(), Rejection> {
        let unit = ctx.board.unit(t).ok_or(Rejection::NoUnit(t))?;
        if unit.nation != self.nation {
            return Err(Rejection::NotYours);
        }
        if kind == OrderKind::Convoy {
            if unit.kind != UnitKind::Fleet {
                return Err(Rejection::OnlyFleetsConvoy);
            }
            if !t.is_sea() {
                return Err(Rejection::ConvoyNeedsOpenSea);
            }
        }
        if let Some(order) = ctx.pending.iter().find(|o| o.subject() == t) {
            return Err(Rejection::AlreadyOrdered { terr: t, order: *order });
        }
        Ok(())
    }

    fn push_targ(&mut self, targ: Territory, ctx: &BuildContext<'_>) -> Result<(), BuilderError> {
        let kind = self.kind().ok_or(BuilderError::Incomplete(Field::Kind))?;
        let origin = match kind {
            OrderKind::Move => self.subject(),
            _ => self.orig(),
        };
        if origin == Some(targ) {
            return Err(Rejection::SelfTarget.into());
        }
        if kind == OrderKind::SupportHold && self.terrs().contains(&targ) {
            return Err(Rejection::AlreadyInOrder(targ).into());
        }

        let (mut ask_via, mut ask_coast, mut coast) = (false, false, None);
        if let (OrderKind::Move, Some(mover)) = (kind, self.subject()) {
            ask_via = ctx.board.convoy_ambiguous(mover, targ);
            let fleet = ctx.board.unit(mover).is_some_and(|u| u.kind == UnitKind::Fleet);
            if fleet && targ.is_split() {
                let reachable = ctx
                    .board
                    .location(mover)
                    .map(|from| ctx.board.coasts_reachable_from(from, targ))
                    .unwrap_or_default();
                match reachable.as_slice() {
                    [only] => coast = Some(*only),
                    _ => ask_coast = true,
                }
            }
        }
        self.steps.push(Step::Targ {
            targ,
            ask_via,
            ask_coast,
            coast,
        });
        Ok(())
    }

    fn push_coast(&mut self, coast: Coast, ctx: &BuildContext<'_>) -> Result<(), BuilderError> {
        let (Some(mover), Some(targ)) = (self.subject(), self.targ()) else {
            return Err(BuilderError::Incomplete(Field::Targ));
        };
        if !targ.coasts().contains(&coast) {
            return Err(Rejection::NoSuchCoast { terr: targ, coast }.into());
        }
        let reachable = ctx
            .board
            .location(mover)
            .map(|from| ctx.board.coasts_reachable_from(from, targ))
            .unwrap_or_default();
        if !reachable.contains(&coast) {
            return Err(Rejection::CoastUnreachable {
                from: mover,
                targ,
                coast,
            }
            .into());
        }
        self.steps.push(Step::Coast(coast));
        Ok(())
    }

    /// Steps back one field.
    ///
    /// While units are being collected the partial selection is discarded
    /// together with the order kind. Fails with [`BuilderError::AtStart`]
    /// when nothing has been chosen yet, so the caller can drop the builder.
    pub fn back(&mut self) -> Result<(), BuilderError> {
        let collecting = self.next_field() == Field::Terr;
        self.terrs.clear();
        self.removing = false;
        if collecting {
            // Only the kind has been committed at this point.
            self.steps.clear();
            return Ok(());
        }
        self.steps.pop().map(|_| ()).ok_or(BuilderError::AtStart)
    }

    /// Expands the finished order into one order per subject.
    pub fn finish(&self) -> Result<Vec<Order>, BuilderError> {
        let field = self.next_field();
        if field != Field::Done {
            return Err(BuilderError::Incomplete(field));
        }
        let kind = self.kind().ok_or(BuilderError::Incomplete(Field::Kind))?;
        let targ = self.targ();
        let orig = self.orig();
        let missing = |f| BuilderError::Incomplete(f);

        self.terrs()
            .iter()
            .map(|&terr| -> Result<Order, BuilderError> {
                Ok(match kind {
                    OrderKind::Hold => Order::Hold { terr },
                    OrderKind::Move => Order::Move {
                        terr,
                        targ: targ.ok_or_else(|| missing(Field::Targ))?,
                        coast: self.coast(),
                        via_convoy: self.via_convoy().unwrap_or(false),
                    },
                    OrderKind::SupportHold => Order::SupportHold {
                        terr,
                        targ: targ.ok_or_else(|| missing(Field::Targ))?,
                    },
                    OrderKind::SupportMove => Order::SupportMove {
                        terr,
                        orig: orig.ok_or_else(|| missing(Field::Orig))?,
                        targ: targ.ok_or_else(|| missing(Field::Targ))?,
                    },
                    OrderKind::Convoy => Order::Convoy {
                        terr,
                        orig: orig.ok_or_else(|| missing(Field::Orig))?,
                        targ: targ.ok_or_else(|| missing(Field::Targ))?,
                    },
                })
            })
            .collect()
    }
}

impl fmt::Display for OrderBuilder {
    /// The order so far, e.g. `Support move: Nth, Hol S Lon-?`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(kind) = self.kind() else {
            return f.write_str("New order");
        };
        write!(f, "{kind}:")?;
        let terrs: Vec<String> = self.terrs().iter().map(|t| t.to_string()).collect();
        if terrs.is_empty() {
            return Ok(());
        }
        write!(f, " {}", terrs.join(", "))?;
        let or_blank = |t: Option<Territory>| t.map_or_else(|| "?".to_string(), |t| t.to_string());
        match kind {
            OrderKind::Hold => f.write_str(" H"),
            OrderKind::Move => {
                write!(f, "-{}", or_blank(self.targ()))?;
                if let Some(c) = self.coast() {
                    write!(f, "{c}")?;
                }
                if self.via_convoy() == Some(true) {
                    f.write_str(" C")?;
                }
                Ok(())
            }
            OrderKind::SupportHold => write!(f, " S {}", or_blank(self.targ())),
            OrderKind::SupportMove => {
                write!(f, " S {}-{}", or_blank(self.orig()), or_blank(self.targ()))
            }
            OrderKind::Convoy => {
                write!(f, " C {}-{}", or_blank(self.orig()), or_blank(self.targ()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::unit::Unit;

    fn t(s: &str) -> Territory {
        s.parse().unwrap()
    }

    fn feed(b: &mut OrderBuilder, ctx: &BuildContext<'_>, inputs: &[&str]) -> Field {
        let mut field = b.next_field();
        for input in inputs {
            field = b.push(input, ctx).unwrap_or_else(|e| panic!("{input}: {e}"));
        }
        field
    }

    fn texts(orders: &[Order]) -> Vec<String> {
        orders.iter().map(|o| o.to_string()).collect()
    }

    #[test]
    fn hold_completes_after_one_unit() {
        let board = Board::standard();
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::England);
        assert_eq!(feed(&mut b, &ctx, &["hold", "lon"]), Field::Done);
        assert_eq!(texts(&b.finish().unwrap()), vec!["Lon H"]);
    }

    #[test]
    fn move_skips_optional_fields() {
        let board = Board::standard();
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::France);
        assert_eq!(feed(&mut b, &ctx, &["M", "Par"]), Field::Targ);
        assert_eq!(feed(&mut b, &ctx, &["Bur"]), Field::Done);
        assert_eq!(texts(&b.finish().unwrap()), vec!["Par-Bur"]);
    }

    #[test]
    fn support_covers_many_units() {
        let mut board = Board::standard();
        board.place(t("Hol"), Unit::army(Nation::England));
        board.place(t("Nth"), Unit::fleet(Nation::England, None));
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::England);
        assert_eq!(feed(&mut b, &ctx, &["support move", "Nth", "Hol"]), Field::Terr);
        assert_eq!(feed(&mut b, &ctx, &["done", "Lon", "Bel"]), Field::Done);
        assert_eq!(texts(&b.finish().unwrap()), vec!["Hol S Lon-Bel", "Nth S Lon-Bel"]);
    }

    #[test]
    fn remove_toggles_selection() {
        let board = Board::standard();
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::England);
        feed(&mut b, &ctx, &["SH", "Lon", "Edi", "remove", "Lon"]);
        assert!(b.is_removing());
        assert_eq!(b.terrs(), &BTreeSet::from([t("Edi")]));
        feed(&mut b, &ctx, &["add", "Lvp"]);
        assert_eq!(b.terrs().len(), 2);
    }

    #[test]
    fn unit_validation() {
        let board = Board::standard();
        let pending = ["Lon-Nth".parse::<Order>().unwrap()];
        let ctx = BuildContext { board: &board, pending: &pending };

        let mut b = OrderBuilder::new(Nation::England);
        b.push("H", &ctx).unwrap();
        assert_eq!(b.push("Bur", &ctx), Err(Rejection::NoUnit(t("Bur")).into()));
        assert_eq!(b.push("Par", &ctx), Err(Rejection::NotYours.into()));
        assert_eq!(b.push("Xyz", &ctx), Err(BuilderError::Invalid("Xyz".to_string())));
        assert_eq!(
            b.push("Lon", &ctx).unwrap_err().to_string(),
            "There's already another order for Lon (Lon-Nth)"
        );
        assert_eq!(b.next_field(), Field::Terr);

        let mut b = OrderBuilder::new(Nation::England);
        b.push("C", &ctx).unwrap();
        assert_eq!(b.push("Lvp", &ctx), Err(Rejection::OnlyFleetsConvoy.into()));
        assert_eq!(b.push("Edi", &ctx), Err(Rejection::ConvoyNeedsOpenSea.into()));
        assert_eq!(b.push("done", &ctx), Err(Rejection::NoTerritory.into()));
    }

    #[test]
    fn self_targeting_is_rejected() {
        let board = Board::standard();
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::England);
        feed(&mut b, &ctx, &["move", "Lon"]);
        assert_eq!(b.push("Lon", &ctx), Err(Rejection::SelfTarget.into()));

        let mut b = OrderBuilder::new(Nation::England);
        feed(&mut b, &ctx, &["SM", "Edi", "done"]);
        assert_eq!(b.push("Edi", &ctx), Err(Rejection::AlreadyInOrder(t("Edi")).into()));
        feed(&mut b, &ctx, &["Lvp"]);
        assert_eq!(b.push("Lvp", &ctx), Err(Rejection::SelfTarget.into()));
    }

    #[test]
    fn army_move_within_a_basin_asks_about_convoy() {
        let board = Board::standard();
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::Germany);
        assert_eq!(feed(&mut b, &ctx, &["move", "Ber", "Kie"]), Field::ViaConvoy);
        assert_eq!(b.push("maybe", &ctx), Err(BuilderError::Invalid("maybe".to_string())));
        assert_eq!(feed(&mut b, &ctx, &["y"]), Field::Done);
        assert_eq!(texts(&b.finish().unwrap()), vec!["Ber-Kie C"]);

        let mut b = OrderBuilder::new(Nation::Germany);
        assert_eq!(feed(&mut b, &ctx, &["move", "Mun", "Kie"]), Field::Done);
    }

    #[test]
    fn coast_is_inferred_when_only_one_is_reachable() {
        let mut board = Board::empty();
        board.place(t("Gas"), Unit::fleet(Nation::France, None));
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::France);
        assert_eq!(feed(&mut b, &ctx, &["move", "Gas", "Spa"]), Field::Done);
        assert_eq!(texts(&b.finish().unwrap()), vec!["Gas-Spa(NC)"]);
    }

    #[test]
    fn unreachable_split_coast_is_rejected_until_backed_out() {
        let board = Board::standard();
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::Russia);
        assert_eq!(feed(&mut b, &ctx, &["move", "StP", "Spa"]), Field::Coast);
        assert!(matches!(b.push("NC", &ctx), Err(BuilderError::Rejected(Rejection::CoastUnreachable { .. }))));
        assert!(matches!(b.push("SC", &ctx), Err(BuilderError::Rejected(Rejection::CoastUnreachable { .. }))));
        assert_eq!(b.push("EC", &ctx), Err(Rejection::NoSuchCoast { terr: t("Spa"), coast: Coast::East }.into()));
        assert_eq!(b.push("back", &ctx), Ok(Field::Targ));
        assert_eq!(feed(&mut b, &ctx, &["Bot"]), Field::Done);
    }

    #[test]
    fn ambiguous_split_coast_needs_an_adjacent_coast() {
        let mut board = Board::empty();
        board.place(t("Con"), Unit::fleet(Nation::Turkey, None));
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::Turkey);
        assert_eq!(feed(&mut b, &ctx, &["move", "Con", "Bul"]), Field::Coast);
        assert!(b.push("north", &ctx).is_err());
        assert_eq!(feed(&mut b, &ctx, &["east coast"]), Field::Done);
        assert_eq!(texts(&b.finish().unwrap()), vec!["Con-Bul(EC)"]);
    }

    #[test]
    fn back_walks_fields_in_reverse() {
        let mut board = Board::standard();
        board.place(t("Nth"), Unit::fleet(Nation::England, None));
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::England);
        feed(&mut b, &ctx, &["convoy", "Nth", "done", "Yor", "Bel"]);
        assert_eq!(b.depth(), 4);
        assert_eq!(b.push("back", &ctx), Ok(Field::Targ));
        assert_eq!(b.push("back", &ctx), Ok(Field::Orig));
        assert_eq!(b.push("back", &ctx), Ok(Field::Terr));
        assert!(b.terrs().is_empty());
        assert_eq!(b.push("back", &ctx), Ok(Field::Kind));
        assert_eq!(b.push("back", &ctx), Err(BuilderError::AtStart));
    }

    #[test]
    fn back_from_partial_selection_resets_kind() {
        let board = Board::standard();
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::England);
        feed(&mut b, &ctx, &["SH", "Lon", "Edi"]);
        assert_eq!(b.push("back", &ctx), Ok(Field::Kind));
        assert!(b.terrs().is_empty());
        assert_eq!(b.depth(), 0);
    }

    #[test]
    fn pushing_past_done_is_an_error() {
        let board = Board::standard();
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::England);
        feed(&mut b, &ctx, &["H", "Lon"]);
        assert_eq!(b.push("Edi", &ctx), Err(BuilderError::Complete));
        let mut b = OrderBuilder::new(Nation::England);
        b.push("H", &ctx).unwrap();
        assert_eq!(b.finish(), Err(BuilderError::Incomplete(Field::Terr)));
    }

    #[test]
    fn canonical_text_round_trips_through_parsing() {
        let board = Board::standard();
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::Germany);
        feed(&mut b, &ctx, &["move", "Ber", "Kie", "n"]);
        for order in b.finish().unwrap() {
            let text = order.to_string();
            let reparsed: Order = text.parse().unwrap();
            assert_eq!(reparsed.to_string(), text);
        }
    }

    #[test]
    fn display_shows_progress() {
        let board = Board::standard();
        let ctx = BuildContext { board: &board, pending: &[] };
        let mut b = OrderBuilder::new(Nation::England);
        assert_eq!(b.to_string(), "New order");
        feed(&mut b, &ctx, &["SM", "Lon", "Edi", "done", "Lvp"]);
        assert_eq!(b.to_string(), "Support move: Edi, Lon S Lvp-?");
    }
}
