//! Movement-phase orders.
//!
//! Orders are written in a compact infix notation that serves both for
//! display and for the solver: `Lon H`, `Lon-Nth`, `Mao-Spa(NC)`,
//! `Lon-Bel C` (via convoy), `Nth S Lon`, `Nth S Lon-Bel`, `Nth C Lon-Bel`.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::territory::{Coast, Location, NameError, Territory};

/// The five order kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    Hold,
    Move,
    SupportHold,
    SupportMove,
    Convoy,
}

pub const ALL_ORDER_KINDS: [OrderKind; 5] = [
    OrderKind::Hold,
    OrderKind::Move,
    OrderKind::SupportHold,
    OrderKind::SupportMove,
    OrderKind::Convoy,
];

impl OrderKind {
    /// Short code offered to players.
    pub const fn code(self) -> &'static str {
        match self {
            OrderKind::Hold => "HOLD",
            OrderKind::Move => "MOVE",
            OrderKind::SupportHold => "SUPH",
            OrderKind::SupportMove => "SUPM",
            OrderKind::Convoy => "CONV",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            OrderKind::Hold => "Hold",
            OrderKind::Move => "Move (attack)",
            OrderKind::SupportHold => "Support hold",
            OrderKind::SupportMove => "Support move",
            OrderKind::Convoy => "Convoy",
        }
    }

    /// Parses a code or one of the accepted aliases, case-insensitively.
    pub fn parse(s: &str) -> Option<OrderKind> {
        let s = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
        let kind = match s.as_str() {
            "H" | "HOL" | "HOLD" => OrderKind::Hold,
            "M" | "MOV" | "MOVE" | "ATTACK" | "MOVE (ATTACK)" => OrderKind::Move,
            "SH" | "SUPH" | "SUPPORT HOLD" | "SUPPORT TO HOLD" | "SUPPORT A HOLD" => {
                OrderKind::SupportHold
            }
            "SM" | "SUPM" | "SUPPORT MOVE" | "SUPPORT TO MOVE" | "SUPPORT A MOVE" => {
                OrderKind::SupportMove
            }
            "C" | "CON" | "CONV" | "CONVOY" => OrderKind::Convoy,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether the order may cover several units while being built.
    pub const fn takes_many(self) -> bool {
        matches!(
            self,
            OrderKind::SupportHold | OrderKind::SupportMove | OrderKind::Convoy
        )
    }

    /// Whether the order names a unit other than its subject.
    pub const fn has_origin(self) -> bool {
        matches!(self, OrderKind::SupportMove | OrderKind::Convoy)
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A finished order for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Order {
    Hold {
        terr: Territory,
    },
    Move {
        terr: Territory,
        targ: Territory,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coast: Option<Coast>,
        #[serde(default)]
        via_convoy: bool,
    },
    SupportHold {
        terr: Territory,
        targ: Territory,
    },
    SupportMove {
        terr: Territory,
        orig: Territory,
        targ: Territory,
    },
    Convoy {
        terr: Territory,
        orig: Territory,
        targ: Territory,
    },
}

/// Errors from parsing order text or order selections.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderParseError {
    #[error("empty order")]
    Empty,

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("'{0}' does not look like an order")]
    Malformed(String),

    #[error("'{0}' is not a valid selection")]
    BadSelection(String),

    #[error("there is no order {0}")]
    OutOfRange(usize),
}

impl Order {
    pub fn kind(&self) -> OrderKind {
        match self {
            Order::Hold { .. } => OrderKind::Hold,
            Order::Move { .. } => OrderKind::Move,
            Order::SupportHold { .. } => OrderKind::SupportHold,
            Order::SupportMove { .. } => OrderKind::SupportMove,
            Order::Convoy { .. } => OrderKind::Convoy,
        }
    }

    /// The territory of the ordered unit.
    pub fn subject(&self) -> Territory {
        match *self {
            Order::Hold { terr }
            | Order::Move { terr, .. }
            | Order::SupportHold { terr, .. }
            | Order::SupportMove { terr, .. }
            | Order::Convoy { terr, .. } => terr,
        }
    }

    pub fn target(&self) -> Option<Territory> {
        match *self {
            Order::Hold { .. } => None,
            Order::Move { targ, .. }
            | Order::SupportHold { targ, .. }
            | Order::SupportMove { targ, .. }
            | Order::Convoy { targ, .. } => Some(targ),
        }
    }

    /// Sort key placing supports and convoys next to what they act on.
    fn sort_key(&self) -> (u8, Territory, Option<Territory>, Option<u8>, Option<Territory>) {
        match *self {
            Order::Hold { terr } => (0, terr, None, None, None),
            Order::SupportHold { terr, targ } => (0, targ, Some(terr), None, None),
            Order::Move { terr, targ, .. } => (1, terr, Some(targ), None, None),
            Order::SupportMove { terr, orig, targ } => (1, orig, Some(targ), Some(0), Some(terr)),
            Order::Convoy { terr, orig, targ } => (1, orig, Some(targ), Some(1), Some(terr)),
        }
    }

    fn tiebreak(&self) -> (Option<Coast>, bool) {
        match *self {
            Order::Move {
                coast, via_convoy, ..
            } => (coast, via_convoy),
            _ => (None, false),
        }
    }
}

impl Ord for Order {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.tiebreak().cmp(&other.tiebreak()))
    }
}

impl PartialOrd for Order {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Order::Hold { terr } => write!(f, "{terr} H"),
            Order::Move {
                terr,
                targ,
                coast,
                via_convoy,
            } => {
                write!(f, "{terr}-{}", targ.with_coast(coast))?;
                if via_convoy {
                    f.write_str(" C")?;
                }
                Ok(())
            }
            Order::SupportHold { terr, targ } => write!(f, "{terr} S {targ}"),
            Order::SupportMove { terr, orig, targ } => write!(f, "{terr} S {orig}-{targ}"),
            Order::Convoy { terr, orig, targ } => write!(f, "{terr} C {orig}-{targ}"),
        }
    }
}

impl FromStr for Order {
    type Err = OrderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spaced = s.replace('-', " - ");
        let tokens: Vec<&str> = spaced.split_whitespace().collect();
        let malformed = || OrderParseError::Malformed(s.trim().to_string());
        let is = |tok: &str, word: &str| tok.eq_ignore_ascii_case(word);

        let Some((first, rest)) = tokens.split_first() else {
            return Err(OrderParseError::Empty);
        };
        let terr: Territory = first.parse()?;

        match rest {
            [h] if is(h, "H") => Ok(Order::Hold { terr }),
            ["-", dest @ ..] if !dest.is_empty() => {
                let (dest, via_convoy) = match dest.split_last() {
                    Some((c, head)) if is(c, "C") && !head.is_empty() => (head, true),
                    _ => (dest, false),
                };
                let dest: Location = dest.join(" ").parse()?;
                if dest.territory == terr {
                    return Err(malformed());
                }
                Ok(Order::Move {
                    terr,
                    targ: dest.territory,
                    coast: dest.coast,
                    via_convoy,
                })
            }
            [s, targ] if is(s, "S") => Ok(Order::SupportHold {
                terr,
                targ: targ.parse()?,
            }),
            [s, orig, "-", targ] if is(s, "S") => Ok(Order::SupportMove {
                terr,
                orig: orig.parse()?,
                targ: targ.parse()?,
            }),
            [c, orig, "-", targ] if is(c, "C") => Ok(Order::Convoy {
                terr,
                orig: orig.parse()?,
                targ: targ.parse()?,
            }),
            _ => Err(malformed()),
        }
    }
}

/// Parses a selection of 1-based order numbers such as `1, 3-5`.
///
/// Every number must be between 1 and `count`. Returns 0-based indices.
pub fn parse_selection(s: &str, count: usize) -> Result<BTreeSet<usize>, OrderParseError> {
    let bad = || OrderParseError::BadSelection(s.trim().to_string());
    let mut out = BTreeSet::new();

    for part in s.split(',').map(str::trim) {
        if part.is_empty() {
            return Err(bad());
        }
        let (lo, hi) = match part.split_once('-') {
            Some((lo, hi)) => (lo.trim(), hi.trim()),
            None => (part, part),
        };
        let lo: usize = lo.parse().map_err(|_| bad())?;
        let hi: usize = hi.parse().map_err(|_| bad())?;
        if lo > hi {
            return Err(bad());
        }
        for n in lo..=hi {
            if n == 0 || n > count {
                return Err(OrderParseError::OutOfRange(n));
            }
            out.insert(n - 1);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Territory {
        s.parse().unwrap()
    }

    fn o(s: &str) -> Order {
        s.parse().unwrap()
    }

    #[test]
    fn canonical_forms() {
        for s in [
            "Lon H",
            "Lon-Nth",
            "Mao-Spa(NC)",
            "Lon-Bel C",
            "Nth S Lon",
            "Nth S Lon-Bel",
            "Nth C Lon-Bel",
        ] {
            assert_eq!(o(s).to_string(), s);
        }
    }

    #[test]
    fn parsing_is_lenient() {
        assert_eq!(o("lon - nth"), o("Lon-Nth"));
        assert_eq!(o("mao-spa/nc"), o("Mao-Spa(NC)"));
        assert_eq!(o("mao - spa nc"), o("Mao-Spa(NC)"));
        assert_eq!(o("nth c lon - bel"), o("Nth C Lon-Bel"));
        assert_eq!(o("lon-bel c"), o("Lon-Bel C"));
    }

    #[test]
    fn malformed_orders() {
        assert_eq!("".parse::<Order>(), Err(OrderParseError::Empty));
        assert!(matches!("Lon X".parse::<Order>(), Err(OrderParseError::Malformed(_))));
        assert!(matches!("Lon-Lon".parse::<Order>(), Err(OrderParseError::Malformed(_))));
        assert!(matches!("Xyz H".parse::<Order>(), Err(OrderParseError::Name(_))));
        assert!(matches!("Lon-".parse::<Order>(), Err(OrderParseError::Malformed(_))));
    }

    #[test]
    fn subject_and_target() {
        let order = o("Nth C Lon-Bel");
        assert_eq!(order.kind(), OrderKind::Convoy);
        assert_eq!(order.subject(), t("Nth"));
        assert_eq!(order.target(), Some(t("Bel")));
        assert_eq!(o("Lon H").target(), None);
    }

    #[test]
    fn supports_sort_next_to_what_they_support() {
        let mut orders = vec![
            o("Nth C Lon-Bel"),
            o("Pic S Lon-Bel"),
            o("Lon-Bel C"),
            o("Yor S Lon"),
            o("Lon H"),
            o("Edi-Nrg"),
        ];
        orders.sort();
        let text: Vec<String> = orders.iter().map(|o| o.to_string()).collect();
        assert_eq!(
            text,
            vec![
                "Lon H",
                "Yor S Lon",
                "Edi-Nrg",
                "Lon-Bel C",
                "Pic S Lon-Bel",
                "Nth C Lon-Bel",
            ]
        );
    }

    #[test]
    fn kind_aliases() {
        assert_eq!(OrderKind::parse("m"), Some(OrderKind::Move));
        assert_eq!(OrderKind::parse("Move (attack)"), Some(OrderKind::Move));
        assert_eq!(OrderKind::parse("support  to hold"), Some(OrderKind::SupportHold));
        assert_eq!(OrderKind::parse("SUPM"), Some(OrderKind::SupportMove));
        assert_eq!(OrderKind::parse("con"), Some(OrderKind::Convoy));
        assert_eq!(OrderKind::parse("retreat"), None);
    }

    #[test]
    fn selections() {
        assert_eq!(parse_selection("1, 3-5", 5).unwrap(), BTreeSet::from([0, 2, 3, 4]));
        assert_eq!(parse_selection("2", 2).unwrap(), BTreeSet::from([1]));
        assert_eq!(parse_selection("4", 3), Err(OrderParseError::OutOfRange(4)));
        assert_eq!(parse_selection("0", 3), Err(OrderParseError::OutOfRange(0)));
        assert!(parse_selection("3-1", 3).is_err());
        assert!(parse_selection("a", 3).is_err());
        assert!(parse_selection("1,,2", 3).is_err());
    }

    #[test]
    fn serde_uses_names() {
        let json = serde_json::to_string(&o("Mao-Spa(NC)")).unwrap();
        assert!(json.contains("\"Spa\""));
        assert!(json.contains("\"North\""));
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, o("Mao-Spa(NC)"));
    }
}
