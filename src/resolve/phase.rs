//! Game calendar.
//!
//! A game year has two movement seasons. Years are signed: negative years
//! are BC and there is no year 0, so the year after 1 BC is 1 AD.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Latest starting year, either side of year 1.
pub const MAX_START_YEAR: i32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Autumn,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Spring => f.write_str("Spring"),
            Season::Autumn => f.write_str("Autumn"),
        }
    }
}

/// In-game date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameDate {
    pub year: i32,
    pub season: Season,
}

impl GameDate {
    /// Spring of `year`.
    pub fn spring(year: i32) -> GameDate {
        debug_assert!(year != 0);
        GameDate {
            year,
            season: Season::Spring,
        }
    }

    /// The following season.
    pub fn next(self) -> GameDate {
        match self.season {
            Season::Spring => GameDate {
                year: self.year,
                season: Season::Autumn,
            },
            Season::Autumn => {
                let year = match self.year.saturating_add(1) {
                    0 => 1,
                    y => y,
                };
                GameDate::spring(year)
            }
        }
    }

    pub fn is_autumn(self) -> bool {
        self.season == Season::Autumn
    }
}

impl fmt::Display for GameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let era = if self.year < 0 { "BC" } else { "AD" };
        write!(f, "{} {} {}", self.season, self.year.unsigned_abs(), era)
    }
}

/// Parses a starting year: `1901`, `1901 AD`, `300 BC`, `44 bce`, `1 CE`.
///
/// Returns `None` for anything else, including year 0 and years beyond
/// [`MAX_START_YEAR`].
pub fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    let digits = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (number, era) = s.split_at(digits);
    let year: i32 = number.parse().ok()?;
    if !(1..=MAX_START_YEAR).contains(&year) {
        return None;
    }
    match era.trim().to_ascii_uppercase().as_str() {
        "" | "AD" | "CE" => Some(year),
        "BC" | "BCE" => Some(-year),
        _ => None,
    }
}

/// Where the game goes once retreats are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterRetreats {
    /// Spring: straight to the next movement phase.
    Movement,
    /// Autumn: supply centers are counted and armies adjusted.
    Adjustments,
}

pub fn after_retreats(season: Season) -> AfterRetreats {
    match season {
        Season::Spring => AfterRetreats::Movement,
        Season::Autumn => AfterRetreats::Adjustments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_alternate() {
        let d = GameDate::spring(1901);
        assert_eq!(d.next(), GameDate { year: 1901, season: Season::Autumn });
        assert_eq!(d.next().next(), GameDate::spring(1902));
    }

    #[test]
    fn no_year_zero() {
        let d = GameDate {
            year: -1,
            season: Season::Autumn,
        };
        assert_eq!(d.next(), GameDate::spring(1));
        assert_eq!(GameDate::spring(-44).next().next(), GameDate::spring(-43));
    }

    #[test]
    fn display() {
        assert_eq!(GameDate::spring(1901).to_string(), "Spring 1901 AD");
        assert_eq!(GameDate::spring(-44).next().to_string(), "Autumn 44 BC");
    }

    #[test]
    fn year_formats() {
        assert_eq!(parse_year("1901"), Some(1901));
        assert_eq!(parse_year(" 1901 AD "), Some(1901));
        assert_eq!(parse_year("300BC"), Some(-300));
        assert_eq!(parse_year("44 bce"), Some(-44));
        assert_eq!(parse_year("1 ce"), Some(1));
        assert_eq!(parse_year("0"), None);
        assert_eq!(parse_year("0 BC"), None);
        assert_eq!(parse_year("AD"), None);
        assert_eq!(parse_year("1901 XY"), None);
        assert_eq!(parse_year("-5"), None);
    }

    #[test]
    fn year_range_is_bounded() {
        assert_eq!(parse_year("1000000"), Some(MAX_START_YEAR));
        assert_eq!(parse_year("1000000 BC"), Some(-MAX_START_YEAR));
        assert_eq!(parse_year("1000001"), None);
        assert_eq!(parse_year("2147483647"), None);
        assert_eq!(parse_year("99999999999"), None);

        let last = GameDate {
            year: i32::MAX,
            season: Season::Autumn,
        };
        assert_eq!(last.next(), GameDate::spring(i32::MAX));
    }

    #[test]
    fn retreat_flow() {
        assert_eq!(after_retreats(Season::Spring), AfterRetreats::Movement);
        assert_eq!(after_retreats(Season::Autumn), AfterRetreats::Adjustments);
    }
}
