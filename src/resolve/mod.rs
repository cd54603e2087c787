//! Turn resolution.
//!
//! Movement is adjudicated by an external solver; everything that happens
//! around it (applying verdicts, retreats, adjustments, the calendar) lives
//! here.

pub mod adjudicator;
pub mod build;
pub mod movement;
pub mod phase;
pub mod retreat;

pub use adjudicator::{AdjudicationError, Adjudicator, ProcessAdjudicator};
pub use build::{apply_adjustments, auto_disband, entitlement, victor, Adjustment, Entitlement};
pub use movement::{adjudicate, apply_verdicts};
pub use phase::{after_retreats, parse_year, AfterRetreats, GameDate, Season};
pub use retreat::{resolve_retreats, Dislodged, RetreatChoice, RetreatOptions, RetreatOutcome};
