//! Board representation and map model.
//!
//! Contains the territory identifiers, the canonical map and its graphs,
//! units, the board state, occupancy-aware movement queries, and orders.

pub mod graph;
pub mod map;
pub mod order;
pub mod reach;
pub mod state;
pub mod territory;
pub mod unit;

pub use graph::{Graph, UNREACHABLE};
pub use map::{Map, MapError, StartingUnit, MAP};
pub use order::{parse_selection, Order, OrderKind, OrderParseError, ALL_ORDER_KINDS};
pub use state::Board;
pub use territory::{Coast, Location, NameError, Nation, Territory, TerritoryKind, ALL_NATIONS};
pub use unit::{Unit, UnitKind};
