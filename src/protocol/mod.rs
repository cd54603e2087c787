//! Text protocols.
//!
//! The solver encoding used to adjudicate movement, and the line command
//! parser the text driver uses in place of a chat transport.

pub mod parser;
pub mod solver;

pub use parser::{parse_command, parse_line, Command, CommandError, Line, Request};
pub use solver::{decode, encode, SolverOutputError, Verdicts};
