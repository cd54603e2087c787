//! Armistice: a Diplomacy rules engine for chat-driven sessions.
//!
//! Exposes the map and board model, the interactive order builder, turn
//! resolution, the session orchestrator, and the text protocols used by the
//! binary and the integration tests.

pub mod board;
pub mod builder;
pub mod config;
pub mod engine;
pub mod game;
pub mod protocol;
pub mod resolve;
