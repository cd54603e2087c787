//! Session-level dispatch.
//!
//! The engine owns the session store and the adjudicator. Each request loads
//! one game, applies one command, runs the solver when the game is waiting
//! for it, and writes the game back.

use std::time::Instant;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::config::Config;
use crate::game::{
    Action, Event, Game, GameError, GamePhase, JsonDirStore, MemoryStore, Refusal, Rules, SessionStore, StoreError,
};
use crate::protocol::Command;
use crate::resolve::Adjudicator;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("There is no game called '{0}'")]
    NoSession(String),

    #[error("A game called '{0}' already exists")]
    SessionExists(String),

    #[error("You are already playing in '{0}'")]
    InAnotherGame(String),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("session store: {0}")]
    Store(#[from] StoreError),
}

pub struct Engine {
    store: Box<dyn SessionStore>,
    adjudicator: Box<dyn Adjudicator>,
    rules: Rules,
    rng: SmallRng,
}

impl Engine {
    pub fn new(store: Box<dyn SessionStore>, adjudicator: Box<dyn Adjudicator>, rules: Rules) -> Self {
        Engine {
            store,
            adjudicator,
            rules,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Like [`Engine::new`] with reproducible nation draws.
    pub fn seeded(store: Box<dyn SessionStore>, adjudicator: Box<dyn Adjudicator>, rules: Rules, seed: u64) -> Self {
        Engine {
            rng: SmallRng::seed_from_u64(seed),
            ..Engine::new(store, adjudicator, rules)
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let store: Box<dyn SessionStore> = match &config.store_dir {
            Some(dir) => Box::new(JsonDirStore::open(dir)?),
            None => Box::new(MemoryStore::new()),
        };
        Ok(Engine::new(store, Box::new(config.adjudicator()), config.rules()))
    }

    pub fn game(&self, session: &str) -> Result<Option<Game>, EngineError> {
        Ok(self.store.get(session)?)
    }

    fn load(&self, session: &str) -> Result<Game, EngineError> {
        self.store
            .get(session)?
            .ok_or_else(|| EngineError::NoSession(session.to_string()))
    }

    /// Fails if `player` already sits in a session other than `session`.
    fn check_free(&self, session: &str, player: &str) -> Result<(), EngineError> {
        for id in self.store.ids()? {
            if id == session {
                continue;
            }
            if self.store.get(&id)?.is_some_and(|g| g.has_player(player)) {
                return Err(EngineError::InAnotherGame(id));
            }
        }
        Ok(())
    }

    /// Handles one request from `player` in `session`.
    pub fn handle(&mut self, session: &str, player: &str, command: Command) -> Result<Vec<Event>, EngineError> {
        let action = match command {
            Command::NewGame => return self.new_game(session, player),
            Command::Board => {
                let game = self.load(session)?;
                return Ok(vec![Event::Snapshot {
                    phase: game.phase,
                    date: game.date,
                    board: game.board,
                }]);
            }
            Command::Orders => {
                let game = self.load(session)?;
                let p = game.players.get(player).ok_or(GameError::Refused(Refusal::NotInGame))?;
                return Ok(vec![Event::Orders {
                    player: p.id.clone(),
                    orders: p.orders.clone(),
                }]);
            }
            Command::Prompt => return Ok(self.load(session)?.prompt(player)),
            Command::Act(action) => action,
        };

        let mut game = self.load(session)?;
        if action == Action::Join {
            self.check_free(session, player)?;
        }
        let mut events = game.apply(player, action, &mut self.rng)?;

        if game.phase == GamePhase::Adjudicating {
            // Keep the collected orders even if the solver takes the
            // process down with it.
            self.store.put(&game)?;
            events.extend(self.run_adjudication(&mut game));
        }

        if game.is_finished() {
            self.store.delete(session)?;
            log::info!("{session}: finished, removed from store");
        } else {
            self.store.put(&game)?;
        }
        Ok(events)
    }

    fn new_game(&mut self, session: &str, player: &str) -> Result<Vec<Event>, EngineError> {
        if self.store.get(session)?.is_some() {
            return Err(EngineError::SessionExists(session.to_string()));
        }
        self.check_free(session, player)?;
        let game = Game::new(session, self.rules, player);
        self.store.put(&game)?;
        log::info!("{session}: created by {player}");
        Ok(vec![
            Event::GameCreated { id: session.to_string() },
            Event::Joined {
                player: player.to_string(),
            },
        ])
    }

    fn run_adjudication(&self, game: &mut Game) -> Vec<Event> {
        let start = Instant::now();
        match game.adjudicate(self.adjudicator.as_ref()) {
            Ok(events) => {
                log::info!("{}: adjudicated in {:.1?}", game.id, start.elapsed());
                events
            }
            Err(e) => vec![Event::AdjudicationFailed { reason: e.to_string() }],
        }
    }
}
