//! Preconditions checked before an action reaches the game.
//!
//! Every action has an ordered list of guards; the first one that fails
//! decides the refusal the player sees.

use serde::Serialize;
use thiserror::Error;

use super::{Action, Game, GamePhase};

/// Why an action was refused before it was looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum Refusal {
    #[error("You need to join a game to use this command")]
    NotInGame,

    #[error("You can't use this command right now")]
    WrongPhase,

    #[error("You have already committed your orders. Withdraw with unready")]
    AlreadyReady,

    #[error("You have not committed your orders yet")]
    NotReady,

    #[error("You have an order to complete first")]
    OrderInProgress,

    #[error("You have to tell me what orders to delete first (type back to abort)")]
    Deleting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Member,
    Phase(&'static [GamePhase]),
    NotReady,
    Ready,
    NoOrderInProgress,
    NotDeleting,
}

const NEW: &[GamePhase] = &[GamePhase::New];
const CHOOSING_NATIONS: &[GamePhase] = &[GamePhase::ChoosingNations];
const CHOOSING_YEAR: &[GamePhase] = &[GamePhase::ChoosingYear];
const MOVEMENT: &[GamePhase] = &[GamePhase::Movement];
const ADJUDICATING: &[GamePhase] = &[GamePhase::Adjudicating];
const RETREAT: &[GamePhase] = &[GamePhase::Retreat];
const BUILD: &[GamePhase] = &[GamePhase::Build];
const ADJUSTING: &[GamePhase] = &[GamePhase::Retreat, GamePhase::Build];
const COLLECTING: &[GamePhase] = &[GamePhase::Movement, GamePhase::Retreat, GamePhase::Build];

const ORDERING: &[Guard] = &[
    Guard::Member,
    Guard::Phase(MOVEMENT),
    Guard::NotReady,
    Guard::NoOrderInProgress,
    Guard::NotDeleting,
];

/// The guards for `action`, in evaluation order.
pub fn guards_for(action: &Action) -> &'static [Guard] {
    match action {
        Action::Join => &[Guard::Phase(NEW)],
        Action::Start => &[Guard::Member, Guard::Phase(NEW)],
        Action::ChooseNation(_) => &[Guard::Member, Guard::Phase(CHOOSING_NATIONS)],
        Action::Year(_) => &[Guard::Member, Guard::Phase(CHOOSING_YEAR)],
        Action::NewOrder | Action::Delete(_) => ORDERING,
        Action::Input(_) => &[Guard::Member, Guard::Phase(MOVEMENT), Guard::NotReady],
        Action::Ready => &[
            Guard::Member,
            Guard::Phase(COLLECTING),
            Guard::NotReady,
            Guard::NoOrderInProgress,
            Guard::NotDeleting,
        ],
        Action::Unready => &[Guard::Member, Guard::Phase(COLLECTING), Guard::Ready],
        Action::Retreat(_) => &[Guard::Member, Guard::Phase(RETREAT), Guard::NotReady],
        Action::Build(_) => &[Guard::Member, Guard::Phase(BUILD), Guard::NotReady],
        Action::Disband(_) | Action::Undo => &[Guard::Member, Guard::Phase(ADJUSTING), Guard::NotReady],
        Action::Retry | Action::Abort => &[Guard::Member, Guard::Phase(ADJUDICATING)],
        Action::Close => &[Guard::Member],
    }
}

impl Guard {
    fn check(self, game: &Game, player: &str) -> Result<(), Refusal> {
        let p = game.players.get(player);
        let ok = match self {
            Guard::Member => p.is_some(),
            Guard::Phase(phases) => phases.contains(&game.phase),
            Guard::NotReady => p.map_or(true, |p| !p.ready),
            Guard::Ready => p.map_or(true, |p| p.ready),
            Guard::NoOrderInProgress => p.map_or(true, |p| p.builder.is_none()),
            Guard::NotDeleting => p.map_or(true, |p| !p.deleting),
        };
        if ok {
            return Ok(());
        }
        Err(match self {
            Guard::Member => Refusal::NotInGame,
            Guard::Phase(_) => Refusal::WrongPhase,
            Guard::NotReady => Refusal::AlreadyReady,
            Guard::Ready => Refusal::NotReady,
            Guard::NoOrderInProgress => Refusal::OrderInProgress,
            Guard::NotDeleting => Refusal::Deleting,
        })
    }
}

/// Runs the guards for `action` in order.
pub fn check(action: &Action, game: &Game, player: &str) -> Result<(), Refusal> {
    guards_for(action)
        .iter()
        .try_for_each(|g| g.check(game, player))
}
