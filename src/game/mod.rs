//! Turn-phase orchestration.
//!
//! A [`Game`] owns the board and the players of one session and walks them
//! through the phases:
//!
//! ```text
//! New -> ChoosingNations -> ChoosingYear -> Movement -> Adjudicating
//!     -> Retreat -> [Build] -> Movement -> ...
//! ```
//!
//! Player actions go through [`Game::apply`], which runs the action's
//! guards before touching any state. Once every player is ready in the
//! movement phase the game sits in `Adjudicating` until [`Game::adjudicate`]
//! succeeds or the adjudication is aborted.

pub mod guards;
pub mod player;
pub mod store;

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{
    parse_selection, Board, Coast, Location, Nation, Order, Territory, Unit, UnitKind, ALL_NATIONS,
};
use crate::builder::{BuildContext, BuilderError, Field, Hint, OrderBuilder};
use crate::resolve::build::{build_coasts, buildable_kinds};
use crate::resolve::{
    after_retreats, apply_adjustments, apply_verdicts, auto_disband, entitlement, movement, parse_year,
    resolve_retreats, victor, AdjudicationError, Adjudicator, AfterRetreats, Adjustment, Dislodged,
    Entitlement, GameDate, RetreatChoice, RetreatOptions, RetreatOutcome,
};

pub use guards::Refusal;
pub use player::{Adjusting, NationPick, Player, PlayerId};
pub use store::{JsonDirStore, MemoryStore, SessionStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    New,
    ChoosingNations,
    ChoosingYear,
    Movement,
    Adjudicating,
    Retreat,
    Build,
    Finished,
}

/// Per-game limits, fixed when the game is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    pub min_players: usize,
    pub max_players: usize,
    pub victory_centers: usize,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            min_players: 2,
            max_players: ALL_NATIONS.len(),
            victory_centers: 18,
        }
    }
}

/// Something a player asks the game to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Join,
    Start,
    ChooseNation(NationPick),
    Year(String),
    /// Start building a new order.
    NewOrder,
    /// Free text: the answer to the open order field, or the orders to
    /// delete.
    Input(String),
    Delete(Option<String>),
    Ready,
    Unready,
    Retreat(String),
    Disband(Option<String>),
    Build(String),
    Undo,
    Retry,
    Abort,
    Close,
}

/// A well-formed action that breaks the rules of the game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("You already joined this game")]
    AlreadyJoined,

    #[error("The game is full")]
    GameFull,

    #[error("At least {0} players have to join before the game can start")]
    NotEnoughPlayers(usize),

    #[error("Wait your turn")]
    NotYourTurn,

    #[error("{0} has already been taken")]
    NationTaken(Nation),

    #[error("You have already sent orders to all of your units")]
    AllOrdered,

    #[error("You have no orders to delete")]
    NoOrders,

    #[error("You have no retreats left to choose")]
    NoRetreatPending,

    #[error("{from} can't retreat to {to}")]
    CantRetreat { from: Territory, to: Territory },

    #[error("You still have retreats to choose")]
    RetreatsPending,

    #[error("On which coast of {0}?")]
    CoastNeeded(Territory),

    #[error("You have no adjustments of that kind to make")]
    NoAdjustments,

    #[error("You have no adjustments left")]
    NoneLeft,

    #[error("You can't build in {0}")]
    CantBuild(Territory),

    #[error("What kind of unit do you want to build in {0}?")]
    KindNeeded(Territory),

    #[error("A {kind} can't be built in {terr}")]
    WrongKind { terr: Territory, kind: UnitKind },

    #[error("You can't disband {0}")]
    CantDisband(Territory),

    #[error("You have to disband {0} more units")]
    DisbandsPending(usize),

    #[error("Nothing to undo")]
    NothingToUndo,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("{0}")]
    Refused(#[from] Refusal),

    #[error("{0}")]
    Rejected(#[from] Violation),

    #[error("Invalid input '{0}'")]
    InvalidInput(String),

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error("adjudication failed: {0}")]
    Adjudication(#[from] AdjudicationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderResult {
    pub nation: Nation,
    pub order: Order,
    pub succeeded: bool,
}

/// What the transport should tell the players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    GameCreated { id: String },
    Joined { player: PlayerId },
    ChooseNation { player: PlayerId, available: Vec<Nation> },
    NationChosen { player: PlayerId, pick: NationPick },
    NationsAssigned { nations: BTreeMap<PlayerId, Nation> },
    ChooseYear,
    AwaitingOrders { date: GameDate },
    OrderPrompt {
        player: PlayerId,
        order: String,
        field: Field,
        prompt: &'static str,
        hint: Hint,
    },
    /// The player's orders, numbered from 1 in this order.
    Orders { player: PlayerId, orders: Vec<Order> },
    ChooseDeletions { player: PlayerId, orders: Vec<Order> },
    Ready { player: PlayerId },
    Unready { player: PlayerId },
    Adjudicating { date: GameDate, orders: usize },
    AdjudicationFailed { reason: String },
    AdjudicationAborted,
    Resolved { date: GameDate, results: Vec<OrderResult> },
    Dislodged { territories: Vec<Territory> },
    NoRetreat { nation: Nation, from: Territory },
    RetreatPrompt {
        player: PlayerId,
        from: Territory,
        options: BTreeSet<Territory>,
    },
    RetreatsChosen {
        player: PlayerId,
        choices: Vec<(Territory, RetreatChoice)>,
    },
    Retreats { outcomes: Vec<RetreatOutcome> },
    CentersUpdated { changes: Vec<(Territory, Nation)> },
    Eliminated { player: PlayerId, nation: Nation },
    AdjustmentPrompt {
        player: PlayerId,
        entitlement: Entitlement,
        chosen: Vec<Adjustment>,
        open: BTreeSet<Territory>,
    },
    AutoDisbanded { nation: Nation, territories: Vec<Territory> },
    Adjusted { nation: Nation, adjustments: Vec<Adjustment> },
    Victory { nation: Nation, player: Option<PlayerId> },
    Closed,
    Snapshot {
        phase: GamePhase,
        date: GameDate,
        board: Board,
    },
}

/// A dislodged unit and the decision taken for it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetreatSlot {
    pub options: RetreatOptions,
    pub choice: Option<RetreatChoice>,
}

impl RetreatSlot {
    pub fn nation(&self) -> Nation {
        self.options.dislodged.unit.nation
    }

    pub fn from(&self) -> Territory {
        self.options.dislodged.from
    }

    /// Whether the owner gets to decide; forced disbands are preset.
    fn is_open(&self) -> bool {
        !self.options.is_forced()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub rules: Rules,
    pub phase: GamePhase,
    pub date: GameDate,
    pub board: Board,
    pub players: BTreeMap<PlayerId, Player>,
    /// Players still to pick a nation, in turn order.
    #[serde(default)]
    choosing: Vec<PlayerId>,
    #[serde(default)]
    retreats: Vec<RetreatSlot>,
    #[serde(default)]
    pub winner: Option<Nation>,
}

fn invalid(text: &str) -> GameError {
    GameError::InvalidInput(text.trim().to_string())
}

fn order_prompt(player: &Player, board: &Board) -> Option<Event> {
    let builder = player.builder.as_ref()?;
    let ctx = BuildContext {
        board,
        pending: &player.orders,
    };
    let field = builder.next_field();
    Some(Event::OrderPrompt {
        player: player.id.clone(),
        order: builder.to_string(),
        field,
        prompt: field.prompt(builder.kind()),
        hint: builder.hints(&ctx),
    })
}

fn orders_event(player: &Player) -> Event {
    Event::Orders {
        player: player.id.clone(),
        orders: player.orders.clone(),
    }
}

fn adjustment_prompt(player: &Player) -> Option<Event> {
    let a = player.adjusting.as_ref()?;
    Some(Event::AdjustmentPrompt {
        player: player.id.clone(),
        entitlement: a.entitlement.clone(),
        chosen: a.chosen.clone(),
        open: a.open(),
    })
}

/// Splits `Lon`, `StP fleet nc`, `Spa(SC)`, `Kie A` into a territory, an
/// optional unit kind, and an optional coast.
fn parse_build(text: &str) -> Option<(Territory, Option<UnitKind>, Option<Coast>)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    (1..=tokens.len()).rev().find_map(|n| {
        let loc: Location = tokens[..n].join(" ").parse().ok()?;
        let (mut kind, mut coast) = (None, loc.coast);
        for tok in &tokens[n..] {
            let repeated = match (UnitKind::parse(tok), Coast::parse(tok)) {
                (Some(k), _) => kind.replace(k).is_some(),
                (None, Some(c)) => coast.replace(c).is_some(),
                (None, None) => return None,
            };
            if repeated {
                return None;
            }
        }
        Some((loc.territory, kind, coast))
    })
}

impl Game {
    /// A new game in the opening position with `creator` as first player.
    pub fn new(id: impl Into<String>, rules: Rules, creator: &str) -> Game {
        let mut players = BTreeMap::new();
        players.insert(creator.to_string(), Player::new(creator));
        Game {
            id: id.into(),
            rules,
            phase: GamePhase::New,
            date: GameDate::spring(1901),
            board: Board::standard(),
            players,
            choosing: Vec::new(),
            retreats: Vec::new(),
            winner: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::Finished
    }

    pub fn has_player(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    /// Dislodged units of the current retreat phase.
    pub fn retreats(&self) -> &[RetreatSlot] {
        &self.retreats
    }

    pub fn player_of(&self, nation: Nation) -> Option<&Player> {
        self.players.values().find(|p| p.nation == Some(nation))
    }

    fn player_mut(&mut self, id: &str) -> Result<&mut Player, GameError> {
        self.players.get_mut(id).ok_or(GameError::Refused(Refusal::NotInGame))
    }

    fn nation_of(&self, id: &str) -> Result<Nation, GameError> {
        let p = self.players.get(id).ok_or(Refusal::NotInGame)?;
        p.nation.ok_or(GameError::Refused(Refusal::WrongPhase))
    }

    /// Applies one player action.
    ///
    /// Refused or invalid actions leave the game as it was.
    pub fn apply(&mut self, player: &str, action: Action, rng: &mut impl Rng) -> Result<Vec<Event>, GameError> {
        guards::check(&action, self, player)?;
        log::debug!("{}: {player} {action:?}", self.id);
        match action {
            Action::Join => self.join(player, rng),
            Action::Start => self.start(rng),
            Action::ChooseNation(pick) => self.choose_nation(player, pick, rng),
            Action::Year(text) => self.choose_year(&text),
            Action::NewOrder => self.new_order(player),
            Action::Input(text) => self.input(player, &text),
            Action::Delete(selection) => self.delete(player, selection.as_deref()),
            Action::Ready => self.ready(player),
            Action::Unready => {
                self.player_mut(player)?.ready = false;
                Ok(vec![Event::Unready {
                    player: player.to_string(),
                }])
            }
            Action::Retreat(text) => self.retreat(player, &text),
            Action::Disband(terr) => self.disband(player, terr.as_deref()),
            Action::Build(text) => self.build(player, &text),
            Action::Undo => self.undo(player),
            // The caller adjudicates again once the guards let it through.
            Action::Retry => Ok(Vec::new()),
            Action::Abort => Ok(self.abort()),
            Action::Close => {
                self.phase = GamePhase::Finished;
                log::info!("{}: closed by {player}", self.id);
                Ok(vec![Event::Closed])
            }
        }
    }

    /// What `player` is currently being asked, if anything.
    pub fn prompt(&self, player: &str) -> Vec<Event> {
        let Some(p) = self.players.get(player) else {
            return Vec::new();
        };
        match self.phase {
            GamePhase::ChoosingNations => self.nation_turn().into_iter().collect(),
            GamePhase::ChoosingYear => vec![Event::ChooseYear],
            GamePhase::Movement if p.deleting => vec![Event::ChooseDeletions {
                player: p.id.clone(),
                orders: p.orders.clone(),
            }],
            GamePhase::Movement => order_prompt(p, &self.board)
                .into_iter()
                .chain([orders_event(p)])
                .collect(),
            GamePhase::Retreat => p.nation.map(|n| self.retreat_progress(p, n)).unwrap_or_default(),
            GamePhase::Build => adjustment_prompt(p).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn join(&mut self, player: &str, rng: &mut impl Rng) -> Result<Vec<Event>, GameError> {
        if self.has_player(player) {
            return Err(Violation::AlreadyJoined.into());
        }
        if self.players.len() >= self.rules.max_players {
            return Err(Violation::GameFull.into());
        }
        self.players.insert(player.to_string(), Player::new(player));
        log::info!("{}: {player} joined ({} players)", self.id, self.players.len());
        let mut events = vec![Event::Joined {
            player: player.to_string(),
        }];
        if self.players.len() == self.rules.max_players {
            events.extend(self.start(rng)?);
        }
        Ok(events)
    }

    fn start(&mut self, rng: &mut impl Rng) -> Result<Vec<Event>, GameError> {
        if self.players.len() < self.rules.min_players {
            return Err(Violation::NotEnoughPlayers(self.rules.min_players).into());
        }
        let mut order: Vec<PlayerId> = self.players.keys().cloned().collect();
        order.shuffle(rng);
        self.choosing = order;
        self.phase = GamePhase::ChoosingNations;
        log::info!("{}: starting with {} players", self.id, self.players.len());
        Ok(self.nation_turn().into_iter().collect())
    }

    fn available_nations(&self) -> Vec<Nation> {
        ALL_NATIONS
            .into_iter()
            .filter(|n| {
                !self
                    .players
                    .values()
                    .any(|p| p.pick == Some(NationPick::Nation(*n)))
            })
            .collect()
    }

    fn nation_turn(&self) -> Option<Event> {
        self.choosing.first().map(|player| Event::ChooseNation {
            player: player.clone(),
            available: self.available_nations(),
        })
    }

    fn choose_nation(&mut self, player: &str, pick: NationPick, rng: &mut impl Rng) -> Result<Vec<Event>, GameError> {
        if self.choosing.first().map(String::as_str) != Some(player) {
            return Err(Violation::NotYourTurn.into());
        }
        if let NationPick::Nation(n) = pick {
            if !self.available_nations().contains(&n) {
                return Err(Violation::NationTaken(n).into());
            }
        }
        self.player_mut(player)?.pick = Some(pick);
        self.choosing.remove(0);

        let mut events = vec![Event::NationChosen {
            player: player.to_string(),
            pick,
        }];
        match self.nation_turn() {
            Some(next) => events.push(next),
            None => events.extend(self.assign_nations(rng)),
        }
        Ok(events)
    }

    /// Resolves `Random` picks from the nations nobody chose.
    fn assign_nations(&mut self, rng: &mut impl Rng) -> Vec<Event> {
        let mut free = self.available_nations();
        free.shuffle(rng);
        for p in self.players.values_mut() {
            p.nation = match p.pick {
                Some(NationPick::Nation(n)) => Some(n),
                _ => free.pop(),
            };
        }
        self.phase = GamePhase::ChoosingYear;
        let nations = self
            .players
            .values()
            .filter_map(|p| Some((p.id.clone(), p.nation?)))
            .collect();
        vec![Event::NationsAssigned { nations }, Event::ChooseYear]
    }

    fn choose_year(&mut self, text: &str) -> Result<Vec<Event>, GameError> {
        let year = parse_year(text).ok_or_else(|| invalid(text))?;
        self.date = GameDate::spring(year);
        log::info!("{}: the game begins in {}", self.id, self.date);
        Ok(self.begin_movement())
    }

    fn begin_movement(&mut self) -> Vec<Event> {
        self.phase = GamePhase::Movement;
        self.retreats.clear();
        for p in self.players.values_mut() {
            p.reset();
        }
        log::info!("{}: awaiting orders for {}", self.id, self.date);
        vec![Event::AwaitingOrders { date: self.date }]
    }

    fn new_order(&mut self, player: &str) -> Result<Vec<Event>, GameError> {
        let nation = self.nation_of(player)?;
        let p = self.players.get_mut(player).ok_or(Refusal::NotInGame)?;
        if p.unordered(&self.board).is_empty() {
            return Err(Violation::AllOrdered.into());
        }
        p.builder = Some(OrderBuilder::new(nation));
        Ok(order_prompt(p, &self.board).into_iter().collect())
    }

    fn input(&mut self, player: &str, text: &str) -> Result<Vec<Event>, GameError> {
        let p = self.players.get_mut(player).ok_or(Refusal::NotInGame)?;

        if let Some(mut builder) = p.builder.take() {
            let ctx = BuildContext {
                board: &self.board,
                pending: &p.orders,
            };
            let pushed = builder.push(text, &ctx);
            let finished = match pushed {
                // Backed out of the first field: the order is dropped.
                Err(BuilderError::AtStart) => return Ok(vec![orders_event(p)]),
                Err(e) => {
                    p.builder = Some(builder);
                    return Err(e.into());
                }
                Ok(Field::Done) => builder.finish(),
                Ok(_) => {
                    p.builder = Some(builder);
                    return Ok(order_prompt(p, &self.board).into_iter().collect());
                }
            };
            return match finished {
                Ok(orders) => {
                    log::debug!("{}: {player} ordered {}", self.id, builder);
                    p.add_orders(orders);
                    Ok(vec![orders_event(p)])
                }
                Err(e) => {
                    p.builder = Some(builder);
                    Err(e.into())
                }
            };
        }

        if p.deleting {
            if text.trim().eq_ignore_ascii_case("back") {
                p.deleting = false;
                return Ok(vec![orders_event(p)]);
            }
            Self::remove_orders(p, text)?;
            return Ok(vec![orders_event(p)]);
        }

        Err(Refusal::WrongPhase.into())
    }

    /// Removes the orders at the 1-based positions listed in `selection`.
    fn remove_orders(p: &mut Player, selection: &str) -> Result<(), GameError> {
        let chosen = parse_selection(selection, p.orders.len()).map_err(|_| invalid(selection))?;
        let mut index = 0;
        p.orders.retain(|_| {
            let keep = !chosen.contains(&index);
            index += 1;
            keep
        });
        p.deleting = false;
        Ok(())
    }

    fn delete(&mut self, player: &str, selection: Option<&str>) -> Result<Vec<Event>, GameError> {
        let p = self.player_mut(player)?;
        if p.orders.is_empty() {
            return Err(Violation::NoOrders.into());
        }
        match selection {
            Some(s) => {
                Self::remove_orders(p, s)?;
                Ok(vec![orders_event(p)])
            }
            None => {
                p.deleting = true;
                Ok(vec![Event::ChooseDeletions {
                    player: p.id.clone(),
                    orders: p.orders.clone(),
                }])
            }
        }
    }

    fn ready(&mut self, player: &str) -> Result<Vec<Event>, GameError> {
        match self.phase {
            GamePhase::Retreat => {
                let nation = self.nation_of(player)?;
                if self.next_retreat(nation).is_some() {
                    return Err(Violation::RetreatsPending.into());
                }
            }
            GamePhase::Build => {
                let pending = self
                    .players
                    .get(player)
                    .and_then(|p| p.adjusting.as_ref())
                    .filter(|a| a.is_disbanding())
                    .map_or(0, Adjusting::remaining);
                if pending > 0 {
                    return Err(Violation::DisbandsPending(pending).into());
                }
            }
            _ => {}
        }
        self.player_mut(player)?.ready = true;
        let mut events = vec![Event::Ready {
            player: player.to_string(),
        }];
        events.extend(self.advance_if_ready());
        Ok(events)
    }

    /// Moves to the next phase once every player is ready.
    fn advance_if_ready(&mut self) -> Vec<Event> {
        if !self.players.values().all(|p| p.ready) {
            return Vec::new();
        }
        match self.phase {
            GamePhase::Movement => {
                self.phase = GamePhase::Adjudicating;
                log::info!("{}: all orders in for {}", self.id, self.date);
                Vec::new()
            }
            GamePhase::Retreat => self.execute_retreats(),
            GamePhase::Build => self.execute_adjustments(),
            _ => Vec::new(),
        }
    }

    /// Every submitted order, grouped by nation.
    fn batch(&self) -> Vec<(Nation, Order)> {
        let mut players: Vec<&Player> = self.players.values().filter(|p| p.nation.is_some()).collect();
        players.sort_by_key(|p| p.nation);
        players
            .into_iter()
            .flat_map(|p| p.orders.iter().filter_map(move |o| Some((p.nation?, *o))))
            .collect()
    }

    /// Runs the solver on the collected orders and applies its verdicts.
    ///
    /// On failure nothing changes and the game stays in `Adjudicating`.
    pub fn adjudicate(&mut self, adjudicator: &dyn Adjudicator) -> Result<Vec<Event>, GameError> {
        if self.phase != GamePhase::Adjudicating {
            return Err(Refusal::WrongPhase.into());
        }
        let batch = self.batch();
        let orders: Vec<Order> = batch.iter().map(|(_, o)| *o).collect();
        log::info!("{}: adjudicating {} orders for {}", self.id, orders.len(), self.date);

        let verdicts = movement::adjudicate(adjudicator, &self.board, &orders).map_err(|e| {
            log::error!("{}: adjudication failed: {e}", self.id);
            e
        })?;

        let results = batch
            .iter()
            .zip(&verdicts.succeeded)
            .map(|((nation, order), ok)| OrderResult {
                nation: *nation,
                order: *order,
                succeeded: *ok,
            })
            .collect();
        let dislodged = apply_verdicts(&mut self.board, &orders, &verdicts);

        let mut events = vec![
            Event::Adjudicating {
                date: self.date,
                orders: orders.len(),
            },
            Event::Resolved {
                date: self.date,
                results,
            },
        ];
        events.extend(self.begin_retreats(dislodged));
        Ok(events)
    }

    fn abort(&mut self) -> Vec<Event> {
        self.phase = GamePhase::Movement;
        for p in self.players.values_mut() {
            p.ready = false;
        }
        log::warn!("{}: adjudication aborted, orders kept", self.id);
        vec![
            Event::AdjudicationAborted,
            Event::AwaitingOrders { date: self.date },
        ]
    }

    fn next_retreat(&self, nation: Nation) -> Option<usize> {
        self.retreats
            .iter()
            .position(|s| s.choice.is_none() && s.nation() == nation)
    }

    fn retreat_progress(&self, player: &Player, nation: Nation) -> Vec<Event> {
        if let Some(i) = self.next_retreat(nation) {
            let slot = &self.retreats[i];
            return vec![Event::RetreatPrompt {
                player: player.id.clone(),
                from: slot.from(),
                options: slot.options.options.clone(),
            }];
        }
        let choices: Vec<(Territory, RetreatChoice)> = self
            .retreats
            .iter()
            .filter(|s| s.nation() == nation && s.is_open())
            .filter_map(|s| Some((s.from(), s.choice?)))
            .collect();
        if choices.is_empty() {
            return Vec::new();
        }
        vec![Event::RetreatsChosen {
            player: player.id.clone(),
            choices,
        }]
    }

    fn begin_retreats(&mut self, dislodged: Vec<RetreatOptions>) -> Vec<Event> {
        self.phase = GamePhase::Retreat;
        let mut events = Vec::new();
        if !dislodged.is_empty() {
            events.push(Event::Dislodged {
                territories: dislodged.iter().map(|d| d.dislodged.from).collect(),
            });
        }

        let played: BTreeSet<Nation> = self.players.values().filter_map(|p| p.nation).collect();
        self.retreats = dislodged
            .into_iter()
            .map(|options| {
                let nation = options.dislodged.unit.nation;
                if options.is_forced() {
                    events.push(Event::NoRetreat {
                        nation,
                        from: options.dislodged.from,
                    });
                }
                let decided = options.is_forced() || !played.contains(&nation);
                RetreatSlot {
                    choice: decided.then_some(RetreatChoice::Disband),
                    options,
                }
            })
            .collect();

        let deciding: BTreeSet<Nation> = self
            .retreats
            .iter()
            .filter(|s| s.choice.is_none())
            .map(RetreatSlot::nation)
            .collect();
        for p in self.players.values_mut() {
            p.reset();
            p.ready = p.nation.map_or(true, |n| !deciding.contains(&n));
        }
        for p in self.players.values().filter(|p| !p.ready) {
            if let Some(n) = p.nation {
                events.extend(self.retreat_progress(p, n));
            }
        }

        events.extend(self.advance_if_ready());
        events
    }

    fn retreat(&mut self, player: &str, text: &str) -> Result<Vec<Event>, GameError> {
        let nation = self.nation_of(player)?;
        let i = self.next_retreat(nation).ok_or(Violation::NoRetreatPending)?;
        let to: Location = text.trim().parse().map_err(|_| invalid(text))?;

        let slot = &self.retreats[i];
        let from = slot.from();
        if !slot.options.options.contains(&to.territory) {
            return Err(Violation::CantRetreat {
                from,
                to: to.territory,
            }
            .into());
        }
        let coasts = slot.options.coasts_at(&self.board, to.territory);
        let needs_coast = slot.options.dislodged.unit.is_fleet() && to.territory.is_split();
        let coast = match (to.coast, coasts.as_slice()) {
            (_, []) if needs_coast => {
                return Err(Violation::CantRetreat {
                    from,
                    to: to.territory,
                }
                .into())
            }
            (_, []) => None,
            (None, [only]) => Some(*only),
            (None, _) => return Err(Violation::CoastNeeded(to.territory).into()),
            (Some(c), cs) if cs.contains(&c) => Some(c),
            (Some(_), _) => {
                return Err(Violation::CantRetreat {
                    from,
                    to: to.territory,
                }
                .into())
            }
        };
        self.retreats[i].choice = Some(RetreatChoice::To(to.territory.with_coast(coast)));
        self.retreat_events(player, nation)
    }

    fn retreat_events(&self, player: &str, nation: Nation) -> Result<Vec<Event>, GameError> {
        let p = self.players.get(player).ok_or(Refusal::NotInGame)?;
        Ok(self.retreat_progress(p, nation))
    }

    fn disband(&mut self, player: &str, terr: Option<&str>) -> Result<Vec<Event>, GameError> {
        let nation = self.nation_of(player)?;
        let terr = match terr {
            Some(s) => Some(Territory::parse(s).ok_or_else(|| invalid(s))?),
            None => None,
        };

        if self.phase == GamePhase::Retreat {
            let i = match terr {
                Some(t) => self
                    .retreats
                    .iter()
                    .position(|s| s.nation() == nation && s.from() == t && s.is_open())
                    .ok_or(Violation::CantDisband(t))?,
                None => self.next_retreat(nation).ok_or(Violation::NoRetreatPending)?,
            };
            self.retreats[i].choice = Some(RetreatChoice::Disband);
            return self.retreat_events(player, nation);
        }

        let t = terr.ok_or_else(|| invalid(""))?;
        let p = self.player_mut(player)?;
        let adjusting = p
            .adjusting
            .as_mut()
            .filter(|a| a.is_disbanding())
            .ok_or(Violation::NoAdjustments)?;
        if adjusting.remaining() == 0 {
            return Err(Violation::NoneLeft.into());
        }
        if !adjusting.open().contains(&t) {
            return Err(Violation::CantDisband(t).into());
        }
        adjusting.chosen.push(Adjustment::Disband { terr: t });
        Ok(adjustment_prompt(p).into_iter().collect())
    }

    fn build(&mut self, player: &str, text: &str) -> Result<Vec<Event>, GameError> {
        let nation = self.nation_of(player)?;
        let (terr, kind, coast) = parse_build(text).ok_or_else(|| invalid(text))?;
        let p = self.player_mut(player)?;
        let adjusting = p
            .adjusting
            .as_mut()
            .filter(|a| matches!(a.entitlement, Entitlement::Build { .. }))
            .ok_or(Violation::NoAdjustments)?;
        if adjusting.remaining() == 0 {
            return Err(Violation::NoneLeft.into());
        }
        if !adjusting.open().contains(&terr) {
            return Err(Violation::CantBuild(terr).into());
        }

        let kinds = buildable_kinds(terr);
        let kind = match (kind, kinds) {
            (Some(k), _) if kinds.contains(&k) => k,
            (Some(k), _) => return Err(Violation::WrongKind { terr, kind: k }.into()),
            (None, [only]) => *only,
            (None, _) if coast.is_some() && terr.is_split() => UnitKind::Fleet,
            (None, _) => return Err(Violation::KindNeeded(terr).into()),
        };
        let coast = match (kind, build_coasts(terr)) {
            (UnitKind::Fleet, coasts) if !coasts.is_empty() => match coast {
                Some(c) if coasts.contains(&c) => Some(c),
                Some(_) => return Err(invalid(text)),
                None => return Err(Violation::CoastNeeded(terr).into()),
            },
            _ => None,
        };
        adjusting.chosen.push(Adjustment::Build {
            terr,
            unit: Unit { nation, kind, coast },
        });
        Ok(adjustment_prompt(p).into_iter().collect())
    }

    fn undo(&mut self, player: &str) -> Result<Vec<Event>, GameError> {
        let nation = self.nation_of(player)?;
        if self.phase == GamePhase::Retreat {
            let slot = self
                .retreats
                .iter_mut()
                .rev()
                .find(|s| s.nation() == nation && s.is_open() && s.choice.is_some())
                .ok_or(Violation::NothingToUndo)?;
            slot.choice = None;
            return self.retreat_events(player, nation);
        }
        let p = self.player_mut(player)?;
        p.adjusting
            .as_mut()
            .and_then(|a| a.chosen.pop())
            .ok_or(Violation::NothingToUndo)?;
        Ok(adjustment_prompt(p).into_iter().collect())
    }

    fn execute_retreats(&mut self) -> Vec<Event> {
        let decisions: Vec<(Dislodged, RetreatChoice)> = self
            .retreats
            .drain(..)
            .map(|s| (s.options.dislodged, s.choice.unwrap_or(RetreatChoice::Disband)))
            .collect();
        let mut events = Vec::new();
        if !decisions.is_empty() {
            let outcomes = resolve_retreats(&mut self.board, &decisions);
            log::info!("{}: {} retreats resolved", self.id, outcomes.len());
            events.push(Event::Retreats { outcomes });
        }
        match after_retreats(self.date.season) {
            AfterRetreats::Movement => {
                self.date = self.date.next();
                events.extend(self.begin_movement());
            }
            AfterRetreats::Adjustments => events.extend(self.begin_adjustments()),
        }
        events
    }

    /// Ends the game if someone has won.
    fn check_victory(&mut self) -> Option<Event> {
        let survivors: Vec<Nation> = self.players.values().filter_map(|p| p.nation).collect();
        let nation = victor(&self.board, &survivors, self.rules.victory_centers)?;
        self.phase = GamePhase::Finished;
        self.winner = Some(nation);
        let player = self.player_of(nation).map(|p| p.id.clone());
        log::info!("{}: {nation} wins", self.id);
        Some(Event::Victory { nation, player })
    }

    fn begin_adjustments(&mut self) -> Vec<Event> {
        self.phase = GamePhase::Build;
        let changes = self.board.update_centers();
        log::info!("{}: supply centers updated, {} changed hands", self.id, changes.len());
        let mut events = vec![Event::CentersUpdated { changes }];
        if let Some(victory) = self.check_victory() {
            events.push(victory);
            return events;
        }

        for nation in ALL_NATIONS {
            let owner = self.player_of(nation).map(|p| p.id.clone());
            let Some(id) = owner else {
                // Nobody plays this nation: surplus units go automatically.
                if let Entitlement::Disband { count, .. } = entitlement(&self.board, nation) {
                    let gone = auto_disband(&self.board, nation, count);
                    let disbands: Vec<Adjustment> = gone.iter().map(|t| Adjustment::Disband { terr: *t }).collect();
                    apply_adjustments(&mut self.board, nation, &disbands);
                    log::info!("{}: {nation} loses {count} units in civil disorder", self.id);
                    events.push(Event::AutoDisbanded {
                        nation,
                        territories: gone,
                    });
                }
                continue;
            };

            if self.board.center_count(nation) == 0 {
                self.board.remove_nation(nation);
                self.players.remove(&id);
                log::info!("{}: {nation} ({id}) eliminated", self.id);
                events.push(Event::Eliminated { player: id, nation });
                if let Some(victory) = self.check_victory() {
                    events.push(victory);
                    return events;
                }
                continue;
            }

            let entitlement = entitlement(&self.board, nation);
            if let Some(p) = self.players.get_mut(&id) {
                p.reset();
                p.ready = entitlement.count() == 0;
                p.adjusting = Some(Adjusting {
                    entitlement,
                    chosen: Vec::new(),
                });
                if !p.ready {
                    events.extend(adjustment_prompt(p));
                }
            }
        }

        events.extend(self.advance_if_ready());
        events
    }

    fn execute_adjustments(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let chosen: Vec<(Nation, Vec<Adjustment>)> = self
            .players
            .values_mut()
            .filter_map(|p| Some((p.nation?, p.adjusting.take()?.chosen)))
            .filter(|(_, adjustments)| !adjustments.is_empty())
            .collect();
        for (nation, adjustments) in chosen {
            apply_adjustments(&mut self.board, nation, &adjustments);
            log::info!("{}: {nation} made {} adjustments", self.id, adjustments.len());
            events.push(Event::Adjusted { nation, adjustments });
        }
        self.date = self.date.next();
        events.extend(self.begin_movement());
        events
    }
}
