//! The event contract and the closed set of event kinds.
//!
//! Every state change in a game is an event scheduled at a [`Tick`]. An event
//! knows how to apply itself (`forward`) and how to undo exactly what it
//! applied (`backward`). Undo information lives inside the event instance:
//! `forward` captures whatever pre-state it needs before mutating, and
//! `backward` consumes that record instead of recomputing from current state.
//!
//! Kinds are a closed enum, [`EventKind`], dispatched through the
//! [`EventAction`] trait. [`GameEvent`] pairs a kind with its tick and the
//! success flag of its most recent forward action.
//!
//! Events serialize to JSON (for replay logs) without their undo records: a
//! deserialized event is always in the "never applied" state.

use serde::{Deserialize, Serialize};
use std::fmt;

use subterfuge_state::prelude::*;

use crate::combat::{DrillerCombat, FriendlyArrival, OutpostDestruction, ShieldCombat, SpecialistSteal};
use crate::command::PlayerCommand;
use crate::config::SimConfig;
use crate::priority::Priority;
use crate::production::Production;

// ---------------------------------------------------------------------------
// EventId
// ---------------------------------------------------------------------------

/// Handle to an event in the [`TimeMachine`](crate::time_machine::TimeMachine)
/// log. Ids are assigned in submission order and double as the same-tick,
/// same-priority tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EventError
// ---------------------------------------------------------------------------

/// Failures that are not ordinary validation rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The event kind has no defined behavior yet.
    #[error("{operation} is not supported")]
    Unsupported { operation: &'static str },
}

// ---------------------------------------------------------------------------
// EventAction
// ---------------------------------------------------------------------------

/// Apply/undo behavior shared by every event kind.
///
/// `forward` returns `Ok(true)` when it changed the state and `Ok(false)` when
/// a precondition failed; in the latter case it must not have mutated
/// anything. `backward` returns `Ok(false)` when there is nothing to undo.
pub trait EventAction {
    /// Same-tick resolution bucket.
    fn priority(&self) -> Priority;

    /// Short stable name used in logs.
    fn name(&self) -> &'static str;

    fn forward(&mut self, state: &mut GameState, config: &SimConfig) -> Result<bool, EventError>;

    fn backward(&mut self, state: &mut GameState, config: &SimConfig) -> Result<bool, EventError>;
}

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// Every kind of event the engine knows how to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    ShieldCombat(ShieldCombat),
    DrillerCombat(DrillerCombat),
    SpecialistSteal(SpecialistSteal),
    OutpostDestruction(OutpostDestruction),
    FriendlyArrival(FriendlyArrival),
    Production(Production),
    PlayerCommand(PlayerCommand),
}

impl EventKind {
    pub fn action(&self) -> &dyn EventAction {
        match self {
            EventKind::ShieldCombat(e) => e,
            EventKind::DrillerCombat(e) => e,
            EventKind::SpecialistSteal(e) => e,
            EventKind::OutpostDestruction(e) => e,
            EventKind::FriendlyArrival(e) => e,
            EventKind::Production(e) => e,
            EventKind::PlayerCommand(e) => e,
        }
    }

    pub fn action_mut(&mut self) -> &mut dyn EventAction {
        match self {
            EventKind::ShieldCombat(e) => e,
            EventKind::DrillerCombat(e) => e,
            EventKind::SpecialistSteal(e) => e,
            EventKind::OutpostDestruction(e) => e,
            EventKind::FriendlyArrival(e) => e,
            EventKind::Production(e) => e,
            EventKind::PlayerCommand(e) => e,
        }
    }
}

macro_rules! impl_from_kind {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for EventKind {
                fn from(event: $variant) -> Self {
                    EventKind::$variant(event)
                }
            }
        )*
    };
}

impl_from_kind!(
    ShieldCombat,
    DrillerCombat,
    SpecialistSteal,
    OutpostDestruction,
    FriendlyArrival,
    Production,
    PlayerCommand,
);

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// An event kind scheduled at a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    occurs_at: Tick,
    kind: EventKind,
    #[serde(skip)]
    success: bool,
}

impl GameEvent {
    pub fn new(occurs_at: Tick, kind: impl Into<EventKind>) -> Self {
        Self {
            occurs_at,
            kind: kind.into(),
            success: false,
        }
    }

    pub fn shield_combat(occurs_at: Tick, first: CombatantId, second: CombatantId) -> Self {
        Self::new(occurs_at, ShieldCombat::new(first, second))
    }

    pub fn driller_combat(occurs_at: Tick, first: CombatantId, second: CombatantId) -> Self {
        Self::new(occurs_at, DrillerCombat::new(first, second))
    }

    pub fn specialist_steal(occurs_at: Tick, thief: CombatantId, victim: CombatantId) -> Self {
        Self::new(occurs_at, SpecialistSteal::new(thief, victim))
    }

    pub fn outpost_destruction(occurs_at: Tick, outpost: EntityId) -> Self {
        Self::new(occurs_at, OutpostDestruction::new(outpost))
    }

    pub fn friendly_arrival(occurs_at: Tick, sub: EntityId, outpost: EntityId) -> Self {
        Self::new(occurs_at, FriendlyArrival::new(sub, outpost))
    }

    /// Schedule a player command at the tick named in its metadata.
    pub fn player_command(command: PlayerCommand) -> Self {
        Self::new(command.meta().occurs_at, command)
    }

    pub fn occurs_at(&self) -> Tick {
        self.occurs_at
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn priority(&self) -> Priority {
        self.kind.action().priority()
    }

    pub fn name(&self) -> &'static str {
        self.kind.action().name()
    }

    /// Outcome of the most recent forward action. `false` before the first.
    pub fn was_successful(&self) -> bool {
        self.success
    }

    /// Apply the event and record whether it succeeded.
    pub fn forward(&mut self, state: &mut GameState, config: &SimConfig) -> Result<bool, EventError> {
        let result = self.kind.action_mut().forward(state, config);
        self.success = matches!(result, Ok(true));
        result
    }

    /// Undo the most recent successful forward action.
    pub fn backward(&mut self, state: &mut GameState, config: &SimConfig) -> Result<bool, EventError> {
        self.kind.action_mut().backward(state, config)
    }
}
