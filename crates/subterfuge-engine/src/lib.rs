//! Subterfuge Engine -- a deterministic, time-reversible tick simulation.
//!
//! The engine owns a [`GameState`](subterfuge_state::state::GameState) and an
//! append-anywhere log of [`GameEvent`](event::GameEvent)s. The
//! [`TimeMachine`](time_machine::TimeMachine) moves the state to any tick by
//! applying events forward or reverting them backward, one tick at a time.
//! Same-tick events resolve in a fixed [`Priority`](priority::Priority) order.
//!
//! # Modules
//!
//! - [`config`]: injected balance constants and undo ordering.
//! - [`priority`]: the same-tick resolution table.
//! - [`event`]: the forward/backward contract and the closed event set.
//! - [`combat`]: shield and driller combat, outpost destruction, friendly
//!   arrival, and the unsupported specialist steal.
//! - [`production`]: recurring driller production and shield regeneration.
//! - [`command`]: player-issued commands with lazily decoded payloads.
//! - [`validator`]: read-only precondition checks.
//! - [`observer`]: tick-changed listeners.
//! - [`time_machine`]: the scheduler.
//! - [`replay`]: session recording and deterministic replay.
//!
//! # Quick Start
//!
//! ```
//! use subterfuge_engine::prelude::*;
//!
//! let mut state = GameState::new();
//! state.add_player(Player::new(PlayerId(1), "alice")).unwrap();
//! state.add_player(Player::new(PlayerId(2), "bob")).unwrap();
//! let a = EntityId::new(1);
//! let b = EntityId::new(2);
//! state
//!     .add_outpost(Outpost::new(a, Some(PlayerId(1))).with_drillers(10).with_shields(10, 3))
//!     .unwrap();
//! state
//!     .add_outpost(Outpost::new(b, Some(PlayerId(2))).with_drillers(4))
//!     .unwrap();
//!
//! let mut tm = TimeMachine::new(state, SimConfig::default()).unwrap();
//! tm.add_event(GameEvent::shield_combat(
//!     Tick::new(2),
//!     CombatantId::Outpost(a),
//!     CombatantId::Outpost(b),
//! ))
//! .unwrap();
//!
//! let before = tm.state_hash();
//! tm.advance(2);
//! assert_eq!(tm.state().outpost(a).unwrap().shield_manager().shields(), 0);
//! tm.rewind(2);
//! assert_eq!(tm.state_hash(), before);
//! ```

#![deny(unsafe_code)]

pub mod combat;
pub mod command;
pub mod config;
pub mod event;
pub mod observer;
pub mod priority;
pub mod production;
pub mod replay;
pub mod time_machine;
pub mod validator;

pub use subterfuge_state;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use subterfuge_state::prelude::*;

    pub use crate::combat::{
        DrillerCombat, FriendlyArrival, OutpostDestruction, ShieldCombat, SpecialistSteal,
    };
    pub use crate::command::{CommandMeta, CommandPayload, PlayerCommand};
    pub use crate::config::{ConfigError, SimConfig, UndoOrder};
    pub use crate::event::{EventAction, EventError, EventId, EventKind, GameEvent};
    pub use crate::observer::{Direction, ListenerHandle, TickChanged};
    pub use crate::priority::Priority;
    pub use crate::production::{Production, Resource, ResourceProducer};
    pub use crate::replay::{replay, ReplayLog, ReplayRecorder, ReplayResult};
    pub use crate::time_machine::{
        EventPhase, GotoSummary, ScheduledEvent, TickReport, TimeMachine, TimeMachineError,
    };
    pub use crate::validator::ValidationError;
}
