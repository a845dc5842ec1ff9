//! Subterfuge State -- entities, components, and the authoritative game state.
//!
//! This crate holds the data the simulation engine mutates. An entity is an
//! identity plus a fixed set of attribute components ([`DrillerCarrier`],
//! [`ShieldManager`], [`SpecialistManager`]); outposts and subs are the two
//! entity kinds, and both implement the [`Combatant`] capability trait so that
//! combat and validation code can treat them uniformly.
//!
//! # Quick Start
//!
//! ```
//! use subterfuge_state::prelude::*;
//!
//! let mut state = GameState::new();
//! state.add_player(Player::new(PlayerId(1), "alice")).unwrap();
//! state
//!     .add_outpost(
//!         Outpost::new(EntityId::new(1), Some(PlayerId(1)))
//!             .with_drillers(40)
//!             .with_shields(10, 10)
//!             .with_driller_capacity(100),
//!     )
//!     .unwrap();
//!
//! assert!(state.outpost_exists(EntityId::new(1)));
//! assert_eq!(state.extra_driller_capacity(PlayerId(1)), 60);
//! ```
//!
//! [`DrillerCarrier`]: component::DrillerCarrier
//! [`ShieldManager`]: component::ShieldManager
//! [`SpecialistManager`]: component::SpecialistManager
//! [`Combatant`]: entity::Combatant

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod id;
pub mod player;
pub mod snapshot;
pub mod specialist;
pub mod state;
pub mod tick;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while building or restoring game state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// An outpost or sub with this id is already registered.
    #[error("entity {entity} is already registered")]
    DuplicateEntity { entity: id::EntityId },

    /// A player with this id is already registered.
    #[error("{player} is already registered")]
    DuplicatePlayer { player: id::PlayerId },

    /// A specialist roster has no free slot.
    #[error("specialist roster is full (capacity {capacity})")]
    RosterFull { capacity: usize },

    /// A snapshot's recorded hash does not match its contents.
    #[error(
        "snapshot hash mismatch: recorded {recorded} but recomputed {recomputed}. \
         The snapshot may be corrupted or tampered with."
    )]
    SnapshotHashMismatch { recorded: String, recomputed: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{DrillerCarrier, ShieldManager, SpecialistManager};
    pub use crate::entity::{Combatant, CombatantId, EntityKind, Outpost, Sub};
    pub use crate::id::{EntityId, PlayerId, SpecialistId};
    pub use crate::player::Player;
    pub use crate::snapshot::StateSnapshot;
    pub use crate::specialist::{Specialist, SpecialistPool};
    pub use crate::state::GameState;
    pub use crate::tick::Tick;
    pub use crate::StateError;
}
