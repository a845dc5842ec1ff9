//! Entity kinds and the [`Combatant`] capability.
//!
//! Outposts and subs are plain structs that own their three attribute
//! components by composition. Algorithms that work on "anything that can
//! fight" (combat, validation) go through the [`Combatant`] trait and address
//! entities with a [`CombatantId`], which names both the kind and the id so
//! that lookups are checked against the right registry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::component::{DrillerCarrier, ShieldManager, SpecialistManager};
use crate::id::{EntityId, PlayerId};
use crate::specialist::Specialist;
use crate::tick::Tick;

// ---------------------------------------------------------------------------
// EntityKind / CombatantId
// ---------------------------------------------------------------------------

/// The concrete kind of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Stationary.
    Outpost,
    /// Mobile, travelling between two outposts.
    Sub,
}

/// A kind-tagged reference to an entity that can take part in combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CombatantId {
    Outpost(EntityId),
    Sub(EntityId),
}

impl CombatantId {
    pub fn entity_id(self) -> EntityId {
        match self {
            CombatantId::Outpost(id) | CombatantId::Sub(id) => id,
        }
    }

    pub fn kind(self) -> EntityKind {
        match self {
            CombatantId::Outpost(_) => EntityKind::Outpost,
            CombatantId::Sub(_) => EntityKind::Sub,
        }
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombatantId::Outpost(id) => write!(f, "outpost {id}"),
            CombatantId::Sub(id) => write!(f, "sub {id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Combatant
// ---------------------------------------------------------------------------

/// Typed access to the components every fighting entity carries.
///
/// Every entity kind in the game implements all accessors, so asking an
/// outpost or a sub for its shields can never fail at runtime.
pub trait Combatant {
    fn id(&self) -> EntityId;
    fn kind(&self) -> EntityKind;
    fn driller_carrier(&self) -> &DrillerCarrier;
    fn driller_carrier_mut(&mut self) -> &mut DrillerCarrier;
    fn shield_manager(&self) -> &ShieldManager;
    fn shield_manager_mut(&mut self) -> &mut ShieldManager;
    fn specialist_manager(&self) -> &SpecialistManager;
    fn specialist_manager_mut(&mut self) -> &mut SpecialistManager;

    /// The owning player, or `None` for neutral entities.
    fn owner(&self) -> Option<PlayerId> {
        self.driller_carrier().owner()
    }

    /// The kind-tagged id of this entity.
    fn combatant_id(&self) -> CombatantId {
        match self.kind() {
            EntityKind::Outpost => CombatantId::Outpost(self.id()),
            EntityKind::Sub => CombatantId::Sub(self.id()),
        }
    }
}

macro_rules! impl_combatant {
    ($ty:ty, $kind:expr) => {
        impl Combatant for $ty {
            fn id(&self) -> EntityId {
                self.id
            }
            fn kind(&self) -> EntityKind {
                $kind
            }
            fn driller_carrier(&self) -> &DrillerCarrier {
                &self.drillers
            }
            fn driller_carrier_mut(&mut self) -> &mut DrillerCarrier {
                &mut self.drillers
            }
            fn shield_manager(&self) -> &ShieldManager {
                &self.shields
            }
            fn shield_manager_mut(&mut self) -> &mut ShieldManager {
                &mut self.shields
            }
            fn specialist_manager(&self) -> &SpecialistManager {
                &self.specialists
            }
            fn specialist_manager_mut(&mut self) -> &mut SpecialistManager {
                &mut self.specialists
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Outpost
// ---------------------------------------------------------------------------

/// A stationary entity.
///
/// Built with [`Outpost::new`] and the `with_*` builder methods; the defaults
/// are an empty, shieldless outpost with no specialist slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outpost {
    id: EntityId,
    name: String,
    /// How many drillers this outpost adds to its owner's total capacity.
    driller_capacity: i32,
    drillers: DrillerCarrier,
    shields: ShieldManager,
    specialists: SpecialistManager,
}

impl Outpost {
    pub fn new(id: EntityId, owner: Option<PlayerId>) -> Self {
        Self {
            id,
            name: String::new(),
            driller_capacity: 0,
            drillers: DrillerCarrier::new(0, owner),
            shields: ShieldManager::new(0),
            specialists: SpecialistManager::new(0),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    pub fn with_drillers(mut self, drillers: i32) -> Self {
        self.drillers.set_drillers(drillers);
        self
    }

    pub fn with_driller_capacity(mut self, capacity: i32) -> Self {
        self.driller_capacity = capacity;
        self
    }

    pub fn with_shields(mut self, capacity: i32, shields: i32) -> Self {
        self.shields = ShieldManager::with_shields(capacity, shields);
        self
    }

    pub fn with_specialists(mut self, specialists: SpecialistManager) -> Self {
        self.specialists = specialists;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driller_capacity(&self) -> i32 {
        self.driller_capacity
    }
}

impl_combatant!(Outpost, EntityKind::Outpost);

// ---------------------------------------------------------------------------
// Sub
// ---------------------------------------------------------------------------

/// A mobile entity travelling from `origin` to `destination`.
///
/// Subs carry a shield component like every combatant, but with zero
/// capacity unless a specialist grants one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sub {
    id: EntityId,
    origin: EntityId,
    destination: EntityId,
    launched_at: Tick,
    drillers: DrillerCarrier,
    shields: ShieldManager,
    specialists: SpecialistManager,
}

impl Sub {
    pub fn new(
        id: EntityId,
        owner: Option<PlayerId>,
        origin: EntityId,
        destination: EntityId,
        launched_at: Tick,
    ) -> Self {
        Self {
            id,
            origin,
            destination,
            launched_at,
            drillers: DrillerCarrier::new(0, owner),
            shields: ShieldManager::new(0),
            specialists: SpecialistManager::new(0),
        }
    }

    pub fn with_drillers(mut self, drillers: i32) -> Self {
        self.drillers.set_drillers(drillers);
        self
    }

    pub fn with_shields(mut self, capacity: i32, shields: i32) -> Self {
        self.shields = ShieldManager::with_shields(capacity, shields);
        self
    }

    /// Builder-style: carry `specialists` in a roster of `capacity` slots.
    pub fn with_specialists(mut self, capacity: usize, specialists: Vec<Specialist>) -> Self {
        self.specialists = SpecialistManager::from_parts(capacity, specialists);
        self
    }

    pub fn origin(&self) -> EntityId {
        self.origin
    }

    pub fn destination(&self) -> EntityId {
        self.destination
    }

    pub fn launched_at(&self) -> Tick {
        self.launched_at
    }
}

impl_combatant!(Sub, EntityKind::Sub);
