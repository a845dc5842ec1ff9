//! The attribute components every combatant carries.
//!
//! - [`DrillerCarrier`]: driller count, owner, destroyed flag.
//! - [`ShieldManager`]: shields clamped to `0..=capacity`, active flag.
//! - [`SpecialistManager`]: ordered, capacity-bounded specialist roster.
//!
//! Components are mutated only through their methods so that clamping and
//! capacity invariants hold after every write. The one exception is
//! [`SpecialistManager::from_parts`], which accepts whatever the map
//! collaborator (or a deserialized snapshot) hands over and leaves it to the
//! validator to reject.

use serde::{Deserialize, Serialize};

use crate::id::{PlayerId, SpecialistId};
use crate::specialist::Specialist;
use crate::StateError;

// ---------------------------------------------------------------------------
// DrillerCarrier
// ---------------------------------------------------------------------------

/// Driller count and ownership of an entity.
///
/// An absent owner marks the entity as neutral ("dormant"). The count is
/// signed so that corrupted input can be represented and rejected by the
/// validator rather than silently wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillerCarrier {
    drillers: i32,
    owner: Option<PlayerId>,
    destroyed: bool,
}

impl DrillerCarrier {
    pub fn new(drillers: i32, owner: Option<PlayerId>) -> Self {
        Self {
            drillers,
            owner,
            destroyed: false,
        }
    }

    pub fn drillers(&self) -> i32 {
        self.drillers
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    /// `true` if no player owns this entity.
    pub fn is_neutral(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn set_destroyed(&mut self, destroyed: bool) {
        self.destroyed = destroyed;
    }

    pub fn set_owner(&mut self, owner: Option<PlayerId>) {
        self.owner = owner;
    }

    /// Overwrite the driller count.
    pub fn set_drillers(&mut self, drillers: i32) {
        self.drillers = drillers;
    }

    /// Shift the driller count by `delta` (negative removes).
    pub fn alter_drillers(&mut self, delta: i32) {
        self.drillers = self.drillers.saturating_add(delta);
    }

    pub fn add_drillers(&mut self, amount: i32) {
        self.alter_drillers(amount);
    }

    pub fn remove_drillers(&mut self, amount: i32) {
        self.alter_drillers(amount.saturating_neg());
    }
}

// ---------------------------------------------------------------------------
// ShieldManager
// ---------------------------------------------------------------------------

/// A capacity-bounded shield buffer.
///
/// Invariant: `0 <= shields <= capacity` after every mutation. Out-of-range
/// writes are clamped, never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldManager {
    shields: i32,
    capacity: i32,
    active: bool,
}

impl ShieldManager {
    /// An active, empty shield with the given capacity (negative clamps to 0).
    pub fn new(capacity: i32) -> Self {
        Self {
            shields: 0,
            capacity: capacity.max(0),
            active: true,
        }
    }

    /// An active shield with the given capacity, pre-charged to `shields`
    /// (clamped).
    pub fn with_shields(capacity: i32, shields: i32) -> Self {
        let mut manager = Self::new(capacity);
        manager.set_shields(shields);
        manager
    }

    pub fn shields(&self) -> i32 {
        self.shields
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    /// Room left before the shield is full.
    pub fn remaining_capacity(&self) -> i32 {
        self.capacity - self.shields
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggle(&mut self) {
        self.active = !self.active;
    }

    pub fn set_shields(&mut self, shields: i32) {
        self.shields = shields.clamp(0, self.capacity);
    }

    /// Add up to `amount` shields. Returns how many were actually added.
    pub fn add_shields(&mut self, amount: i32) -> i32 {
        let before = self.shields;
        self.set_shields(before.saturating_add(amount));
        self.shields - before
    }

    /// Remove up to `amount` shields. Returns how many were actually removed.
    pub fn remove_shields(&mut self, amount: i32) -> i32 {
        let before = self.shields;
        self.set_shields(before.saturating_sub(amount));
        before - self.shields
    }

    /// Change the capacity (negative clamps to 0) and re-clamp the current
    /// shields to it.
    pub fn set_capacity(&mut self, capacity: i32) {
        self.capacity = capacity.max(0);
        self.set_shields(self.shields);
    }
}

// ---------------------------------------------------------------------------
// SpecialistManager
// ---------------------------------------------------------------------------

/// Ordered roster of hired specialists.
///
/// Insertion order is significant: it is the tie-break when several
/// specialists of equal priority act at the same location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistManager {
    specialists: Vec<Specialist>,
    capacity: usize,
}

impl SpecialistManager {
    /// An empty roster with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            specialists: Vec::new(),
            capacity,
        }
    }

    /// Build a roster without checking the capacity invariant.
    pub fn from_parts(capacity: usize, specialists: Vec<Specialist>) -> Self {
        Self {
            specialists,
            capacity,
        }
    }

    pub fn specialists(&self) -> &[Specialist] {
        &self.specialists
    }

    pub fn count(&self) -> usize {
        self.specialists.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `n` more specialists fit.
    pub fn has_room_for(&self, n: usize) -> bool {
        self.specialists.len().saturating_add(n) <= self.capacity
    }

    pub fn contains(&self, id: SpecialistId) -> bool {
        self.specialists.iter().any(|s| s.id == id)
    }

    /// Append a specialist.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::RosterFull`] (and leaves the roster unchanged) if
    /// the roster is already at capacity.
    pub fn add_specialist(&mut self, specialist: Specialist) -> Result<(), StateError> {
        if !self.has_room_for(1) {
            return Err(StateError::RosterFull {
                capacity: self.capacity,
            });
        }
        self.specialists.push(specialist);
        Ok(())
    }

    /// Append several specialists, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::RosterFull`] if they do not all fit.
    pub fn add_specialists(&mut self, specialists: Vec<Specialist>) -> Result<(), StateError> {
        if !self.has_room_for(specialists.len()) {
            return Err(StateError::RosterFull {
                capacity: self.capacity,
            });
        }
        self.specialists.extend(specialists);
        Ok(())
    }

    /// Remove a specialist by id, returning the index it occupied.
    pub fn remove_specialist(&mut self, id: SpecialistId) -> Option<(usize, Specialist)> {
        let index = self.specialists.iter().position(|s| s.id == id)?;
        Some((index, self.specialists.remove(index)))
    }

    /// Re-insert a specialist at a recorded index (clamped to the end).
    ///
    /// Used to undo a removal; capacity is not re-checked because the slot
    /// was occupied before.
    pub fn restore_at(&mut self, index: usize, specialist: Specialist) {
        let index = index.min(self.specialists.len());
        self.specialists.insert(index, specialist);
    }

    /// Remove all specialists, in order.
    pub fn take_all(&mut self) -> Vec<Specialist> {
        std::mem::take(&mut self.specialists)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
