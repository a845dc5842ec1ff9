//! The authoritative game state at the current tick.
//!
//! [`GameState`] owns every entity ever registered, plus the sets that say
//! which of them are currently *live*. Entities are never deleted while the
//! game can still rewind over them: an absorbed sub moves from the live set to
//! the absorbed set, a destroyed outpost moves to the destroyed set, and
//! backward replay moves them back.
//!
//! All collections are `BTreeMap`/`BTreeSet` so iteration and serialization
//! order are deterministic, which the state hash depends on.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::entity::{Combatant, CombatantId, Outpost, Sub};
use crate::id::{EntityId, PlayerId};
use crate::player::Player;
use crate::tick::Tick;
use crate::StateError;

/// Snapshot of all live entities and players at [`current_tick`](Self::current_tick).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    current_tick: Tick,
    players: BTreeMap<PlayerId, Player>,
    outposts: BTreeMap<EntityId, Outpost>,
    live_outposts: BTreeSet<EntityId>,
    destroyed_outposts: BTreeSet<EntityId>,
    subs: BTreeMap<EntityId, Sub>,
    live_subs: BTreeSet<EntityId>,
    absorbed_subs: BTreeSet<EntityId>,
}

impl GameState {
    /// An empty state at the epoch.
    pub fn new() -> Self {
        Self::default()
    }

    // -- setup --------------------------------------------------------------

    /// Register a player.
    ///
    /// # Errors
    ///
    /// [`StateError::DuplicatePlayer`] if the id is already taken.
    pub fn add_player(&mut self, player: Player) -> Result<(), StateError> {
        let id = player.id();
        if self.players.contains_key(&id) {
            return Err(StateError::DuplicatePlayer { player: id });
        }
        self.players.insert(id, player);
        Ok(())
    }

    /// Register a live outpost.
    ///
    /// # Errors
    ///
    /// [`StateError::DuplicateEntity`] if any entity already uses the id.
    pub fn add_outpost(&mut self, outpost: Outpost) -> Result<(), StateError> {
        let id = outpost.id();
        self.ensure_unregistered(id)?;
        self.live_outposts.insert(id);
        self.outposts.insert(id, outpost);
        Ok(())
    }

    /// Register a live sub.
    ///
    /// # Errors
    ///
    /// [`StateError::DuplicateEntity`] if any entity already uses the id.
    pub fn insert_sub(&mut self, sub: Sub) -> Result<(), StateError> {
        let id = sub.id();
        self.ensure_unregistered(id)?;
        self.live_subs.insert(id);
        self.subs.insert(id, sub);
        Ok(())
    }

    /// Forget a sub entirely, whichever collection it is in.
    ///
    /// Only correct for undoing the event that created the sub; every other
    /// removal goes through [`remove_sub`](Self::remove_sub).
    pub fn unregister_sub(&mut self, id: EntityId) -> Option<Sub> {
        self.live_subs.remove(&id);
        self.absorbed_subs.remove(&id);
        self.subs.remove(&id)
    }

    fn ensure_unregistered(&self, id: EntityId) -> Result<(), StateError> {
        if self.is_registered(id) {
            return Err(StateError::DuplicateEntity { entity: id });
        }
        Ok(())
    }

    // -- time ---------------------------------------------------------------

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Move the state's clock. Only the time machine should call this.
    pub fn set_current_tick(&mut self, tick: Tick) {
        self.current_tick = tick;
    }

    // -- existence ----------------------------------------------------------

    /// Whether any outpost or sub, live or not, uses `id`.
    pub fn is_registered(&self, id: EntityId) -> bool {
        self.outposts.contains_key(&id) || self.subs.contains_key(&id)
    }

    /// Whether `id` is a live outpost.
    pub fn outpost_exists(&self, id: EntityId) -> bool {
        self.live_outposts.contains(&id)
    }

    /// Whether `id` is a live sub.
    pub fn sub_exists(&self, id: EntityId) -> bool {
        self.live_subs.contains(&id)
    }

    pub fn player_exists(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Whether the combatant is live in the collection its kind says.
    pub fn combatant_exists(&self, id: CombatantId) -> bool {
        match id {
            CombatantId::Outpost(e) => self.outpost_exists(e),
            CombatantId::Sub(e) => self.sub_exists(e),
        }
    }

    // -- lookup -------------------------------------------------------------

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Registry lookup; also finds destroyed outposts.
    pub fn outpost(&self, id: EntityId) -> Option<&Outpost> {
        self.outposts.get(&id)
    }

    pub fn outpost_mut(&mut self, id: EntityId) -> Option<&mut Outpost> {
        self.outposts.get_mut(&id)
    }

    /// Registry lookup; also finds absorbed subs.
    pub fn sub(&self, id: EntityId) -> Option<&Sub> {
        self.subs.get(&id)
    }

    pub fn sub_mut(&mut self, id: EntityId) -> Option<&mut Sub> {
        self.subs.get_mut(&id)
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&dyn Combatant> {
        match id {
            CombatantId::Outpost(e) => self.outposts.get(&e).map(|o| o as &dyn Combatant),
            CombatantId::Sub(e) => self.subs.get(&e).map(|s| s as &dyn Combatant),
        }
    }

    pub fn combatant_mut(&mut self, id: CombatantId) -> Option<&mut dyn Combatant> {
        match id {
            CombatantId::Outpost(e) => self
                .outposts
                .get_mut(&e)
                .map(|o| o as &mut dyn Combatant),
            CombatantId::Sub(e) => self.subs.get_mut(&e).map(|s| s as &mut dyn Combatant),
        }
    }

    /// Live outposts in id order.
    pub fn live_outposts(&self) -> impl Iterator<Item = &Outpost> {
        self.live_outposts
            .iter()
            .filter_map(move |id| self.outposts.get(id))
    }

    /// Live subs in id order.
    pub fn live_subs(&self) -> impl Iterator<Item = &Sub> {
        self.live_subs.iter().filter_map(move |id| self.subs.get(id))
    }

    pub fn absorbed_subs(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.absorbed_subs.iter().copied()
    }

    pub fn destroyed_outposts(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.destroyed_outposts.iter().copied()
    }

    // -- relocation ---------------------------------------------------------

    /// Move a live sub to the absorbed set. Returns `false` if it was not live.
    pub fn remove_sub(&mut self, id: EntityId) -> bool {
        if !self.live_subs.remove(&id) {
            return false;
        }
        self.absorbed_subs.insert(id);
        true
    }

    /// Move an absorbed sub back to the live set.
    ///
    /// Returns `false` if the sub is unknown or already live.
    pub fn add_sub(&mut self, id: EntityId) -> bool {
        if !self.subs.contains_key(&id) || self.live_subs.contains(&id) {
            tracing::warn!(entity = %id, "cannot reinstate sub: unknown or already live");
            return false;
        }
        self.absorbed_subs.remove(&id);
        self.live_subs.insert(id);
        true
    }

    /// Move a live outpost to the destroyed set. Returns `false` if it was not
    /// live.
    pub fn destroy_outpost(&mut self, id: EntityId) -> bool {
        if !self.live_outposts.remove(&id) {
            return false;
        }
        self.destroyed_outposts.insert(id);
        true
    }

    /// Move a destroyed outpost back to the live set.
    pub fn restore_outpost(&mut self, id: EntityId) -> bool {
        if !self.destroyed_outposts.remove(&id) {
            return false;
        }
        self.live_outposts.insert(id);
        true
    }

    // -- derived quantities -------------------------------------------------

    /// Total drillers `owner` holds on live outposts and live subs.
    pub fn drillers_owned_by(&self, owner: PlayerId) -> i32 {
        let on_outposts: i32 = self
            .live_outposts()
            .filter(|o| o.owner() == Some(owner))
            .map(|o| o.driller_carrier().drillers())
            .fold(0, i32::saturating_add);
        let on_subs: i32 = self
            .live_subs()
            .filter(|s| s.owner() == Some(owner))
            .map(|s| s.driller_carrier().drillers())
            .fold(0, i32::saturating_add);
        on_outposts.saturating_add(on_subs)
    }

    /// Driller capacity contributed by `owner`'s live outposts.
    pub fn driller_capacity_of(&self, owner: PlayerId) -> i32 {
        self.live_outposts()
            .filter(|o| o.owner() == Some(owner) && !o.driller_carrier().is_destroyed())
            .map(Outpost::driller_capacity)
            .fold(0, i32::saturating_add)
    }

    /// How many more drillers `owner` may produce before hitting capacity.
    ///
    /// Zero for unknown or eliminated players; never negative.
    pub fn extra_driller_capacity(&self, owner: PlayerId) -> i32 {
        match self.players.get(&owner) {
            Some(player) if !player.is_eliminated() => {
                self.driller_capacity_of(owner)
                    .saturating_sub(self.drillers_owned_by(owner))
                    .max(0)
            }
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
