//! Natural combat effects and the events that move entities between the live
//! and inactive sets.
//!
//! Combat between two combatants at the same location resolves in two
//! passes, in priority order:
//!
//! 1. [`ShieldCombat`]: each side's shields soak up to the opponent's driller
//!    count. Absorbed damage is removed from the defender's shields *and* from
//!    the attacker's drillers.
//! 2. [`DrillerCombat`]: the surviving drillers annihilate one for one.
//!
//! Both passes cache the absolute pre-combat values of the two sides and
//! restore them on backward, so undo never depends on clamping behavior.

use serde::{Deserialize, Serialize};
use tracing::warn;

use subterfuge_state::prelude::*;

use crate::config::SimConfig;
use crate::event::{EventAction, EventError};
use crate::priority::Priority;

// ---------------------------------------------------------------------------
// CombatCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fighter {
    id: CombatantId,
    drillers: i32,
    shields: i32,
}

impl Fighter {
    fn read(state: &GameState, id: CombatantId) -> Option<Self> {
        if !state.combatant_exists(id) {
            return None;
        }
        let entity = state.combatant(id)?;
        Some(Self {
            id,
            drillers: entity.driller_carrier().drillers(),
            shields: entity.shield_manager().shields(),
        })
    }

    fn restore(&self, state: &mut GameState) {
        if let Some(entity) = state.combatant_mut(self.id) {
            entity.driller_carrier_mut().set_drillers(self.drillers);
            entity.shield_manager_mut().set_shields(self.shields);
        }
    }
}

/// Pre-combat values of both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CombatCache {
    first: Fighter,
    second: Fighter,
}

impl CombatCache {
    fn capture(
        state: &GameState,
        first: CombatantId,
        second: CombatantId,
        name: &'static str,
    ) -> Option<Self> {
        if first == second {
            warn!(event = name, combatant = %first, "combatant cannot fight itself");
            return None;
        }
        match (Fighter::read(state, first), Fighter::read(state, second)) {
            (Some(first), Some(second)) => Some(Self { first, second }),
            _ => {
                warn!(
                    event = name,
                    first = %first,
                    second = %second,
                    "combat skipped: a combatant is no longer live"
                );
                None
            }
        }
    }

    fn restore(&self, state: &mut GameState) {
        self.first.restore(state);
        self.second.restore(state);
    }
}

fn with_combatant(state: &mut GameState, id: CombatantId, f: impl FnOnce(&mut dyn Combatant)) {
    if let Some(entity) = state.combatant_mut(id) {
        f(entity);
    }
}

// ---------------------------------------------------------------------------
// ShieldCombat
// ---------------------------------------------------------------------------

/// Shields absorb incoming drillers before any driller is lost.
///
/// With `s1, d1` and `s2, d2` the pre-combat shields and drillers:
/// `absorbed_by_1 = min(s1, d2)` is removed from side 1's shields and side 2's
/// drillers, and symmetrically for `absorbed_by_2 = min(s2, d1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldCombat {
    combatant_1: CombatantId,
    combatant_2: CombatantId,
    #[serde(skip)]
    undo: Option<CombatCache>,
}

impl ShieldCombat {
    pub fn new(combatant_1: CombatantId, combatant_2: CombatantId) -> Self {
        Self {
            combatant_1,
            combatant_2,
            undo: None,
        }
    }

    pub fn combatants(&self) -> (CombatantId, CombatantId) {
        (self.combatant_1, self.combatant_2)
    }
}

impl EventAction for ShieldCombat {
    fn priority(&self) -> Priority {
        Priority::ShieldCombat
    }

    fn name(&self) -> &'static str {
        "shield_combat"
    }

    fn forward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        let Some(cache) = CombatCache::capture(state, self.combatant_1, self.combatant_2, self.name())
        else {
            return Ok(false);
        };

        let absorbed_by_1 = cache.first.shields.min(cache.second.drillers).max(0);
        let absorbed_by_2 = cache.second.shields.min(cache.first.drillers).max(0);

        with_combatant(state, self.combatant_1, |c| {
            c.shield_manager_mut().remove_shields(absorbed_by_1);
            c.driller_carrier_mut().remove_drillers(absorbed_by_2);
        });
        with_combatant(state, self.combatant_2, |c| {
            c.shield_manager_mut().remove_shields(absorbed_by_2);
            c.driller_carrier_mut().remove_drillers(absorbed_by_1);
        });

        self.undo = Some(cache);
        Ok(true)
    }

    fn backward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        let Some(cache) = self.undo.take() else {
            return Ok(false);
        };
        cache.restore(state);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// DrillerCombat
// ---------------------------------------------------------------------------

/// Drillers left after the shield pass annihilate one for one: both sides
/// lose `min(d1, d2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillerCombat {
    combatant_1: CombatantId,
    combatant_2: CombatantId,
    #[serde(skip)]
    undo: Option<CombatCache>,
}

impl DrillerCombat {
    pub fn new(combatant_1: CombatantId, combatant_2: CombatantId) -> Self {
        Self {
            combatant_1,
            combatant_2,
            undo: None,
        }
    }

    pub fn combatants(&self) -> (CombatantId, CombatantId) {
        (self.combatant_1, self.combatant_2)
    }
}

impl EventAction for DrillerCombat {
    fn priority(&self) -> Priority {
        Priority::DrillerCombat
    }

    fn name(&self) -> &'static str {
        "driller_combat"
    }

    fn forward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        let Some(cache) = CombatCache::capture(state, self.combatant_1, self.combatant_2, self.name())
        else {
            return Ok(false);
        };

        let losses = cache.first.drillers.min(cache.second.drillers).max(0);
        for id in [self.combatant_1, self.combatant_2] {
            with_combatant(state, id, |c| c.driller_carrier_mut().remove_drillers(losses));
        }

        self.undo = Some(cache);
        Ok(true)
    }

    fn backward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        let Some(cache) = self.undo.take() else {
            return Ok(false);
        };
        cache.restore(state);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// SpecialistSteal
// ---------------------------------------------------------------------------

/// A specialist effect that takes something from the opposing side.
///
/// What is taken, and how much, has not been decided. Both directions fail
/// with [`EventError::Unsupported`] and leave the state alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistSteal {
    thief: CombatantId,
    victim: CombatantId,
}

impl SpecialistSteal {
    pub fn new(thief: CombatantId, victim: CombatantId) -> Self {
        Self { thief, victim }
    }

    pub fn thief(&self) -> CombatantId {
        self.thief
    }

    pub fn victim(&self) -> CombatantId {
        self.victim
    }
}

impl EventAction for SpecialistSteal {
    fn priority(&self) -> Priority {
        Priority::SpecialistSteal
    }

    fn name(&self) -> &'static str {
        "specialist_steal"
    }

    fn forward(&mut self, _state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        Err(EventError::Unsupported {
            operation: "specialist steal",
        })
    }

    fn backward(&mut self, _state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        Err(EventError::Unsupported {
            operation: "specialist steal",
        })
    }
}

// ---------------------------------------------------------------------------
// OutpostDestruction
// ---------------------------------------------------------------------------

/// Marks a live outpost destroyed and moves it out of the live set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutpostDestruction {
    outpost: EntityId,
    #[serde(skip)]
    applied: bool,
}

impl OutpostDestruction {
    pub fn new(outpost: EntityId) -> Self {
        Self {
            outpost,
            applied: false,
        }
    }

    pub fn outpost(&self) -> EntityId {
        self.outpost
    }
}

impl EventAction for OutpostDestruction {
    fn priority(&self) -> Priority {
        Priority::OutpostDestruction
    }

    fn name(&self) -> &'static str {
        "outpost_destruction"
    }

    fn forward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        if !state.outpost_exists(self.outpost) {
            warn!(outpost = %self.outpost, "outpost already gone, nothing to destroy");
            return Ok(false);
        }
        if let Some(outpost) = state.outpost_mut(self.outpost) {
            outpost.driller_carrier_mut().set_destroyed(true);
        }
        state.destroy_outpost(self.outpost);
        self.applied = true;
        Ok(true)
    }

    fn backward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        if !std::mem::take(&mut self.applied) {
            return Ok(false);
        }
        state.restore_outpost(self.outpost);
        if let Some(outpost) = state.outpost_mut(self.outpost) {
            outpost.driller_carrier_mut().set_destroyed(false);
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// FriendlyArrival
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct ArrivalUndo {
    drillers: i32,
    /// Crew moved into the outpost, in the sub's roster order.
    crew: Vec<SpecialistId>,
}

/// A sub docking at an outpost its owner holds.
///
/// The sub's drillers and specialists move into the outpost and the sub
/// leaves the live set. Both entities must still be live when the event
/// fires, and the outpost's roster must have room for the whole crew;
/// otherwise nothing happens and the event reports failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendlyArrival {
    sub: EntityId,
    outpost: EntityId,
    #[serde(skip)]
    undo: Option<ArrivalUndo>,
}

impl FriendlyArrival {
    pub fn new(sub: EntityId, outpost: EntityId) -> Self {
        Self {
            sub,
            outpost,
            undo: None,
        }
    }

    pub fn sub(&self) -> EntityId {
        self.sub
    }

    pub fn outpost(&self) -> EntityId {
        self.outpost
    }
}

impl EventAction for FriendlyArrival {
    fn priority(&self) -> Priority {
        Priority::FriendlyArrival
    }

    fn name(&self) -> &'static str {
        "friendly_arrival"
    }

    fn forward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        if !state.sub_exists(self.sub) || !state.outpost_exists(self.outpost) {
            warn!(sub = %self.sub, outpost = %self.outpost, "arrival skipped: sub or outpost is gone");
            return Ok(false);
        }
        let (Some(sub), Some(outpost)) = (state.sub(self.sub), state.outpost(self.outpost)) else {
            return Ok(false);
        };

        let drillers = sub.driller_carrier().drillers();
        let crew = sub.specialist_manager().count();
        let roster = outpost.specialist_manager();
        if !roster.has_room_for(crew) {
            warn!(
                sub = %self.sub,
                outpost = %self.outpost,
                crew,
                capacity = roster.capacity(),
                "arrival skipped: outpost roster cannot take the crew"
            );
            return Ok(false);
        }

        let mut specialists = Vec::new();
        if let Some(sub) = state.sub_mut(self.sub) {
            sub.driller_carrier_mut().set_drillers(0);
            specialists = sub.specialist_manager_mut().take_all();
        }
        let crew = specialists.iter().map(|s| s.id).collect();
        if let Some(outpost) = state.outpost_mut(self.outpost) {
            outpost.driller_carrier_mut().add_drillers(drillers);
            for specialist in specialists {
                let index = outpost.specialist_manager().count();
                outpost.specialist_manager_mut().restore_at(index, specialist);
            }
        }
        state.remove_sub(self.sub);

        self.undo = Some(ArrivalUndo { drillers, crew });
        Ok(true)
    }

    fn backward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        let Some(undo) = self.undo.take() else {
            return Ok(false);
        };

        let mut crew = Vec::new();
        if let Some(outpost) = state.outpost_mut(self.outpost) {
            outpost.driller_carrier_mut().remove_drillers(undo.drillers);
            let roster = outpost.specialist_manager_mut();
            crew = undo
                .crew
                .iter()
                .filter_map(|id| roster.remove_specialist(*id).map(|(_, s)| s))
                .collect();
        }
        if let Some(sub) = state.sub_mut(self.sub) {
            sub.driller_carrier_mut().set_drillers(undo.drillers);
            for (index, specialist) in crew.into_iter().enumerate() {
                sub.specialist_manager_mut().restore_at(index, specialist);
            }
        }
        state.add_sub(self.sub);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const A: EntityId = EntityId::new(1);
    const B: EntityId = EntityId::new(2);
    const SUB: EntityId = EntityId::new(10);

    fn duel(a: (i32, i32), b: (i32, i32)) -> GameState {
        let mut state = GameState::new();
        state.add_player(Player::new(PlayerId(1), "one")).unwrap();
        state.add_player(Player::new(PlayerId(2), "two")).unwrap();
        state
            .add_outpost(
                Outpost::new(A, Some(PlayerId(1)))
                    .with_drillers(a.0)
                    .with_shields(20, a.1),
            )
            .unwrap();
        state
            .add_outpost(
                Outpost::new(B, Some(PlayerId(2)))
                    .with_drillers(b.0)
                    .with_shields(20, b.1),
            )
            .unwrap();
        state
    }

    fn counts(state: &GameState, id: EntityId) -> (i32, i32) {
        let o = state.outpost(id).unwrap();
        (o.driller_carrier().drillers(), o.shield_manager().shields())
    }

    #[test]
    fn shields_absorb_attackers() {
        let mut state = duel((10, 3), (4, 0));
        let mut combat = ShieldCombat::new(CombatantId::Outpost(A), CombatantId::Outpost(B));
        assert!(combat.forward(&mut state, &SimConfig::default()).unwrap());

        // A's three shields soak three of B's drillers; B has no shields.
        assert_eq!(counts(&state, A), (10, 0));
        assert_eq!(counts(&state, B), (1, 0));
    }

    #[test]
    fn shield_combat_round_trips_three_ways() {
        let config = SimConfig::default();
        let mut state = duel((7, 5), (9, 2));
        let before = state.clone();
        let mut combat = ShieldCombat::new(CombatantId::Outpost(A), CombatantId::Outpost(B));

        combat.forward(&mut state, &config).unwrap();
        let after = state.clone();
        assert!(combat.backward(&mut state, &config).unwrap());
        assert_eq!(state, before);
        combat.forward(&mut state, &config).unwrap();
        assert_eq!(state, after);
    }

    #[test]
    fn driller_combat_annihilates() {
        let mut state = duel((10, 0), (4, 0));
        let mut combat = DrillerCombat::new(CombatantId::Outpost(A), CombatantId::Outpost(B));
        combat.forward(&mut state, &SimConfig::default()).unwrap();
        assert_eq!(counts(&state, A).0, 6);
        assert_eq!(counts(&state, B).0, 0);
    }

    #[test]
    fn combat_with_missing_side_fails_without_mutation() {
        let mut state = duel((10, 3), (4, 0));
        let before = state.clone();
        let mut combat =
            ShieldCombat::new(CombatantId::Outpost(A), CombatantId::Sub(EntityId::new(99)));
        assert!(!combat.forward(&mut state, &SimConfig::default()).unwrap());
        assert_eq!(state, before);
        assert!(!combat.backward(&mut state, &SimConfig::default()).unwrap());
    }

    #[test]
    fn steal_is_unsupported() {
        let mut state = duel((1, 1), (1, 1));
        let before = state.clone();
        let mut steal = SpecialistSteal::new(CombatantId::Outpost(A), CombatantId::Outpost(B));
        assert_eq!(
            steal.forward(&mut state, &SimConfig::default()),
            Err(EventError::Unsupported {
                operation: "specialist steal"
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn destruction_round_trip() {
        let config = SimConfig::default();
        let mut state = duel((1, 0), (1, 0));
        let before = state.clone();
        let mut destroy = OutpostDestruction::new(B);
        assert!(destroy.forward(&mut state, &config).unwrap());
        assert!(!state.outpost_exists(B));
        assert!(state.outpost(B).unwrap().driller_carrier().is_destroyed());
        assert!(!destroy.forward(&mut state.clone(), &config).unwrap());

        assert!(destroy.backward(&mut state, &config).unwrap());
        assert_eq!(state, before);
    }

    fn with_sub(mut state: GameState, crew: usize) -> GameState {
        let specialists = (0..crew as u32)
            .map(|i| Specialist::new(SpecialistId(i), "spy", PlayerId(1), 1))
            .collect();
        state
            .insert_sub(
                Sub::new(SUB, Some(PlayerId(1)), B, A, Tick::EPOCH)
                    .with_drillers(12)
                    .with_specialists(3, specialists),
            )
            .unwrap();
        state
    }

    #[test]
    fn arrival_moves_cargo_and_reverts() {
        let config = SimConfig::default();
        let mut state = duel((10, 0), (0, 0));
        if let Some(o) = state.outpost_mut(A) {
            *o.specialist_manager_mut() = SpecialistManager::new(5);
        }
        let mut state = with_sub(state, 2);
        let before = state.clone();

        let mut arrival = FriendlyArrival::new(SUB, A);
        assert!(arrival.forward(&mut state, &config).unwrap());
        assert!(!state.sub_exists(SUB));
        assert_eq!(counts(&state, A).0, 22);
        assert_eq!(state.outpost(A).unwrap().specialist_manager().count(), 2);
        assert_eq!(state.sub(SUB).unwrap().driller_carrier().drillers(), 0);

        assert!(arrival.backward(&mut state, &config).unwrap());
        assert_eq!(state, before);
    }

    #[test]
    fn arrival_rejected_when_roster_full() {
        let mut state = with_sub(duel((10, 0), (0, 0)), 1);
        let before = state.clone();
        let mut arrival = FriendlyArrival::new(SUB, A);
        assert!(!arrival.forward(&mut state, &SimConfig::default()).unwrap());
        assert_eq!(state, before);
    }

    #[test]
    fn arrival_at_destroyed_outpost_fails() {
        let config = SimConfig::default();
        let mut state = with_sub(duel((10, 0), (0, 0)), 0);
        OutpostDestruction::new(A).forward(&mut state, &config).unwrap();
        let before = state.clone();
        let mut arrival = FriendlyArrival::new(SUB, A);
        assert!(!arrival.forward(&mut state, &config).unwrap());
        assert_eq!(state, before);
    }
}
