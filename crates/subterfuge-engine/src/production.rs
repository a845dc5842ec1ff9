//! Recurring resource production.
//!
//! A [`ResourceProducer`] is a schedule: every `interval` ticks after its
//! anchor it emits a [`Production`] event for its location. The time machine
//! asks each producer for due events as it steps forward, so productions are
//! generated lazily and only for ticks actually visited.
//!
//! The amount produced is decided when the event fires, from the state at that
//! moment, and recorded in the event. Backward removes exactly the recorded
//! amount, so undo stays exact even if capacity has changed since.

use serde::{Deserialize, Serialize};
use tracing::warn;

use subterfuge_state::prelude::*;

use crate::config::SimConfig;
use crate::event::{EventAction, EventError};
use crate::priority::Priority;

/// What a producer generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Factory output, bounded by the owner's spare driller capacity.
    Drillers,
    /// Shield regeneration, bounded by the shield's free capacity.
    Shields,
}

// ---------------------------------------------------------------------------
// ResourceProducer
// ---------------------------------------------------------------------------

/// A fixed-interval production schedule for one outpost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProducer {
    location: EntityId,
    resource: Resource,
    interval: u64,
    base_amount: i32,
    anchor: Tick,
    generated_through: Tick,
}

impl ResourceProducer {
    /// Produce `base_amount` of `resource` at `location` every `interval`
    /// ticks after `anchor`. An interval of 0 is treated as 1.
    pub fn new(
        location: EntityId,
        resource: Resource,
        interval: u64,
        base_amount: i32,
        anchor: Tick,
    ) -> Self {
        Self {
            location,
            resource,
            interval: interval.max(1),
            base_amount,
            anchor,
            generated_through: anchor,
        }
    }

    /// Driller production configured from `config`.
    pub fn drillers(location: EntityId, anchor: Tick, config: &SimConfig) -> Self {
        Self::new(
            location,
            Resource::Drillers,
            config.ticks_per_production,
            config.base_production_amount,
            anchor,
        )
    }

    /// Shield regeneration configured from `config`.
    pub fn shields(location: EntityId, anchor: Tick, config: &SimConfig) -> Self {
        Self::new(
            location,
            Resource::Shields,
            config.ticks_per_shield_regeneration,
            config.base_shield_regeneration,
            anchor,
        )
    }

    pub fn location(&self) -> EntityId {
        self.location
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn base_amount(&self) -> i32 {
        self.base_amount
    }

    /// Whether `tick` is one of this producer's production ticks.
    pub fn is_due(&self, tick: Tick) -> bool {
        tick > self.anchor && tick.since(self.anchor) % self.interval == 0
    }

    /// The production event for `tick`, if one is due and has not been
    /// generated yet. Each tick is handed out at most once.
    pub fn take_due(&mut self, tick: Tick) -> Option<Production> {
        if tick <= self.generated_through {
            return None;
        }
        self.generated_through = tick;
        self.is_due(tick)
            .then(|| Production::new(self.location, self.resource, self.base_amount))
    }

    /// Forget which ticks were already generated beyond `tick`.
    pub(crate) fn reset_generated_through(&mut self, tick: Tick) {
        self.generated_through = tick.max(self.anchor);
    }
}

// ---------------------------------------------------------------------------
// Production
// ---------------------------------------------------------------------------

/// One production at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    location: EntityId,
    resource: Resource,
    base_amount: i32,
    #[serde(skip)]
    produced: Option<i32>,
}

impl Production {
    pub fn new(location: EntityId, resource: Resource, base_amount: i32) -> Self {
        Self {
            location,
            resource,
            base_amount,
            produced: None,
        }
    }

    pub fn location(&self) -> EntityId {
        self.location
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Amount added by the last forward action, if it has not been undone.
    pub fn produced(&self) -> Option<i32> {
        self.produced
    }

    /// How much this production would add right now.
    ///
    /// Zero when the outpost is destroyed or no longer live, and for drillers
    /// also when it is neutral or its owner is eliminated.
    pub fn next_amount(&self, state: &GameState) -> i32 {
        let Some(outpost) = state.outpost(self.location) else {
            return 0;
        };
        if !state.outpost_exists(self.location) || outpost.driller_carrier().is_destroyed() {
            return 0;
        }
        match self.resource {
            Resource::Drillers => match outpost.owner() {
                Some(owner) => state
                    .extra_driller_capacity(owner)
                    .min(self.base_amount)
                    .max(0),
                None => 0,
            },
            Resource::Shields => {
                let shields = outpost.shield_manager();
                if shields.is_active() {
                    shields.remaining_capacity().min(self.base_amount).max(0)
                } else {
                    0
                }
            }
        }
    }
}

impl EventAction for Production {
    fn priority(&self) -> Priority {
        match self.resource {
            Resource::Drillers => Priority::Production,
            Resource::Shields => Priority::ShieldRegeneration,
        }
    }

    fn name(&self) -> &'static str {
        match self.resource {
            Resource::Drillers => "driller_production",
            Resource::Shields => "shield_regeneration",
        }
    }

    fn forward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        if state.outpost(self.location).is_none() {
            warn!(outpost = %self.location, "production at unknown outpost");
            return Ok(false);
        }
        let amount = self.next_amount(state);
        let produced = match state.outpost_mut(self.location) {
            Some(outpost) => match self.resource {
                Resource::Drillers => {
                    outpost.driller_carrier_mut().add_drillers(amount);
                    amount
                }
                Resource::Shields => outpost.shield_manager_mut().add_shields(amount),
            },
            None => 0,
        };
        self.produced = Some(produced);
        Ok(true)
    }

    fn backward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        let Some(produced) = self.produced.take() else {
            return Ok(false);
        };
        if let Some(outpost) = state.outpost_mut(self.location) {
            match self.resource {
                Resource::Drillers => outpost.driller_carrier_mut().remove_drillers(produced),
                Resource::Shields => {
                    outpost.shield_manager_mut().remove_shields(produced);
                }
            }
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FACTORY: EntityId = EntityId::new(1);

    fn factory(drillers: i32, capacity: i32) -> GameState {
        let mut state = GameState::new();
        state.add_player(Player::new(PlayerId(1), "one")).unwrap();
        state
            .add_outpost(
                Outpost::new(FACTORY, Some(PlayerId(1)))
                    .with_drillers(drillers)
                    .with_driller_capacity(capacity)
                    .with_shields(10, 4),
            )
            .unwrap();
        state
    }

    fn drillers(state: &GameState) -> i32 {
        state.outpost(FACTORY).unwrap().driller_carrier().drillers()
    }

    #[test]
    fn clamps_to_extra_capacity_and_undoes_exact_amount() {
        let config = SimConfig::default();
        let mut state = factory(8, 10);
        let mut production = Production::new(FACTORY, Resource::Drillers, 5);

        assert!(production.forward(&mut state, &config).unwrap());
        assert_eq!(production.produced(), Some(2));
        assert_eq!(drillers(&state), 10);

        // Raise capacity after the fact: undo must still remove only 2.
        state
            .add_outpost(Outpost::new(EntityId::new(2), Some(PlayerId(1))).with_driller_capacity(50))
            .unwrap();
        assert_eq!(production.next_amount(&state), 5);
        assert!(production.backward(&mut state, &config).unwrap());
        assert_eq!(drillers(&state), 8);
        assert!(!production.backward(&mut state, &config).unwrap());
    }

    #[test]
    fn eliminated_owner_produces_nothing() {
        let mut state = factory(0, 100);
        state.player_mut(PlayerId(1)).unwrap().set_eliminated(true);
        let production = Production::new(FACTORY, Resource::Drillers, 6);
        assert_eq!(production.next_amount(&state), 0);
    }

    #[test]
    fn destroyed_outpost_produces_nothing() {
        let mut state = factory(0, 100);
        state.outpost_mut(FACTORY).unwrap().driller_carrier_mut().set_destroyed(true);
        let production = Production::new(FACTORY, Resource::Drillers, 6);
        assert_eq!(production.next_amount(&state), 0);
    }

    #[test]
    fn neutral_outpost_is_dormant() {
        let mut state = GameState::new();
        state
            .add_outpost(Outpost::new(FACTORY, None).with_driller_capacity(50))
            .unwrap();
        let production = Production::new(FACTORY, Resource::Drillers, 6);
        assert_eq!(production.next_amount(&state), 0);
    }

    #[test]
    fn shield_regeneration_respects_capacity_and_toggle() {
        let config = SimConfig::default();
        let mut state = factory(0, 0);
        let mut regen = Production::new(FACTORY, Resource::Shields, 10);
        regen.forward(&mut state, &config).unwrap();
        assert_eq!(regen.produced(), Some(6));
        assert_eq!(state.outpost(FACTORY).unwrap().shield_manager().shields(), 10);
        regen.backward(&mut state, &config).unwrap();
        assert_eq!(state.outpost(FACTORY).unwrap().shield_manager().shields(), 4);

        state.outpost_mut(FACTORY).unwrap().shield_manager_mut().toggle();
        assert_eq!(regen.next_amount(&state), 0);
    }

    #[test]
    fn producer_schedule() {
        let mut producer =
            ResourceProducer::new(FACTORY, Resource::Drillers, 3, 6, Tick::EPOCH);
        let due: Vec<u64> = (0..10)
            .filter_map(|t| producer.take_due(Tick::new(t)).map(|_| t))
            .collect();
        assert_eq!(due, vec![3, 6, 9]);

        // Already generated ticks are never handed out twice.
        assert!(producer.take_due(Tick::new(6)).is_none());
        producer.reset_generated_through(Tick::new(5));
        assert!(producer.take_due(Tick::new(6)).is_some());
    }

    #[test]
    fn unknown_location_fails() {
        let mut state = GameState::new();
        let mut production = Production::new(FACTORY, Resource::Drillers, 1);
        assert!(!production.forward(&mut state, &SimConfig::default()).unwrap());
    }
}
