//! Read-only precondition checks.
//!
//! Every mutating event runs the relevant checks here before it touches
//! [`GameState`]. A rejection is an ordinary outcome (a stale or adversarial
//! client command, an entity that died earlier in the same tick) and is
//! reported as a [`ValidationError`] value, never as a panic.

use subterfuge_state::prelude::*;

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Why a precondition check rejected an entity, specialist, or command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The entity is not live in the state.
    #[error("{entity} does not exist")]
    MissingEntity { entity: CombatantId },

    /// The entity's driller count is negative.
    #[error("{entity} has a negative driller count ({drillers})")]
    NegativeDrillers { entity: CombatantId, drillers: i32 },

    /// The entity's roster holds more specialists than it has slots.
    #[error("{entity} holds {count} specialists but has capacity {capacity}")]
    SpecialistOverCapacity {
        entity: CombatantId,
        count: usize,
        capacity: usize,
    },

    /// The entity is owned by a player that is not registered.
    #[error("{entity} is owned by unknown {owner}")]
    UnknownOwner { entity: CombatantId, owner: PlayerId },

    /// The specialist has no owner.
    #[error("specialist {specialist:?} has no owner")]
    UnownedSpecialist { specialist: SpecialistId },

    /// The specialist's priority is zero or negative.
    #[error("specialist {specialist:?} has non-positive priority {priority}")]
    NonPositivePriority {
        specialist: SpecialistId,
        priority: i32,
    },

    /// The player is not registered.
    #[error("{player} does not exist")]
    UnknownPlayer { player: PlayerId },

    /// The player has been eliminated and can no longer act.
    #[error("{player} has been eliminated")]
    PlayerEliminated { player: PlayerId },

    /// The player tried to act on an entity they do not own.
    #[error("{player} does not own {entity}")]
    NotOwner { player: PlayerId, entity: CombatantId },

    /// The player's pool has no such offer.
    #[error("{player} has no offer for specialist {specialist:?}")]
    OfferNotFound {
        player: PlayerId,
        specialist: SpecialistId,
    },

    /// The entity's roster has no such specialist.
    #[error("{entity} does not carry specialist {specialist:?}")]
    SpecialistNotFound {
        entity: CombatantId,
        specialist: SpecialistId,
    },

    /// Not enough drillers for the requested transfer.
    #[error("{entity} has {available} drillers, {requested} requested")]
    InsufficientDrillers {
        entity: CombatantId,
        available: i32,
        requested: i32,
    },

    /// The target roster has no room left.
    #[error("{entity} has no room for {requested} more specialists (capacity {capacity})")]
    RosterFull {
        entity: CombatantId,
        requested: usize,
        capacity: usize,
    },

    /// A new entity was requested with an id that is already registered.
    #[error("entity id {entity} is already taken")]
    EntityIdTaken { entity: EntityId },

    /// The command payload could not be decoded.
    #[error("malformed command payload: {reason}")]
    MalformedPayload { reason: String },
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Validate any combatant: it must be live, hold a non-negative driller
/// count, stay within its roster capacity, and (if owned) be owned by a
/// registered player.
pub fn validate_combatant(state: &GameState, id: CombatantId) -> Result<(), ValidationError> {
    if !state.combatant_exists(id) {
        return Err(ValidationError::MissingEntity { entity: id });
    }
    let Some(entity) = state.combatant(id) else {
        return Err(ValidationError::MissingEntity { entity: id });
    };

    let drillers = entity.driller_carrier().drillers();
    if drillers < 0 {
        return Err(ValidationError::NegativeDrillers {
            entity: id,
            drillers,
        });
    }

    let roster = entity.specialist_manager();
    if roster.count() > roster.capacity() {
        return Err(ValidationError::SpecialistOverCapacity {
            entity: id,
            count: roster.count(),
            capacity: roster.capacity(),
        });
    }

    if let Some(owner) = entity.owner() {
        if !state.player_exists(owner) {
            return Err(ValidationError::UnknownOwner { entity: id, owner });
        }
    }
    Ok(())
}

pub fn validate_outpost(state: &GameState, id: EntityId) -> Result<(), ValidationError> {
    validate_combatant(state, CombatantId::Outpost(id))
}

pub fn validate_sub(state: &GameState, id: EntityId) -> Result<(), ValidationError> {
    validate_combatant(state, CombatantId::Sub(id))
}

/// A specialist is valid when it has an owner and a strictly positive
/// priority.
pub fn validate_specialist(specialist: &Specialist) -> Result<(), ValidationError> {
    if specialist.owner.is_none() {
        return Err(ValidationError::UnownedSpecialist {
            specialist: specialist.id,
        });
    }
    if specialist.priority <= 0 {
        return Err(ValidationError::NonPositivePriority {
            specialist: specialist.id,
            priority: specialist.priority,
        });
    }
    Ok(())
}

/// The player must be registered and still in the game.
pub fn validate_player(state: &GameState, id: PlayerId) -> Result<(), ValidationError> {
    match state.player(id) {
        None => Err(ValidationError::UnknownPlayer { player: id }),
        Some(p) if p.is_eliminated() => Err(ValidationError::PlayerEliminated { player: id }),
        Some(_) => Ok(()),
    }
}

/// The combatant must be valid and owned by `player`.
pub fn validate_ownership(
    state: &GameState,
    player: PlayerId,
    id: CombatantId,
) -> Result<(), ValidationError> {
    validate_combatant(state, id)?;
    let owner = state.combatant(id).and_then(|c| c.owner());
    if owner != Some(player) {
        return Err(ValidationError::NotOwner { player, entity: id });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        let mut s = GameState::new();
        s.add_player(Player::new(PlayerId(1), "one")).unwrap();
        s.add_outpost(Outpost::new(EntityId::new(1), Some(PlayerId(1))).with_drillers(10))
            .unwrap();
        s
    }

    #[test]
    fn valid_outpost_passes() {
        validate_outpost(&state(), EntityId::new(1)).unwrap();
    }

    #[test]
    fn negative_drillers_rejected() {
        let mut s = state();
        s.add_outpost(Outpost::new(EntityId::new(2), None).with_drillers(-1))
            .unwrap();
        assert_eq!(
            validate_outpost(&s, EntityId::new(2)),
            Err(ValidationError::NegativeDrillers {
                entity: CombatantId::Outpost(EntityId::new(2)),
                drillers: -1,
            })
        );
    }

    #[test]
    fn roster_over_capacity_rejected() {
        let mut s = state();
        let roster = SpecialistManager::from_parts(
            3,
            (0..5)
                .map(|i| Specialist::new(SpecialistId(i), "spy", PlayerId(1), 1))
                .collect(),
        );
        s.add_outpost(
            Outpost::new(EntityId::new(2), Some(PlayerId(1))).with_specialists(roster),
        )
        .unwrap();
        assert!(matches!(
            validate_outpost(&s, EntityId::new(2)),
            Err(ValidationError::SpecialistOverCapacity {
                count: 5,
                capacity: 3,
                ..
            })
        ));
    }

    #[test]
    fn sub_with_unknown_owner_rejected() {
        let mut s = state();
        s.insert_sub(Sub::new(
            EntityId::new(9),
            Some(PlayerId(42)),
            EntityId::new(1),
            EntityId::new(1),
            Tick::EPOCH,
        ))
        .unwrap();
        assert_eq!(
            validate_sub(&s, EntityId::new(9)),
            Err(ValidationError::UnknownOwner {
                entity: CombatantId::Sub(EntityId::new(9)),
                owner: PlayerId(42),
            })
        );
    }

    #[test]
    fn absorbed_sub_is_missing() {
        let mut s = state();
        s.insert_sub(Sub::new(
            EntityId::new(9),
            Some(PlayerId(1)),
            EntityId::new(1),
            EntityId::new(1),
            Tick::EPOCH,
        ))
        .unwrap();
        s.remove_sub(EntityId::new(9));
        assert!(matches!(
            validate_sub(&s, EntityId::new(9)),
            Err(ValidationError::MissingEntity { .. })
        ));
    }

    #[test]
    fn specialist_rules() {
        let ok = Specialist::new(SpecialistId(1), "queen", PlayerId(1), 3);
        validate_specialist(&ok).unwrap();

        let mut zero = ok.clone();
        zero.priority = 0;
        assert!(matches!(
            validate_specialist(&zero),
            Err(ValidationError::NonPositivePriority { priority: 0, .. })
        ));

        let mut orphan = ok;
        orphan.owner = None;
        assert!(matches!(
            validate_specialist(&orphan),
            Err(ValidationError::UnownedSpecialist { .. })
        ));
    }

    #[test]
    fn eliminated_player_rejected() {
        let mut s = state();
        s.player_mut(PlayerId(1)).unwrap().set_eliminated(true);
        assert_eq!(
            validate_player(&s, PlayerId(1)),
            Err(ValidationError::PlayerEliminated {
                player: PlayerId(1)
            })
        );
        assert_eq!(
            validate_player(&s, PlayerId(7)),
            Err(ValidationError::UnknownPlayer {
                player: PlayerId(7)
            })
        );
    }

    #[test]
    fn ownership_checked() {
        let s = state();
        let outpost = CombatantId::Outpost(EntityId::new(1));
        validate_ownership(&s, PlayerId(1), outpost).unwrap();
        assert!(matches!(
            validate_ownership(&s, PlayerId(2), outpost),
            Err(ValidationError::NotOwner { .. })
        ));
    }
}
