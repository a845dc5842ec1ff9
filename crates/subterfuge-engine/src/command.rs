//! Player-issued commands.
//!
//! A [`PlayerCommand`] carries submission metadata ([`CommandMeta`]) and an
//! opaque JSON payload. The payload is only decoded when the command fires,
//! into one of the [`CommandPayload`] kinds. Every precondition is checked
//! through the [validator](crate::validator) before the first mutation; a
//! rejected command leaves the state untouched, records the
//! [`ValidationError`], and logs a warning. The simulation carries on.
//!
//! A successful command records exactly what it changed (which offer was
//! hired and from where, which specialists left which slots) so that backward
//! can reverse it without looking at anything else.
//!
//! # Example
//!
//! ```
//! use subterfuge_engine::command::{CommandMeta, CommandPayload, PlayerCommand};
//! use subterfuge_state::prelude::*;
//!
//! let meta = CommandMeta {
//!     command_id: "cmd-1".to_owned(),
//!     issued_by: PlayerId(1),
//!     issued_at_unix_ms: 1_700_000_000_000,
//!     occurs_at: Tick::new(5),
//! };
//! let command = PlayerCommand::from_payload(
//!     meta,
//!     &CommandPayload::ToggleShield { outpost: EntityId::new(3) },
//! )
//! .unwrap();
//! assert_eq!(
//!     command.decode_payload().unwrap(),
//!     CommandPayload::ToggleShield { outpost: EntityId::new(3) }
//! );
//! ```

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use subterfuge_state::prelude::*;

use crate::config::SimConfig;
use crate::event::{EventAction, EventError};
use crate::priority::Priority;
use crate::validator::{
    validate_combatant, validate_ownership, validate_player, validate_specialist, ValidationError,
};

// ---------------------------------------------------------------------------
// CommandMeta / CommandPayload
// ---------------------------------------------------------------------------

/// Submission metadata supplied by the layer that accepts player input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMeta {
    /// Unique id assigned at submission.
    pub command_id: String,
    /// The player who issued the command.
    pub issued_by: PlayerId,
    /// Wall-clock submission time, milliseconds since the Unix epoch.
    pub issued_at_unix_ms: u64,
    /// The tick the command takes effect.
    pub occurs_at: Tick,
}

/// The decoded command kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandPayload {
    /// Hire an offer from the issuer's specialist pool into an outpost or sub
    /// the issuer owns.
    HireSpecialist {
        hire_location: EntityId,
        specialist_id: SpecialistId,
    },
    /// Launch a new sub from an owned outpost.
    LaunchSub {
        source: EntityId,
        sub_id: EntityId,
        destination: EntityId,
        drillers: i32,
        #[serde(default)]
        specialists: Vec<SpecialistId>,
    },
    /// Switch an owned outpost's shield on or off.
    ToggleShield { outpost: EntityId },
}

// ---------------------------------------------------------------------------
// CommandUndo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum CommandUndo {
    Hired {
        location: CombatantId,
        pool_index: usize,
        specialist: Specialist,
    },
    Launched {
        source: EntityId,
        sub_id: EntityId,
        drillers: i32,
        /// Source roster index and id of each crew member, in removal order.
        crew: Vec<(usize, SpecialistId)>,
    },
    Toggled {
        outpost: EntityId,
    },
}

// ---------------------------------------------------------------------------
// PlayerCommand
// ---------------------------------------------------------------------------

/// A command submitted by a player, applied at `meta.occurs_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCommand {
    meta: CommandMeta,
    payload: String,
    #[serde(skip)]
    undo: Option<CommandUndo>,
    #[serde(skip)]
    rejection: Option<ValidationError>,
}

impl PlayerCommand {
    /// Wrap an already serialized payload. Decoding is deferred to forward.
    pub fn new(meta: CommandMeta, payload: impl Into<String>) -> Self {
        Self {
            meta,
            payload: payload.into(),
            undo: None,
            rejection: None,
        }
    }

    /// Serialize `payload` and wrap it.
    ///
    /// # Errors
    ///
    /// Propagates the `serde_json` error if the payload cannot be encoded.
    pub fn from_payload(meta: CommandMeta, payload: &CommandPayload) -> Result<Self, serde_json::Error> {
        Ok(Self::new(meta, serde_json::to_string(payload)?))
    }

    pub fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    /// The raw serialized payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn decode_payload(&self) -> Result<CommandPayload, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }

    /// Why the most recent forward action was rejected, if it was.
    pub fn rejection(&self) -> Option<&ValidationError> {
        self.rejection.as_ref()
    }

    fn apply(&self, state: &mut GameState, config: &SimConfig) -> Result<CommandUndo, ValidationError> {
        let payload = self
            .decode_payload()
            .map_err(|e| ValidationError::MalformedPayload {
                reason: e.to_string(),
            })?;
        let player = self.meta.issued_by;
        validate_player(state, player)?;

        match payload {
            CommandPayload::HireSpecialist {
                hire_location,
                specialist_id,
            } => hire_specialist(state, player, hire_location, specialist_id),
            CommandPayload::LaunchSub {
                source,
                sub_id,
                destination,
                drillers,
                specialists,
            } => launch_sub(
                state,
                config,
                player,
                LaunchOrder {
                    source,
                    sub_id,
                    destination,
                    drillers,
                    specialists,
                    occurs_at: self.meta.occurs_at,
                },
            ),
            CommandPayload::ToggleShield { outpost } => {
                validate_ownership(state, player, CombatantId::Outpost(outpost))?;
                if let Some(o) = state.outpost_mut(outpost) {
                    o.shield_manager_mut().toggle();
                }
                Ok(CommandUndo::Toggled { outpost })
            }
        }
    }
}

impl EventAction for PlayerCommand {
    fn priority(&self) -> Priority {
        Priority::PlayerCommand
    }

    fn name(&self) -> &'static str {
        "player_command"
    }

    fn forward(&mut self, state: &mut GameState, config: &SimConfig) -> Result<bool, EventError> {
        match self.apply(state, config) {
            Ok(undo) => {
                trace!(command_id = %self.meta.command_id, player = %self.meta.issued_by, "command applied");
                self.undo = Some(undo);
                self.rejection = None;
                Ok(true)
            }
            Err(rejection) => {
                warn!(
                    command_id = %self.meta.command_id,
                    player = %self.meta.issued_by,
                    tick = %self.meta.occurs_at,
                    error = %rejection,
                    "command rejected"
                );
                self.undo = None;
                self.rejection = Some(rejection);
                Ok(false)
            }
        }
    }

    fn backward(&mut self, state: &mut GameState, _config: &SimConfig) -> Result<bool, EventError> {
        let Some(undo) = self.undo.take() else {
            return Ok(false);
        };
        match undo {
            CommandUndo::Hired {
                location,
                pool_index,
                specialist,
            } => {
                // The hire location may already be gone if a same-tick
                // launch was reverted first; the offer goes back regardless.
                if let Some(entity) = state.combatant_mut(location) {
                    entity.specialist_manager_mut().remove_specialist(specialist.id);
                }
                if let Some(player) = state.player_mut(self.meta.issued_by) {
                    player.specialist_pool_mut().undo_hire(pool_index, specialist);
                }
            }
            CommandUndo::Launched {
                source,
                sub_id,
                drillers,
                crew,
            } => {
                let Some(mut sub) = state.unregister_sub(sub_id) else {
                    return Ok(false);
                };
                let roster = sub.specialist_manager_mut();
                let returning: Vec<_> = crew
                    .into_iter()
                    .filter_map(|(index, id)| {
                        roster.remove_specialist(id).map(|(_, s)| (index, s))
                    })
                    .collect();
                if let Some(outpost) = state.outpost_mut(source) {
                    outpost.driller_carrier_mut().add_drillers(drillers);
                    for (index, specialist) in returning.into_iter().rev() {
                        outpost.specialist_manager_mut().restore_at(index, specialist);
                    }
                }
            }
            CommandUndo::Toggled { outpost } => {
                if let Some(o) = state.outpost_mut(outpost) {
                    o.shield_manager_mut().toggle();
                }
            }
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Command kinds
// ---------------------------------------------------------------------------

fn locate(state: &GameState, id: EntityId) -> Result<CombatantId, ValidationError> {
    if state.outpost_exists(id) {
        Ok(CombatantId::Outpost(id))
    } else if state.sub_exists(id) {
        Ok(CombatantId::Sub(id))
    } else {
        Err(ValidationError::MissingEntity {
            entity: CombatantId::Outpost(id),
        })
    }
}

fn hire_specialist(
    state: &mut GameState,
    player: PlayerId,
    hire_location: EntityId,
    specialist_id: SpecialistId,
) -> Result<CommandUndo, ValidationError> {
    let location = locate(state, hire_location)?;
    validate_ownership(state, player, location)?;

    let offer = state
        .player(player)
        .and_then(|p| p.specialist_pool().find_offer(specialist_id))
        .ok_or(ValidationError::OfferNotFound {
            player,
            specialist: specialist_id,
        })?;
    validate_specialist(offer)?;

    if let Some(entity) = state.combatant(location) {
        let roster = entity.specialist_manager();
        if !roster.has_room_for(1) {
            return Err(ValidationError::RosterFull {
                entity: location,
                requested: 1,
                capacity: roster.capacity(),
            });
        }
    }

    let hired = state
        .player_mut(player)
        .and_then(|p| p.specialist_pool_mut().hire(specialist_id));
    let Some((pool_index, specialist)) = hired else {
        return Err(ValidationError::OfferNotFound {
            player,
            specialist: specialist_id,
        });
    };
    if let Some(entity) = state.combatant_mut(location) {
        let roster = entity.specialist_manager_mut();
        let end = roster.count();
        roster.restore_at(end, specialist.clone());
    }

    Ok(CommandUndo::Hired {
        location,
        pool_index,
        specialist,
    })
}

struct LaunchOrder {
    source: EntityId,
    sub_id: EntityId,
    destination: EntityId,
    drillers: i32,
    specialists: Vec<SpecialistId>,
    occurs_at: Tick,
}

fn launch_sub(
    state: &mut GameState,
    config: &SimConfig,
    player: PlayerId,
    order: LaunchOrder,
) -> Result<CommandUndo, ValidationError> {
    let source_id = CombatantId::Outpost(order.source);
    validate_ownership(state, player, source_id)?;
    validate_combatant(state, CombatantId::Outpost(order.destination))?;

    if state.is_registered(order.sub_id) {
        return Err(ValidationError::EntityIdTaken {
            entity: order.sub_id,
        });
    }

    let Some(source) = state.outpost(order.source) else {
        return Err(ValidationError::MissingEntity { entity: source_id });
    };
    let available = source.driller_carrier().drillers();
    if order.drillers < 0 || order.drillers > available {
        return Err(ValidationError::InsufficientDrillers {
            entity: source_id,
            available,
            requested: order.drillers,
        });
    }
    if order.specialists.len() > config.sub_specialist_capacity {
        return Err(ValidationError::RosterFull {
            entity: CombatantId::Sub(order.sub_id),
            requested: order.specialists.len(),
            capacity: config.sub_specialist_capacity,
        });
    }
    let mut crew = Vec::with_capacity(order.specialists.len());
    for id in &order.specialists {
        let found = source
            .specialist_manager()
            .specialists()
            .iter()
            .find(|s| s.id == *id)
            .filter(|_| !crew.iter().any(|c: &Specialist| c.id == *id));
        match found {
            Some(specialist) => crew.push(specialist.clone()),
            None => {
                return Err(ValidationError::SpecialistNotFound {
                    entity: source_id,
                    specialist: *id,
                })
            }
        }
    }

    let sub = Sub::new(
        order.sub_id,
        Some(player),
        order.source,
        order.destination,
        order.occurs_at,
    )
    .with_drillers(order.drillers)
    .with_specialists(config.sub_specialist_capacity, crew);
    state
        .insert_sub(sub)
        .map_err(|_| ValidationError::EntityIdTaken {
            entity: order.sub_id,
        })?;

    let mut removed = Vec::with_capacity(order.specialists.len());
    if let Some(source) = state.outpost_mut(order.source) {
        source.driller_carrier_mut().remove_drillers(order.drillers);
        for id in &order.specialists {
            if let Some((index, _)) = source.specialist_manager_mut().remove_specialist(*id) {
                removed.push((index, *id));
            }
        }
    }

    Ok(CommandUndo::Launched {
        source: order.source,
        sub_id: order.sub_id,
        drillers: order.drillers,
        crew: removed,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
