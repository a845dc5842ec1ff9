//! The time machine: sole owner and mutator of the [`GameState`].
//!
//! The time machine holds the event log and moves the state one tick at a
//! time toward a requested target:
//!
//! * **Forward** into tick `t`: set the clock to `t`, let every
//!   [`ResourceProducer`] add its due productions to the log, then apply the
//!   events scheduled at `t` in ascending `(priority, submission order)`.
//! * **Reverse** out of tick `t`: revert the events that were applied at `t`
//!   (in the order chosen by [`SimConfig::undo_order`]), then set the clock to
//!   `t - 1`.
//!
//! Each step settles completely before the next begins, and observers are
//! notified once per settled tick. Nothing is ever applied at the epoch: the
//! initial state *is* the epoch.
//!
//! Editing the past is allowed. Adding or removing an event at or before the
//! current tick rewinds to just before it, edits the log, and replays back to
//! where the machine was, so the state always equals "every logged event
//! applied in order from the initial state".
//!
//! # Example
//!
//! ```
//! use subterfuge_engine::prelude::*;
//!
//! let mut state = GameState::new();
//! state.add_player(Player::new(PlayerId(1), "alice")).unwrap();
//! state
//!     .add_outpost(
//!         Outpost::new(EntityId::new(1), Some(PlayerId(1)))
//!             .with_drillers(10)
//!             .with_driller_capacity(100),
//!     )
//!     .unwrap();
//!
//! let config = SimConfig {
//!     ticks_per_production: 10,
//!     base_production_amount: 5,
//!     ..SimConfig::default()
//! };
//! let mut tm = TimeMachine::new(state, config).unwrap();
//! tm.add_driller_producer(EntityId::new(1));
//!
//! tm.advance(25);
//! let drillers = |tm: &TimeMachine| {
//!     tm.state().outpost(EntityId::new(1)).unwrap().driller_carrier().drillers()
//! };
//! assert_eq!(drillers(&tm), 20);
//!
//! tm.rewind(25);
//! assert_eq!(drillers(&tm), 10);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use subterfuge_state::prelude::*;

use crate::config::{ConfigError, SimConfig, UndoOrder};
use crate::event::{EventId, GameEvent};
use crate::observer::{Direction, ListenerHandle, ObserverList, TickChanged};
use crate::priority::Priority;
use crate::production::ResourceProducer;

// ---------------------------------------------------------------------------
// TimeMachineError
// ---------------------------------------------------------------------------

/// Errors returned by time machine operations.
#[derive(Debug, thiserror::Error)]
pub enum TimeMachineError {
    /// No event with this id is in the log.
    #[error("{id} is not in the event log")]
    UnknownEvent { id: EventId },

    /// The epoch is the initial state; events must come after it.
    #[error("events cannot be scheduled at the epoch")]
    ScheduledAtEpoch,

    /// The supplied configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// EventPhase / ScheduledEvent
// ---------------------------------------------------------------------------

/// Where a logged event stands relative to the current timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventPhase {
    /// Not yet reached, or reverted.
    Pending,
    /// Forward succeeded; backward will be run when rewinding over it.
    Applied,
    /// Forward reported failure and changed nothing.
    Rejected,
    /// Forward returned an unsupported-operation error.
    Unsupported,
}

/// An event in the log together with its bookkeeping.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    id: EventId,
    event: GameEvent,
    phase: EventPhase,
    generated: bool,
}

impl ScheduledEvent {
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn event(&self) -> &GameEvent {
        &self.event
    }

    pub fn occurs_at(&self) -> Tick {
        self.event.occurs_at()
    }

    pub fn priority(&self) -> Priority {
        self.event.priority()
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    /// `true` for productions added by a producer rather than submitted.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    fn sort_key(&self) -> (Tick, Priority, EventId) {
        (self.occurs_at(), self.priority(), self.id)
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened while settling a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub direction: Direction,
    /// The tick the machine is at after the step.
    pub tick: Tick,
    /// Forward actions that succeeded.
    pub applied: usize,
    /// Forward actions rejected by a precondition.
    pub failed: usize,
    /// Forward actions that hit an unsupported operation.
    pub unsupported: usize,
    /// Backward actions that undid an applied event.
    pub reverted: usize,
}

impl TickReport {
    fn new(direction: Direction, tick: Tick) -> Self {
        Self {
            direction,
            tick,
            applied: 0,
            failed: 0,
            unsupported: 0,
            reverted: 0,
        }
    }
}

/// Totals for a whole [`TimeMachine::goto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GotoSummary {
    pub from: Tick,
    pub to: Tick,
    pub ticks_stepped: u64,
    pub applied: usize,
    pub failed: usize,
    pub unsupported: usize,
    pub reverted: usize,
}

impl GotoSummary {
    fn absorb(&mut self, report: &TickReport) {
        self.ticks_stepped += 1;
        self.applied += report.applied;
        self.failed += report.failed;
        self.unsupported += report.unsupported;
        self.reverted += report.reverted;
    }
}

// ---------------------------------------------------------------------------
// TimeMachine
// ---------------------------------------------------------------------------

/// Event log plus the state it has been applied to up to the current tick.
#[derive(Debug)]
pub struct TimeMachine {
    state: GameState,
    config: SimConfig,
    log: BTreeMap<EventId, ScheduledEvent>,
    by_tick: BTreeMap<Tick, Vec<EventId>>,
    next_event_id: u64,
    producers: Vec<ResourceProducer>,
    observers: ObserverList,
    last_report: Option<TickReport>,
}

impl TimeMachine {
    /// Take ownership of `state` as the state at its current tick.
    ///
    /// # Errors
    ///
    /// [`TimeMachineError::Config`] if `config` fails validation.
    pub fn new(state: GameState, config: SimConfig) -> Result<Self, TimeMachineError> {
        config.validate()?;
        Ok(Self {
            state,
            config,
            log: BTreeMap::new(),
            by_tick: BTreeMap::new(),
            next_event_id: 0,
            producers: Vec::new(),
            observers: ObserverList::new(),
            last_report: None,
        })
    }

    // -- accessors ----------------------------------------------------------

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn current_tick(&self) -> Tick {
        self.state.current_tick()
    }

    /// BLAKE3 hex digest of the current state.
    pub fn state_hash(&self) -> String {
        self.state.state_hash()
    }

    pub fn capture_snapshot(&self) -> StateSnapshot {
        self.state.capture_snapshot()
    }

    pub fn event(&self, id: EventId) -> Option<&ScheduledEvent> {
        self.log.get(&id)
    }

    pub fn producers(&self) -> &[ResourceProducer] {
        &self.producers
    }

    /// Report of the most recently settled tick.
    pub fn last_tick_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    // -- log queries --------------------------------------------------------

    /// Events strictly after the current tick, in resolution order.
    pub fn queued_events(&self) -> Vec<&ScheduledEvent> {
        let now = self.current_tick();
        self.sorted_events(|e| e.occurs_at() > now)
    }

    /// Events at or before the current tick, in resolution order.
    pub fn past_events(&self) -> Vec<&ScheduledEvent> {
        let now = self.current_tick();
        self.sorted_events(|e| e.occurs_at() <= now)
    }

    fn sorted_events(&self, keep: impl Fn(&ScheduledEvent) -> bool) -> Vec<&ScheduledEvent> {
        let mut events: Vec<&ScheduledEvent> = self.log.values().filter(|e| keep(e)).collect();
        events.sort_by_key(|e| e.sort_key());
        events
    }

    // -- scheduling ---------------------------------------------------------

    /// Add an event to the log and return its id.
    ///
    /// If the event falls at or before the current tick, the machine rewinds
    /// to the tick before it, inserts it, and replays back to the current
    /// tick.
    ///
    /// # Errors
    ///
    /// [`TimeMachineError::ScheduledAtEpoch`] for events at tick 0.
    pub fn add_event(&mut self, event: GameEvent) -> Result<EventId, TimeMachineError> {
        let at = event.occurs_at();
        if at == Tick::EPOCH {
            return Err(TimeMachineError::ScheduledAtEpoch);
        }
        let resume = self.current_tick();
        if at <= resume {
            debug!(tick = %at, current = %resume, event = event.name(), "retroactive add");
            self.goto(at.rewind(1));
            let id = self.insert(event, false);
            self.goto(resume);
            return Ok(id);
        }
        Ok(self.insert(event, false))
    }

    /// Remove an event from the log, returning it.
    ///
    /// If it already fired, the machine rewinds to before it so its effects
    /// are undone, drops it, and replays back to the current tick.
    ///
    /// # Errors
    ///
    /// [`TimeMachineError::UnknownEvent`] if `id` is not in the log.
    pub fn remove_event(&mut self, id: EventId) -> Result<GameEvent, TimeMachineError> {
        let at = self
            .log
            .get(&id)
            .map(ScheduledEvent::occurs_at)
            .ok_or(TimeMachineError::UnknownEvent { id })?;
        let resume = self.current_tick();
        if at <= resume {
            debug!(tick = %at, current = %resume, %id, "retroactive remove");
            self.goto(at.rewind(1));
            let removed = self.take(id);
            self.goto(resume);
            return removed.ok_or(TimeMachineError::UnknownEvent { id });
        }
        self.take(id).ok_or(TimeMachineError::UnknownEvent { id })
    }

    fn insert(&mut self, event: GameEvent, generated: bool) -> EventId {
        let id = EventId::new(self.next_event_id);
        self.next_event_id += 1;
        self.by_tick.entry(event.occurs_at()).or_default().push(id);
        self.log.insert(
            id,
            ScheduledEvent {
                id,
                event,
                phase: EventPhase::Pending,
                generated,
            },
        );
        id
    }

    fn take(&mut self, id: EventId) -> Option<GameEvent> {
        let entry = self.log.remove(&id)?;
        if let Some(ids) = self.by_tick.get_mut(&entry.occurs_at()) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_tick.remove(&entry.occurs_at());
            }
        }
        Some(entry.event)
    }

    // -- producers ----------------------------------------------------------

    /// Register a recurring producer. Only productions after the current tick
    /// are generated.
    pub fn add_producer(&mut self, mut producer: ResourceProducer) {
        producer.reset_generated_through(self.current_tick());
        self.producers.push(producer);
    }

    /// Driller production at `outpost`, anchored at the current tick.
    pub fn add_driller_producer(&mut self, outpost: EntityId) {
        let producer = ResourceProducer::drillers(outpost, self.current_tick(), &self.config);
        self.add_producer(producer);
    }

    /// Shield regeneration at `outpost`, anchored at the current tick.
    pub fn add_shield_producer(&mut self, outpost: EntityId) {
        let producer = ResourceProducer::shields(outpost, self.current_tick(), &self.config);
        self.add_producer(producer);
    }

    fn generate_productions(&mut self, tick: Tick) {
        let due: Vec<_> = self
            .producers
            .iter_mut()
            .filter_map(|p| p.take_due(tick))
            .collect();
        for production in due {
            self.insert(GameEvent::new(tick, production), true);
        }
    }

    // -- observers ----------------------------------------------------------

    /// Call `listener` after every settled tick.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&TickChanged<'_>) + 'static,
    ) -> ListenerHandle {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.observers.unsubscribe(handle)
    }

    // -- travel -------------------------------------------------------------

    /// Step one tick at a time until the current tick equals `target`.
    pub fn goto(&mut self, target: Tick) -> GotoSummary {
        let mut summary = GotoSummary {
            from: self.current_tick(),
            to: target,
            ..GotoSummary::default()
        };
        while self.current_tick() < target {
            let report = self.step_forward();
            summary.absorb(&report);
        }
        while self.current_tick() > target {
            let report = self.step_reverse();
            summary.absorb(&report);
        }
        summary
    }

    /// Jump to the tick of a logged event.
    ///
    /// # Errors
    ///
    /// [`TimeMachineError::UnknownEvent`] if `id` is not in the log.
    pub fn goto_event(&mut self, id: EventId) -> Result<GotoSummary, TimeMachineError> {
        let at = self
            .log
            .get(&id)
            .map(ScheduledEvent::occurs_at)
            .ok_or(TimeMachineError::UnknownEvent { id })?;
        Ok(self.goto(at))
    }

    pub fn advance(&mut self, ticks: u64) -> GotoSummary {
        self.goto(self.current_tick().advance(ticks))
    }

    /// Move back `ticks` ticks, stopping at the epoch.
    pub fn rewind(&mut self, ticks: u64) -> GotoSummary {
        self.goto(self.current_tick().rewind(ticks))
    }

    /// Ids scheduled at `tick`, in forward resolution order.
    fn batch(&self, tick: Tick) -> Vec<EventId> {
        let mut ids = self.by_tick.get(&tick).cloned().unwrap_or_default();
        ids.sort_by_key(|id| {
            let priority = self.log.get(id).map(ScheduledEvent::priority);
            (priority, *id)
        });
        ids
    }

    fn step_forward(&mut self) -> TickReport {
        let tick = self.current_tick().advance(1);
        self.state.set_current_tick(tick);
        self.generate_productions(tick);

        let mut report = TickReport::new(Direction::Forward, tick);
        for id in self.batch(tick) {
            let Some(entry) = self.log.get_mut(&id) else {
                continue;
            };
            match entry.event.forward(&mut self.state, &self.config) {
                Ok(true) => {
                    trace!(%id, %tick, event = entry.event.name(), "event applied");
                    entry.phase = EventPhase::Applied;
                    report.applied += 1;
                }
                Ok(false) => {
                    warn!(%id, %tick, event = entry.event.name(), "event failed");
                    entry.phase = EventPhase::Rejected;
                    report.failed += 1;
                }
                Err(e) => {
                    error!(%id, %tick, event = entry.event.name(), error = %e, "event not applied");
                    entry.phase = EventPhase::Unsupported;
                    report.unsupported += 1;
                }
            }
        }

        self.settle(report)
    }

    fn step_reverse(&mut self) -> TickReport {
        let leaving = self.current_tick();
        let mut batch = self.batch(leaving);
        if self.config.undo_order == UndoOrder::Reversed {
            batch.reverse();
        }

        let tick = leaving.rewind(1);
        let mut report = TickReport::new(Direction::Reverse, tick);
        for id in batch {
            let Some(entry) = self.log.get_mut(&id) else {
                continue;
            };
            let phase = std::mem::replace(&mut entry.phase, EventPhase::Pending);
            if phase != EventPhase::Applied {
                continue;
            }
            match entry.event.backward(&mut self.state, &self.config) {
                Ok(true) => {
                    trace!(%id, tick = %leaving, event = entry.event.name(), "event reverted");
                    report.reverted += 1;
                }
                Ok(false) => {
                    warn!(%id, tick = %leaving, event = entry.event.name(), "applied event had nothing to revert");
                }
                Err(e) => {
                    error!(%id, tick = %leaving, event = entry.event.name(), error = %e, "event not reverted");
                }
            }
        }

        self.state.set_current_tick(tick);
        self.settle(report)
    }

    fn settle(&mut self, report: TickReport) -> TickReport {
        debug!(
            direction = %report.direction,
            tick = %report.tick,
            applied = report.applied,
            failed = report.failed,
            unsupported = report.unsupported,
            reverted = report.reverted,
            "tick settled"
        );
        self.observers.notify(&TickChanged {
            direction: report.direction,
            tick: report.tick,
            state: &self.state,
        });
        self.last_report = Some(report);
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
