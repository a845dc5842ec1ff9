//! Deterministic replay with submission recording and checkpoint verification.
//!
//! A [`ReplayRecorder`] captures the starting point of a session (config,
//! state snapshot, producers, and any events already queued) and then every
//! later submission, removal, and hash checkpoint, each tagged with the tick
//! the machine was at when it happened. The result is a [`ReplayLog`].
//!
//! Removals are recorded by submission ordinal rather than [`EventId`]: a
//! fresh machine numbers events from zero, so the ids seen while recording
//! need not match the ids handed out on replay.
//!
//! [`replay`] rebuilds a fresh [`TimeMachine`] from the log, performs the same
//! operations at the same ticks, and compares state hashes at every
//! checkpoint and at the end. Because the engine is deterministic, any
//! mismatch is a bug (or a tampered log).
//!
//! # Recording
//!
//! ```
//! use subterfuge_engine::prelude::*;
//! use subterfuge_engine::replay::{replay, ReplayRecorder};
//!
//! let mut state = GameState::new();
//! state.add_outpost(Outpost::new(EntityId::new(1), None)).unwrap();
//! let mut tm = TimeMachine::new(state, SimConfig::default()).unwrap();
//!
//! let mut recorder = ReplayRecorder::new(&tm);
//! let event = GameEvent::outpost_destruction(Tick::new(4), EntityId::new(1));
//! recorder.submit(&mut tm, event).unwrap();
//! tm.advance(2);
//! recorder.record_checkpoint(&tm);
//! tm.advance(3);
//! let log = recorder.finish(&tm);
//!
//! let result = replay(&log).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! ```

use serde::{Deserialize, Serialize};

use subterfuge_state::prelude::*;

use crate::config::SimConfig;
use crate::event::{EventId, GameEvent};
use crate::production::ResourceProducer;
use crate::time_machine::{TimeMachine, TimeMachineError};

// ---------------------------------------------------------------------------
// ReplayLog / ReplayEntry
// ---------------------------------------------------------------------------

/// A complete, JSON-serializable session recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Engine settings in force during recording.
    pub config: SimConfig,
    /// State at the moment recording began.
    pub initial_snapshot: StateSnapshot,
    /// Producers registered when recording began.
    pub producers: Vec<ResourceProducer>,
    /// Operations in the order they were performed.
    pub entries: Vec<ReplayEntry>,
    /// Tick the machine was left at.
    pub final_tick: Tick,
    /// BLAKE3 hex digest of the state at `final_tick`.
    pub final_hash: String,
}

impl ReplayLog {
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One recorded operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// An event was submitted while the machine was at `at`.
    Submit { at: Tick, event: GameEvent },
    /// The `submission`-th recorded submission was removed while the machine
    /// was at `at`.
    Remove { at: Tick, submission: usize },
    /// The state hash observed at `tick`.
    Checkpoint { tick: Tick, state_hash: String },
}

// ---------------------------------------------------------------------------
// ReplayResult / ReplayDivergence
// ---------------------------------------------------------------------------

/// The outcome of [`replay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    /// `true` if every entry was replayed and every hash matched.
    pub completed: bool,
    /// Number of entries processed before stopping.
    pub entries_replayed: usize,
    /// The first hash mismatch, if any.
    pub first_divergence: Option<ReplayDivergence>,
}

/// A checkpoint where the replayed state did not match the recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub tick: Tick,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Records a session into a [`ReplayLog`].
///
/// Route submissions and removals through [`submit`](Self::submit) and
/// [`remove`](Self::remove) so they are recorded together with the tick they
/// happened at, and call [`record_checkpoint`](Self::record_checkpoint)
/// whenever a hash should be verified on replay.
///
/// Checkpoint ticks must strictly increase.
pub struct ReplayRecorder {
    log: ReplayLog,
    /// Recording-side id of each submission, by ordinal.
    submitted: Vec<EventId>,
    last_checkpoint: Option<Tick>,
}

impl ReplayRecorder {
    /// Start recording from the machine's current state.
    ///
    /// Submitted events already queued for the future are captured as
    /// submissions at the current tick. Events at or before the current tick
    /// are part of the snapshot; a recording must not rewind past its start.
    pub fn new(tm: &TimeMachine) -> Self {
        let now = tm.current_tick();
        let producers = tm
            .producers()
            .iter()
            .cloned()
            .map(|mut p| {
                p.reset_generated_through(now);
                p
            })
            .collect();
        let mut queued: Vec<_> = tm
            .queued_events()
            .into_iter()
            .filter(|e| !e.is_generated())
            .collect();
        queued.sort_by_key(|e| e.id());

        let submitted = queued.iter().map(|e| e.id()).collect();
        let entries = queued
            .into_iter()
            .map(|e| ReplayEntry::Submit {
                at: now,
                event: e.event().clone(),
            })
            .collect();

        Self {
            log: ReplayLog {
                config: tm.config().clone(),
                initial_snapshot: tm.capture_snapshot(),
                producers,
                entries,
                final_tick: now,
                final_hash: String::new(),
            },
            submitted,
            last_checkpoint: None,
        }
    }

    /// Add `event` to the machine and record the submission.
    ///
    /// # Errors
    ///
    /// Whatever [`TimeMachine::add_event`] returns; nothing is recorded then.
    pub fn submit(
        &mut self,
        tm: &mut TimeMachine,
        event: GameEvent,
    ) -> Result<EventId, TimeMachineError> {
        let at = tm.current_tick();
        let recorded = event.clone();
        let id = tm.add_event(event)?;
        self.submitted.push(id);
        self.log.entries.push(ReplayEntry::Submit {
            at,
            event: recorded,
        });
        Ok(id)
    }

    /// Remove a recorded submission from the machine and record the removal.
    ///
    /// # Errors
    ///
    /// [`TimeMachineError::UnknownEvent`] if `id` was not submitted through
    /// this recorder (or queued when it started), or is already gone. The
    /// machine is left untouched in that case.
    pub fn remove(
        &mut self,
        tm: &mut TimeMachine,
        id: EventId,
    ) -> Result<GameEvent, TimeMachineError> {
        let submission = self
            .submitted
            .iter()
            .position(|s| *s == id)
            .ok_or(TimeMachineError::UnknownEvent { id })?;
        let at = tm.current_tick();
        let removed = tm.remove_event(id)?;
        self.log
            .entries
            .push(ReplayEntry::Remove { at, submission });
        Ok(removed)
    }

    /// Record the machine's current tick and state hash.
    ///
    /// # Panics
    ///
    /// Panics if the tick is not strictly greater than the previous
    /// checkpoint's.
    pub fn record_checkpoint(&mut self, tm: &TimeMachine) {
        let tick = tm.current_tick();
        if let Some(prev) = self.last_checkpoint {
            assert!(
                tick > prev,
                "ReplayRecorder::record_checkpoint: tick {tick} is not strictly greater than \
                 previous checkpoint {prev}. Checkpoints must be recorded in increasing order."
            );
        }
        self.last_checkpoint = Some(tick);
        self.log.entries.push(ReplayEntry::Checkpoint {
            tick,
            state_hash: tm.state_hash(),
        });
    }

    /// Finish recording at the machine's current tick.
    pub fn finish(mut self, tm: &TimeMachine) -> ReplayLog {
        self.log.final_tick = tm.current_tick();
        self.log.final_hash = tm.state_hash();
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay a [`ReplayLog`] on a fresh machine and verify every checkpoint.
///
/// # Errors
///
/// Returns an error if the log is malformed (non-increasing checkpoints, a
/// snapshot whose hash does not match its contents, an invalid config, or an
/// operation the machine refuses). All structural validation happens before
/// any machine is built.
pub fn replay(log: &ReplayLog) -> anyhow::Result<ReplayResult> {
    rebuild(log).map(|(_, result)| result)
}

/// Like [`replay`], but also hand back the rebuilt machine.
pub fn rebuild(log: &ReplayLog) -> anyhow::Result<(TimeMachine, ReplayResult)> {
    let mut previous: Option<Tick> = None;
    let mut submissions = 0;
    for entry in &log.entries {
        match entry {
            ReplayEntry::Submit { .. } => submissions += 1,
            ReplayEntry::Remove { submission, .. } => {
                if *submission >= submissions {
                    return Err(anyhow::anyhow!(
                        "replay log removes submission {submission} before it was submitted"
                    ));
                }
            }
            ReplayEntry::Checkpoint { tick, .. } => {
                if previous.is_some_and(|p| *tick <= p) {
                    return Err(anyhow::anyhow!(
                        "replay log checkpoints are not strictly increasing at tick {tick}"
                    ));
                }
                previous = Some(*tick);
            }
        }
    }

    let state = log
        .initial_snapshot
        .clone()
        .into_state()
        .map_err(|e| anyhow::anyhow!("failed to restore initial snapshot for replay: {e}"))?;
    let mut tm = TimeMachine::new(state, log.config.clone())
        .map_err(|e| anyhow::anyhow!("replay log carries an invalid config: {e}"))?;
    for producer in &log.producers {
        tm.add_producer(producer.clone());
    }

    let mut entries_replayed = 0;
    let mut replayed_ids: Vec<EventId> = Vec::with_capacity(submissions);
    for entry in &log.entries {
        match entry {
            ReplayEntry::Submit { at, event } => {
                tm.goto(*at);
                let id = tm.add_event(event.clone()).map_err(|e| {
                    anyhow::anyhow!("replayed submission at tick {at} failed: {e}")
                })?;
                replayed_ids.push(id);
            }
            ReplayEntry::Remove { at, submission } => {
                tm.goto(*at);
                let id = replayed_ids[*submission];
                tm.remove_event(id)
                    .map_err(|e| anyhow::anyhow!("replayed removal at tick {at} failed: {e}"))?;
            }
            ReplayEntry::Checkpoint { tick, state_hash } => {
                tm.goto(*tick);
                if let Some(divergence) = compare(&tm, state_hash) {
                    return Ok((
                        tm,
                        ReplayResult {
                            completed: false,
                            entries_replayed,
                            first_divergence: Some(divergence),
                        },
                    ));
                }
            }
        }
        entries_replayed += 1;
    }

    tm.goto(log.final_tick);
    let first_divergence = compare(&tm, &log.final_hash);
    let result = ReplayResult {
        completed: first_divergence.is_none(),
        entries_replayed,
        first_divergence,
    };
    Ok((tm, result))
}

fn compare(tm: &TimeMachine, expected: &str) -> Option<ReplayDivergence> {
    let actual = tm.state_hash();
    (actual != expected).then(|| ReplayDivergence {
        tick: tm.current_tick(),
        expected_hash: expected.to_owned(),
        actual_hash: actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> TimeMachine {
        let mut state = GameState::new();
        state.add_player(Player::new(PlayerId(1), "one")).unwrap();
        state
            .add_outpost(
                Outpost::new(EntityId::new(1), Some(PlayerId(1)))
                    .with_driller_capacity(50)
                    .with_drillers(5),
            )
            .unwrap();
        let config = SimConfig {
            ticks_per_production: 3,
            ..SimConfig::default()
        };
        TimeMachine::new(state, config).unwrap()
    }

    #[test]
    fn tampered_checkpoint_reports_divergence() {
        let mut tm = machine();
        tm.add_driller_producer(EntityId::new(1));
        let mut recorder = ReplayRecorder::new(&tm);
        tm.advance(4);
        recorder.record_checkpoint(&tm);
        tm.advance(4);
        let mut log = recorder.finish(&tm);

        if let Some(ReplayEntry::Checkpoint { state_hash, .. }) = log.entries.last_mut() {
            *state_hash = "0".repeat(64);
        }
        let result = replay(&log).unwrap();
        assert!(!result.completed);
        let divergence = result.first_divergence.unwrap();
        assert_eq!(divergence.tick, Tick::new(4));
        assert_eq!(divergence.expected_hash, "0".repeat(64));
    }

    #[test]
    fn non_increasing_checkpoints_rejected() {
        let tm = machine();
        let mut log = ReplayRecorder::new(&tm).finish(&tm);
        for _ in 0..2 {
            log.entries.push(ReplayEntry::Checkpoint {
                tick: Tick::new(3),
                state_hash: String::new(),
            });
        }
        assert!(replay(&log).is_err());
    }

    #[test]
    #[should_panic(expected = "not strictly greater")]
    fn recorder_panics_on_repeated_checkpoint() {
        let tm = machine();
        let mut recorder = ReplayRecorder::new(&tm);
        recorder.record_checkpoint(&tm);
        recorder.record_checkpoint(&tm);
    }

    #[test]
    fn corrupted_snapshot_rejected() {
        let tm = machine();
        let mut log = ReplayRecorder::new(&tm).finish(&tm);
        log.initial_snapshot.hash = "f".repeat(64);
        let err = replay(&log).unwrap_err();
        assert!(err.to_string().contains("initial snapshot"));
    }

    #[test]
    fn log_survives_json() {
        let mut tm = machine();
        let mut recorder = ReplayRecorder::new(&tm);
        let keep = GameEvent::outpost_destruction(Tick::new(2), EntityId::new(1));
        recorder.submit(&mut tm, keep).unwrap();
        tm.advance(3);
        let doomed = GameEvent::outpost_destruction(Tick::new(5), EntityId::new(1));
        let doomed = recorder.submit(&mut tm, doomed).unwrap();
        recorder.remove(&mut tm, doomed).unwrap();
        let log = recorder.finish(&tm);

        let decoded = ReplayLog::from_json(&log.to_json().unwrap()).unwrap();
        let result = replay(&decoded).unwrap();
        assert!(result.completed, "{:?}", result.first_divergence);
        assert_eq!(result.entries_replayed, 3);
    }

    #[test]
    fn removing_unrecorded_event_is_refused() {
        let mut tm = machine();
        let outside = tm
            .add_event(GameEvent::outpost_destruction(Tick::new(9), EntityId::new(1)))
            .unwrap();
        let mut recorder = ReplayRecorder::new(&tm);
        let generated_elsewhere = EventId::new(outside.raw() + 40);
        assert!(matches!(
            recorder.remove(&mut tm, generated_elsewhere),
            Err(TimeMachineError::UnknownEvent { .. })
        ));
        // Queued events present at the start are recorded submissions.
        recorder.remove(&mut tm, outside).unwrap();
        assert!(tm.queued_events().is_empty());
    }

    #[test]
    fn removal_before_submission_rejected() {
        let tm = machine();
        let mut log = ReplayRecorder::new(&tm).finish(&tm);
        log.entries.push(ReplayEntry::Remove {
            at: Tick::new(1),
            submission: 0,
        });
        assert!(replay(&log).is_err());
    }
}
