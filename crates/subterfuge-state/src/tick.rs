//! Discrete simulation time.
//!
//! A [`Tick`] is the only notion of time the simulation understands. Ticks are
//! totally ordered and never negative: rewinding past the epoch clamps to
//! [`Tick::EPOCH`] instead of wrapping or failing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete point in simulation time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(u64);

impl Tick {
    /// The first tick of every game. The initial map describes the state *at*
    /// the epoch, so no event can be scheduled there.
    pub const EPOCH: Tick = Tick(0);

    /// Construct a tick from its raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// The tick `n` units later. Saturates at `u64::MAX`.
    #[inline]
    pub fn advance(self, n: u64) -> Tick {
        Tick(self.0.saturating_add(n))
    }

    /// The tick `n` units earlier, clamped at [`Tick::EPOCH`].
    #[inline]
    pub fn rewind(self, n: u64) -> Tick {
        Tick(self.0.saturating_sub(n))
    }

    /// Number of ticks from `earlier` to `self`, or zero if `earlier` is later.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
